//! Closed-trade history port.

use crate::domain::error::RuleforgeError;
use crate::domain::risk_ladder::TradeOutcome;

pub trait TradeHistoryPort {
    /// Outcomes ordered oldest to newest.
    fn outcomes(&self) -> Result<Vec<TradeOutcome>, RuleforgeError>;
}
