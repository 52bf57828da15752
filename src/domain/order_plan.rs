//! Order planning: rule levels, ladder risk and position size in one pass.

use crate::domain::error::SizingError;
use crate::domain::position_size::{PositionSize, PositionSizeRequest, PositionSizer};
use crate::domain::risk_ladder::{RiskLadder, RiskLadderState, TradeOutcome};
use crate::domain::rule_apply::{MarketContext, RuleApplier, RuleLevels};
use crate::domain::trading_rule::TradingRule;
use crate::domain::whitelist::Whitelist;

/// Everything the order-submission layer needs to place the bracket.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    pub rule_name: String,
    pub market: MarketContext,
    pub levels: RuleLevels,
    pub ladder: RiskLadderState,
    pub risk_percent: f64,
    pub position: PositionSize,
    pub partial_pct: f64,
    pub exit_rule: String,
}

#[derive(Debug, Clone, Default)]
pub struct Planner {
    pub whitelist: Whitelist,
    pub ladder: RiskLadder,
    pub sizer: PositionSizer,
}

impl Planner {
    pub fn new(whitelist: Whitelist, ladder: RiskLadder, sizer: PositionSizer) -> Self {
        Self {
            whitelist,
            ladder,
            sizer,
        }
    }

    pub fn plan(
        &self,
        rule: &TradingRule,
        market: &MarketContext,
        history: &[TradeOutcome],
        buying_power: f64,
        average_daily_volume: Option<f64>,
    ) -> Result<OrderPlan, SizingError> {
        let levels = RuleApplier::new(&self.whitelist).apply(rule, market);
        let ladder = self.ladder.replay(history);
        let risk_percent = self.ladder.risk_percent(&ladder);

        let position = self.sizer.calculate(&PositionSizeRequest {
            entry_price: market.entry_price,
            stop_loss: levels.stop_loss.value,
            risk_percent,
            buying_power,
            average_daily_volume,
            partial_fill_percent: Some(rule.partial_pct),
        })?;

        tracing::info!(
            rule = %rule.name,
            quantity = position.quantity,
            stop = levels.stop_loss.value,
            target = levels.profit_target.value,
            risk_percent,
            "order planned"
        );

        Ok(OrderPlan {
            rule_name: rule.name.clone(),
            market: *market,
            levels,
            ladder,
            risk_percent,
            position,
            partial_pct: rule.partial_pct,
            exit_rule: rule.exit_rule.clone(),
        })
    }
}
