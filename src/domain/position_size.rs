//! Risk-based position sizing.
//!
//! quantity = floor(buying_power * risk% / |entry - stop|), optionally capped
//! at a fraction of average daily volume.

use crate::domain::error::SizingError;

/// Default share of average daily volume a single order may take.
pub const DEFAULT_VOLUME_CAP_FRACTION: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizeRequest {
    pub entry_price: f64,
    pub stop_loss: f64,
    /// Percent of buying power to risk, e.g. 1.0 for 1%.
    pub risk_percent: f64,
    pub buying_power: f64,
    pub average_daily_volume: Option<f64>,
    /// Carried through for the execution layer; not part of the sizing math.
    pub partial_fill_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSize {
    pub quantity: u64,
    pub amount_invested: f64,
    pub amount_at_risk: f64,
    pub risk_percent: f64,
    /// Set when the volume cap reduced the quantity.
    pub cap_note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    volume_cap_fraction: f64,
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self {
            volume_cap_fraction: DEFAULT_VOLUME_CAP_FRACTION,
        }
    }
}

impl PositionSizer {
    pub fn new(volume_cap_fraction: f64) -> Self {
        Self {
            volume_cap_fraction,
        }
    }

    pub fn volume_cap_fraction(&self) -> f64 {
        self.volume_cap_fraction
    }

    pub fn calculate(&self, req: &PositionSizeRequest) -> Result<PositionSize, SizingError> {
        // Written as negations so NaN prices are rejected too.
        if !(req.entry_price > 0.0) || !(req.stop_loss > 0.0) {
            return Err(SizingError::InvalidPrice {
                entry_price: req.entry_price,
                stop_loss: req.stop_loss,
            });
        }

        let risk_per_share = (req.entry_price - req.stop_loss).abs();
        if !(risk_per_share > 0.0) {
            return Err(SizingError::NonPositiveRisk);
        }

        let max_risk_amount = req.buying_power * (req.risk_percent / 100.0);
        let mut quantity = (max_risk_amount / risk_per_share).floor();
        let mut cap_note = None;

        if let Some(volume) = req.average_daily_volume {
            let cap = (volume * self.volume_cap_fraction).floor();
            if quantity > cap {
                cap_note = Some(format!(
                    "capped at {cap} shares ({}% of average daily volume {volume})",
                    self.volume_cap_fraction * 100.0
                ));
                quantity = cap;
            }
        }

        if !(quantity >= 1.0) {
            return Err(SizingError::ZeroQuantity);
        }
        let quantity = quantity as u64;

        Ok(PositionSize {
            quantity,
            amount_invested: req.entry_price * quantity as f64,
            amount_at_risk: risk_per_share * quantity as f64,
            risk_percent: req.risk_percent,
            cap_note,
        })
    }
}

/// Size with the default volume cap.
pub fn calculate(req: &PositionSizeRequest) -> Result<PositionSize, SizingError> {
    PositionSizer::default().calculate(req)
}
