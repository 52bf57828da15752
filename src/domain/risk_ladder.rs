//! Win/loss-streak risk ladder.
//!
//! The ladder is recomputed from the full trade history on every call, oldest
//! trade first. Two consecutive non-negative trades move one tier up, two
//! consecutive losses move one tier down. Counters reset when the tier moves.

use chrono::NaiveDate;

/// Risk percent per tier, lowest first.
pub const STANDARD_TIERS: [f64; 3] = [0.25, 0.5, 1.0];
pub const STANDARD_STREAK_LENGTH: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeOutcome {
    pub pnl: f64,
    pub closed_on: Option<NaiveDate>,
}

impl TradeOutcome {
    pub fn new(pnl: f64) -> Self {
        Self {
            pnl,
            closed_on: None,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl >= 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskLadderState {
    pub tier: usize,
    pub consecutive_wins: u32,
    pub consecutive_losses: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskLadder {
    tiers: Vec<f64>,
    streak_length: u32,
}

impl Default for RiskLadder {
    fn default() -> Self {
        Self {
            tiers: STANDARD_TIERS.to_vec(),
            streak_length: STANDARD_STREAK_LENGTH,
        }
    }
}

impl RiskLadder {
    /// Returns `None` when there are no tiers or the streak length is zero.
    pub fn new(tiers: Vec<f64>, streak_length: u32) -> Option<Self> {
        if tiers.is_empty() || streak_length == 0 {
            return None;
        }
        Some(Self {
            tiers,
            streak_length,
        })
    }

    pub fn tiers(&self) -> &[f64] {
        &self.tiers
    }

    pub fn streak_length(&self) -> u32 {
        self.streak_length
    }

    fn top_tier(&self) -> usize {
        self.tiers.len() - 1
    }

    /// Advance the state by one trade.
    pub fn step(&self, state: &mut RiskLadderState, outcome: &TradeOutcome) {
        if outcome.is_win() {
            state.consecutive_wins += 1;
            state.consecutive_losses = 0;
            if state.consecutive_wins == self.streak_length && state.tier < self.top_tier() {
                state.tier += 1;
                state.consecutive_wins = 0;
            }
        } else {
            state.consecutive_losses += 1;
            state.consecutive_wins = 0;
            if state.consecutive_losses == self.streak_length && state.tier > 0 {
                state.tier -= 1;
                state.consecutive_losses = 0;
            }
        }
    }

    /// Replay a history ordered oldest to newest from the bottom tier.
    pub fn replay<'a>(&self, history: impl IntoIterator<Item = &'a TradeOutcome>) -> RiskLadderState {
        let mut state = RiskLadderState::default();
        for outcome in history {
            self.step(&mut state, outcome);
        }
        state
    }

    pub fn risk_percent(&self, state: &RiskLadderState) -> f64 {
        self.tiers[state.tier.min(self.top_tier())]
    }

    pub fn current_risk_percent(&self, history: &[TradeOutcome]) -> f64 {
        self.risk_percent(&self.replay(history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(pnls: &[f64]) -> Vec<TradeOutcome> {
        pnls.iter().copied().map(TradeOutcome::new).collect()
    }

    #[test]
    fn empty_history_is_bottom_tier() {
        let ladder = RiskLadder::default();
        let state = ladder.replay(&history(&[]));
        assert_eq!(state, RiskLadderState::default());
        assert_eq!(ladder.risk_percent(&state), 0.25);
    }

    #[test]
    fn two_wins_advance_one_tier() {
        let ladder = RiskLadder::default();
        let state = ladder.replay(&history(&[1.0, 1.0]));
        assert_eq!(state.tier, 1);
        assert_eq!(state.consecutive_wins, 0);
        assert_eq!(ladder.risk_percent(&state), 0.5);
    }

    #[test]
    fn two_losses_retreat_one_tier() {
        let ladder = RiskLadder::default();
        assert_eq!(ladder.current_risk_percent(&history(&[1.0, 1.0, -1.0, -1.0])), 0.25);
    }

    #[test]
    fn breakeven_counts_as_win() {
        let ladder = RiskLadder::default();
        assert_eq!(ladder.current_risk_percent(&history(&[0.0, 0.0])), 0.5);
    }

    #[test]
    fn alternating_results_never_move() {
        let ladder = RiskLadder::default();
        let state = ladder.replay(&history(&[1.0, -1.0, 1.0, -1.0, 1.0]));
        assert_eq!(state.tier, 0);
        assert_eq!(state.consecutive_wins, 1);
        assert_eq!(state.consecutive_losses, 0);
    }

    #[test]
    fn losses_at_bottom_keep_counting() {
        let ladder = RiskLadder::default();
        let state = ladder.replay(&history(&[-1.0, -1.0, -1.0]));
        assert_eq!(state.tier, 0);
        assert_eq!(state.consecutive_losses, 3);
    }

    #[test]
    fn long_win_streak_stops_at_top() {
        let ladder = RiskLadder::default();
        let state = ladder.replay(&history(&[5.0; 10]));
        assert_eq!(state.tier, 2);
        assert_eq!(ladder.risk_percent(&state), 1.0);
    }

    #[test]
    fn at_top_a_single_loss_does_not_retreat() {
        let ladder = RiskLadder::default();
        assert_eq!(
            ladder.current_risk_percent(&history(&[1.0, 1.0, 1.0, 1.0, -3.0])),
            1.0
        );
        assert_eq!(
            ladder.current_risk_percent(&history(&[1.0, 1.0, 1.0, 1.0, -3.0, -3.0])),
            0.5
        );
    }

    #[test]
    fn custom_ladder() {
        let ladder = RiskLadder::new(vec![0.1, 0.2, 0.4, 0.8], 3).unwrap();
        assert_eq!(ladder.current_risk_percent(&history(&[1.0; 6])), 0.4);
        assert!(RiskLadder::new(vec![], 2).is_none());
        assert!(RiskLadder::new(vec![1.0], 0).is_none());
    }
}
