//! Apply a trading rule's formulas to a market context.
//!
//! # Evaluation Semantics
//!
//! - Empty formula: the level's default (stop = low/high by side, target and
//!   trailing stop = 0, meaning "none")
//! - Formula evaluates: its value is used as-is
//! - Formula fails: the rule's fallback strategy supplies the value and the
//!   failure is logged; the error is kept on the returned [`Level`]
//!
//! Stop-loss formulas see `entry`, `low`, `high` and `entry_type` (±1).
//! Profit targets see `entry` and `atr`. Trailing stops see `atr` only.

use crate::domain::bindings::VariableBindings;
use crate::domain::error::FormulaError;
use crate::domain::formula::evaluate_formula;
use crate::domain::trading_rule::{
    EntrySide, StopFallback, TargetFallback, TradingRule, TrailFallback,
};
use crate::domain::whitelist::Whitelist;

#[derive(Debug, Clone, PartialEq)]
pub enum LevelSource<F> {
    /// The formula was empty.
    Default,
    Formula,
    Fallback { strategy: F, error: FormulaError },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Level<F> {
    pub value: f64,
    pub source: LevelSource<F>,
}

impl<F> Level<F> {
    fn default_value(value: f64) -> Self {
        Self {
            value,
            source: LevelSource::Default,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, LevelSource::Fallback { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketContext {
    pub entry_price: f64,
    pub side: EntrySide,
    pub low: f64,
    pub high: f64,
    pub atr: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleLevels {
    pub stop_loss: Level<StopFallback>,
    pub profit_target: Level<TargetFallback>,
    pub trailing_stop: Level<TrailFallback>,
}

pub struct RuleApplier<'w> {
    whitelist: &'w Whitelist,
}

impl<'w> RuleApplier<'w> {
    pub fn new(whitelist: &'w Whitelist) -> Self {
        Self { whitelist }
    }

    pub fn stop_loss(
        &self,
        rule: &TradingRule,
        entry_price: f64,
        side: EntrySide,
        low: f64,
        high: f64,
    ) -> Level<StopFallback> {
        if rule.stop_loss.trim().is_empty() {
            return Level::default_value(StopFallback::SideDefault.resolve(
                entry_price,
                side,
                low,
                high,
            ));
        }
        let bindings = VariableBindings::new()
            .with("entry", entry_price)
            .with("low", low)
            .with("high", high)
            .with("entry_type", side.sign());
        self.evaluate(&rule.name, "stop loss", &rule.stop_loss, &bindings, || {
            let strategy = rule.stop_fallback();
            (strategy, strategy.resolve(entry_price, side, low, high))
        })
    }

    pub fn profit_target(
        &self,
        rule: &TradingRule,
        entry_price: f64,
        atr: f64,
    ) -> Level<TargetFallback> {
        if rule.profit_taking.trim().is_empty() {
            return Level::default_value(0.0);
        }
        let bindings = VariableBindings::new()
            .with("entry", entry_price)
            .with("atr", atr);
        self.evaluate(&rule.name, "profit target", &rule.profit_taking, &bindings, || {
            let strategy = rule.target_fallback();
            (strategy, strategy.resolve(entry_price, atr))
        })
    }

    pub fn trailing_stop(&self, rule: &TradingRule, atr: f64) -> Level<TrailFallback> {
        if rule.trailing_stop.trim().is_empty() {
            return Level::default_value(0.0);
        }
        let bindings = VariableBindings::new().with("atr", atr);
        self.evaluate(&rule.name, "trailing stop", &rule.trailing_stop, &bindings, || {
            let strategy = rule.trail_fallback();
            (strategy, strategy.resolve(atr))
        })
    }

    pub fn apply(&self, rule: &TradingRule, market: &MarketContext) -> RuleLevels {
        RuleLevels {
            stop_loss: self.stop_loss(
                rule,
                market.entry_price,
                market.side,
                market.low,
                market.high,
            ),
            profit_target: self.profit_target(rule, market.entry_price, market.atr),
            trailing_stop: self.trailing_stop(rule, market.atr),
        }
    }

    fn evaluate<F: std::fmt::Debug>(
        &self,
        rule_name: &str,
        kind: &str,
        formula: &str,
        bindings: &VariableBindings,
        fallback: impl FnOnce() -> (F, f64),
    ) -> Level<F> {
        match evaluate_formula(formula, bindings, self.whitelist) {
            Ok(value) => Level {
                value,
                source: LevelSource::Formula,
            },
            Err(error) => {
                let (strategy, value) = fallback();
                tracing::warn!(
                    rule = rule_name,
                    kind,
                    formula,
                    %error,
                    ?strategy,
                    value,
                    "formula failed, using fallback"
                );
                Level {
                    value,
                    source: LevelSource::Fallback { strategy, error },
                }
            }
        }
    }
}
