//! Trading rule records and their fallback strategies.
//!
//! A rule holds three formula strings (stop-loss, trailing stop, profit
//! taking). An empty formula means "use the default heuristic". When a
//! formula cannot be evaluated, the rule application layer falls back to one
//! of the named strategies below: either the one recorded in the rule's
//! `Fallback` metadata or the one recognised from the formula text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    Long,
    Short,
}

impl EntrySide {
    /// +1 for long, -1 for short; bound as `entry_type` during stop evaluation.
    pub fn sign(self) -> f64 {
        match self {
            EntrySide::Long => 1.0,
            EntrySide::Short => -1.0,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "long" | "buy" => Some(EntrySide::Long),
            "short" | "sell" => Some(EntrySide::Short),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopFallback {
    Low,
    High,
    Entry,
    /// Low for long entries, high for short entries.
    SideDefault,
}

impl StopFallback {
    /// Keyword scan of the lower-cased formula, in priority order.
    pub fn recognize(formula: &str) -> Self {
        let formula = formula.to_lowercase();
        if formula.contains("low") {
            StopFallback::Low
        } else if formula.contains("high") {
            StopFallback::High
        } else if formula.contains("entry") {
            StopFallback::Entry
        } else {
            StopFallback::SideDefault
        }
    }

    pub fn resolve(self, entry_price: f64, side: EntrySide, low: f64, high: f64) -> f64 {
        match self {
            StopFallback::Low => low,
            StopFallback::High => high,
            StopFallback::Entry => entry_price,
            StopFallback::SideDefault => match side {
                EntrySide::Long => low,
                EntrySide::Short => high,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFallback {
    /// entry * 1.05
    FivePercent,
    /// entry + 8 * atr
    EightAtr,
    /// entry * 1.02, a stand-in for the session VWAP
    Vwap,
    NoTarget,
}

impl TargetFallback {
    pub fn recognize(formula: &str) -> Self {
        let formula = formula.to_lowercase();
        if formula.contains("entry * 1.05") {
            TargetFallback::FivePercent
        } else if formula.contains("entry + (8 * atr)") {
            TargetFallback::EightAtr
        } else if formula.contains("vwap") {
            TargetFallback::Vwap
        } else {
            TargetFallback::NoTarget
        }
    }

    pub fn resolve(self, entry_price: f64, atr: f64) -> f64 {
        match self {
            TargetFallback::FivePercent => entry_price * 1.05,
            TargetFallback::EightAtr => entry_price + 8.0 * atr,
            TargetFallback::Vwap => entry_price * 1.02,
            TargetFallback::NoTarget => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailFallback {
    /// atr * 1.5
    OneAndHalfAtr,
    /// atr * 1.3, standing in for a 13-period ATR
    Atr13,
    NoTrail,
}

impl TrailFallback {
    pub fn recognize(formula: &str) -> Self {
        let formula = formula.to_lowercase();
        if formula.contains("atr * 1.5") {
            TrailFallback::OneAndHalfAtr
        } else if formula.contains("atr13") {
            TrailFallback::Atr13
        } else {
            TrailFallback::NoTrail
        }
    }

    pub fn resolve(self, atr: f64) -> f64 {
        match self {
            TrailFallback::OneAndHalfAtr => atr * 1.5,
            TrailFallback::Atr13 => atr * 1.3,
            TrailFallback::NoTrail => 0.0,
        }
    }
}

/// Explicit fallback choices; a missing entry means "recognise from the formula".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FallbackPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<StopFallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_taking: Option<TargetFallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_stop: Option<TrailFallback>,
}

impl FallbackPolicy {
    pub fn is_empty(&self) -> bool {
        *self == FallbackPolicy::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradingRule {
    pub name: String,
    #[serde(default)]
    pub stop_loss: String,
    #[serde(default)]
    pub trailing_stop: String,
    #[serde(default)]
    pub profit_taking: String,
    /// Share of the position exited at the profit target, 0-100.
    #[serde(default)]
    pub partial_pct: f64,
    /// Opaque tag for the execution layer.
    #[serde(default)]
    pub exit_rule: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "FallbackPolicy::is_empty")]
    pub fallback: FallbackPolicy,
}

impl TradingRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stop_loss: String::new(),
            trailing_stop: String::new(),
            profit_taking: String::new(),
            partial_pct: 0.0,
            exit_rule: String::new(),
            selected: false,
            fallback: FallbackPolicy::default(),
        }
    }

    pub fn stop_fallback(&self) -> StopFallback {
        self.fallback
            .stop_loss
            .unwrap_or_else(|| StopFallback::recognize(&self.stop_loss))
    }

    pub fn target_fallback(&self) -> TargetFallback {
        self.fallback
            .profit_taking
            .unwrap_or_else(|| TargetFallback::recognize(&self.profit_taking))
    }

    pub fn trail_fallback(&self) -> TrailFallback {
        self.fallback
            .trailing_stop
            .unwrap_or_else(|| TrailFallback::recognize(&self.trailing_stop))
    }

    /// Field-level sanity checks applied when rules are loaded.
    pub fn check(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if !(0.0..=100.0).contains(&self.partial_pct) {
            return Err(format!(
                "PartialPct must be between 0 and 100, got {}",
                self.partial_pct
            ));
        }
        Ok(())
    }
}

/// Rules seeded into a fresh rule store.
pub fn default_rules() -> Vec<TradingRule> {
    vec![
        TradingRule {
            stop_loss: "low".into(),
            profit_taking: "vwap".into(),
            selected: true,
            ..TradingRule::new("Dead Cat")
        },
        TradingRule {
            stop_loss: "low".into(),
            profit_taking: "entry * 1.05".into(),
            partial_pct: 33.3,
            exit_rule: "move_stop_to_breakeven_after_partial".into(),
            ..TradingRule::new("Arndt Daily 1/3 Breakeven")
        },
        TradingRule {
            stop_loss: "low_of_week".into(),
            profit_taking: "entry * 1.05".into(),
            partial_pct: 33.3,
            exit_rule: "move_stop_to_breakeven_after_partial".into(),
            ..TradingRule::new("Arndt Weekly 1/3 Breakeven")
        },
        TradingRule {
            stop_loss: "low if entry_type == 'Long' else high".into(),
            trailing_stop: "atr * 1.5".into(),
            profit_taking: "entry + (8 * atr) if entry_type == 'Long' else entry - (tp_mult * atr)"
                .into(),
            ..TradingRule::new("Basic Arndt")
        },
    ]
}
