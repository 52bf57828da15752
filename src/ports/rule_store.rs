//! Trading rule persistence port.

use crate::domain::error::RuleforgeError;
use crate::domain::trading_rule::TradingRule;

pub trait RuleStore {
    fn load_rules(&self) -> Result<Vec<TradingRule>, RuleforgeError>;

    fn save_rules(&self, rules: &[TradingRule]) -> Result<(), RuleforgeError>;

    fn find(&self, name: &str) -> Result<TradingRule, RuleforgeError> {
        self.load_rules()?
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RuleforgeError::RuleNotFound {
                name: name.to_string(),
            })
    }

    /// The active default rule: the first rule flagged as selected.
    fn selected(&self) -> Result<TradingRule, RuleforgeError> {
        self.load_rules()?
            .into_iter()
            .find(|r| r.selected)
            .ok_or(RuleforgeError::NoSelectedRule)
    }

    /// Make `name` the only selected rule.
    fn select(&self, name: &str) -> Result<(), RuleforgeError> {
        let mut rules = self.load_rules()?;
        if !rules.iter().any(|r| r.name == name) {
            return Err(RuleforgeError::RuleNotFound {
                name: name.to_string(),
            });
        }
        for rule in &mut rules {
            rule.selected = rule.name == name;
        }
        self.save_rules(&rules)
    }
}
