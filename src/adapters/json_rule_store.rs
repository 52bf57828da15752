//! JSON file rule store.
//!
//! The file holds an array of rule records with PascalCase field names. A
//! missing file is seeded with the default rules on first load.

use crate::domain::error::RuleforgeError;
use crate::domain::trading_rule::{default_rules, TradingRule};
use crate::ports::rule_store::RuleStore;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RULES_PATH: &str = "trade_rules.json";

pub struct JsonRuleStore {
    path: PathBuf,
}

impl JsonRuleStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, reason: impl ToString) -> RuleforgeError {
        RuleforgeError::RuleStore {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn check(rules: &[TradingRule]) -> Result<(), RuleforgeError> {
        let mut names = HashSet::new();
        let mut selected = false;
        for rule in rules {
            rule.check().map_err(|reason| RuleforgeError::RuleInvalid {
                name: rule.name.clone(),
                reason,
            })?;
            if !names.insert(rule.name.as_str()) {
                return Err(RuleforgeError::RuleInvalid {
                    name: rule.name.clone(),
                    reason: "duplicate rule name".to_string(),
                });
            }
            if rule.selected {
                if selected {
                    return Err(RuleforgeError::RuleInvalid {
                        name: rule.name.clone(),
                        reason: "more than one rule is selected".to_string(),
                    });
                }
                selected = true;
            }
        }
        Ok(())
    }
}

impl RuleStore for JsonRuleStore {
    fn load_rules(&self) -> Result<Vec<TradingRule>, RuleforgeError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "rule file missing, seeding defaults");
            let rules = default_rules();
            self.save_rules(&rules)?;
            return Ok(rules);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.store_error(e))?;
        let rules: Vec<TradingRule> =
            serde_json::from_str(&content).map_err(|e| self.store_error(e))?;
        Self::check(&rules)?;
        tracing::info!(path = %self.path.display(), count = rules.len(), "rules loaded");
        Ok(rules)
    }

    fn save_rules(&self, rules: &[TradingRule]) -> Result<(), RuleforgeError> {
        Self::check(rules)?;
        let json = serde_json::to_string_pretty(rules).map_err(|e| self.store_error(e))?;
        fs::write(&self.path, json).map_err(|e| self.store_error(e))
    }
}
