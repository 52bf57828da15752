#![allow(dead_code)]

use chrono::NaiveDate;
use ruleforge::domain::error::RuleforgeError;
use ruleforge::domain::risk_ladder::TradeOutcome;
use ruleforge::domain::rule_apply::MarketContext;
use ruleforge::domain::trading_rule::{default_rules, EntrySide, TradingRule};
use ruleforge::ports::rule_store::RuleStore;
use ruleforge::ports::trade_history_port::TradeHistoryPort;
use std::cell::RefCell;
use std::io::Write;

pub struct MockHistory {
    pub outcomes: Vec<TradeOutcome>,
}

impl MockHistory {
    pub fn new(pnls: &[f64]) -> Self {
        Self {
            outcomes: pnls.iter().copied().map(TradeOutcome::new).collect(),
        }
    }
}

impl TradeHistoryPort for MockHistory {
    fn outcomes(&self) -> Result<Vec<TradeOutcome>, RuleforgeError> {
        Ok(self.outcomes.clone())
    }
}

/// In-memory rule store; `saves` counts writes.
pub struct MemoryRuleStore {
    pub rules: RefCell<Vec<TradingRule>>,
    pub saves: RefCell<usize>,
}

impl MemoryRuleStore {
    pub fn new(rules: Vec<TradingRule>) -> Self {
        Self {
            rules: RefCell::new(rules),
            saves: RefCell::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_rules())
    }
}

impl RuleStore for MemoryRuleStore {
    fn load_rules(&self) -> Result<Vec<TradingRule>, RuleforgeError> {
        Ok(self.rules.borrow().clone())
    }

    fn save_rules(&self, rules: &[TradingRule]) -> Result<(), RuleforgeError> {
        *self.rules.borrow_mut() = rules.to_vec();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

pub fn long_market() -> MarketContext {
    MarketContext {
        entry_price: 100.0,
        side: EntrySide::Long,
        low: 95.0,
        high: 105.0,
        atr: 2.0,
    }
}

pub fn short_market() -> MarketContext {
    MarketContext {
        side: EntrySide::Short,
        ..long_market()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// A `date,pnl` CSV with one trade per day starting 2024-01-01.
pub fn history_csv(pnls: &[f64]) -> String {
    let mut csv = String::from("date,pnl\n");
    for (i, pnl) in pnls.iter().enumerate() {
        let day = date(2024, 1, 1) + chrono::Duration::days(i as i64);
        csv.push_str(&format!("{},{}\n", day.format("%Y-%m-%d"), pnl));
    }
    csv
}
