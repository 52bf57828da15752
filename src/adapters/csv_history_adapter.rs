//! CSV trade history adapter.
//!
//! Expects a `date,pnl` header. Rows are returned sorted by date; trades on
//! the same day keep their file order.

use crate::domain::error::RuleforgeError;
use crate::domain::risk_ladder::TradeOutcome;
use crate::ports::trade_history_port::TradeHistoryPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HISTORY_PATH: &str = "trade_history.csv";

pub struct CsvHistoryAdapter {
    path: PathBuf,
}

impl CsvHistoryAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn history_error(&self, reason: String) -> RuleforgeError {
        RuleforgeError::TradeHistory {
            path: self.path.display().to_string(),
            reason,
        }
    }

    pub fn parse(&self, content: &str) -> Result<Vec<TradeOutcome>, RuleforgeError> {
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut outcomes = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let line = row + 2;
            let record =
                result.map_err(|e| self.history_error(format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| self.history_error(format!("line {line}: missing date column")))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                self.history_error(format!("line {line}: invalid date format: {}", e))
            })?;

            let pnl: f64 = record
                .get(1)
                .ok_or_else(|| self.history_error(format!("line {line}: missing pnl column")))?
                .trim()
                .parse()
                .map_err(|e| self.history_error(format!("line {line}: invalid pnl value: {}", e)))?;
            if !pnl.is_finite() {
                return Err(self.history_error(format!("line {line}: pnl must be finite")));
            }

            outcomes.push(TradeOutcome {
                pnl,
                closed_on: Some(date),
            });
        }

        outcomes.sort_by_key(|o| o.closed_on);
        Ok(outcomes)
    }
}

impl TradeHistoryPort for CsvHistoryAdapter {
    fn outcomes(&self) -> Result<Vec<TradeOutcome>, RuleforgeError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no trade history, starting fresh");
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| self.history_error(format!("failed to read: {}", e)))?;
        let outcomes = self.parse(&content)?;
        tracing::info!(path = %self.path.display(), trades = outcomes.len(), "trade history loaded");
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn adapter_with(content: &str) -> (TempDir, CsvHistoryAdapter) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_HISTORY_PATH);
        fs::write(&path, content).unwrap();
        (dir, CsvHistoryAdapter::new(path))
    }

    #[test]
    fn reads_outcomes_in_date_order() {
        let (_dir, adapter) = adapter_with(
            "date,pnl\n\
             2024-03-02,-50.0\n\
             2024-03-01,120.5\n\
             2024-03-02,10\n",
        );
        let outcomes = adapter.outcomes().unwrap();
        let pnls: Vec<f64> = outcomes.iter().map(|o| o.pnl).collect();
        assert_eq!(pnls, vec![120.5, -50.0, 10.0]);
        assert_eq!(
            outcomes[0].closed_on,
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvHistoryAdapter::new(dir.path().join("none.csv"));
        assert!(adapter.outcomes().unwrap().is_empty());
    }

    #[test]
    fn header_only_is_empty_history() {
        let (_dir, adapter) = adapter_with("date,pnl\n");
        assert!(adapter.outcomes().unwrap().is_empty());
    }

    #[test]
    fn invalid_date_is_rejected() {
        let (_dir, adapter) = adapter_with("date,pnl\n03/01/2024,5\n");
        let err = adapter.outcomes().unwrap_err();
        assert!(matches!(err, RuleforgeError::TradeHistory { ref reason, .. } if reason.contains("line 2")));
    }

    #[test]
    fn invalid_pnl_is_rejected() {
        let (_dir, adapter) = adapter_with("date,pnl\n2024-03-01,lots\n");
        assert!(matches!(
            adapter.outcomes(),
            Err(RuleforgeError::TradeHistory { .. })
        ));
    }

    #[test]
    fn non_finite_pnl_is_rejected() {
        let (_dir, adapter) = adapter_with("date,pnl\n2024-03-01,NaN\n");
        assert!(matches!(
            adapter.outcomes(),
            Err(RuleforgeError::TradeHistory { .. })
        ));
    }
}
