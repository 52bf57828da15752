//! Concrete adapter implementations for ports.

pub mod csv_history_adapter;
pub mod file_config_adapter;
pub mod json_rule_store;
