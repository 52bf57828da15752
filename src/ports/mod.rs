//! Port traits the domain depends on.

pub mod config_port;
pub mod rule_store;
pub mod trade_history_port;
