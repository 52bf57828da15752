//! Core domain types and logic.

pub mod error;
pub mod token;
pub mod whitelist;
pub mod bindings;
pub mod validator;
pub mod shunting_yard;
pub mod expr;
pub mod formula;
pub mod trading_rule;
pub mod rule_apply;
pub mod position_size;
pub mod risk_ladder;
pub mod order_plan;
pub mod config_validation;
