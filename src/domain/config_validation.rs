//! Configuration validation.
//!
//! Every key is optional. A key that is present must hold a usable value, so
//! numbers are re-read as text here rather than through the defaulting getters.

use crate::domain::error::RuleforgeError;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), RuleforgeError> {
    validate_alias_flag(config)?;
    validate_volume_cap(config)?;
    validate_tiers(config)?;
    validate_streak_length(config)?;
    validate_store_paths(config)?;
    Ok(())
}

/// Parse a comma separated tier list such as `0.25,0.5,1.0`.
pub fn parse_tiers(text: &str) -> Result<Vec<f64>, String> {
    let tiers = text
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| format!("'{t}' is not a number"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if tiers.is_empty() {
        return Err("at least one tier is required".to_string());
    }
    if tiers.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
        return Err("tiers must be positive".to_string());
    }
    if tiers.windows(2).any(|w| w[0] >= w[1]) {
        return Err("tiers must be strictly ascending".to_string());
    }
    Ok(tiers)
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> RuleforgeError {
    RuleforgeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_alias_flag(config: &dyn ConfigPort) -> Result<(), RuleforgeError> {
    if let Some(value) = config.get_string("formula", "collapse_entry_aliases") {
        let known = ["true", "yes", "1", "false", "no", "0"];
        if !known.contains(&value.to_lowercase().as_str()) {
            return Err(invalid(
                "formula",
                "collapse_entry_aliases",
                "collapse_entry_aliases must be true or false",
            ));
        }
    }
    Ok(())
}

fn validate_volume_cap(config: &dyn ConfigPort) -> Result<(), RuleforgeError> {
    let Some(text) = config.get_string("sizing", "volume_cap_fraction") else {
        return Ok(());
    };
    let value: f64 = text.trim().parse().map_err(|_| {
        invalid(
            "sizing",
            "volume_cap_fraction",
            "volume_cap_fraction must be a number",
        )
    })?;
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(
            "sizing",
            "volume_cap_fraction",
            "volume_cap_fraction must be greater than 0 and at most 1",
        ));
    }
    Ok(())
}

fn validate_tiers(config: &dyn ConfigPort) -> Result<(), RuleforgeError> {
    if let Some(text) = config.get_string("risk", "tiers") {
        parse_tiers(&text).map_err(|reason| invalid("risk", "tiers", reason))?;
    }
    Ok(())
}

fn validate_streak_length(config: &dyn ConfigPort) -> Result<(), RuleforgeError> {
    let Some(text) = config.get_string("risk", "streak_length") else {
        return Ok(());
    };
    match text.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(()),
        _ => Err(invalid(
            "risk",
            "streak_length",
            "streak_length must be a whole number of at least 1",
        )),
    }
}

fn validate_store_paths(config: &dyn ConfigPort) -> Result<(), RuleforgeError> {
    for key in ["rules_path", "history_path"] {
        if let Some(path) = config.get_string("store", key) {
            if path.trim().is_empty() {
                return Err(RuleforgeError::ConfigMissing {
                    section: "store".to_string(),
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(())
}
