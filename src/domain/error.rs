//! Domain error types.

/// Failure while validating, parsing or evaluating a formula.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,

    #[error("illegal character '{found}' at position {position}")]
    Lexical { found: char, position: usize },

    #[error("malformed number '{text}' at position {position}")]
    BadNumber { text: String, position: usize },

    #[error("identifier '{name}' is not allowed")]
    UnknownIdentifier { name: String },

    #[error("variable '{name}' not provided")]
    UnboundVariable { name: String },

    #[error("function '{name}' is not allowed")]
    UnknownFunction { name: String },

    #[error("{function} expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("numeric domain error: {reason}")]
    Domain { reason: String },

    #[error("malformed expression: {reason}")]
    Malformed { reason: String },
}

impl FormulaError {
    /// Character offset of the error in the formula text, when one is known.
    pub fn position(&self) -> Option<usize> {
        match self {
            FormulaError::Lexical { position, .. } | FormulaError::BadNumber { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    /// Format the error with a caret pointing at the error position in the input.
    ///
    /// Errors without a position render as the plain message under the input.
    pub fn display_with_context(&self, input: &str) -> String {
        match self.position() {
            Some(position) => {
                let caret = " ".repeat(position) + "^";
                format!("{input}\n{caret}\n{err}", err = self)
            }
            None => format!("{input}\n{err}", err = self),
        }
    }
}

/// Rejection from the position size calculator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingError {
    #[error("invalid entry or stop loss price (entry {entry_price}, stop {stop_loss})")]
    InvalidPrice { entry_price: f64, stop_loss: f64 },

    #[error("risk per share must be positive")]
    NonPositiveRisk,

    #[error(
        "calculated quantity is zero; check buying power, risk percent, or stop-loss distance"
    )]
    ZeroQuantity,
}

/// Top-level error type for ruleforge.
#[derive(Debug, thiserror::Error)]
pub enum RuleforgeError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("rule store error in {path}: {reason}")]
    RuleStore { path: String, reason: String },

    #[error("no rule named '{name}'")]
    RuleNotFound { name: String },

    #[error("no trading rule is selected")]
    NoSelectedRule,

    #[error("invalid rule '{name}': {reason}")]
    RuleInvalid { name: String, reason: String },

    #[error("trade history error in {path}: {reason}")]
    TradeHistory { path: String, reason: String },

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Sizing(#[from] SizingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RuleforgeError> for std::process::ExitCode {
    fn from(err: &RuleforgeError) -> Self {
        let code: u8 = match err {
            RuleforgeError::Io(_) => 1,
            RuleforgeError::ConfigParse { .. }
            | RuleforgeError::ConfigMissing { .. }
            | RuleforgeError::ConfigInvalid { .. } => 2,
            RuleforgeError::RuleStore { .. }
            | RuleforgeError::RuleNotFound { .. }
            | RuleforgeError::NoSelectedRule
            | RuleforgeError::RuleInvalid { .. } => 3,
            RuleforgeError::Formula(_) => 4,
            RuleforgeError::Sizing(_) => 5,
            RuleforgeError::TradeHistory { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_error_context_points_at_character() {
        let err = FormulaError::Lexical {
            found: '$',
            position: 6,
        };
        let rendered = err.display_with_context("entry $ 2");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "entry $ 2");
        assert_eq!(lines[1], "      ^");
        assert!(lines[2].contains("illegal character '$'"));
    }

    #[test]
    fn positionless_error_context_has_no_caret() {
        let err = FormulaError::UnknownIdentifier { name: "foo".into() };
        let rendered = err.display_with_context("foo + 1");
        assert!(!rendered.contains('^'));
        assert!(rendered.ends_with("identifier 'foo' is not allowed"));
    }

    #[test]
    fn formula_errors_convert_into_top_level() {
        let err: RuleforgeError = FormulaError::Empty.into();
        assert!(matches!(err, RuleforgeError::Formula(FormulaError::Empty)));
    }

    #[test]
    fn exit_codes_group_by_class() {
        use std::process::ExitCode;
        let cases = [
            (
                RuleforgeError::ConfigMissing {
                    section: "risk".into(),
                    key: "tiers".into(),
                },
                ExitCode::from(2),
            ),
            (RuleforgeError::NoSelectedRule, ExitCode::from(3)),
            (FormulaError::Empty.into(), ExitCode::from(4)),
            (SizingError::ZeroQuantity.into(), ExitCode::from(5)),
            (
                RuleforgeError::TradeHistory {
                    path: "h.csv".into(),
                    reason: "bad".into(),
                },
                ExitCode::from(6),
            ),
        ];
        for (err, expected) in &cases {
            assert_eq!(ExitCode::from(err), *expected, "{err}");
        }
    }
}
