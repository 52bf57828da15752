//! Allowed variables and functions.
//!
//! A [`Whitelist`] is built once and shared by reference between the
//! validator and the evaluator. Nothing here is mutable after construction.

use crate::domain::error::FormulaError;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Variable names a formula may reference, before case folding.
pub const STANDARD_VARIABLES: [&str; 20] = [
    "entry",
    "low",
    "high",
    "prev_low",
    "prev_high",
    "atr",
    "qty",
    "buying_power",
    "bid",
    "ask",
    "last",
    "close",
    "marketPrice",
    "volume",
    "avg_volume",
    "partial_pct",
    "entry_price",
    "stop_loss",
    "profit_target",
    "trailing_stop",
];

/// Names that collapse onto `entry` under [`AliasPolicy::CollapseToEntry`].
pub const ENTRY_ALIASES: [&str; 4] = ["entry_price", "stop_loss", "profit_target", "trailing_stop"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// A pure numeric function callable from formulas.
#[derive(Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub arity: Arity,
    body: fn(&[f64]) -> f64,
}

impl Function {
    /// Check arity, run the body, and reject non-finite results.
    pub fn call(&self, args: &[f64]) -> Result<f64, FormulaError> {
        if !self.arity.accepts(args.len()) {
            return Err(FormulaError::Arity {
                function: self.name.to_string(),
                expected: self.arity.to_string(),
                found: args.len(),
            });
        }
        let value = (self.body)(args);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::Domain {
                reason: format!("{}({:?}) is not finite", self.name, args),
            })
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

fn fold_min(args: &[f64]) -> f64 {
    args.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(args: &[f64]) -> f64 {
    args.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

const STANDARD_FUNCTIONS: [Function; 10] = [
    Function {
        name: "min",
        arity: Arity::AtLeast(1),
        body: fold_min,
    },
    Function {
        name: "max",
        arity: Arity::AtLeast(1),
        body: fold_max,
    },
    Function {
        name: "abs",
        arity: Arity::Exactly(1),
        body: |a| a[0].abs(),
    },
    Function {
        name: "round",
        arity: Arity::Exactly(1),
        body: |a| a[0].round_ties_even(),
    },
    Function {
        name: "floor",
        arity: Arity::Exactly(1),
        body: |a| a[0].floor(),
    },
    Function {
        name: "ceil",
        arity: Arity::Exactly(1),
        body: |a| a[0].ceil(),
    },
    Function {
        name: "sqrt",
        arity: Arity::Exactly(1),
        body: |a| a[0].sqrt(),
    },
    Function {
        name: "pow",
        arity: Arity::Exactly(2),
        body: |a| a[0].powf(a[1]),
    },
    Function {
        name: "log",
        arity: Arity::Exactly(1),
        body: |a| a[0].ln(),
    },
    Function {
        name: "exp",
        arity: Arity::Exactly(1),
        body: |a| a[0].exp(),
    },
];

/// How the four entry-like aliases are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasPolicy {
    /// `entry_price`, `stop_loss`, `profit_target` and `trailing_stop` all read `entry`.
    #[default]
    CollapseToEntry,
    /// Every alias is a variable of its own.
    Distinct,
}

#[derive(Debug, Clone)]
pub struct Whitelist {
    variables: HashSet<String>,
    functions: HashMap<&'static str, Function>,
    alias_policy: AliasPolicy,
}

impl Whitelist {
    pub fn standard() -> Self {
        Self::with_alias_policy(AliasPolicy::default())
    }

    pub fn with_alias_policy(alias_policy: AliasPolicy) -> Self {
        Self {
            variables: STANDARD_VARIABLES
                .iter()
                .map(|name| name.to_ascii_lowercase())
                .collect(),
            functions: STANDARD_FUNCTIONS.iter().map(|f| (f.name, *f)).collect(),
            alias_policy,
        }
    }

    pub fn alias_policy(&self) -> AliasPolicy {
        self.alias_policy
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Whether `name` (already case-folded) is an allowed variable.
    pub fn is_variable(&self, name: &str) -> bool {
        self.variables.contains(name)
    }

    /// The binding key a case-folded variable name reads from.
    pub fn canonical<'n>(&self, name: &'n str) -> &'n str {
        match self.alias_policy {
            AliasPolicy::CollapseToEntry if ENTRY_ALIASES.contains(&name) => "entry",
            _ => name,
        }
    }
}

impl Default for Whitelist {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_whitelist_folds_variable_case() {
        let wl = Whitelist::standard();
        assert!(wl.is_variable("marketprice"));
        assert!(!wl.is_variable("marketPrice"));
        assert!(wl.is_variable("prev_low"));
        assert!(!wl.is_variable("vwap"));
    }

    #[test]
    fn standard_functions_present() {
        let wl = Whitelist::standard();
        for name in [
            "min", "max", "abs", "round", "floor", "ceil", "sqrt", "pow", "log", "exp",
        ] {
            assert!(wl.is_function(name), "{name}");
        }
        assert!(!wl.is_function("sin"));
    }

    #[test]
    fn min_max_are_variadic() {
        let wl = Whitelist::standard();
        let min = wl.function("min").unwrap();
        assert_eq!(min.call(&[3.0, 7.0, -1.0]).unwrap(), -1.0);
        assert_eq!(min.call(&[4.0]).unwrap(), 4.0);
        let max = wl.function("max").unwrap();
        assert_eq!(max.call(&[3.0, 7.0]).unwrap(), 7.0);
    }

    #[test]
    fn empty_argument_list_is_arity_error() {
        let wl = Whitelist::standard();
        let err = wl.function("max").unwrap().call(&[]).unwrap_err();
        assert!(matches!(err, FormulaError::Arity { found: 0, .. }));
    }

    #[test]
    fn pow_requires_two_arguments() {
        let wl = Whitelist::standard();
        let pow = wl.function("pow").unwrap();
        assert_eq!(pow.call(&[2.0, 3.0]).unwrap(), 8.0);
        let err = pow.call(&[2.0]).unwrap_err();
        assert_eq!(
            err,
            FormulaError::Arity {
                function: "pow".into(),
                expected: "2".into(),
                found: 1
            }
        );
    }

    #[test]
    fn round_is_half_to_even() {
        let round = *Whitelist::standard().function("round").unwrap();
        assert_eq!(round.call(&[2.5]).unwrap(), 2.0);
        assert_eq!(round.call(&[3.5]).unwrap(), 4.0);
        assert_eq!(round.call(&[2.6]).unwrap(), 3.0);
    }

    #[test]
    fn non_finite_function_results_are_domain_errors() {
        let wl = Whitelist::standard();
        assert!(matches!(
            wl.function("sqrt").unwrap().call(&[-4.0]),
            Err(FormulaError::Domain { .. })
        ));
        assert!(matches!(
            wl.function("log").unwrap().call(&[0.0]),
            Err(FormulaError::Domain { .. })
        ));
    }

    #[test]
    fn alias_policy_controls_canonical_name() {
        let collapsed = Whitelist::standard();
        assert_eq!(collapsed.canonical("stop_loss"), "entry");
        assert_eq!(collapsed.canonical("entry_price"), "entry");
        assert_eq!(collapsed.canonical("low"), "low");

        let distinct = Whitelist::with_alias_policy(AliasPolicy::Distinct);
        assert_eq!(distinct.canonical("stop_loss"), "stop_loss");
    }
}
