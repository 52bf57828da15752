//! Formula evaluation entry points.
//!
//! Every call re-tokenizes the text: validate identifiers, convert to
//! postfix, build the tree, evaluate. Errors are returned unmodified; only the
//! rule application layer recovers from them.

use crate::domain::bindings::VariableBindings;
use crate::domain::error::FormulaError;
use crate::domain::expr::Expr;
use crate::domain::shunting_yard::to_postfix;
use crate::domain::token::tokenize;
use crate::domain::validator::validate_tokens;
use crate::domain::whitelist::Whitelist;

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize(formula: &str) -> String {
    formula.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse without checking bindings.
pub fn parse(formula: &str, whitelist: &Whitelist) -> Result<Expr, FormulaError> {
    let formula = normalize(formula);
    if formula.is_empty() {
        return Err(FormulaError::Empty);
    }
    let tokens = tokenize(&formula)?;
    Expr::from_postfix(&to_postfix(&tokens, whitelist)?)
}

pub fn evaluate_formula(
    formula: &str,
    bindings: &VariableBindings,
    whitelist: &Whitelist,
) -> Result<f64, FormulaError> {
    let formula = normalize(formula);
    if formula.is_empty() {
        return Err(FormulaError::Empty);
    }
    let tokens = tokenize(&formula)?;
    validate_tokens(&tokens, bindings, whitelist)?;
    let expr = Expr::from_postfix(&to_postfix(&tokens, whitelist)?)?;
    let value = expr.evaluate(bindings, whitelist)?;
    tracing::debug!(formula = %formula, value, "formula evaluated");
    Ok(value)
}

/// Bindings used to check that a formula is well formed outside any market context.
pub fn sample_bindings() -> VariableBindings {
    VariableBindings::new()
        .with("entry", 100.0)
        .with("low", 95.0)
        .with("high", 105.0)
        .with("atr", 2.0)
        .with("qty", 100.0)
        .with("buying_power", 10_000.0)
}

/// Evaluate against [`sample_bindings`] and report the first problem, if any.
pub fn is_valid_formula(formula: &str, whitelist: &Whitelist) -> Result<(), FormulaError> {
    evaluate_formula(formula, &sample_bindings(), whitelist).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(formula: &str) -> Result<f64, FormulaError> {
        let bindings = VariableBindings::new()
            .with("entry", 100.0)
            .with("low", 95.0)
            .with("high", 105.0)
            .with("atr", 2.5);
        evaluate_formula(formula, &bindings, &Whitelist::standard())
    }

    #[test]
    fn precedence_respected() {
        assert_eq!(eval("2+3*4").unwrap(), 14.0);
        assert_eq!(eval("(2+3)*4").unwrap(), 20.0);
    }

    #[test]
    fn min_max_abs() {
        assert_eq!(eval("min(3,7)").unwrap(), 3.0);
        assert_eq!(eval("max(3,7)").unwrap(), 7.0);
        assert_eq!(eval("abs(entry-low)").unwrap(), 5.0);
    }

    #[test]
    fn division_by_zero_fails() {
        assert!(matches!(eval("10/0"), Err(FormulaError::Domain { .. })));
        assert!(matches!(eval("10%0"), Err(FormulaError::Domain { .. })));
    }

    #[test]
    fn unknown_identifier_fails() {
        assert_eq!(
            eval("foo+1").unwrap_err(),
            FormulaError::UnknownIdentifier { name: "foo".into() }
        );
    }

    #[test]
    fn empty_formula_fails() {
        assert_eq!(eval("").unwrap_err(), FormulaError::Empty);
        assert_eq!(eval(" \t ").unwrap_err(), FormulaError::Empty);
    }

    #[test]
    fn typical_rule_formulas() {
        assert_relative_eq!(eval("entry * 1.05").unwrap(), 105.0);
        assert_relative_eq!(eval("entry + (8 * atr)").unwrap(), 120.0);
        assert_relative_eq!(eval("atr * 1.5").unwrap(), 3.75);
        assert_relative_eq!(eval("min(low, entry - 2 * atr)").unwrap(), 95.0);
    }

    #[test]
    fn power_chains_left_to_right() {
        assert_eq!(eval("2^3^2").unwrap(), 64.0);
    }

    #[test]
    fn unbalanced_parentheses_are_tolerated() {
        assert_eq!(eval("(1+2").unwrap(), 3.0);
        assert_eq!(eval("1+2)").unwrap(), 3.0);
        assert_eq!(eval("(2+3)*4)").unwrap(), 20.0);
    }

    #[test]
    fn arguments_must_each_produce_one_value() {
        for formula in [
            "max(low entry, -1)",
            "max(1 2, +3)",
            "min(entry low, *2)",
            "max(,1)",
            "max(1,)",
        ] {
            assert!(
                matches!(eval(formula), Err(FormulaError::Malformed { .. })),
                "{formula} should be malformed"
            );
        }
    }

    #[test]
    fn non_finite_bindings_are_rejected() {
        let whitelist = Whitelist::standard();
        let nan = VariableBindings::new().with("low", f64::NAN);
        let inf = VariableBindings::new().with("entry", f64::INFINITY);
        assert!(matches!(
            evaluate_formula("low", &nan, &whitelist),
            Err(FormulaError::Domain { .. })
        ));
        assert!(matches!(
            evaluate_formula("entry - 1", &inf, &whitelist),
            Err(FormulaError::Domain { .. })
        ));
    }

    #[test]
    fn unary_minus_is_not_supported() {
        assert!(matches!(eval("-5 + 2"), Err(FormulaError::Malformed { .. })));
    }

    #[test]
    fn whitespace_is_normalised() {
        assert_eq!(normalize("  entry   *\t1.05 "), "entry * 1.05");
        assert_relative_eq!(eval("  entry   *\n 1.05 ").unwrap(), 105.0);
    }

    #[test]
    fn aliases_collapse_to_entry_by_default() {
        assert_relative_eq!(eval("stop_loss - 1").unwrap(), 99.0);
        assert_relative_eq!(eval("entry_price + profit_target").unwrap(), 200.0);
    }

    #[test]
    fn pow_arity_enforced() {
        assert!(matches!(eval("pow(2)"), Err(FormulaError::Arity { .. })));
        assert_eq!(eval("pow(2, 5)").unwrap(), 32.0);
    }

    #[test]
    fn parse_does_not_need_bindings() {
        let expr = parse("entry + 8 * atr", &Whitelist::standard()).unwrap();
        assert_eq!(expr.variables(), vec!["entry", "atr"]);
    }

    #[test]
    fn validity_check_uses_sample_bindings() {
        let wl = Whitelist::standard();
        assert!(is_valid_formula("entry + 8 * atr", &wl).is_ok());
        assert!(is_valid_formula("low if entry_type == 'Long' else high", &wl).is_err());
        assert_eq!(
            is_valid_formula("bid - 0.01", &wl).unwrap_err(),
            FormulaError::UnboundVariable { name: "bid".into() }
        );
    }
}
