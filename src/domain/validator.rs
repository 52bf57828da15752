//! Identifier validation against the whitelist and the supplied bindings.
//!
//! Runs before parsing: a formula that fails here never reaches the evaluator.

use crate::domain::bindings::VariableBindings;
use crate::domain::error::FormulaError;
use crate::domain::token::{tokenize, Token};
use crate::domain::whitelist::Whitelist;

/// Check every identifier in `formula`.
///
/// An identifier directly followed by `(` must be a whitelisted function.
/// Function names used without a call are skipped. Everything else must be an
/// allowed variable and must be bound (after alias resolution).
pub fn validate(
    formula: &str,
    bindings: &VariableBindings,
    whitelist: &Whitelist,
) -> Result<Vec<Token>, FormulaError> {
    let tokens = tokenize(formula)?;
    validate_tokens(&tokens, bindings, whitelist)?;
    Ok(tokens)
}

pub fn validate_tokens(
    tokens: &[Token],
    bindings: &VariableBindings,
    whitelist: &Whitelist,
) -> Result<(), FormulaError> {
    for (i, token) in tokens.iter().enumerate() {
        let Token::Identifier(name) = token else {
            continue;
        };
        let is_call = matches!(tokens.get(i + 1), Some(Token::LeftParen));

        if whitelist.is_function(name) {
            continue;
        }
        if is_call {
            return Err(FormulaError::UnknownFunction { name: name.clone() });
        }
        if !whitelist.is_variable(name) {
            return Err(FormulaError::UnknownIdentifier { name: name.clone() });
        }
        if !bindings.contains(whitelist.canonical(name)) {
            return Err(FormulaError::UnboundVariable { name: name.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::whitelist::AliasPolicy;

    fn bindings() -> VariableBindings {
        VariableBindings::new()
            .with("entry", 100.0)
            .with("low", 95.0)
            .with("atr", 2.0)
    }

    #[test]
    fn accepts_bound_whitelisted_variables() {
        let wl = Whitelist::standard();
        assert!(validate("abs(entry - low) + atr * 2", &bindings(), &wl).is_ok());
    }

    #[test]
    fn rejects_unknown_identifier() {
        let wl = Whitelist::standard();
        let err = validate("foo + 1", &bindings(), &wl).unwrap_err();
        assert_eq!(err, FormulaError::UnknownIdentifier { name: "foo".into() });
    }

    #[test]
    fn rejects_unbound_whitelisted_variable() {
        let wl = Whitelist::standard();
        let err = validate("high - low", &bindings(), &wl).unwrap_err();
        assert_eq!(err, FormulaError::UnboundVariable { name: "high".into() });
    }

    #[test]
    fn rejects_call_of_unknown_function() {
        let wl = Whitelist::standard();
        let err = validate("sin(atr)", &bindings(), &wl).unwrap_err();
        assert_eq!(err, FormulaError::UnknownFunction { name: "sin".into() });
    }

    #[test]
    fn rejects_call_of_variable_name() {
        let wl = Whitelist::standard();
        let err = validate("low(2)", &bindings(), &wl).unwrap_err();
        assert!(matches!(err, FormulaError::UnknownFunction { .. }));
    }

    #[test]
    fn case_insensitive_names() {
        let wl = Whitelist::standard();
        assert!(validate("MAX(Entry, LOW)", &bindings(), &wl).is_ok());
    }

    #[test]
    fn alias_reads_entry_binding_when_collapsed() {
        let wl = Whitelist::standard();
        assert!(validate("entry_price * 1.01", &bindings(), &wl).is_ok());

        let distinct = Whitelist::with_alias_policy(AliasPolicy::Distinct);
        let err = validate("entry_price * 1.01", &bindings(), &distinct).unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnboundVariable {
                name: "entry_price".into()
            }
        );
    }

    #[test]
    fn lexical_errors_surface_first() {
        let wl = Whitelist::standard();
        let err = validate("vwap $", &bindings(), &wl).unwrap_err();
        assert!(matches!(err, FormulaError::Lexical { found: '$', .. }));
    }

    #[test]
    fn bound_but_not_whitelisted_is_still_rejected() {
        let wl = Whitelist::standard();
        let b = bindings().with("entry_type", 1.0);
        let err = validate("entry_type * low", &b, &wl).unwrap_err();
        assert!(matches!(err, FormulaError::UnknownIdentifier { .. }));
    }
}
