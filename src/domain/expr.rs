//! Formula expression tree.
//!
//! Built from the postfix sequence. Variables stay symbolic in the tree and
//! are resolved against [`VariableBindings`] at evaluation time.

use crate::domain::bindings::VariableBindings;
use crate::domain::error::FormulaError;
use crate::domain::shunting_yard::Postfix;
use crate::domain::token::Operator;
use crate::domain::whitelist::Whitelist;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn from_postfix(postfix: &[Postfix]) -> Result<Expr, FormulaError> {
        let mut stack: Vec<Expr> = Vec::new();
        for item in postfix {
            let node = match item {
                Postfix::Number(v) => Expr::Number(*v),
                Postfix::Variable(name) => Expr::Variable(name.clone()),
                Postfix::Operator(op) => {
                    let right = pop_operand(&mut stack, item)?;
                    let left = pop_operand(&mut stack, item)?;
                    Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
                Postfix::Call { name, argc } => {
                    let args = split_args(&mut stack, *argc, item)?;
                    Expr::Call {
                        name: name.clone(),
                        args,
                    }
                }
            };
            stack.push(node);
        }
        single_result(stack)
    }

    pub fn evaluate(
        &self,
        bindings: &VariableBindings,
        whitelist: &Whitelist,
    ) -> Result<f64, FormulaError> {
        match self {
            Expr::Number(v) => Ok(*v),
            Expr::Variable(name) => resolve_variable(name, bindings, whitelist),
            Expr::Call { name, args } => {
                let function = whitelist
                    .function(name)
                    .ok_or_else(|| FormulaError::UnknownFunction { name: name.clone() })?;
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(bindings, whitelist))
                    .collect::<Result<Vec<_>, _>>()?;
                function.call(&values)
            }
            Expr::Binary { op, left, right } => {
                let a = left.evaluate(bindings, whitelist)?;
                let b = right.evaluate(bindings, whitelist)?;
                op.apply(a, b)
            }
        }
    }

    /// Variable names referenced anywhere in the tree, in first-seen order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(names);
                }
            }
            Expr::Binary { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
        }
    }
}

/// Fully parenthesised infix form; re-parses to an equivalent tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{v}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
        }
    }
}

pub(crate) fn resolve_variable(
    name: &str,
    bindings: &VariableBindings,
    whitelist: &Whitelist,
) -> Result<f64, FormulaError> {
    if !whitelist.is_variable(name) {
        return Err(FormulaError::UnknownIdentifier {
            name: name.to_string(),
        });
    }
    let value = bindings
        .get(whitelist.canonical(name))
        .ok_or_else(|| FormulaError::UnboundVariable {
            name: name.to_string(),
        })?;
    if !value.is_finite() {
        return Err(FormulaError::Domain {
            reason: format!("variable '{name}' is not finite ({value})"),
        });
    }
    Ok(value)
}

fn pop_operand<T>(stack: &mut Vec<T>, item: &Postfix) -> Result<T, FormulaError> {
    stack.pop().ok_or_else(|| FormulaError::Malformed {
        reason: format!("missing operand for '{item}'"),
    })
}

fn split_args<T>(stack: &mut Vec<T>, argc: usize, item: &Postfix) -> Result<Vec<T>, FormulaError> {
    if stack.len() < argc {
        return Err(FormulaError::Malformed {
            reason: format!("missing arguments for '{item}'"),
        });
    }
    Ok(stack.split_off(stack.len() - argc))
}

fn single_result<T>(mut stack: Vec<T>) -> Result<T, FormulaError> {
    match stack.len() {
        1 => Ok(stack.remove(0)),
        0 => Err(FormulaError::Malformed {
            reason: "no value produced".to_string(),
        }),
        n => Err(FormulaError::Malformed {
            reason: format!("{n} values left on the stack"),
        }),
    }
}

/// Stack-machine evaluation straight from postfix, without building a tree.
pub fn evaluate_postfix(
    postfix: &[Postfix],
    bindings: &VariableBindings,
    whitelist: &Whitelist,
) -> Result<f64, FormulaError> {
    let mut stack: Vec<f64> = Vec::new();
    for item in postfix {
        let value = match item {
            Postfix::Number(v) => *v,
            Postfix::Variable(name) => resolve_variable(name, bindings, whitelist)?,
            Postfix::Operator(op) => {
                let b = pop_operand(&mut stack, item)?;
                let a = pop_operand(&mut stack, item)?;
                op.apply(a, b)?
            }
            Postfix::Call { name, argc } => {
                let function = whitelist
                    .function(name)
                    .ok_or_else(|| FormulaError::UnknownFunction { name: name.clone() })?;
                let args = split_args(&mut stack, *argc, item)?;
                function.call(&args)?
            }
        };
        stack.push(value);
    }
    single_result(stack)
}
