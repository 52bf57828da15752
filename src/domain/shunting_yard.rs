//! Infix to postfix conversion.
//!
//! Classic shunting-yard over the token stream. Operators are all
//! left-associative, including `^`. Function calls are emitted as a single
//! [`Postfix::Call`] carrying the argument count, so variadic `min`/`max`
//! evaluate on the same stack as the arithmetic.
//!
//! Parenthesis depth is not checked: a stray `)` pops operators until the
//! nearest `(` (or the bottom of the stack) and an unclosed `(` is dropped at
//! end of input. Call arguments are stricter: each one must leave exactly one
//! value, so `max(low entry, 1)` and `max(1,)` are rejected here instead of
//! borrowing operands from a neighbouring argument.

use crate::domain::error::FormulaError;
use crate::domain::token::{Operator, Token};
use crate::domain::whitelist::Whitelist;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Postfix {
    Number(f64),
    Variable(String),
    Operator(Operator),
    Call { name: String, argc: usize },
}

impl fmt::Display for Postfix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Postfix::Number(v) => write!(f, "{v}"),
            Postfix::Variable(name) => write!(f, "{name}"),
            Postfix::Operator(op) => write!(f, "{op}"),
            Postfix::Call { name, argc } => write!(f, "{name}/{argc}"),
        }
    }
}

/// Render a postfix sequence as space-separated RPN text.
pub fn render(postfix: &[Postfix]) -> String {
    postfix
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

enum Pending {
    Op(Operator),
    Paren,
    /// `mark` is the operand depth at which the current argument started.
    Call {
        name: String,
        commas: usize,
        mark: isize,
    },
}

/// Postfix output plus the depth of the value stack it would leave behind.
struct Output {
    items: Vec<Postfix>,
    depth: isize,
}

impl Output {
    fn push(&mut self, item: Postfix) {
        self.depth += match &item {
            Postfix::Number(_) | Postfix::Variable(_) => 1,
            Postfix::Operator(_) => -1,
            Postfix::Call { argc, .. } => 1 - *argc as isize,
        };
        self.items.push(item);
    }
}

pub fn to_postfix(tokens: &[Token], whitelist: &Whitelist) -> Result<Vec<Postfix>, FormulaError> {
    let mut out = Output {
        items: Vec::with_capacity(tokens.len()),
        depth: 0,
    };
    let mut stack: Vec<Pending> = Vec::new();
    let mut call_name: Option<String> = None;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Number(v) => out.push(Postfix::Number(*v)),
            Token::Identifier(name) => {
                if matches!(tokens.get(i + 1), Some(Token::LeftParen)) {
                    if !whitelist.is_function(name) {
                        return Err(FormulaError::UnknownFunction { name: name.clone() });
                    }
                    call_name = Some(name.clone());
                } else {
                    out.push(Postfix::Variable(name.clone()));
                }
            }
            Token::LeftParen => match call_name.take() {
                Some(name) => stack.push(Pending::Call {
                    name,
                    commas: 0,
                    mark: out.depth,
                }),
                None => stack.push(Pending::Paren),
            },
            Token::Comma => {
                pop_operators(&mut stack, &mut out);
                match stack.last_mut() {
                    Some(Pending::Call { name, commas, mark }) => {
                        check_argument(name, *mark, out.depth)?;
                        *commas += 1;
                        *mark = out.depth;
                    }
                    _ => {
                        return Err(FormulaError::Malformed {
                            reason: "',' outside of a function call".to_string(),
                        });
                    }
                }
            }
            Token::Operator(op) => {
                while let Some(Pending::Op(top)) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    out.push(Postfix::Operator(*top));
                    stack.pop();
                }
                stack.push(Pending::Op(*op));
            }
            Token::RightParen => {
                pop_operators(&mut stack, &mut out);
                let empty_call = i > 0 && tokens[i - 1] == Token::LeftParen;
                match stack.pop() {
                    Some(Pending::Call { name, commas, mark }) => {
                        let argc = if empty_call {
                            0
                        } else {
                            check_argument(&name, mark, out.depth)?;
                            commas + 1
                        };
                        out.push(Postfix::Call { name, argc });
                    }
                    // A stray ')' with nothing open is ignored.
                    Some(Pending::Paren | Pending::Op(_)) | None => {}
                }
            }
        }
    }

    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Op(op) => out.push(Postfix::Operator(op)),
            Pending::Paren => {}
            Pending::Call { name, commas, mark } => {
                check_argument(&name, mark, out.depth)?;
                out.push(Postfix::Call {
                    name,
                    argc: commas + 1,
                });
            }
        }
    }

    Ok(out.items)
}

fn pop_operators(stack: &mut Vec<Pending>, out: &mut Output) {
    while let Some(Pending::Op(op)) = stack.last() {
        out.push(Postfix::Operator(*op));
        stack.pop();
    }
}

/// Each argument must leave exactly one value of its own.
fn check_argument(name: &str, mark: isize, depth: isize) -> Result<(), FormulaError> {
    let reason = match depth - mark {
        1 => return Ok(()),
        n if n < 1 => format!("missing value in argument to '{name}'"),
        n => format!("argument to '{name}' has {n} values, missing operator or ','"),
    };
    Err(FormulaError::Malformed { reason })
}
