//! Formula tokenizer.
//!
//! Splits a formula into numbers, identifiers, operators, parentheses and
//! argument commas. Identifiers are case-folded here so every later stage
//! matches names case-insensitively.

use crate::domain::error::FormulaError;
use std::fmt;

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl Operator {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            '%' => Some(Operator::Rem),
            '^' => Some(Operator::Pow),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Rem => '%',
            Operator::Pow => '^',
        }
    }

    /// Binding strength; all operators are left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div | Operator::Rem => 2,
            Operator::Pow => 3,
        }
    }

    /// Apply the operator, rejecting results that are not finite.
    pub fn apply(self, a: f64, b: f64) -> Result<f64, FormulaError> {
        let value = match self {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div | Operator::Rem if b == 0.0 => {
                return Err(FormulaError::Domain {
                    reason: format!("{} {} 0", a, self.symbol()),
                });
            }
            Operator::Div => a / b,
            Operator::Rem => a % b,
            Operator::Pow => a.powf(b),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::Domain {
                reason: format!("{} {} {} is not finite", a, self.symbol(), b),
            })
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Identifier(String),
    Operator(Operator),
    LeftParen,
    RightParen,
    Comma,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&accept) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn number(&mut self) -> Result<Token, FormulaError> {
        let start = self.pos;
        let text = self.take_while(|c| c.is_ascii_digit() || c == '.');
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::BadNumber {
                text: text.to_string(),
                position: start,
            })
    }

    fn identifier(&mut self) -> Token {
        let text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        Token::Identifier(text.to_ascii_lowercase())
    }

    fn next_token(&mut self) -> Option<Result<Token, FormulaError>> {
        loop {
            let ch = self.peek()?;
            if ch.is_whitespace() {
                self.advance();
                continue;
            }
            if ch.is_ascii_digit() || ch == '.' {
                return Some(self.number());
            }
            if ch.is_ascii_alphabetic() || ch == '_' {
                return Some(Ok(self.identifier()));
            }
            let position = self.pos;
            self.advance();
            let token = match ch {
                '(' => Token::LeftParen,
                ')' => Token::RightParen,
                ',' => Token::Comma,
                _ => match Operator::from_char(ch) {
                    Some(op) => Token::Operator(op),
                    None => return Some(Err(FormulaError::Lexical { found: ch, position })),
                },
            };
            return Some(Ok(token));
        }
    }
}

/// Tokenize a formula. Fails on the first character outside the formula alphabet.
pub fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token?);
    }
    Ok(tokens)
}
