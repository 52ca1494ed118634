//! Arithmetic expression evaluator.
//!
//! Hand-written tokenizer and recursive-descent parser; nothing is ever
//! handed to a shell or interpreter.

use crate::llm::types::ToolDef;
use crate::tools::{Tool, optional_usize, required_str};
use anyhow::Result;
use serde_json::{Value, json};
use std::iter::Peekable;
use std::str::Chars;

pub const MAX_EXPRESSION_LEN: usize = 1000;
pub const DEFAULT_PRECISION: usize = 10;
const MAX_PRECISION: usize = 15;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("expression is empty")]
    Empty,
    #[error("expression is longer than {MAX_EXPRESSION_LEN} characters")]
    TooLong,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LeftParen,
    RightParen,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => tokens.push(Token::Number(parse_number(&mut chars)?)),
            '+' | '-' | '*' | '/' | '%' | '^' => {
                chars.next();
                tokens.push(Token::Op(ch));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LeftParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RightParen);
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if !c.is_ascii_alphanumeric() {
                        break;
                    }
                    ident.push(c.to_ascii_lowercase());
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

fn parse_number(chars: &mut Peekable<Chars<'_>>) -> Result<f64, CalcError> {
    let mut literal = String::new();
    while let Some(&c) = chars.peek() {
        match c {
            '0'..='9' | '.' => literal.push(c),
            'e' | 'E' if !literal.contains(['e', 'E']) => {
                // Exponent only when a digit or sign follows.
                let mut ahead = chars.clone();
                ahead.next();
                match ahead.peek() {
                    Some(d) if d.is_ascii_digit() || *d == '+' || *d == '-' => {
                        literal.push(c);
                        chars.next();
                        if let Some(&sign) = chars.peek()
                            && (sign == '+' || sign == '-')
                        {
                            literal.push(sign);
                            chars.next();
                        }
                        continue;
                    }
                    _ => break,
                }
            }
            _ => break,
        }
        chars.next();
    }
    literal
        .parse::<f64>()
        .map_err(|_| CalcError::InvalidNumber(literal))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect_right_paren(&mut self) -> Result<(), CalcError> {
        match self.next() {
            Some(Token::RightParen) => Ok(()),
            Some(other) => Err(CalcError::UnexpectedToken(format!("{other:?}"))),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<f64, CalcError> {
        let mut left = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.term()?;
            left = if op == '+' { left + right } else { left - right };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut left = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.unary()?;
            left = match op {
                '*' => left * right,
                _ if right == 0.0 => return Err(CalcError::DivisionByZero),
                '/' => left / right,
                _ => left % right,
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // Right associative: 2^3^2 == 2^9.
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LeftParen) => {
                let value = self.expression()?;
                self.expect_right_paren()?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if let Some(Token::LeftParen) = self.peek() {
                    self.pos += 1;
                    let arg = self.expression()?;
                    self.expect_right_paren()?;
                    apply_function(&name, arg)
                } else {
                    constant(&name)
                }
            }
            Some(other) => Err(CalcError::UnexpectedToken(format!("{other:?}"))),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

fn constant(name: &str) -> Result<f64, CalcError> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => Err(CalcError::UnknownIdentifier(name.to_string())),
    }
}

fn apply_function(name: &str, x: f64) -> Result<f64, CalcError> {
    let value = match name {
        "sqrt" => x.sqrt(),
        "abs" => x.abs(),
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "ln" => x.ln(),
        "log" => x.log10(),
        "exp" => x.exp(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "round" => x.round(),
        _ => return Err(CalcError::UnknownIdentifier(name.to_string())),
    };
    Ok(value)
}

pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    if expression.chars().count() > MAX_EXPRESSION_LEN {
        return Err(CalcError::TooLong);
    }
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(CalcError::UnexpectedToken(format!("{extra:?}")));
    }
    if !value.is_finite() {
        return Err(CalcError::NonFinite);
    }
    Ok(value)
}

/// Rounds to `precision` decimal places and drops trailing zeros.
pub fn format_result(value: f64, precision: usize) -> String {
    let precision = precision.min(MAX_PRECISION);
    let factor = 10f64.powi(precision as i32);
    let scaled = value * factor;
    let rounded = if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    };
    let mut text = format!("{rounded:.precision$}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

pub fn tool_def() -> ToolDef {
    ToolDef::function(
        "calculator",
        "Evaluates a mathematical expression and returns the numeric result. Supports + - * / % ^, parentheses, the constants pi and e, and the functions sqrt, abs, sin, cos, tan, ln, log, exp, floor, ceil and round. Use it for any arithmetic instead of computing in your head.",
        json!({
            "type": "object",
            "properties": {
                "expression": {"type": "string", "description": "Expression to evaluate, e.g. \"2 + 3 * 4\" or \"sqrt(16)\""},
                "precision": {"type": "integer", "description": "Decimal places in the result (default 10)"}
            },
            "required": ["expression"]
        }),
    )
}

pub struct Calculator;

#[async_trait::async_trait]
impl Tool for Calculator {
    fn name(&self) -> &'static str {
        "calculator"
    }

    fn tool_def(&self) -> ToolDef {
        tool_def()
    }

    async fn call(&self, args: &Value) -> Result<Value> {
        let expression = required_str(args, "expression")?;
        let precision = optional_usize(args, "precision").unwrap_or(DEFAULT_PRECISION);
        let value = evaluate(expression)?;
        Ok(Value::String(format_result(value, precision)))
    }
}
