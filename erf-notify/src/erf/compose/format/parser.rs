//! Recursive descent parser for email templates

use super::ast::*;
use crate::erf::Value;

/// Parse error with position information
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
    pub context: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "at position {}: {}", self.position, self.message)?;
        if !self.context.is_empty() {
            write!(f, " (near '{}')", self.context)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Parse a template string into a [`FormatTemplate`]
pub fn parse_template(input: &str) -> Result<FormatTemplate, ParseError> {
    let mut parts = Vec::new();
    let mut current_literal = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        if ch != '$' || !matches!(chars.peek(), Some(&(_, '{'))) {
            current_literal.push(ch);
            continue;
        }
        chars.next(); // '{'

        if !current_literal.is_empty() {
            parts.push(FormatPart::Literal(std::mem::take(&mut current_literal)));
        }

        let expr_start = pos + 2;
        let mut depth = 1;
        let mut in_string = false;
        let mut expr_end = None;

        for (i, c) in chars.by_ref() {
            match c {
                '\'' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        expr_end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let Some(expr_end) = expr_end else {
            return Err(ParseError {
                message: "unclosed expression, expected '}'".to_string(),
                position: pos,
                context: input[pos..].chars().take(20).collect(),
            });
        };

        let expr_str = &input[expr_start..expr_end];
        if expr_str.trim().is_empty() {
            return Err(ParseError {
                message: "empty expression".to_string(),
                position: pos,
                context: "${}".to_string(),
            });
        }
        parts.push(FormatPart::Expr(parse_expression(expr_str, expr_start)?));
    }

    if !current_literal.is_empty() {
        parts.push(FormatPart::Literal(current_literal));
    }

    Ok(FormatTemplate::new(parts, input.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Question,
    DoubleQuestion,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,

    Eof,
}

struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    base_pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, base_pos: usize) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            base_pos,
        }
    }

    fn current_pos(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
            + self.base_pos
    }

    fn error(&self, message: impl Into<String>, pos: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position: pos + self.base_pos,
            context: self.input[pos..].chars().take(10).collect(),
        }
    }

    /// Consume `second` if it is next, returning `long`, else `short`
    fn pair(&mut self, second: char, long: Token, short: Token) -> Token {
        if let Some(&(_, c)) = self.chars.peek() {
            if c == second {
                self.chars.next();
                return long;
            }
        }
        short
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        while let Some(&(_, ch)) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.chars.next();
        }

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        let single = match ch {
            ':' => Some(Token::Colon),
            '.' => Some(Token::Dot),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(tok) = single {
            self.chars.next();
            return Ok(tok);
        }

        match ch {
            '?' => {
                self.chars.next();
                return Ok(self.pair('?', Token::DoubleQuestion, Token::Question));
            }
            '<' => {
                self.chars.next();
                return Ok(self.pair('=', Token::Le, Token::Lt));
            }
            '>' => {
                self.chars.next();
                return Ok(self.pair('=', Token::Ge, Token::Gt));
            }
            '=' | '!' => {
                self.chars.next();
                if let Some(&(_, '=')) = self.chars.peek() {
                    self.chars.next();
                    return Ok(if ch == '=' { Token::Eq } else { Token::Ne });
                }
                return Err(self.error(format!("expected '{}='", ch), pos));
            }
            '\'' => {
                self.chars.next();
                let mut s = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, '\'')) => break,
                        Some((_, c)) => s.push(c),
                        None => return Err(self.error("unclosed string literal", pos)),
                    }
                }
                return Ok(Token::String(s));
            }
            _ => {}
        }

        if ch.is_ascii_digit() {
            return self.number(pos);
        }

        if ch.is_alphabetic() || ch == '_' {
            while let Some(&(_, c)) = self.chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    self.chars.next();
                } else {
                    break;
                }
            }
            let end = self.chars.peek().map(|(i, _)| *i).unwrap_or(self.input.len());
            return Ok(match &self.input[pos..end] {
                "true" => Token::Bool(true),
                "false" => Token::Bool(false),
                ident => Token::Ident(ident.to_string()),
            });
        }

        Err(self.error(format!("unexpected character: '{}'", ch), pos))
    }

    fn number(&mut self, start: usize) -> Result<Token, ParseError> {
        let mut has_dot = false;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.chars.next();
            } else if c == '.' && !has_dot {
                // Only a decimal point when a digit follows
                let next_is_digit = self.input[i + 1..]
                    .chars()
                    .next()
                    .is_some_and(|n| n.is_ascii_digit());
                if !next_is_digit {
                    break;
                }
                has_dot = true;
                self.chars.next();
            } else {
                break;
            }
        }

        let end = self.chars.peek().map(|(i, _)| *i).unwrap_or(self.input.len());
        let text = &self.input[start..end];
        if has_dot {
            text.parse()
                .map(Token::Float)
                .map_err(|_| self.error(format!("invalid float: {}", text), start))
        } else {
            text.parse()
                .map(Token::Int)
                .map_err(|_| self.error(format!("invalid integer: {}", text), start))
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, base_pos: usize) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input, base_pos);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(&mut self, message: String) -> ParseError {
        ParseError {
            message,
            position: self.lexer.current_pos(),
            context: String::new(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.current == expected {
            self.advance()
        } else {
            let msg = format!("expected {:?}, found {:?}", expected, self.current);
            Err(self.unexpected(msg))
        }
    }

    /// expression = ternary (":" spec)?
    fn parse(&mut self) -> Result<FormatExpr, ParseError> {
        let mut expr = self.parse_ternary()?;

        // A format spec is only allowed at the top level
        if self.current == Token::Colon {
            self.advance()?;
            let spec = self.parse_format_spec()?;
            expr = FormatExpr::Formatted {
                expr: Box::new(expr),
                spec,
            };
        }

        if self.current != Token::Eof {
            let msg = format!("unexpected token after expression: {:?}", self.current);
            return Err(self.unexpected(msg));
        }

        Ok(expr)
    }

    /// ternary = coalesce ("?" ternary ":" ternary)?
    fn parse_ternary(&mut self) -> Result<FormatExpr, ParseError> {
        let condition = self.parse_coalesce()?;
        if self.current != Token::Question {
            return Ok(condition);
        }

        self.advance()?;
        let then_expr = self.parse_ternary()?;
        self.expect(Token::Colon)?;
        let else_expr = self.parse_ternary()?;

        Ok(FormatExpr::Ternary {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    /// coalesce = comparison ("??" comparison)*
    fn parse_coalesce(&mut self) -> Result<FormatExpr, ParseError> {
        let first = self.parse_comparison()?;
        if self.current != Token::DoubleQuestion {
            return Ok(first);
        }

        let mut exprs = vec![first];
        while self.current == Token::DoubleQuestion {
            self.advance()?;
            exprs.push(self.parse_comparison()?);
        }
        Ok(FormatExpr::Coalesce { exprs })
    }

    /// comparison = primary (op primary)?
    fn parse_comparison(&mut self) -> Result<FormatExpr, ParseError> {
        let left = self.parse_primary()?;

        let op = match self.current {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.parse_primary()?;

        Ok(FormatExpr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    /// primary = "(" ternary ")" | ident | number | string | boolean
    fn parse_primary(&mut self) -> Result<FormatExpr, ParseError> {
        let expr = match &self.current {
            Token::LParen => {
                self.advance()?;
                let inner = self.parse_ternary()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            Token::Ident(name) => FormatExpr::Field(name.clone()),
            Token::Int(n) => FormatExpr::Constant(Value::Int(*n)),
            Token::Float(n) => FormatExpr::Constant(Value::Float(*n)),
            Token::String(s) => FormatExpr::Constant(Value::String(s.clone())),
            Token::Bool(b) => FormatExpr::Constant(Value::Bool(*b)),
            other => {
                let msg = format!("unexpected token: {:?}", other);
                return Err(self.unexpected(msg));
            }
        };
        self.advance()?;
        Ok(expr)
    }

    /// spec = ","? ("." digits)? type?
    fn parse_format_spec(&mut self) -> Result<FormatSpec, ParseError> {
        let mut spec = FormatSpec::default();

        if self.current == Token::Comma {
            spec.thousands_sep = true;
            self.advance()?;
        }

        if self.current == Token::Dot {
            self.advance()?;
            match self.current {
                Token::Int(n) if (0..=u8::MAX as i64).contains(&n) => {
                    spec.precision = Some(n as u8);
                    self.advance()?;
                }
                _ => return Err(self.unexpected("expected precision after '.'".to_string())),
            }
        }

        if let Token::Ident(s) = &self.current {
            spec.format_type = match s.as_str() {
                "f" => FormatType::Float,
                "d" => FormatType::Integer,
                "date" => FormatType::Date,
                "datetime" => FormatType::DateTime,
                other => {
                    let msg = format!("unknown format type: {}", other);
                    return Err(self.unexpected(msg));
                }
            };
            self.advance()?;
        }

        Ok(spec)
    }
}

fn parse_expression(input: &str, base_pos: usize) -> Result<FormatExpr, ParseError> {
    Parser::new(input, base_pos)?.parse()
}
