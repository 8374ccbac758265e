use std::fmt;

use regex::Regex;

use crate::error::{QueryError, QueryResult};
use crate::lexer::{tokenize, Spanned, Token};

/// A comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Comparator {
    /// Returns `true` for the ordering comparators.
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::Ge | Self::Le)
    }

    /// The operator selected by a field suffix such as `__gt`.
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            _ => None,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        })
    }
}

/// The right-hand side of a clause.
#[derive(Clone, Debug)]
pub enum Literal {
    Str(String),
    /// A string literal containing `*`, compiled to an anchored regex.
    Pattern { source: String, regex: Regex },
    Number(f64),
    Bool(bool),
}

impl Literal {
    fn string(value: String, position: usize) -> QueryResult<Self> {
        if !value.contains('*') {
            return Ok(Self::Str(value));
        }
        let body: Vec<String> = value.split('*').map(regex::escape).collect();
        let pattern = format!("^{}$", body.join(".*"));
        let regex = Regex::new(&pattern)
            .map_err(|e| QueryError::parse(position, format!("invalid wildcard: {e}")))?;
        Ok(Self::Pattern {
            source: value,
            regex,
        })
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Pattern { source: a, .. }, Self::Pattern { source: b, .. }) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

/// A single `field comparator literal` test.
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub field: String,
    pub comparator: Comparator,
    pub literal: Literal,
}

/// A parsed query expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Clause(Clause),
}

/// Parse query text into an expression tree.
pub fn parse(input: &str) -> QueryResult<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(QueryError::parse(0, "empty query"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let expr = parser.or_expr()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(QueryError::parse(
            extra.position,
            format!("unexpected {}", extra.token),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> QueryResult<Spanned> {
        let spanned = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| QueryError::parse(self.end, "unexpected end of query"))?;
        self.pos += 1;
        Ok(spanned)
    }

    fn or_expr(&mut self) -> QueryResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> QueryResult<Expr> {
        let mut lhs = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> QueryResult<Expr> {
        let Spanned { token, position } = self.next()?;
        match token {
            Token::Not => Ok(Expr::Not(Box::new(self.unary()?))),
            Token::LParen => {
                let inner = self.or_expr()?;
                match self.next()? {
                    Spanned {
                        token: Token::RParen,
                        ..
                    } => Ok(inner),
                    other => Err(QueryError::parse(
                        other.position,
                        format!("expected `)`, found {}", other.token),
                    )),
                }
            }
            Token::Ident(name) => self.clause(name, position),
            other => Err(QueryError::parse(
                position,
                format!("expected field, `(` or `not`, found {other}"),
            )),
        }
    }

    fn clause(&mut self, name: String, position: usize) -> QueryResult<Expr> {
        let (field, suffix_op) = split_suffix(&name);
        if field.is_empty() {
            return Err(QueryError::parse(position, "missing field name"));
        }

        let cmp = self.next()?;
        let written = match cmp.token {
            Token::Cmp(c) => c,
            other => {
                return Err(QueryError::parse(
                    cmp.position,
                    format!("expected comparator after `{name}`, found {other}"),
                ))
            }
        };
        let comparator = match suffix_op {
            Some(op) if written == Comparator::Eq => op,
            Some(_) => {
                return Err(QueryError::parse(
                    cmp.position,
                    format!("`{name}` carries an operator suffix and must be compared with `=`"),
                ))
            }
            None => written,
        };

        let lit = self.next()?;
        let literal = match lit.token {
            Token::Str(s) => Literal::string(s, lit.position)?,
            Token::Number(n) => Literal::Number(n),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            other => {
                return Err(QueryError::parse(
                    lit.position,
                    format!("expected literal, found {other}"),
                ))
            }
        };
        if matches!(literal, Literal::Pattern { .. }) && comparator.is_ordering() {
            return Err(QueryError::parse(
                lit.position,
                "wildcard literals only support `=` and `!=`",
            ));
        }

        Ok(Expr::Clause(Clause {
            field: field.to_string(),
            comparator,
            literal,
        }))
    }
}

fn split_suffix(name: &str) -> (&str, Option<Comparator>) {
    if let Some((field, suffix)) = name.rsplit_once("__") {
        if let Some(op) = Comparator::from_suffix(suffix) {
            return (field, Some(op));
        }
    }
    (name, None)
}
