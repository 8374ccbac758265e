use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{QueryError, QueryResult};
use crate::parser::Comparator;

/// A lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    True,
    False,
    And,
    Or,
    Not,
    LParen,
    RParen,
    Cmp(Comparator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "field `{name}`"),
            Self::Str(s) => write!(f, "string {s:?}"),
            Self::Number(n) => write!(f, "number {n}"),
            Self::True => f.write_str("`true`"),
            Self::False => f.write_str("`false`"),
            Self::And => f.write_str("`and`"),
            Self::Or => f.write_str("`or`"),
            Self::Not => f.write_str("`not`"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
            Self::Cmp(c) => write!(f, "`{c}`"),
        }
    }
}

/// A token with the byte offset it started at.
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Split query text into tokens.
pub fn tokenize(input: &str) -> QueryResult<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let token = match ch {
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '\'' | '"' => lex_string(&mut chars, position)?,
            '=' | '!' | '<' | '>' | '&' | '|' => lex_operator(&mut chars, position)?,
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                lex_number(input, &mut chars, position)?
            }
            c if c.is_ascii_alphabetic() || c == '_' => lex_word(&mut chars),
            other => {
                return Err(QueryError::parse(
                    position,
                    format!("unexpected character {other:?}"),
                ))
            }
        };
        tokens.push(Spanned { token, position });
    }

    Ok(tokens)
}

type Chars<'a> = Peekable<CharIndices<'a>>;

fn lex_string(chars: &mut Chars<'_>, start: usize) -> QueryResult<Token> {
    let Some((_, quote)) = chars.next() else {
        return Err(QueryError::parse(start, "expected string"));
    };
    let mut value = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            c if c == quote => return Ok(Token::Str(value)),
            c => value.push(c),
        }
    }
    Err(QueryError::parse(start, "unterminated string literal"))
}

fn lex_operator(chars: &mut Chars<'_>, start: usize) -> QueryResult<Token> {
    let Some((_, first)) = chars.next() else {
        return Err(QueryError::parse(start, "expected operator"));
    };
    let second = chars.peek().map(|&(_, c)| c);
    let (token, doubled) = match (first, second) {
        ('=', Some('=')) => (Token::Cmp(Comparator::Eq), true),
        ('=', _) => (Token::Cmp(Comparator::Eq), false),
        ('!', Some('=')) => (Token::Cmp(Comparator::Ne), true),
        ('!', _) => (Token::Not, false),
        ('>', Some('=')) => (Token::Cmp(Comparator::Ge), true),
        ('>', _) => (Token::Cmp(Comparator::Gt), false),
        ('<', Some('=')) => (Token::Cmp(Comparator::Le), true),
        ('<', _) => (Token::Cmp(Comparator::Lt), false),
        ('&', Some('&')) => (Token::And, true),
        ('|', Some('|')) => (Token::Or, true),
        (c, _) => {
            return Err(QueryError::parse(
                start,
                format!("unexpected character {c:?}, expected `{c}{c}`"),
            ))
        }
    };
    if doubled {
        chars.next();
    }
    Ok(token)
}

fn lex_number(input: &str, chars: &mut Chars<'_>, start: usize) -> QueryResult<Token> {
    let mut end = start;
    let mut first = true;
    while let Some(&(i, c)) = chars.peek() {
        let accepted = c.is_ascii_digit() || c == '.' || (first && c == '-');
        if !accepted {
            break;
        }
        first = false;
        end = i + c.len_utf8();
        chars.next();
    }
    let text = &input[start..end];
    text.parse::<f64>()
        .map(Token::Number)
        .map_err(|_| QueryError::parse(start, format!("invalid number {text:?}")))
}

fn lex_word(chars: &mut Chars<'_>) -> Token {
    let mut word = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            break;
        }
        word.push(c);
        chars.next();
    }
    match word.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "true" => Token::True,
        "false" => Token::False,
        _ => Token::Ident(word),
    }
}
