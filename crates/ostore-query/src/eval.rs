use std::cmp::Ordering;

use ostore_types::{IndexObject, Value};

use crate::error::{QueryError, QueryResult};
use crate::parser::{self, Clause, Comparator, Expr, Literal};

/// A parsed query, ready to be matched against index projections.
#[derive(Clone, Debug)]
pub struct Query {
    source: String,
    expr: Expr,
}

impl Query {
    /// Parse query text.
    pub fn parse(source: &str) -> QueryResult<Self> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The text this query was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate the query against `object`.
    ///
    /// An object missing a field the evaluation needs does not match. Only
    /// genuinely invalid comparisons, such as ordering booleans, are errors.
    pub fn matches(&self, object: &IndexObject) -> QueryResult<bool> {
        Ok(eval(&self.expr, object)?.unwrap_or(false))
    }
}

/// `Ok(None)` means a referenced field was missing on `object`.
///
/// Both sides of `and`/`or` are always evaluated, so a missing field
/// anywhere in the tree excludes the object whatever the clause order.
fn eval(expr: &Expr, object: &IndexObject) -> QueryResult<Option<bool>> {
    match expr {
        Expr::Clause(clause) => eval_clause(clause, object),
        Expr::Not(inner) => Ok(eval(inner, object)?.map(|b| !b)),
        Expr::And(lhs, rhs) => {
            let (lhs, rhs) = (eval(lhs, object)?, eval(rhs, object)?);
            Ok(lhs.zip(rhs).map(|(l, r)| l && r))
        }
        Expr::Or(lhs, rhs) => {
            let (lhs, rhs) = (eval(lhs, object)?, eval(rhs, object)?);
            Ok(lhs.zip(rhs).map(|(l, r)| l || r))
        }
    }
}

fn eval_clause(clause: &Clause, object: &IndexObject) -> QueryResult<Option<bool>> {
    let Some(value) = object.field(&clause.field) else {
        return Ok(None);
    };
    let cmp = clause.comparator;

    let matched = match (&clause.literal, &value) {
        (Literal::Bool(_), _) | (_, Value::Bool(_)) if cmp.is_ordering() => {
            return Err(QueryError::Evaluation(format!(
                "cannot apply `{cmp}` to boolean field `{}`",
                clause.field
            )))
        }
        (Literal::Bool(expected), Value::Bool(actual)) => apply(cmp, actual.cmp(expected)),
        (Literal::Number(expected), actual) => match actual.as_f64() {
            Some(actual) => match actual.partial_cmp(expected) {
                Some(ordering) => apply(cmp, ordering),
                None => false,
            },
            None => false,
        },
        (Literal::Str(expected), Value::String(actual)) => {
            apply(cmp, actual.as_str().cmp(expected.as_str()))
        }
        (Literal::Pattern { regex, .. }, Value::String(actual)) => match cmp {
            Comparator::Eq => regex.is_match(actual),
            Comparator::Ne => !regex.is_match(actual),
            _ => false,
        },
        _ => false,
    };
    Ok(Some(matched))
}

fn apply(cmp: Comparator, ordering: Ordering) -> bool {
    match cmp {
        Comparator::Eq => ordering == Ordering::Equal,
        Comparator::Ne => ordering != Ordering::Equal,
        Comparator::Gt => ordering == Ordering::Greater,
        Comparator::Lt => ordering == Ordering::Less,
        Comparator::Ge => ordering != Ordering::Less,
        Comparator::Le => ordering != Ordering::Greater,
    }
}
