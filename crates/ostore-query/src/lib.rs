//! Query language for ostore.
//!
//! A query is a boolean expression over `field comparator literal` clauses:
//!
//! ```text
//! test_int > 64 and test_int < 128
//! name = 'jo*' or not (status__ne = "open")
//! ```
//!
//! Fields may carry an operator suffix (`__eq`, `__ne`, `__gt`, `__lt`), in
//! which case the comparator must be `=`. String literals containing `*`
//! match as anchored wildcards. Numbers are always compared as `f64`.
//!
//! An object lacking a referenced field is excluded from the result rather
//! than failing the query.

pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use error::{QueryError, QueryResult};
pub use eval::Query;
pub use parser::{Clause, Comparator, Expr, Literal};
