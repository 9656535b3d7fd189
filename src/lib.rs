//! minisql - a small embeddable tabular query engine
//!
//! Named, typed in-memory tables queried through a compact SQL-like language:
//! - column projection, WHERE predicates evaluated left to right
//! - stable multi-key ORDER BY and LIMIT/OFFSET pagination
//! - nested-loop INNER/LEFT/RIGHT joins
//! - COUNT/MIN/MAX/SUM/AVG aggregates with exact decimal arithmetic
//! - CSV ingestion with type inference

pub mod error;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
pub use sql::engine::Session;
