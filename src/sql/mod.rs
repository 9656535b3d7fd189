//! Query processing
//!
//! - `types`: data types, values, comparison and rows
//! - `schema`: column definitions
//! - `parser`: the statement parser and the SELECT query parser
//! - `plan`: the query model and its fluent builder
//! - `executor`: query pipeline, joins, aggregates and statement executors
//! - `engine`: the statement session

pub mod engine;
pub mod executor;
pub mod parser;
pub mod plan;
pub mod schema;
pub mod types;
