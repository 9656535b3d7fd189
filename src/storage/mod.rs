//! In-memory table storage and CSV ingestion

pub mod csv;
pub mod database;
pub mod table;
