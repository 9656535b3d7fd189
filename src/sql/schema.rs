use serde::{Deserialize, Serialize};

use crate::sql::types::DataType;

/// Column schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    /// Informational only: uniqueness is not enforced by the store
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            primary_key: false,
        }
    }

    /// Marks the column as the primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}
