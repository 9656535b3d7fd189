//! The query model: a fully resolved SELECT ready for execution

use std::fmt::Debug;

use crate::{
    sql::{
        parser::ast::{OrderDirection, Predicate},
        types::Row,
    },
    storage::table::Table,
};

pub mod builder;

/// Maps a result row to the caller's result type
pub type Mapper<'a, T> = Box<dyn Fn(&Row) -> T + 'a>;

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: String,
    pub direction: OrderDirection,
}

impl OrderSpec {
    pub fn new(column: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn is_asc(&self) -> bool {
        self.direction == OrderDirection::Asc
    }
}

/// A resolved query against one table.
///
/// An empty `columns` list selects every column in schema order. The mapper
/// defaults to cloning the row.
pub struct Query<'a, T = Row> {
    pub table: Option<&'a Table>,
    pub columns: Vec<String>,
    pub filter: Predicate,
    pub order_by: Vec<OrderSpec>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub mapper: Mapper<'a, T>,
}

impl<'a> Query<'a, Row> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table: Some(table),
            ..Self::default()
        }
    }
}

impl Default for Query<'_, Row> {
    fn default() -> Self {
        Self {
            table: None,
            columns: Vec::new(),
            filter: Predicate::Always,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            mapper: Box::new(|row: &Row| row.clone()),
        }
    }
}

impl<'a, T> Query<'a, T> {
    /// Replaces the result mapper, keeping everything else
    pub fn map<U>(self, mapper: impl Fn(&Row) -> U + 'a) -> Query<'a, U> {
        Query {
            table: self.table,
            columns: self.columns,
            filter: self.filter,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            mapper: Box::new(mapper),
        }
    }

    /// Columns the query projects: the selected ones, or the full schema
    pub fn output_columns(&self) -> Vec<String> {
        match self.table {
            Some(table) if self.columns.is_empty() => table.column_names(),
            _ => self.columns.clone(),
        }
    }
}

impl<T> Debug for Query<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("table", &self.table.map(|t| t.name()))
            .field("columns", &self.columns)
            .field("filter", &self.filter)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}
