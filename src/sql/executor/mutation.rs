use std::collections::BTreeMap;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet},
        parser::{
            ast::{Literal, Predicate},
            query::QueryParser,
        },
    },
    storage::{database::Database, table::Table},
};

/// Resolves a raw WHERE body through the query parser, by way of
/// `SELECT * FROM <table> WHERE <body>`
fn resolve_where(db: &Database, table_name: &str, where_clause: Option<&str>) -> Result<Predicate> {
    match where_clause {
        Some(clause) => {
            let sql = format!("SELECT * FROM {} WHERE {}", table_name, clause);
            Ok(QueryParser::new().parse(&sql, db)?.filter)
        }
        None => Ok(Predicate::Always),
    }
}

fn check_column(table: &Table, column: &str) -> Result<()> {
    match table.get_column(column) {
        Some(_) => Ok(()),
        None => Err(Error::Query(format!("Unknown column: {}", column))),
    }
}

/// INSERT executor
pub struct Insert {
    table_name: String,
    columns: Option<Vec<String>>,
    values: Vec<Vec<Literal>>,
}

impl Insert {
    pub fn new(table_name: String, columns: Option<Vec<String>>, values: Vec<Vec<Literal>>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            values,
        })
    }
}

/// Pairs one VALUES tuple with column names. Without an explicit column list
/// the values follow schema order and missing trailing columns stay null.
fn make_row(
    table: &Table,
    columns: Option<&[String]>,
    values: Vec<Literal>,
) -> Result<BTreeMap<String, Literal>> {
    let names = match columns {
        Some(columns) => {
            if columns.len() != values.len() {
                return Err(Error::Query(format!(
                    "{} columns but {} values",
                    columns.len(),
                    values.len()
                )));
            }
            for column in columns {
                check_column(table, column)?;
            }
            columns.to_vec()
        }
        None => {
            if values.len() > table.columns().len() {
                return Err(Error::Query(format!(
                    "{} values for {} columns of table {}",
                    values.len(),
                    table.columns().len(),
                    table.name()
                )));
            }
            table.column_names()
        }
    };
    Ok(names.into_iter().zip(values).collect())
}

impl Executor for Insert {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let Self {
            table_name,
            columns,
            values,
        } = *self;
        let table = db.get_table_mut(&table_name)?;
        // Every tuple is checked before the first one is stored
        let rows = values
            .into_iter()
            .map(|values| make_row(table, columns.as_deref(), values))
            .collect::<Result<Vec<_>>>()?;
        for row in rows.iter() {
            table.insert(row);
        }
        Ok(ResultSet::Insert { count: rows.len() })
    }
}

/// UPDATE executor
pub struct Update {
    table_name: String,
    columns: BTreeMap<String, Literal>,
    where_clause: Option<String>,
}

impl Update {
    pub fn new(
        table_name: String,
        columns: BTreeMap<String, Literal>,
        where_clause: Option<String>,
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            where_clause,
        })
    }
}

impl Executor for Update {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let table = db.get_table(&self.table_name)?;
        for column in self.columns.keys() {
            check_column(table, column)?;
        }
        let filter = resolve_where(db, &self.table_name, self.where_clause.as_deref())?;
        let count = db
            .get_table_mut(&self.table_name)?
            .update(|row| filter.evaluate(row), &self.columns)?;
        Ok(ResultSet::Update { count })
    }
}

/// DELETE executor
pub struct Delete {
    table_name: String,
    where_clause: Option<String>,
}

impl Delete {
    pub fn new(table_name: String, where_clause: Option<String>) -> Box<Self> {
        Box::new(Self {
            table_name,
            where_clause,
        })
    }
}

impl Executor for Delete {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        db.get_table(&self.table_name)?;
        let filter = resolve_where(db, &self.table_name, self.where_clause.as_deref())?;
        let count = db
            .get_table_mut(&self.table_name)?
            .delete(|row| filter.evaluate(row))?;
        Ok(ResultSet::Delete { count })
    }
}
