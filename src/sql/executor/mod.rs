use std::fmt::Display;

use crate::{
    error::Result,
    sql::{
        executor::{
            agg::{Aggregate, AggregateValue},
            join::NestedLoopJoin,
            mutation::{Delete, Insert, Update},
            query::Select,
            schema::{AddColumn, CreateTable, Describe, DropTable, Load, ShowTables},
        },
        parser::ast::Statement,
        schema::Column,
        types::Value,
    },
    storage::database::Database,
};

pub mod agg;
pub mod join;
mod mutation;
pub mod query;
mod schema;

/// Statement executor
pub trait Executor {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet>;
}

impl dyn Executor {
    /// Builds the executor for a parsed statement
    pub fn build(stmt: Statement) -> Box<dyn Executor> {
        match stmt {
            Statement::CreateTable { name, columns } => CreateTable::new(name, columns),
            Statement::AddColumn { table_name, column } => AddColumn::new(table_name, column),
            Statement::DropTable { name } => DropTable::new(name),
            Statement::Insert {
                table_name,
                columns,
                values,
            } => Insert::new(table_name, columns, values),
            Statement::Update {
                table_name,
                columns,
                where_clause,
            } => Update::new(table_name, columns, where_clause),
            Statement::Delete {
                table_name,
                where_clause,
            } => Delete::new(table_name, where_clause),
            Statement::Select { query } => Select::new(query),
            Statement::Join {
                left,
                right,
                left_column,
                right_column,
                join_type,
            } => NestedLoopJoin::new(left, right, left_column, right_column, join_type),
            Statement::Aggregate {
                table_name,
                function,
                column,
                where_clause,
            } => Aggregate::new(table_name, function, column, where_clause),
            Statement::ShowTables => ShowTables::new(),
            Statement::Describe { table_name } => Describe::new(table_name),
            Statement::Load {
                table_name,
                path,
                delimiter,
            } => Load::new(table_name, path, delimiter),
        }
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    CreateTable {
        table_name: String,
    },
    DropTable {
        table_name: String,
    },
    AddColumn {
        table_name: String,
        column: Column,
    },
    Insert {
        count: usize,
    },
    Update {
        count: usize,
    },
    Delete {
        count: usize,
    },
    Scan {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Aggregate {
        name: String,
        value: AggregateValue,
    },
    Tables {
        names: Vec<String>,
    },
    Describe {
        table_name: String,
        columns: Vec<Column>,
        rows: usize,
    },
    Load {
        table_name: String,
        count: usize,
    },
}

fn pk_suffix(column: &Column) -> &'static str {
    if column.primary_key { " (PK)" } else { "" }
}

/// Boxed text table followed by a row count footer
fn write_table(
    f: &mut std::fmt::Formatter<'_>,
    columns: &[String],
    rows: &[Vec<Value>],
) -> std::fmt::Result {
    let cells = rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let mut widths = columns.iter().map(|c| c.chars().count()).collect::<Vec<_>>();
    for row in cells.iter() {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = widths.iter().fold(String::from("+"), |mut line, w| {
        line.push_str(&"-".repeat(w + 2));
        line.push('+');
        line
    });
    let write_row = |f: &mut std::fmt::Formatter<'_>, row: &[String]| -> std::fmt::Result {
        write!(f, "|")?;
        for (cell, width) in row.iter().zip(widths.iter()) {
            write!(f, " {:<width$} |", cell, width = *width)?;
        }
        writeln!(f)
    };

    writeln!(f, "{}", separator)?;
    write_row(f, columns)?;
    writeln!(f, "{}", separator)?;
    for row in cells.iter() {
        write_row(f, row.as_slice())?;
    }
    writeln!(f, "{}", separator)?;
    match rows.len() {
        1 => write!(f, "(1 row)"),
        n => write!(f, "({} rows)", n),
    }
}

impl Display for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSet::CreateTable { table_name } => write!(f, "Table created: {}", table_name),
            ResultSet::DropTable { table_name } => write!(f, "Dropped table: {}", table_name),
            ResultSet::AddColumn { table_name, column } => write!(
                f,
                "Table {}: column {} {} added{}",
                table_name,
                column.name,
                column.datatype,
                pk_suffix(column)
            ),
            ResultSet::Insert { count } => write!(f, "{} row(s) inserted", count),
            ResultSet::Update { count } => write!(f, "{} row(s) updated", count),
            ResultSet::Delete { count } => write!(f, "{} row(s) deleted", count),
            ResultSet::Scan { columns, rows } => write_table(f, columns, rows),
            ResultSet::Aggregate { name, value } => write!(f, "{} = {}", name, value),
            ResultSet::Tables { names } => write!(f, "{}", names.join("\n")),
            ResultSet::Describe {
                table_name,
                columns,
                rows,
            } => {
                writeln!(f, "Table: {}", table_name)?;
                writeln!(f, "Columns:")?;
                for column in columns {
                    writeln!(f, "  {} : {}{}", column.name, column.datatype, pk_suffix(column))?;
                }
                write!(f, "Rows: {}", rows)
            }
            ResultSet::Load { table_name, count } => {
                write!(f, "Loaded {} row(s) into table '{}'", count, table_name)
            }
        }
    }
}
