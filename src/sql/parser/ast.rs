use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    sql::{
        schema::Column,
        types::{Operator, Row, Value},
    },
};

/// Statements of the command language
#[derive(Debug, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable {
        name: String,
        columns: Vec<Column>,
    },
    /// ALTER TABLE ... ADD COLUMN statement
    AddColumn {
        table_name: String,
        column: Column,
    },
    /// DROP TABLE statement
    DropTable {
        name: String,
    },
    /// INSERT statement, `columns` is None when values follow schema order
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Vec<Literal>>,
    },
    /// UPDATE statement, the WHERE body is kept as raw text
    Update {
        table_name: String,
        columns: BTreeMap<String, Literal>,
        where_clause: Option<String>,
    },
    /// DELETE statement, the WHERE body is kept as raw text
    Delete {
        table_name: String,
        where_clause: Option<String>,
    },
    /// SELECT statement, handed verbatim to the query parser
    Select {
        query: String,
    },
    /// JOIN left right ON left_column = right_column [INNER|LEFT|RIGHT]
    Join {
        left: String,
        right: String,
        left_column: String,
        right_column: String,
        join_type: JoinType,
    },
    /// AGG table FUNC(column) [WHERE ...]
    Aggregate {
        table_name: String,
        function: String,
        column: String,
        where_clause: Option<String>,
    },
    /// TABLES
    ShowTables,
    /// DESCRIBE table
    Describe {
        table_name: String,
    },
    /// LOAD table FROM 'path' [DELIM = 'c']
    Load {
        table_name: String,
        path: String,
        delimiter: Option<char>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
        })
    }
}

/// Sort direction (ascending or descending)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Raw, untyped input values for INSERT and UPDATE.
/// Tables coerce them to the declared column type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Double(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

/// Textual form, used when a literal is stored as a STRING
impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Double(d) => write!(f, "{:?}", d),
            Literal::String(s) => write!(f, "{}", s),
        }
    }
}

/// Logical connective between two terms of a WHERE chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Display for Connective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        })
    }
}

/// Row predicate of a WHERE clause.
///
/// Connectives are kept as a flat chain in the order they were written and
/// applied left to right, so `a AND b OR c` is `(a AND b) OR c`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    Compare {
        column: String,
        operator: Operator,
        value: Value,
    },
    Chain {
        first: Box<Predicate>,
        rest: Vec<(Connective, Predicate)>,
    },
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        self.chain(Connective::And, other)
    }

    pub fn or(self, other: Predicate) -> Predicate {
        self.chain(Connective::Or, other)
    }

    /// Appends a term, extending an existing chain in place
    fn chain(self, connective: Connective, other: Predicate) -> Predicate {
        match self {
            Predicate::Chain { first, mut rest } => {
                rest.push((connective, other));
                Predicate::Chain { first, rest }
            }
            first => Predicate::Chain {
                first: Box::new(first),
                rest: vec![(connective, other)],
            },
        }
    }

    /// Evaluates the predicate against a row. A chain short-circuits: a term
    /// after AND on a false result, or after OR on a true one, is skipped.
    /// A comparison on a column the row does not have is false.
    pub fn evaluate(&self, row: &Row) -> Result<bool> {
        match self {
            Predicate::Always => Ok(true),
            Predicate::Compare {
                column,
                operator,
                value,
            } => match row.get(column) {
                Some(cell) => cell.compare(*operator, Some(value)),
                None => Ok(false),
            },
            Predicate::Chain { first, rest } => {
                let mut acc = first.evaluate(row)?;
                for (connective, term) in rest {
                    acc = match connective {
                        Connective::And => acc && term.evaluate(row)?,
                        Connective::Or => acc || term.evaluate(row)?,
                    };
                }
                Ok(acc)
            }
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Always => write!(f, "TRUE"),
            Predicate::Compare {
                column,
                operator,
                value: Value::String(s),
            } => write!(f, "{} {} '{}'", column, operator, s.replace('\'', "''")),
            Predicate::Compare {
                column,
                operator,
                value,
            } => write!(f, "{} {} {}", column, operator, value),
            Predicate::Chain { first, rest } => {
                write!(f, "({}", first)?;
                for (connective, term) in rest {
                    write!(f, " {} {}", connective, term)?;
                }
                write!(f, ")")
            }
        }
    }
}
