use std::{cmp::Ordering, collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Double,
    String,
    Boolean,
}

impl DataType {
    /// INTEGER and DOUBLE are mutually comparable
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Double)
    }

    /// Resolves a type name (case-insensitive), accepting the common aliases
    pub fn from_name(name: &str) -> Option<DataType> {
        Some(match name.to_ascii_uppercase().as_ref() {
            "INTEGER" | "INT" => DataType::Integer,
            "DOUBLE" | "FLOAT" => DataType::Double,
            "STRING" | "TEXT" | "VARCHAR" => DataType::String,
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            _ => return None,
        })
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataType::Integer => "INTEGER",
            DataType::Double => "DOUBLE",
            DataType::String => "STRING",
            DataType::Boolean => "BOOLEAN",
        })
    }
}

/// Comparison operators understood by [`Value::compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    Like,
}

impl Operator {
    /// Every operator spelling, `<>` being an alias of `!=`
    pub const TOKENS: [(&'static str, Operator); 8] = [
        ("!=", Operator::NotEq),
        ("<>", Operator::NotEq),
        (">=", Operator::GtEq),
        ("<=", Operator::LtEq),
        ("=", Operator::Eq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
        ("LIKE", Operator::Like),
    ];

    /// Parses an operator token, LIKE being case-insensitive
    pub fn from_token(token: &str) -> Option<Operator> {
        Self::TOKENS
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(token))
            .map(|(_, op)| *op)
    }

    fn is_equality(&self) -> bool {
        matches!(self, Operator::Eq | Operator::NotEq)
    }

    /// Whether an ordering outcome satisfies this operator
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::NotEq => ordering != Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::GtEq => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            Operator::LtEq => ordering != Ordering::Greater,
            Operator::Like => false,
        }
    }

    /// Outcome when at least one operand is null
    fn accepts_nulls(&self, left_null: bool, right_null: bool) -> bool {
        match self {
            Operator::Eq => left_null && right_null,
            Operator::NotEq => !(left_null && right_null),
            _ => false,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Like => "LIKE",
        })
    }
}

/// A typed cell value. Nulls remember the type of the column they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null(DataType),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    String(String),
}

impl Value {
    /// Declared type of the value, also defined for nulls
    pub fn datatype(&self) -> DataType {
        match self {
            Value::Null(datatype) => *datatype,
            Value::Integer(_) => DataType::Integer,
            Value::Double(_) => DataType::Double,
            Value::Boolean(_) => DataType::Boolean,
            Value::String(_) => DataType::String,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Operator-aware comparison against an optional right-hand value.
    ///
    /// Without a right-hand value only `=` and `!=` are meaningful and they test
    /// this value's nullness. INTEGER and DOUBLE compare numerically with each
    /// other; any other pair of differing types is an error.
    pub fn compare(&self, operator: Operator, other: Option<&Value>) -> Result<bool> {
        let Some(other) = other else {
            return Ok(match operator {
                Operator::Eq => self.is_null(),
                Operator::NotEq => !self.is_null(),
                _ => false,
            });
        };

        let (lt, rt) = (self.datatype(), other.datatype());
        if lt.is_numeric() && rt.is_numeric() {
            if operator == Operator::Like {
                return Err(Error::Query(format!(
                    "Invalid operator for numeric comparison: {}",
                    operator
                )));
            }
            return Ok(match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => operator.accepts(a.total_cmp(&b)),
                (a, b) => operator.accepts_nulls(a.is_none(), b.is_none()),
            });
        }

        if lt != rt {
            return Err(Error::Query(format!(
                "Incompatible types in compare: {} vs {}",
                lt, rt
            )));
        }

        if lt == DataType::Boolean && !operator.is_equality() {
            return Err(Error::Query(format!(
                "Invalid operator for boolean comparison: {}",
                operator
            )));
        }

        Ok(match (self, other) {
            (Value::String(a), Value::String(b)) => match operator {
                Operator::Like => like(a, b),
                op => op.accepts(a.as_str().cmp(b.as_str())),
            },
            (Value::Boolean(a), Value::Boolean(b)) => operator.accepts(a.cmp(b)),
            _ => operator.accepts_nulls(self.is_null(), other.is_null()),
        })
    }

    /// Three-way ordering derived from `=`, `>` and `<` probes.
    ///
    /// Nulls order after every non-null value.
    pub fn order(&self, other: &Value) -> Result<Ordering> {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => return Ok(Ordering::Greater),
            (false, true) => return Ok(Ordering::Less),
            (false, false) => {}
        }
        Ok(if self.compare(Operator::Eq, Some(other))? {
            Ordering::Equal
        } else if self.compare(Operator::Gt, Some(other))? {
            Ordering::Greater
        } else if self.compare(Operator::Lt, Some(other))? {
            Ordering::Less
        } else {
            Ordering::Equal
        })
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null(_) => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            // `{:?}` keeps the decimal point on whole numbers (2.0, not 2)
            Value::Double(v) => write!(f, "{:?}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

/// SQL LIKE matching: `%` matches any sequence, `_` exactly one character.
/// The match is anchored at both ends and every other character is literal.
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    // Position after the last `%` seen, and the text position it is currently absorbing up to
    let mut resume: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p).copied() {
            Some('%') => {
                resume = Some((p + 1, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match resume {
                Some((after, absorbed)) => {
                    resume = Some((after, absorbed + 1));
                    p = after;
                    t = absorbed + 1;
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// A table row: one cell per column of the owning table's schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(cells: BTreeMap<String, Value>) -> Self {
        Self { cells }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Value> {
        self.cells.get_mut(column)
    }

    /// Overwrites (or adds) the cell for `column`
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.cells.insert(column.into(), value);
    }

    pub fn cells(&self) -> &BTreeMap<String, Value> {
        &self.cells
    }

    /// Picks the given columns in order, failing on a column the row does not have
    pub fn project(&self, columns: &[String]) -> Result<Vec<Value>> {
        columns
            .iter()
            .map(|c| {
                self.get(c)
                    .cloned()
                    .ok_or(Error::Query(format!("column {} not found", c)))
            })
            .collect()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "}}")
    }
}
