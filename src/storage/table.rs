use std::collections::{BTreeMap, HashSet};

use crate::{
    error::{Error, Result},
    sql::{
        parser::ast::Literal,
        schema::Column,
        types::{DataType, Row, Value},
    },
};

/// An in-memory table: an append-only schema plus rows in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table, validating the schema
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(Error::Storage(format!("table {} has no columns", name)));
        }
        let mut seen = HashSet::new();
        for col in columns.iter() {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::Storage(format!(
                    "duplicate column {} in table {}",
                    col.name, name
                )));
            }
        }
        Ok(Self {
            name,
            columns,
            rows: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Appends one row. Every schema column gets a cell: the coerced supplied
    /// value, or a null of the column type when the name is absent.
    pub fn insert(&mut self, values: &BTreeMap<String, Literal>) {
        let row = self
            .columns
            .iter()
            .map(|col| {
                let value = match values.get(&col.name) {
                    Some(raw) => coerce(col.datatype, raw),
                    None => Value::Null(col.datatype),
                };
                (col.name.clone(), value)
            })
            .collect::<Row>();
        self.rows.push(row);
        tracing::debug!(table = %self.name, rows = self.rows.len(), "inserted row");
    }

    /// Rows matching the predicate, in storage order
    pub fn select<F>(&self, predicate: F) -> Result<Vec<&Row>>
    where
        F: Fn(&Row) -> Result<bool>,
    {
        let mut rows = Vec::new();
        for row in self.rows.iter() {
            if predicate(row)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Overwrites the supplied cells of every matching row. Names that are not
    /// columns of this table are ignored. Returns the number of matched rows.
    pub fn update<F>(&mut self, predicate: F, values: &BTreeMap<String, Literal>) -> Result<usize>
    where
        F: Fn(&Row) -> Result<bool>,
    {
        // Evaluate everything before touching a row, so a failing predicate changes nothing
        let matched = self.matches(&predicate)?;

        let updates = values
            .iter()
            .filter_map(|(name, raw)| {
                self.get_column(name)
                    .map(|col| (col.name.clone(), coerce(col.datatype, raw)))
            })
            .collect::<Vec<_>>();

        let mut count = 0;
        for (row, hit) in self.rows.iter_mut().zip(matched) {
            if !hit {
                continue;
            }
            for (name, value) in updates.iter() {
                match row.get_mut(name) {
                    Some(cell) => *cell = value.clone(),
                    None => row.set(name.clone(), value.clone()),
                }
            }
            count += 1;
        }
        tracing::debug!(table = %self.name, count, "updated rows");
        Ok(count)
    }

    /// Removes every matching row, returning how many were removed
    pub fn delete<F>(&mut self, predicate: F) -> Result<usize>
    where
        F: Fn(&Row) -> Result<bool>,
    {
        let matched = self.matches(&predicate)?;
        let before = self.rows.len();
        let mut hits = matched.into_iter();
        self.rows.retain(|_| !hits.next().unwrap_or(false));
        let count = before - self.rows.len();
        tracing::debug!(table = %self.name, count, "deleted rows");
        Ok(count)
    }

    /// Appends a column to the schema and backfills a null cell on every row
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.get_column(&column.name).is_some() {
            return Err(Error::Storage(format!(
                "column {} already exists in table {}",
                column.name, self.name
            )));
        }
        for row in self.rows.iter_mut() {
            row.set(column.name.clone(), Value::Null(column.datatype));
        }
        tracing::debug!(table = %self.name, column = %column.name, "added column");
        self.columns.push(column);
        Ok(())
    }

    fn matches<F>(&self, predicate: &F) -> Result<Vec<bool>>
    where
        F: Fn(&Row) -> Result<bool>,
    {
        self.rows.iter().map(predicate).collect()
    }
}

/// Converts a raw value to the declared column type.
///
/// A value that does not convert is kept as its textual form tagged STRING.
/// Booleans parse "true" case-insensitively and treat any other text as false.
pub fn coerce(datatype: DataType, raw: &Literal) -> Value {
    let coerced = match (datatype, raw) {
        (dt, Literal::Null) => Some(Value::Null(dt)),
        (DataType::Integer, Literal::Integer(i)) => Some(Value::Integer(*i)),
        (DataType::Integer, Literal::Double(d)) => Some(Value::Integer(*d as i64)),
        (DataType::Integer, Literal::String(s)) => s.parse().ok().map(Value::Integer),
        (DataType::Integer, Literal::Boolean(_)) => None,
        (DataType::Double, Literal::Integer(i)) => Some(Value::Double(*i as f64)),
        (DataType::Double, Literal::Double(d)) => Some(Value::Double(*d)),
        (DataType::Double, Literal::String(s)) => s.trim().parse().ok().map(Value::Double),
        (DataType::Double, Literal::Boolean(_)) => None,
        (DataType::Boolean, Literal::Boolean(b)) => Some(Value::Boolean(*b)),
        (DataType::Boolean, other) => Some(Value::Boolean(
            other.to_string().eq_ignore_ascii_case("true"),
        )),
        (DataType::String, other) => Some(Value::String(other.to_string())),
    };
    coerced.unwrap_or_else(|| {
        tracing::debug!(%raw, %datatype, "value does not convert, stored as STRING");
        Value::String(raw.to_string())
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{Table, coerce};
    use crate::{
        error::{Error, Result},
        sql::{
            parser::ast::Literal,
            schema::Column,
            types::{DataType, Operator, Row, Value},
        },
    };

    fn people() -> Result<Table> {
        let mut table = Table::new(
            "people",
            vec![
                Column::new("id", DataType::Integer).primary_key(),
                Column::new("name", DataType::String),
                Column::new("age", DataType::Integer),
            ],
        )?;
        for (id, name, age) in [(1, "ann", 31), (2, "bob", 25), (3, "cid", 40)] {
            table.insert(&values(&[
                ("id", Literal::Integer(id)),
                ("name", name.into()),
                ("age", Literal::Integer(age)),
            ]));
        }
        Ok(table)
    }

    fn values(pairs: &[(&str, Literal)]) -> BTreeMap<String, Literal> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn id_is(id: i64) -> impl Fn(&Row) -> Result<bool> {
        move |row| match row.get("id") {
            Some(v) => v.compare(Operator::Eq, Some(&Value::Integer(id))),
            None => Ok(false),
        }
    }

    #[test]
    fn test_new_validates_schema() {
        assert!(Table::new("t", vec![]).is_err());
        assert_eq!(
            Table::new(
                "t",
                vec![
                    Column::new("a", DataType::Integer),
                    Column::new("a", DataType::String)
                ]
            ),
            Err(Error::Storage("duplicate column a in table t".into()))
        );
    }

    #[test]
    fn test_insert_fills_missing_with_null() -> Result<()> {
        let mut table = people()?;
        table.insert(&values(&[("id", Literal::Integer(4))]));
        let row = &table.rows()[3];
        assert_eq!(row.get("id"), Some(&Value::Integer(4)));
        assert_eq!(row.get("name"), Some(&Value::Null(DataType::String)));
        assert_eq!(row.get("age"), Some(&Value::Null(DataType::Integer)));
        assert_eq!(row.cells().len(), 3);
        Ok(())
    }

    #[test]
    fn test_insert_does_not_enforce_primary_key() -> Result<()> {
        let mut table = people()?;
        table.insert(&values(&[("id", Literal::Integer(1))]));
        assert_eq!(table.select(id_is(1))?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_update_in_place() -> Result<()> {
        let mut table = people()?;
        let count = table.update(
            id_is(2),
            &values(&[("name", "zed".into()), ("unknown", Literal::Integer(9))]),
        )?;
        assert_eq!(count, 1);
        assert_eq!(table.rows()[1].get("name"), Some(&Value::String("zed".into())));
        assert_eq!(table.rows()[1].get("unknown"), None);
        assert_eq!(table.rows()[0].get("name"), Some(&Value::String("ann".into())));
        Ok(())
    }

    #[test]
    fn test_update_error_changes_nothing() -> Result<()> {
        let mut table = people()?;
        let bad = |row: &Row| match row.get("name") {
            Some(v) => v.compare(Operator::Eq, Some(&Value::Integer(1))),
            None => Ok(false),
        };
        assert!(table.update(bad, &values(&[("age", Literal::Integer(0))])).is_err());
        assert!(table.delete(bad).is_err());
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.rows()[0].get("age"), Some(&Value::Integer(31)));
        Ok(())
    }

    #[test]
    fn test_delete() -> Result<()> {
        let mut table = people()?;
        let older = |row: &Row| match row.get("age") {
            Some(v) => v.compare(Operator::Gt, Some(&Value::Integer(30))),
            None => Ok(false),
        };
        assert_eq!(table.delete(older)?, 2);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0].get("name"), Some(&Value::String("bob".into())));
        assert_eq!(table.delete(older)?, 0);
        Ok(())
    }

    #[test]
    fn test_add_column_backfills_nulls() -> Result<()> {
        let mut table = people()?;
        table.add_column(Column::new("active", DataType::Boolean))?;
        assert_eq!(table.columns().len(), 4);
        for row in table.rows() {
            assert_eq!(row.get("active"), Some(&Value::Null(DataType::Boolean)));
        }
        assert!(table.add_column(Column::new("name", DataType::String)).is_err());
        Ok(())
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(DataType::Integer, &"42".into()), Value::Integer(42));
        assert_eq!(coerce(DataType::Integer, &Literal::Double(2.9)), Value::Integer(2));
        assert_eq!(coerce(DataType::Double, &Literal::Integer(3)), Value::Double(3.0));
        assert_eq!(coerce(DataType::Double, &" 1.25 ".into()), Value::Double(1.25));
        assert_eq!(coerce(DataType::Boolean, &"TRUE".into()), Value::Boolean(true));
        assert_eq!(coerce(DataType::Boolean, &"yes".into()), Value::Boolean(false));
        assert_eq!(coerce(DataType::String, &Literal::Double(2.0)), Value::String("2.0".into()));
        assert_eq!(coerce(DataType::String, &Literal::Boolean(true)), Value::String("true".into()));
        assert_eq!(coerce(DataType::Double, &Literal::Null), Value::Null(DataType::Double));
    }

    #[test]
    fn test_coerce_falls_back_to_string() {
        assert_eq!(coerce(DataType::Integer, &"abc".into()), Value::String("abc".into()));
        assert_eq!(coerce(DataType::Integer, &"1.5".into()), Value::String("1.5".into()));
        assert_eq!(coerce(DataType::Double, &Literal::Boolean(false)), Value::String("false".into()));
    }
}
