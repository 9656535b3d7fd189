use std::collections::BTreeMap;

use crate::{
    error::{Error, Result},
    sql::{parser::ast::Literal, schema::Column},
    storage::table::Table,
};

/// The set of named tables of one process
#[derive(Debug, Default)]
pub struct Database {
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table, failing if the name is taken
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(Error::Storage(format!("Table {} already exists", name)));
        }
        let table = Table::new(name, columns)?;
        self.tables.insert(name.to_string(), table);
        tracing::debug!(table = name, "created table");
        Ok(())
    }

    /// Drops a table, returning it
    pub fn drop_table(&mut self, name: &str) -> Result<Table> {
        let table = self
            .tables
            .remove(name)
            .ok_or(Error::Storage(format!("No table named {}", name)))?;
        tracing::debug!(table = name, "dropped table");
        Ok(table)
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or(Error::Storage(format!("No table named {}", name)))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or(Error::Storage(format!("No table named {}", name)))
    }

    /// Table names in sorted order
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn insert(&mut self, table_name: &str, values: &BTreeMap<String, Literal>) -> Result<()> {
        self.get_table_mut(table_name)?.insert(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::Database;
    use crate::{
        error::{Error, Result},
        sql::{parser::ast::Literal, schema::Column, types::DataType},
    };

    #[test]
    fn test_table_lifecycle() -> Result<()> {
        let mut db = Database::new();
        db.create_table("b", vec![Column::new("id", DataType::Integer)])?;
        db.create_table("a", vec![Column::new("id", DataType::Integer)])?;
        assert_eq!(db.list_tables(), vec!["a".to_string(), "b".to_string()]);

        assert_eq!(
            db.create_table("a", vec![Column::new("x", DataType::String)]),
            Err(Error::Storage("Table a already exists".into()))
        );

        let mut values = BTreeMap::new();
        values.insert("id".to_string(), Literal::Integer(7));
        db.insert("a", &values)?;
        assert_eq!(db.get_table("a")?.rows().len(), 1);

        let dropped = db.drop_table("a")?;
        assert_eq!(dropped.name(), "a");
        assert!(db.get_table("a").is_err());
        assert!(db.drop_table("a").is_err());
        assert!(db.insert("a", &values).is_err());
        assert_eq!(db.list_tables(), vec!["b".to_string()]);
        Ok(())
    }
}
