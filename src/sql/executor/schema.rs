use crate::{
    error::Result,
    sql::{
        executor::{Executor, ResultSet},
        schema::Column,
    },
    storage::{
        csv::{self, CsvOptions},
        database::Database,
    },
};

/// CREATE TABLE executor
pub struct CreateTable {
    name: String,
    columns: Vec<Column>,
}

impl CreateTable {
    pub fn new(name: String, columns: Vec<Column>) -> Box<Self> {
        Box::new(Self { name, columns })
    }
}

impl Executor for CreateTable {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        db.create_table(&self.name, self.columns)?;
        Ok(ResultSet::CreateTable {
            table_name: self.name,
        })
    }
}

/// ALTER TABLE ... ADD COLUMN executor
pub struct AddColumn {
    table_name: String,
    column: Column,
}

impl AddColumn {
    pub fn new(table_name: String, column: Column) -> Box<Self> {
        Box::new(Self { table_name, column })
    }
}

impl Executor for AddColumn {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        db.get_table_mut(&self.table_name)?
            .add_column(self.column.clone())?;
        Ok(ResultSet::AddColumn {
            table_name: self.table_name,
            column: self.column,
        })
    }
}

/// DROP TABLE executor
pub struct DropTable {
    name: String,
}

impl DropTable {
    pub fn new(name: String) -> Box<Self> {
        Box::new(Self { name })
    }
}

impl Executor for DropTable {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        db.drop_table(&self.name)?;
        Ok(ResultSet::DropTable {
            table_name: self.name,
        })
    }
}

/// TABLES executor
pub struct ShowTables;

impl ShowTables {
    pub fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Executor for ShowTables {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        Ok(ResultSet::Tables {
            names: db.list_tables(),
        })
    }
}

/// DESCRIBE executor
pub struct Describe {
    table_name: String,
}

impl Describe {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl Executor for Describe {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let table = db.get_table(&self.table_name)?;
        Ok(ResultSet::Describe {
            columns: table.columns().to_vec(),
            rows: table.rows().len(),
            table_name: self.table_name,
        })
    }
}

/// LOAD executor: reads a CSV file into a new table
pub struct Load {
    table_name: String,
    path: String,
    delimiter: Option<char>,
}

impl Load {
    pub fn new(table_name: String, path: String, delimiter: Option<char>) -> Box<Self> {
        Box::new(Self {
            table_name,
            path,
            delimiter,
        })
    }
}

impl Executor for Load {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let options = CsvOptions {
            delimiter: self.delimiter,
        };
        let count = csv::load(db, &self.table_name, &self.path, &options)?;
        Ok(ResultSet::Load {
            table_name: self.table_name,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AddColumn, CreateTable, Describe, DropTable, Load, ShowTables};
    use crate::{
        error::Result,
        sql::{
            executor::{Executor, ResultSet},
            schema::Column,
            types::{DataType, Value},
        },
        storage::database::Database,
    };

    #[test]
    fn test_table_lifecycle() -> Result<()> {
        let mut db = Database::new();
        let columns = vec![Column::new("id", DataType::Integer).primary_key()];
        assert_eq!(
            CreateTable::new("t".into(), columns.clone()).execute(&mut db)?,
            ResultSet::CreateTable {
                table_name: "t".into()
            }
        );
        assert!(CreateTable::new("t".into(), columns).execute(&mut db).is_err());

        let column = Column::new("name", DataType::String);
        AddColumn::new("t".into(), column.clone()).execute(&mut db)?;
        assert!(AddColumn::new("t".into(), column).execute(&mut db).is_err());

        match Describe::new("t".into()).execute(&mut db)? {
            ResultSet::Describe { columns, rows, .. } => {
                assert_eq!(columns.len(), 2);
                assert_eq!(columns[1].name, "name");
                assert_eq!(rows, 0);
            }
            other => panic!("unexpected result {:?}", other),
        }

        assert_eq!(
            ShowTables::new().execute(&mut db)?,
            ResultSet::Tables {
                names: vec!["t".into()]
            }
        );
        DropTable::new("t".into()).execute(&mut db)?;
        assert!(DropTable::new("t".into()).execute(&mut db).is_err());
        assert!(Describe::new("t".into()).execute(&mut db).is_err());
        Ok(())
    }

    #[test]
    fn test_load() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "id;city\n1;Oslo\n2;Lima\n")?;
        file.flush()?;
        let path = file.path().to_string_lossy().to_string();

        let mut db = Database::new();
        let rs = Load::new("cities".into(), path.clone(), None).execute(&mut db)?;
        assert_eq!(rs.to_string(), "Loaded 2 row(s) into table 'cities'");
        let table = db.get_table("cities")?;
        assert_eq!(table.rows()[1].get("city"), Some(&Value::String("Lima".into())));

        // Forcing a comma keeps each line as a single column
        Load::new("raw".into(), path, Some(',')).execute(&mut db)?;
        assert_eq!(db.get_table("raw")?.columns()[0].name, "id;city");
        Ok(())
    }
}
