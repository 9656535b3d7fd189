use crate::{
    error::Result,
    sql::{
        executor::{Executor, ResultSet},
        parser::Parser,
    },
    storage::database::Database,
};

/// A statement session over one in-memory database
#[derive(Debug, Default)]
pub struct Session {
    db: Database,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session over an existing database
    pub fn with_database(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    /// Executes a single statement
    pub fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        let stmt = Parser::new(sql).parse()?;
        tracing::debug!(?stmt, "executing statement");
        <dyn Executor>::build(stmt).execute(&mut self.db)
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::{
        error::{Error, Result},
        sql::{
            executor::{ResultSet, agg::AggregateValue},
            types::{DataType, Value},
        },
    };

    fn scores() -> Result<Session> {
        let mut s = Session::new();
        s.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name STRING, score DOUBLE);")?;
        s.execute("INSERT INTO t VALUES (1, 'a', 1.5), (2, 'b', 2.5), (3, 'c', NULL);")?;
        Ok(s)
    }

    fn scan(rs: ResultSet) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        match rs {
            ResultSet::Scan { columns, rows } => Ok((columns, rows)),
            other => Err(Error::Internal(format!("expected a scan, got {:?}", other))),
        }
    }

    #[test]
    fn test_filtered_ordered_select() -> Result<()> {
        let mut s = scores()?;
        let (columns, rows) = scan(s.execute("SELECT name FROM t WHERE score >= 2.0 ORDER BY score DESC")?)?;
        assert_eq!(columns, vec!["name".to_string()]);
        assert_eq!(rows, vec![vec![Value::String("b".into())]]);

        let (columns, rows) = scan(s.execute("select * from t order by id desc limit 1, 1")?)?;
        assert_eq!(columns.len(), 3);
        assert_eq!(rows[0][0], Value::Integer(2));
        assert_eq!(rows.len(), 1);
        Ok(())
    }

    #[test]
    fn test_aggregates() -> Result<()> {
        let mut s = scores()?;
        let value = |rs: ResultSet| match rs {
            ResultSet::Aggregate { value, .. } => Some(value),
            _ => None,
        };
        assert_eq!(value(s.execute("AGG t AVG(score)")?).map(|v| v.to_string()), Some("2.0".into()));
        assert_eq!(value(s.execute("AGG t COUNT(*)")?), Some(AggregateValue::Count(3)));
        assert_eq!(value(s.execute("AGG t COUNT(score)")?), Some(AggregateValue::Count(2)));
        assert_eq!(
            value(s.execute("AGG t MAX(id) WHERE score < 2")?),
            Some(AggregateValue::Value(Some(Value::Integer(1))))
        );
        assert_eq!(s.execute("AGG t SUM(score)")?.to_string(), "SUM(score) = 4.0");
        assert!(s.execute("AGG t AVG(missing)").is_err());
        Ok(())
    }

    #[test]
    fn test_update_then_select() -> Result<()> {
        let mut s = scores()?;
        assert_eq!(
            s.execute("UPDATE t SET name = 'z' WHERE id = 2;")?,
            ResultSet::Update { count: 1 }
        );
        let (_, rows) = scan(s.execute("SELECT name FROM t WHERE id = 2")?)?;
        assert_eq!(rows, vec![vec![Value::String("z".into())]]);

        assert_eq!(s.execute("DELETE FROM t WHERE name = 'z'")?, ResultSet::Delete { count: 1 });
        let (_, rows) = scan(s.execute("SELECT id FROM t")?)?;
        assert_eq!(rows, vec![vec![Value::Integer(1)], vec![Value::Integer(3)]]);
        Ok(())
    }

    #[test]
    fn test_left_join_with_empty_table() -> Result<()> {
        let mut s = scores()?;
        s.execute("CREATE TABLE e (id INTEGER, note TEXT)")?;
        let (columns, rows) = scan(s.execute("JOIN t e ON id = id LEFT")?)?;
        assert_eq!(columns, vec!["t.id", "t.name", "t.score", "e.id", "e.note"]);
        assert_eq!(rows.len(), 3);
        for row in rows.iter() {
            assert_eq!(row[3], Value::Null(DataType::Integer));
            assert_eq!(row[4], Value::Null(DataType::String));
        }
        let (_, rows) = scan(s.execute("JOIN t e ON id = id")?)?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[test]
    fn test_and_or_evaluate_left_to_right() -> Result<()> {
        let mut s = Session::new();
        s.execute("CREATE TABLE f (a INT, b INT, c INT)")?;
        s.execute("INSERT INTO f VALUES (0, 0, 3), (1, 2, 0), (1, 0, 0)")?;
        let (_, rows) = scan(s.execute("SELECT a, b, c FROM f WHERE a = 1 AND b = 2 OR c = 3")?)?;
        assert_eq!(rows.len(), 2);
        // (a = 1 OR b = 2) AND c = 3 when read left to right
        let (_, rows) = scan(s.execute("SELECT c FROM f WHERE a = 1 OR b = 2 AND c = 3")?)?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[test]
    fn test_schema_statements() -> Result<()> {
        let mut s = scores()?;
        s.execute("ALTER TABLE t ADD COLUMN active BOOLEAN")?;
        assert_eq!(
            s.execute("DESCRIBE t")?.to_string(),
            "Table: t\nColumns:\n  id : INTEGER (PK)\n  name : STRING\n  score : DOUBLE\n  active : BOOLEAN\nRows: 3"
        );
        s.execute("CREATE TABLE a (x INT)")?;
        assert_eq!(s.execute("TABLES")?.to_string(), "a\nt");
        assert_eq!(s.execute("DROP TABLE a")?.to_string(), "Dropped table: a");
        assert_eq!(s.database().list_tables(), vec!["t".to_string()]);
        Ok(())
    }

    #[test]
    fn test_errors() -> Result<()> {
        let mut s = scores()?;
        assert!(matches!(s.execute("SELECT nope FROM t"), Err(Error::Query(_))));
        assert!(matches!(s.execute("SELECT * FROM missing"), Err(Error::Query(_))));
        assert!(matches!(s.execute("SELECT * FROM t WHERE name > 1"), Err(Error::Query(_))));
        assert!(matches!(s.execute("SELECT * FROM t LIMIT -1"), Err(Error::Query(_))));
        assert!(matches!(s.execute("DROP TABLE missing"), Err(Error::Storage(_))));
        assert!(s.execute("FROB t").is_err());
        // A failed statement leaves the data untouched
        assert_eq!(s.database().get_table("t")?.rows().len(), 3);
        Ok(())
    }
}
