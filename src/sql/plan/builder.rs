use crate::{
    error::{Error, Result},
    sql::{
        parser::{ast::OrderDirection, query::QueryParser},
        plan::{OrderSpec, Query},
        types::Row,
    },
    storage::database::Database,
};

/// Fluent construction of a [`Query`].
///
/// The builder renders query text and hands it to [`QueryParser`], so a built
/// query behaves exactly like the equivalent hand-written SELECT.
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    database: &'a Database,
    columns: Vec<String>,
    table_name: Option<String>,
    where_parts: Vec<String>,
    order_by: Vec<OrderSpec>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(database: &'a Database) -> Self {
        Self {
            database,
            columns: Vec::new(),
            table_name: None,
            where_parts: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Adds projected columns, skipping blank names
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns.extend(
            columns
                .into_iter()
                .map(|c| c.as_ref().trim().to_string())
                .filter(|c| !c.is_empty()),
        );
        self
    }

    /// Projects every column, dropping earlier `select` calls
    pub fn select_all(mut self) -> Self {
        self.columns.clear();
        self
    }

    pub fn from(mut self, table_name: &str) -> Self {
        self.table_name = Some(table_name.to_string());
        self
    }

    /// Adds a raw condition, joined to earlier ones with AND
    pub fn where_(self, condition: &str) -> Self {
        self.push_condition(None, condition)
    }

    pub fn and(self, condition: &str) -> Self {
        self.push_condition(Some("AND"), condition)
    }

    pub fn or(self, condition: &str) -> Self {
        self.push_condition(Some("OR"), condition)
    }

    fn push_condition(mut self, connective: Option<&str>, condition: &str) -> Self {
        let condition = condition.trim();
        if condition.is_empty() {
            return self;
        }
        let part = match connective {
            None if self.where_parts.is_empty() => condition.to_string(),
            None => format!("AND {}", condition),
            Some(connective) => format!("{} {}", connective, condition),
        };
        self.where_parts.push(part);
        self
    }

    pub fn order_by(mut self, column: &str, asc: bool) -> Self {
        let direction = if asc {
            OrderDirection::Asc
        } else {
            OrderDirection::Desc
        };
        self.order_by.push(OrderSpec::new(column, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Renders the query text the builder stands for
    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(self.table_name.as_deref().unwrap_or(""));

        if !self.where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_parts.join(" "));
        }

        if !self.order_by.is_empty() {
            let keys = self
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.column, if o.is_asc() { "ASC" } else { "DESC" }))
                .collect::<Vec<_>>();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = self.offset.filter(|o| *o > 0) {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }
        sql
    }

    pub fn build(&self) -> Result<Query<'a, Row>> {
        if self
            .table_name
            .as_deref()
            .is_none_or(|name| name.trim().is_empty())
        {
            return Err(Error::Query("FROM table is required".into()));
        }
        let mut query = QueryParser::new().parse(&self.to_sql(), self.database)?;
        // The text form only carries OFFSET next to a LIMIT
        if self.limit.is_none() {
            query.offset = self.offset.filter(|o| *o > 0);
        }
        Ok(query)
    }

    /// Builds the query with a custom result mapper
    pub fn build_with<T>(&self, mapper: impl Fn(&Row) -> T + 'a) -> Result<Query<'a, T>> {
        Ok(self.build()?.map(mapper))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::QueryBuilder;
    use crate::{
        error::{Error, Result},
        sql::{
            parser::ast::Literal,
            schema::Column,
            types::{DataType, Value},
        },
        storage::database::Database,
    };

    fn database() -> Result<Database> {
        let mut db = Database::new();
        db.create_table(
            "users",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("name", DataType::String),
            ],
        )?;
        for (id, name) in [(1, "ann"), (2, "bob")] {
            let values = BTreeMap::from([
                ("id".to_string(), Literal::Integer(id)),
                ("name".to_string(), Literal::from(name)),
            ]);
            db.insert("users", &values)?;
        }
        Ok(db)
    }

    #[test]
    fn test_to_sql() -> Result<()> {
        let db = database()?;
        let builder = QueryBuilder::new(&db)
            .select(["id", " ", "name "])
            .from("users")
            .where_("id > 0")
            .where_("name != 'x'")
            .or("id = 7")
            .order_by("name", false)
            .order_by("id", true)
            .limit(10)
            .offset(5);
        assert_eq!(
            builder.to_sql(),
            "SELECT id, name FROM users WHERE id > 0 AND name != 'x' OR id = 7 \
             ORDER BY name DESC, id ASC LIMIT 10 OFFSET 5"
        );

        let builder = QueryBuilder::new(&db).select(["id"]).select_all().from("users").offset(0).limit(3);
        assert_eq!(builder.to_sql(), "SELECT * FROM users LIMIT 3");
        Ok(())
    }

    #[test]
    fn test_build() -> Result<()> {
        let db = database()?;
        let query = QueryBuilder::new(&db)
            .from("users")
            .where_("name = 'bob'")
            .offset(1)
            .build()?;
        assert_eq!(query.table.map(|t| t.name()), Some("users"));
        assert_eq!(query.limit, None);
        assert_eq!(query.offset, Some(1));

        let query = QueryBuilder::new(&db)
            .from("users")
            .build_with(|row| row.get("id").cloned())?;
        let table = query.table.ok_or(Error::Internal("no table".into()))?;
        assert_eq!((query.mapper)(&table.rows()[0]), Some(Value::Integer(1)));
        Ok(())
    }

    #[test]
    fn test_build_requires_table() -> Result<()> {
        let db = database()?;
        assert_eq!(
            QueryBuilder::new(&db).select(["id"]).build().unwrap_err(),
            Error::Query("FROM table is required".into())
        );
        assert_eq!(
            QueryBuilder::new(&db).from("nope").build().unwrap_err(),
            Error::Query("Table not found: nope".into())
        );
        Ok(())
    }
}
