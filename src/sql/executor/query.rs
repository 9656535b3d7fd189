use std::cmp::Ordering;

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet},
        parser::{ast::Predicate, query::QueryParser},
        plan::{OrderSpec, Query},
        types::Row,
    },
    storage::{database::Database, table::Table},
};

/// Runs a [`Query`] against the live rows of its table:
/// filter, then sort, then paginate, then map.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn execute<T>(&self, query: &Query<'_, T>) -> Result<Vec<T>> {
        let table = query
            .table
            .ok_or(Error::Query("Query has no table".into()))?;
        let rows = pipeline(table, query).execute()?;
        tracing::debug!(table = table.name(), rows = rows.len(), "executed query");
        Ok(rows.into_iter().map(|row| (query.mapper)(row)).collect())
    }
}

/// One step of the SELECT pipeline, pulling rows from its source
trait Stage<'a> {
    fn execute(self: Box<Self>) -> Result<Vec<&'a Row>>;
}

/// Chains the stages a query needs, innermost first
fn pipeline<'a, T>(table: &'a Table, query: &'a Query<'_, T>) -> Box<dyn Stage<'a> + 'a> {
    let mut stage: Box<dyn Stage<'a> + 'a> = Scan::new(table, &query.filter);
    if !query.order_by.is_empty() {
        stage = Order::new(stage, &query.order_by);
    }
    if query.limit.is_some() || query.offset.is_some() {
        stage = Paginate::new(stage, query.limit, query.offset);
    }
    stage
}

/// Full table scan keeping the rows that satisfy the filter, in storage order
struct Scan<'a> {
    table: &'a Table,
    filter: &'a Predicate,
}

impl<'a> Scan<'a> {
    fn new(table: &'a Table, filter: &'a Predicate) -> Box<Self> {
        Box::new(Self { table, filter })
    }
}

impl<'a> Stage<'a> for Scan<'a> {
    fn execute(self: Box<Self>) -> Result<Vec<&'a Row>> {
        let filter = self.filter;
        self.table.select(|row| filter.evaluate(row))
    }
}

/// ORDER BY - stable multi-key sort
struct Order<'a> {
    source: Box<dyn Stage<'a> + 'a>,
    order_by: &'a [OrderSpec],
}

impl<'a> Order<'a> {
    fn new(source: Box<dyn Stage<'a> + 'a>, order_by: &'a [OrderSpec]) -> Box<Self> {
        Box::new(Self { source, order_by })
    }
}

impl<'a> Stage<'a> for Order<'a> {
    fn execute(self: Box<Self>) -> Result<Vec<&'a Row>> {
        let rows = self.source.execute()?;
        let order_by = self.order_by;
        merge_sort(rows, &|a: &&Row, b: &&Row| compare_rows(a, b, order_by))
    }
}

/// Compares two rows key by key. Later keys only break ties of earlier ones,
/// and a descending key reverses its own result.
fn compare_rows(a: &Row, b: &Row, order_by: &[OrderSpec]) -> Result<Ordering> {
    for spec in order_by {
        let ordering = match (a.get(&spec.column), b.get(&spec.column)) {
            (Some(x), Some(y)) => x.order(y)?,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = if spec.is_asc() {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}

/// Stable top-down merge sort with a fallible comparator.
/// The first comparison error aborts the sort.
fn merge_sort<T, F>(mut items: Vec<T>, compare: &F) -> Result<Vec<T>>
where
    F: Fn(&T, &T) -> Result<Ordering>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare)?;
    let right = merge_sort(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        // Ties take from the left run
        let next = if compare(r, l)? == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

/// LIMIT/OFFSET. An offset past the end yields no rows.
struct Paginate<'a> {
    source: Box<dyn Stage<'a> + 'a>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl<'a> Paginate<'a> {
    fn new(source: Box<dyn Stage<'a> + 'a>, limit: Option<usize>, offset: Option<usize>) -> Box<Self> {
        Box::new(Self {
            source,
            limit,
            offset,
        })
    }
}

impl<'a> Stage<'a> for Paginate<'a> {
    fn execute(self: Box<Self>) -> Result<Vec<&'a Row>> {
        let rows = self.source.execute()?;
        let start = self.offset.unwrap_or(0);
        if start >= rows.len() {
            return Ok(Vec::new());
        }
        let end = self
            .limit
            .map_or(rows.len(), |limit| rows.len().min(start.saturating_add(limit)));
        Ok(rows[start..end].to_vec())
    }
}

/// SELECT statement executor: parses the text, runs it and projects the
/// selected columns
pub struct Select {
    query: String,
}

impl Select {
    pub fn new(query: String) -> Box<Self> {
        Box::new(Self { query })
    }
}

impl Executor for Select {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let database: &Database = db;
        let query = QueryParser::new().parse(&self.query, database)?;
        let columns = query.output_columns();
        if let Some(table) = query.table {
            if let Some(unknown) = columns.iter().find(|c| table.get_column(c).is_none()) {
                return Err(Error::Query(format!("Unknown column: {}", unknown)));
            }
        }
        let rows = QueryExecutor::new()
            .execute(&query)?
            .iter()
            .map(|row| row.project(&columns))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResultSet::Scan { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{QueryExecutor, merge_sort};
    use crate::{
        error::{Error, Result},
        sql::{
            parser::{
                ast::{Literal, OrderDirection, Predicate},
                query::QueryParser,
            },
            plan::{OrderSpec, Query},
            schema::Column,
            types::{DataType, Operator, Row, Value},
        },
        storage::{database::Database, table::Table},
    };

    fn scores() -> Result<Table> {
        let mut table = Table::new(
            "scores",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("team", DataType::String),
                Column::new("points", DataType::Double),
            ],
        )?;
        let rows: [(i64, &str, Literal); 6] = [
            (1, "red", Literal::Double(3.0)),
            (2, "blue", Literal::Double(5.5)),
            (3, "red", Literal::Null),
            (4, "blue", Literal::Double(3.0)),
            (5, "red", Literal::Double(5.5)),
            (6, "green", Literal::Double(1.0)),
        ];
        for (id, team, points) in rows {
            table.insert(&BTreeMap::from([
                ("id".to_string(), Literal::Integer(id)),
                ("team".to_string(), team.into()),
                ("points".to_string(), points),
            ]));
        }
        Ok(table)
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .filter_map(|row| match row.get("id") {
                Some(Value::Integer(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn query(table: &Table) -> Query<'_> {
        Query::new(table)
    }

    #[test]
    fn test_filter_partitions_rows() -> Result<()> {
        let table = scores()?;
        let mut q = query(&table);
        q.filter = Predicate::Compare {
            column: "team".into(),
            operator: Operator::Eq,
            value: Value::String("red".into()),
        };
        let kept = QueryExecutor::new().execute(&q)?;
        assert_eq!(ids(&kept), vec![1, 3, 5]);
        for row in table.rows() {
            assert_eq!(kept.contains(row), q.filter.evaluate(row)?);
        }
        Ok(())
    }

    #[test]
    fn test_sort_is_stable_multi_key() -> Result<()> {
        let table = scores()?;
        let mut q = query(&table);
        q.order_by = vec![OrderSpec::new("points", OrderDirection::Desc)];
        // Equal points keep storage order: 2 before 5, 1 before 4. Null sorts last
        // ascending, so first descending.
        assert_eq!(ids(&QueryExecutor::new().execute(&q)?), vec![3, 2, 5, 1, 4, 6]);

        q.order_by = vec![
            OrderSpec::new("team", OrderDirection::Asc),
            OrderSpec::new("points", OrderDirection::Asc),
        ];
        assert_eq!(ids(&QueryExecutor::new().execute(&q)?), vec![4, 2, 6, 1, 5, 3]);
        Ok(())
    }

    #[test]
    fn test_pagination_bounds() -> Result<()> {
        let table = scores()?;
        let executor = QueryExecutor::new();
        let page = |limit, offset| -> Result<Vec<i64>> {
            let mut q = query(&table);
            q.limit = limit;
            q.offset = offset;
            Ok(ids(&executor.execute(&q)?))
        };
        assert_eq!(page(Some(2), None)?, vec![1, 2]);
        assert_eq!(page(Some(2), Some(3))?, vec![4, 5]);
        assert_eq!(page(Some(10), Some(4))?, vec![5, 6]);
        assert_eq!(page(None, Some(4))?, vec![5, 6]);
        assert_eq!(page(Some(0), None)?, Vec::<i64>::new());
        assert_eq!(page(None, Some(6))?, Vec::<i64>::new());
        assert_eq!(page(Some(3), Some(100))?, Vec::<i64>::new());
        Ok(())
    }

    #[test]
    fn test_mapper_and_missing_table() -> Result<()> {
        let table = scores()?;
        let q = query(&table).map(|row| row.get("team").map(|v| v.to_string()));
        let teams = QueryExecutor::new().execute(&q)?;
        assert_eq!(teams.len(), 6);
        assert_eq!(teams[5], Some("green".to_string()));

        assert_eq!(
            QueryExecutor::new().execute(&Query::default()),
            Err(Error::Query("Query has no table".into()))
        );
        Ok(())
    }

    #[test]
    fn test_comparison_errors_propagate() -> Result<()> {
        let table = scores()?;
        let mut q = query(&table);
        q.filter = Predicate::Compare {
            column: "team".into(),
            operator: Operator::Gt,
            value: Value::Integer(1),
        };
        assert!(QueryExecutor::new().execute(&q).is_err());

        let failing = |a: &i64, b: &i64| {
            if *a == 3 || *b == 3 {
                Err(Error::Query("boom".into()))
            } else {
                Ok(a.cmp(b))
            }
        };
        assert!(merge_sort(vec![5, 3, 1], &failing).is_err());
        assert_eq!(merge_sort(vec![5, 4, 1, 2], &failing)?, vec![1, 2, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_left_to_right_connectives_end_to_end() -> Result<()> {
        let mut db = Database::new();
        db.create_table(
            "t",
            vec![
                Column::new("a", DataType::Integer),
                Column::new("b", DataType::Integer),
                Column::new("c", DataType::Integer),
            ],
        )?;
        for (a, b, c) in [(1, 2, 0), (0, 0, 3), (1, 0, 0), (0, 2, 3)] {
            db.insert(
                "t",
                &BTreeMap::from([
                    ("a".to_string(), Literal::Integer(a)),
                    ("b".to_string(), Literal::Integer(b)),
                    ("c".to_string(), Literal::Integer(c)),
                ]),
            )?;
        }
        let q = QueryParser::new().parse("SELECT * FROM t WHERE a=1 AND b=2 OR c=3", &db)?;
        let rows = QueryExecutor::new().execute(&q)?;
        // (0, 0, 3) satisfies only c=3 and is still included
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|r| r.get("b") == Some(&Value::Integer(0))
            && r.get("c") == Some(&Value::Integer(3))));
        Ok(())
    }
}
