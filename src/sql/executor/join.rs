use crate::{
    error::Result,
    sql::{
        executor::{Executor, ResultSet},
        parser::ast::JoinType,
        types::{Operator, Row, Value},
    },
    storage::{database::Database, table::Table},
};

/// One joined pair. The side without a match in an outer join is None.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowPair<'a> {
    pub left: Option<&'a Row>,
    pub right: Option<&'a Row>,
}

/// Nested-loop joins between two tables
pub struct Join;

impl Join {
    /// Joins every left row against every right row.
    ///
    /// INNER emits the matching pairs. LEFT additionally emits a pair with no
    /// right side for each left row that matched nothing, and RIGHT is the
    /// mirror image with the right table as the outer loop.
    pub fn join<'a, F>(
        left: &'a Table,
        right: &'a Table,
        join_type: JoinType,
        on: F,
    ) -> Result<Vec<RowPair<'a>>>
    where
        F: Fn(&Row, &Row) -> Result<bool>,
    {
        let mut pairs = Vec::new();
        match join_type {
            JoinType::Inner => {
                for l in left.rows() {
                    for r in right.rows() {
                        if on(l, r)? {
                            pairs.push(RowPair {
                                left: Some(l),
                                right: Some(r),
                            });
                        }
                    }
                }
            }
            JoinType::Left => {
                for l in left.rows() {
                    let before = pairs.len();
                    for r in right.rows() {
                        if on(l, r)? {
                            pairs.push(RowPair {
                                left: Some(l),
                                right: Some(r),
                            });
                        }
                    }
                    if pairs.len() == before {
                        pairs.push(RowPair {
                            left: Some(l),
                            right: None,
                        });
                    }
                }
            }
            JoinType::Right => {
                for r in right.rows() {
                    let before = pairs.len();
                    for l in left.rows() {
                        if on(l, r)? {
                            pairs.push(RowPair {
                                left: Some(l),
                                right: Some(r),
                            });
                        }
                    }
                    if pairs.len() == before {
                        pairs.push(RowPair {
                            left: None,
                            right: Some(r),
                        });
                    }
                }
            }
        }
        tracing::debug!(
            left = left.name(),
            right = right.name(),
            %join_type,
            pairs = pairs.len(),
            "joined tables"
        );
        Ok(pairs)
    }

    /// Equality of `left_column` on the left row and `right_column` on the
    /// right row. A null or missing cell on either side never matches.
    pub fn eq(left_column: &str, right_column: &str) -> impl Fn(&Row, &Row) -> Result<bool> {
        let (left_column, right_column) = (left_column.to_string(), right_column.to_string());
        move |l, r| match (l.get(&left_column), r.get(&right_column)) {
            (Some(lv), Some(rv)) if !lv.is_null() && !rv.is_null() => {
                lv.compare(Operator::Eq, Some(rv))
            }
            _ => Ok(false),
        }
    }
}

/// JOIN statement executor: an equality join rendered as a scan with
/// `table.column` headers
pub struct NestedLoopJoin {
    left: String,
    right: String,
    left_column: String,
    right_column: String,
    join_type: JoinType,
}

impl NestedLoopJoin {
    pub fn new(
        left: String,
        right: String,
        left_column: String,
        right_column: String,
        join_type: JoinType,
    ) -> Box<Self> {
        Box::new(Self {
            left,
            right,
            left_column,
            right_column,
            join_type,
        })
    }
}

/// Cells of one side in schema order, typed nulls when the side is absent
fn side_cells(table: &Table, row: Option<&Row>) -> Vec<Value> {
    table
        .columns()
        .iter()
        .map(|col| {
            row.and_then(|r| r.get(&col.name))
                .cloned()
                .unwrap_or(Value::Null(col.datatype))
        })
        .collect()
}

impl Executor for NestedLoopJoin {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let left = db.get_table(&self.left)?;
        let right = db.get_table(&self.right)?;
        let pairs = Join::join(
            left,
            right,
            self.join_type,
            Join::eq(&self.left_column, &self.right_column),
        )?;

        let columns = [left, right]
            .iter()
            .flat_map(|t| t.columns().iter().map(move |c| format!("{}.{}", t.name(), c.name)))
            .collect();
        let rows = pairs
            .iter()
            .map(|pair| {
                let mut cells = side_cells(left, pair.left);
                cells.extend(side_cells(right, pair.right));
                cells
            })
            .collect();
        Ok(ResultSet::Scan { columns, rows })
    }
}
