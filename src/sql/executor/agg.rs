use std::{cmp::Ordering, fmt::Display, str::FromStr};

use bigdecimal::{BigDecimal, RoundingMode};

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet, query::QueryExecutor},
        parser::query::QueryParser,
        types::{Row, Value},
    },
    storage::database::Database,
};

/// Aggregate functions over an already filtered row sequence
pub struct Aggregator;

impl Aggregator {
    /// COUNT(*), nulls included
    pub fn count(rows: &[Row]) -> usize {
        rows.len()
    }

    /// COUNT(column): rows whose cell is present and non-null
    pub fn count_not_null(rows: &[Row], column: &str) -> usize {
        values(rows, column).count()
    }

    pub fn min(rows: &[Row], column: &str) -> Result<Option<Value>> {
        extreme(rows, column, Ordering::Less)
    }

    pub fn max(rows: &[Row], column: &str) -> Result<Option<Value>> {
        extreme(rows, column, Ordering::Greater)
    }

    /// Exact decimal sum of the non-null cells. Values that are not numbers
    /// and do not parse as one contribute zero.
    pub fn sum(rows: &[Row], column: &str) -> BigDecimal {
        values(rows, column).fold(BigDecimal::from(0), |acc, v| acc + to_decimal(v))
    }

    /// SUM over the non-null count, rounded half-up to the scale of the sum.
    /// Zero when no non-null value exists.
    pub fn avg(rows: &[Row], column: &str) -> BigDecimal {
        let count = Self::count_not_null(rows, column);
        if count == 0 {
            return BigDecimal::from(0);
        }
        let sum = Self::sum(rows, column);
        let (_, scale) = sum.as_bigint_and_exponent();
        (sum / BigDecimal::from(count as u64)).with_scale_round(scale, RoundingMode::HalfUp)
    }
}

fn values<'a>(rows: &'a [Row], column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    rows.iter()
        .filter_map(move |row| row.get(column))
        .filter(|v| !v.is_null())
}

/// First value that orders `wanted` against every other, ties keeping the earliest
fn extreme(rows: &[Row], column: &str, wanted: Ordering) -> Result<Option<Value>> {
    let mut best: Option<&Value> = None;
    for v in values(rows, column) {
        best = match best {
            Some(b) if v.order(b)? != wanted => Some(b),
            _ => Some(v),
        };
    }
    Ok(best.cloned())
}

/// Doubles go through their shortest text form so 0.1 sums as exactly 0.1.
/// NaN and infinities have no decimal value and count as zero.
fn to_decimal(value: &Value) -> BigDecimal {
    let parse = |s: &str| BigDecimal::from_str(s).unwrap_or_else(|_| BigDecimal::from(0));
    match value {
        Value::Integer(i) => BigDecimal::from(*i),
        Value::Double(d) if d.is_finite() => parse(&format!("{:?}", d)),
        Value::String(s) => parse(s.trim()),
        Value::Double(_) | Value::Boolean(_) | Value::Null(_) => BigDecimal::from(0),
    }
}

/// Result of one aggregate function
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateValue {
    Count(usize),
    Value(Option<Value>),
    Decimal(BigDecimal),
}

impl Display for AggregateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateValue::Count(n) => write!(f, "{}", n),
            AggregateValue::Value(Some(v)) => write!(f, "{}", v),
            AggregateValue::Value(None) => write!(f, "NULL"),
            AggregateValue::Decimal(d) => write!(f, "{}", d),
        }
    }
}

/// An aggregate function selected by name at runtime
pub trait Calculator {
    fn calc(&self, column: &str, rows: &[Row]) -> Result<AggregateValue>;
}

impl dyn Calculator {
    /// Runtime dispatch on the function name (case-insensitive)
    pub fn build(func_name: &str) -> Result<Box<dyn Calculator>> {
        Ok(match func_name.to_uppercase().as_ref() {
            "COUNT" => Count::new(),
            "SUM" => Sum::new(),
            "MIN" => Min::new(),
            "MAX" => Max::new(),
            "AVG" => Avg::new(),
            _ => {
                return Err(Error::Query(format!(
                    "Unknown aggregate: {} (use COUNT, MIN, MAX, SUM, AVG)",
                    func_name
                )));
            }
        })
    }
}

/// COUNT(*) counts rows, COUNT(column) non-null cells
pub struct Count;

impl Count {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Count {
    fn calc(&self, column: &str, rows: &[Row]) -> Result<AggregateValue> {
        Ok(AggregateValue::Count(if column == "*" {
            Aggregator::count(rows)
        } else {
            Aggregator::count_not_null(rows, column)
        }))
    }
}

pub struct Min;

impl Min {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Min {
    fn calc(&self, column: &str, rows: &[Row]) -> Result<AggregateValue> {
        Ok(AggregateValue::Value(Aggregator::min(rows, column)?))
    }
}

pub struct Max;

impl Max {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Max {
    fn calc(&self, column: &str, rows: &[Row]) -> Result<AggregateValue> {
        Ok(AggregateValue::Value(Aggregator::max(rows, column)?))
    }
}

pub struct Sum;

impl Sum {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Sum {
    fn calc(&self, column: &str, rows: &[Row]) -> Result<AggregateValue> {
        Ok(AggregateValue::Decimal(Aggregator::sum(rows, column)))
    }
}

pub struct Avg;

impl Avg {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Avg {
    fn calc(&self, column: &str, rows: &[Row]) -> Result<AggregateValue> {
        Ok(AggregateValue::Decimal(Aggregator::avg(rows, column)))
    }
}

/// AGG statement executor - one aggregate over an optionally filtered table
pub struct Aggregate {
    table_name: String,
    function: String,
    column: String,
    where_clause: Option<String>,
}

impl Aggregate {
    pub fn new(
        table_name: String,
        function: String,
        column: String,
        where_clause: Option<String>,
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            function,
            column,
            where_clause,
        })
    }
}

impl Executor for Aggregate {
    fn execute(self: Box<Self>, db: &mut Database) -> Result<ResultSet> {
        let calculator = <dyn Calculator>::build(&self.function)?;
        let table = db.get_table(&self.table_name)?;
        if self.column != "*" && table.get_column(&self.column).is_none() {
            return Err(Error::Query(format!("Unknown column: {}", self.column)));
        }

        let value = match &self.where_clause {
            Some(clause) => {
                let sql = format!("SELECT * FROM {} WHERE {}", self.table_name, clause);
                let query = QueryParser::new().parse(&sql, db)?;
                let rows = QueryExecutor::new().execute(&query)?;
                calculator.calc(&self.column, &rows)?
            }
            None => calculator.calc(&self.column, table.rows())?,
        };
        Ok(ResultSet::Aggregate {
            name: format!("{}({})", self.function.to_uppercase(), self.column),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, str::FromStr};

    use bigdecimal::BigDecimal;

    use super::{AggregateValue, Aggregator, Calculator};
    use crate::{
        error::{Error, Result},
        sql::{
            parser::ast::Literal,
            schema::Column,
            types::{DataType, Row, Value},
        },
        storage::table::Table,
    };

    fn table() -> Result<Table> {
        let mut table = Table::new(
            "t",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("name", DataType::String),
                Column::new("score", DataType::Double),
            ],
        )?;
        for (id, name, score) in [
            (1, "a", Literal::Double(1.5)),
            (2, "b", Literal::Double(2.5)),
            (3, "c", Literal::Null),
        ] {
            table.insert(&BTreeMap::from([
                ("id".to_string(), Literal::Integer(id)),
                ("name".to_string(), name.into()),
                ("score".to_string(), score),
            ]));
        }
        Ok(table)
    }

    fn dec(s: &str) -> Result<BigDecimal> {
        BigDecimal::from_str(s).map_err(|e| Error::Internal(e.to_string()))
    }

    fn doubles(values: &[f64]) -> Result<Table> {
        let mut t = Table::new("d", vec![Column::new("v", DataType::Double)])?;
        for v in values {
            t.insert(&BTreeMap::from([("v".to_string(), Literal::Double(*v))]));
        }
        Ok(t)
    }

    #[test]
    fn test_counts() -> Result<()> {
        let t = table()?;
        assert_eq!(Aggregator::count(t.rows()), 3);
        assert_eq!(Aggregator::count_not_null(t.rows(), "score"), 2);
        assert_eq!(Aggregator::count_not_null(t.rows(), "missing"), 0);
        Ok(())
    }

    #[test]
    fn test_min_max() -> Result<()> {
        let t = table()?;
        assert_eq!(Aggregator::min(t.rows(), "score")?, Some(Value::Double(1.5)));
        assert_eq!(Aggregator::max(t.rows(), "score")?, Some(Value::Double(2.5)));
        assert_eq!(Aggregator::max(t.rows(), "name")?, Some(Value::String("c".into())));
        assert_eq!(Aggregator::min(&[], "score")?, None);
        Ok(())
    }

    #[test]
    fn test_sum_avg() -> Result<()> {
        let t = table()?;
        assert_eq!(Aggregator::sum(t.rows(), "score"), dec("4.0")?);
        // Only the two non-null values are averaged
        let avg = Aggregator::avg(t.rows(), "score");
        assert_eq!(avg.to_string(), "2.0");
        assert_eq!(avg * BigDecimal::from(2), Aggregator::sum(t.rows(), "score"));

        // Half-up at the scale of the sum: (1 + 2) / 2 = 1.5 -> 2
        assert_eq!(Aggregator::avg(&t.rows()[..2], "id"), BigDecimal::from(2));
        // Text that is not a number adds nothing
        assert_eq!(Aggregator::sum(t.rows(), "name"), BigDecimal::from(0));
        Ok(())
    }

    #[test]
    fn test_exact_decimal_sum() -> Result<()> {
        let t = doubles(&[0.1, 0.2, 1e20])?;
        assert_eq!(Aggregator::sum(&t.rows()[..2], "v"), dec("0.3")?);
        assert_eq!(Aggregator::sum(&t.rows()[2..], "v"), dec("100000000000000000000")?);
        Ok(())
    }

    #[test]
    fn test_sum_avg_mixed_magnitudes() -> Result<()> {
        let t = doubles(&[1e30, 1.0])?;
        assert_eq!(Aggregator::sum(t.rows(), "v"), dec("1000000000000000000000000000001.0")?);
        assert_eq!(Aggregator::avg(t.rows(), "v"), dec("500000000000000000000000000000.5")?);

        let t = doubles(&[1e-30])?;
        assert_eq!(Aggregator::sum(t.rows(), "v"), dec("1e-30")?);
        assert_eq!(Aggregator::avg(t.rows(), "v"), dec("1e-30")?);

        let t = doubles(&[1e300, -1e300, 2.5e-300])?;
        assert_eq!(Aggregator::sum(t.rows(), "v"), dec("2.5e-300")?);

        let mut t = Table::new("s", vec![Column::new("v", DataType::String)])?;
        for v in ["99999999999999999999999999999999999999", "1", "x"] {
            t.insert(&BTreeMap::from([("v".to_string(), Literal::from(v))]));
        }
        assert_eq!(
            Aggregator::sum(t.rows(), "v"),
            dec("100000000000000000000000000000000000000")?
        );
        // Two of the three values are numbers, but all three are counted
        assert_eq!(
            Aggregator::avg(t.rows(), "v"),
            dec("33333333333333333333333333333333333333")?
        );
        Ok(())
    }

    #[test]
    fn test_empty_input_is_zero() -> Result<()> {
        let rows: Vec<Row> = Vec::new();
        assert_eq!(Aggregator::sum(&rows, "score"), BigDecimal::from(0));
        assert_eq!(Aggregator::avg(&rows, "score"), BigDecimal::from(0));
        assert_eq!(Aggregator::count(&rows), 0);
        Ok(())
    }

    #[test]
    fn test_calculator_dispatch() -> Result<()> {
        let t = table()?;
        let run = |name: &str, column: &str| -> Result<AggregateValue> {
            <dyn Calculator>::build(name)?.calc(column, t.rows())
        };
        assert_eq!(run("count", "*")?, AggregateValue::Count(3));
        assert_eq!(run("COUNT", "score")?, AggregateValue::Count(2));
        assert_eq!(run("Min", "id")?, AggregateValue::Value(Some(Value::Integer(1))));
        assert_eq!(run("avg", "score")?.to_string(), "2.0");
        assert_eq!(run("max", "missing")?.to_string(), "NULL");
        assert!(run("median", "score").is_err());
        Ok(())
    }
}
