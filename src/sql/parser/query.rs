//! SELECT text parser.
//!
//! Clause boundaries are found by keyword search over the whitespace-normalized
//! text; WHERE clauses are split on AND/OR outside string literals and folded
//! strictly left to right, without operator precedence.

use crate::{
    error::{Error, Result},
    sql::{
        parser::ast::{OrderDirection, Predicate},
        plan::{OrderSpec, Query},
        types::{Operator, Row, Value},
    },
    storage::database::Database,
};

const SELECT: &str = "SELECT ";
const FROM: &str = " FROM ";
const WHERE: &str = " WHERE ";
const ORDER_BY: &str = " ORDER BY ";
const LIMIT: &str = " LIMIT ";
const OFFSET: &str = " OFFSET ";

/// Parses `SELECT <cols>|* FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT ...]`
/// into a [`Query`] bound to a table of `database`
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse<'a>(&self, sql: &str, database: &'a Database) -> Result<Query<'a, Row>> {
        let sql = normalize(sql);
        let upper = sql.to_ascii_uppercase();
        if !upper.starts_with(SELECT) {
            return Err(Error::Query("Query must start with SELECT".into()));
        }

        let from_idx = upper
            .find(FROM)
            .ok_or(Error::Query("Missing FROM clause".into()))?;
        let select_part = sql.get(SELECT.len()..from_idx).unwrap_or("").trim();
        if select_part.is_empty() {
            return Err(Error::Query("Missing column list".into()));
        }
        let columns = parse_columns(select_part);

        // Each clause keyword is located once, after FROM
        let body_start = from_idx + FROM.len();
        let locate = |keyword: &str| {
            upper
                .get(body_start..)
                .and_then(|rest| rest.find(keyword))
                .map(|i| i + body_start)
        };
        let clauses = [
            (WHERE, locate(WHERE)),
            (ORDER_BY, locate(ORDER_BY)),
            (LIMIT, locate(LIMIT)),
        ];
        let present = clauses
            .iter()
            .filter_map(|(keyword, idx)| idx.map(|i| (*keyword, i)))
            .collect::<Vec<_>>();
        for pair in present.windows(2) {
            if pair[1].1 < pair[0].1 {
                return Err(Error::Query(format!(
                    "{} clause must come before {}",
                    pair[1].0.trim(),
                    pair[0].0.trim()
                )));
            }
        }
        // Body of a clause: from its keyword to the next located keyword
        let body = |keyword: &str| -> Option<&str> {
            let pos = present.iter().position(|(k, _)| *k == keyword)?;
            let start = present[pos].1 + keyword.len();
            let end = present.get(pos + 1).map_or(sql.len(), |(_, i)| *i);
            Some(sql.get(start..end).unwrap_or("").trim())
        };

        let table_end = present.first().map_or(sql.len(), |(_, i)| *i);
        let table_part = sql.get(body_start..table_end).unwrap_or("").trim();
        let table_name = table_part
            .split(' ')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or(Error::Query("Missing table name".into()))?;
        let table = database
            .get_table(table_name)
            .map_err(|_| Error::Query(format!("Table not found: {}", table_name)))?;

        let filter = match body(WHERE) {
            Some("") => return Err(Error::Query("Empty WHERE clause".into())),
            Some(clause) => parse_where(clause)?,
            None => Predicate::Always,
        };

        let order_by = match body(ORDER_BY) {
            Some("") => return Err(Error::Query("Empty ORDER BY clause".into())),
            Some(clause) => parse_order_by(clause)?,
            None => Vec::new(),
        };

        let (limit, offset) = match body(LIMIT) {
            Some(tail) => parse_limit(tail)?,
            None => (None, None),
        };

        tracing::debug!(
            table = table_name,
            filter = %filter,
            order_keys = order_by.len(),
            ?limit,
            ?offset,
            "parsed query"
        );

        Ok(Query {
            table: Some(table),
            columns,
            filter,
            order_by,
            limit,
            offset,
            ..Query::default()
        })
    }
}

/// Trims, drops one trailing `;` and collapses whitespace runs to one space
fn normalize(sql: &str) -> String {
    let sql = sql.trim();
    let sql = sql.strip_suffix(';').unwrap_or(sql);
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_columns(part: &str) -> Vec<String> {
    if part == "*" {
        return Vec::new();
    }
    part.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, PartialEq)]
enum Segment<'s> {
    Predicate(&'s str),
    And,
    Or,
}

/// Parses a WHERE body into a predicate, combining left to right
pub fn parse_where(clause: &str) -> Result<Predicate> {
    let invalid = || Error::Query(format!("Invalid WHERE clause: {}", clause));

    let mut segments = split_logical(clause).into_iter();
    let mut acc = match segments.next() {
        Some(Segment::Predicate(expr)) => parse_predicate(expr)?,
        _ => return Err(invalid()),
    };
    while let Some(connective) = segments.next() {
        let right = match segments.next() {
            Some(Segment::Predicate(expr)) => parse_predicate(expr)?,
            _ => return Err(invalid()),
        };
        acc = match connective {
            Segment::And => acc.and(right),
            Segment::Or => acc.or(right),
            Segment::Predicate(_) => return Err(invalid()),
        };
    }
    Ok(acc)
}

/// Splits on ` AND ` / ` OR ` (any case) outside single-quoted strings.
/// A doubled quote inside a string is an escaped quote.
fn split_logical(clause: &str) -> Vec<Segment<'_>> {
    let bytes = clause.as_bytes();
    let mut segments = Vec::new();
    let mut in_str = false;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if in_str && bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            in_str = !in_str;
        } else if !in_str {
            let connective = if region_matches(bytes, i, b" AND ") {
                Some((Segment::And, 5))
            } else if region_matches(bytes, i, b" OR ") {
                Some((Segment::Or, 4))
            } else {
                None
            };
            if let Some((segment, len)) = connective {
                segments.push(Segment::Predicate(clause[start..i].trim()));
                segments.push(segment);
                i += len;
                start = i;
                continue;
            }
        }
        i += 1;
    }
    let rest = clause[start..].trim();
    if !rest.is_empty() {
        segments.push(Segment::Predicate(rest));
    }
    segments
}

fn region_matches(bytes: &[u8], offset: usize, needle: &[u8]) -> bool {
    bytes
        .get(offset..offset + needle.len())
        .is_some_and(|region| region.eq_ignore_ascii_case(needle))
}

/// First occurrence of `needle` (ASCII case-insensitive) outside string literals
fn find_outside_quotes(s: &str, needle: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_str = false;
    let mut i = 0;
    while i + needle.len() <= bytes.len() {
        if bytes[i] == b'\'' {
            if in_str && bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            in_str = !in_str;
        }
        if !in_str && region_matches(bytes, i, needle.as_bytes()) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Parses `column <op> literal`. Of all operator tokens present, the longest
/// wins, and the earliest among equally long ones.
fn parse_predicate(expr: &str) -> Result<Predicate> {
    let (token, operator, idx) = Operator::TOKENS
        .iter()
        .filter_map(|(token, op)| find_outside_quotes(expr, token).map(|i| (*token, *op, i)))
        .max_by(|a, b| a.0.len().cmp(&b.0.len()).then(b.2.cmp(&a.2)))
        .ok_or(Error::Query(format!("Unsupported operator in: {}", expr)))?;

    let column = expr[..idx].trim();
    let raw = expr[idx + token.len()..].trim();
    if column.is_empty() || raw.is_empty() {
        return Err(Error::Query(format!("Invalid predicate: {}", expr)));
    }

    Ok(Predicate::Compare {
        column: column.to_string(),
        operator,
        value: parse_value(raw),
    })
}

/// Classifies a literal: quoted string, boolean, integer, decimal, else bare string
pub fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Value::String(raw[1..raw.len() - 1].replace("''", "'"));
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if is_integer(raw) {
        if let Ok(i) = raw.parse() {
            return Value::Integer(i);
        }
    }
    if is_decimal(raw) {
        if let Ok(d) = raw.parse() {
            return Value::Double(d);
        }
    }
    Value::String(raw.to_string())
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// `[-+]?\d+`
fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && all_digits(digits)
}

/// `[-+]?\d*\.\d+`
fn is_decimal(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    match body.split_once('.') {
        Some((int, frac)) => all_digits(int) && !frac.is_empty() && all_digits(frac),
        None => false,
    }
}

fn parse_order_by(clause: &str) -> Result<Vec<OrderSpec>> {
    let mut specs = Vec::new();
    for part in clause.split(',') {
        let mut tokens = part.split_whitespace();
        let Some(column) = tokens.next() else {
            continue;
        };
        let direction = match tokens.next() {
            None => OrderDirection::Asc,
            Some(dir) if dir.eq_ignore_ascii_case("ASC") => OrderDirection::Asc,
            Some(dir) if dir.eq_ignore_ascii_case("DESC") => OrderDirection::Desc,
            Some(dir) => {
                return Err(Error::Query(format!(
                    "ORDER BY: expected ASC/DESC, got: {}",
                    dir
                )));
            }
        };
        specs.push(OrderSpec::new(column, direction));
    }
    Ok(specs)
}

/// `n`, `n OFFSET m` or MySQL-style `m, n`. Returns (limit, offset).
fn parse_limit(tail: &str) -> Result<(Option<usize>, Option<usize>)> {
    let s = tail.trim();
    let s = s.strip_suffix(';').unwrap_or(s).trim();
    let upper = s.to_ascii_uppercase();

    if let Some(i) = upper.find(OFFSET) {
        let limit = non_negative(s[..i].trim(), "LIMIT")?;
        let offset = non_negative(s[i + OFFSET.len()..].trim(), "OFFSET")?;
        return Ok((Some(limit), Some(offset)));
    }

    if s.contains(',') {
        let parts = s.split(',').collect::<Vec<_>>();
        if parts.len() != 2 {
            return Err(Error::Query(format!("Invalid LIMIT format: {}", tail)));
        }
        let offset = non_negative(parts[0].trim(), "LIMIT offset")?;
        let limit = non_negative(parts[1].trim(), "LIMIT count")?;
        return Ok((Some(limit), Some(offset)));
    }

    Ok((Some(non_negative(s, "LIMIT")?), None))
}

fn non_negative(s: &str, label: &str) -> Result<usize> {
    let v: i64 = s
        .parse()
        .map_err(|_| Error::Query(format!("Invalid {} value: {}", label, s)))?;
    usize::try_from(v).map_err(|_| Error::Query(format!("{} must be >= 0", label)))
}
