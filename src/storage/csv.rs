use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::{
    error::{Error, Result},
    sql::{parser::ast::Literal, schema::Column, types::DataType},
    storage::database::Database,
};

/// CSV ingestion options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvOptions {
    /// Field delimiter, detected from the header line when None
    pub delimiter: Option<char>,
}

/// Loads a CSV file into a new table, returning the number of rows inserted
pub fn load(db: &mut Database, table_name: &str, path: impl AsRef<Path>, options: &CsvOptions) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::Internal(format!("cannot open {}: {}", path.display(), e)))?;
    load_reader(db, table_name, BufReader::new(file), options)
}

/// Loads CSV text into a new table. The first line is the header; column
/// types are inferred from the data before anything is stored.
pub fn load_reader(
    db: &mut Database,
    table_name: &str,
    reader: impl BufRead,
    options: &CsvOptions,
) -> Result<usize> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::Internal("CSV is empty".into())),
    };
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(&header));
    let headers = split_line(&header, delimiter);

    let mut records = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = split_line(&line, delimiter);
        fields.resize(headers.len(), String::new());
        records.push(fields);
    }

    let columns = headers
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let datatype = infer_type(records.iter().map(|r| r[i].as_str()));
            Column::new(sanitize_header(raw, i), datatype)
        })
        .collect::<Vec<_>>();
    db.create_table(table_name, columns.clone())?;

    let table = db.get_table_mut(table_name)?;
    for record in records.iter() {
        let values = columns
            .iter()
            .zip(record)
            .map(|(col, field)| (col.name.clone(), cast(field, col.datatype)))
            .collect::<BTreeMap<_, _>>();
        table.insert(&values);
    }

    tracing::info!(
        table = table_name,
        rows = records.len(),
        columns = columns.len(),
        delimiter = ?delimiter,
        "loaded CSV"
    );
    Ok(records.len())
}

/// The most frequent of comma, semicolon and tab in the header. Ties go to
/// the earlier one in that order.
fn detect_delimiter(header: &str) -> char {
    [',', ';', '\t']
        .into_iter()
        .rev()
        .max_by_key(|d| header.chars().filter(|c| c == d).count())
        .unwrap_or(',')
}

/// Splits one line on the delimiter. Double quotes group a field and `""`
/// inside quotes is a literal quote.
fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn sanitize_header(raw: &str, index: usize) -> String {
    let name = raw.split_whitespace().collect::<Vec<_>>().join("_");
    match name.chars().next() {
        None => format!("col_{}", index + 1),
        Some(c) if !c.is_alphabetic() => format!("c_{}", name),
        Some(_) => name,
    }
}

fn classify(field: &str) -> DataType {
    let unsigned = field.strip_prefix(['+', '-']).unwrap_or(field);
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if field.eq_ignore_ascii_case("true") || field.eq_ignore_ascii_case("false") {
        DataType::Boolean
    } else if !unsigned.is_empty() && digits(unsigned) {
        DataType::Integer
    } else {
        match unsigned.split_once('.') {
            Some((int, frac)) if !frac.is_empty() && digits(int) && digits(frac) => DataType::Double,
            _ => DataType::String,
        }
    }
}

/// Narrowest type covering every non-blank field: INTEGER widens to DOUBLE,
/// any other mix is STRING, and a column with no values is STRING.
fn infer_type<'a>(fields: impl Iterator<Item = &'a str>) -> DataType {
    let mut inferred: Option<DataType> = None;
    for field in fields.map(str::trim).filter(|f| !f.is_empty()) {
        let seen = classify(field);
        inferred = Some(match inferred {
            None => seen,
            Some(current) if current == seen => current,
            Some(DataType::Integer | DataType::Double)
                if matches!(seen, DataType::Integer | DataType::Double) =>
            {
                DataType::Double
            }
            Some(_) => DataType::String,
        });
        if inferred == Some(DataType::String) {
            break;
        }
    }
    inferred.unwrap_or(DataType::String)
}

/// Converts a field to a literal of the inferred type. Blank fields and
/// values out of range are NULL.
fn cast(field: &str, datatype: DataType) -> Literal {
    let field = field.trim();
    if field.is_empty() {
        return Literal::Null;
    }
    let literal = match datatype {
        DataType::Integer => field.parse().ok().map(Literal::Integer),
        DataType::Double => field.parse().ok().map(Literal::Double),
        DataType::Boolean => Some(Literal::Boolean(field.eq_ignore_ascii_case("true"))),
        DataType::String => Some(Literal::String(field.to_string())),
    };
    literal.unwrap_or_else(|| {
        tracing::debug!(field, %datatype, "CSV field does not convert, loaded as NULL");
        Literal::Null
    })
}
