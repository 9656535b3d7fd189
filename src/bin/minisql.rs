//! Interactive minisql console over stdin

use std::io::{self, BufRead, Write};

use minisql::{Error, Result, Session};

const HELP: &str = "Commands:
  HELP
  EXIT | QUIT
  TABLES
  DESCRIBE <table>
  LOAD <table> FROM '<path>' [DELIM = ',' | ';' | '\\t']
  -- DDL:
  CREATE TABLE <name> (col TYPE [PRIMARY KEY], col2 TYPE, ...)
  ALTER TABLE <name> ADD COLUMN <col> <TYPE> [PRIMARY KEY]
  DROP TABLE <name>
  -- DML:
  INSERT INTO <name> [(col, col2, ...)] VALUES (v1, v2, ...)[, (...)]
  UPDATE <name> SET col = val[, col2 = val2 ...] [WHERE ...]
  DELETE FROM <name> [WHERE ...]
  -- Query:
  SELECT <cols> FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT n [OFFSET m] | LIMIT m, n];
  -- Utilities:
  JOIN <left> <right> ON leftCol = rightCol [INNER|LEFT|RIGHT]
  AGG <table> <FUNC(col|*)> [WHERE ...]   COUNT, MIN, MAX, SUM, AVG";

/// Statements that may span several lines until a terminating `;`
fn is_multiline(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    !line.ends_with(';')
        && ["SELECT ", "UPDATE ", "INSERT "]
            .iter()
            .any(|prefix| upper.starts_with(prefix))
}

fn prompt(out: &mut impl Write, text: &str) -> Result<()> {
    write!(out, "{}", text)?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut out = io::stdout();

    writeln!(out, "MiniSQL console. Type HELP for commands.")?;
    loop {
        prompt(&mut out, "> ")?;
        let Some(line) = lines.next() else { break };
        let mut statement = line?.trim().to_string();
        if statement.is_empty() {
            continue;
        }
        if is_multiline(&statement) {
            while !statement.trim_end().ends_with(';') {
                prompt(&mut out, "... ")?;
                match lines.next() {
                    Some(more) => {
                        statement.push(' ');
                        statement.push_str(&more?);
                    }
                    None => break,
                }
            }
        }

        match statement.trim_end_matches(';').trim().to_ascii_uppercase().as_str() {
            "HELP" => writeln!(out, "{}", HELP)?,
            "EXIT" | "QUIT" => {
                writeln!(out, "Bye!")?;
                break;
            }
            _ => match session.execute(&statement) {
                Ok(result) => writeln!(out, "{}", result)?,
                Err(Error::Query(msg)) => writeln!(out, "[Query error] {}", msg)?,
                Err(Error::Storage(msg)) | Err(Error::Internal(msg)) => {
                    writeln!(out, "[Error] {}", msg)?
                }
            },
        }
    }
    Ok(())
}
