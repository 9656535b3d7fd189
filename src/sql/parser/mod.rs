use std::collections::BTreeMap;

use crate::{
    error::{Error, Result},
    sql::{
        parser::{
            ast::{JoinType, Literal, Statement},
            lexer::{Keyword, Lexer, Token},
        },
        schema::Column,
        types::DataType,
    },
};

pub mod ast;
mod lexer;
pub mod query;

/// Statement parser - turns one command into a [`Statement`].
///
/// SELECT text and the WHERE bodies of UPDATE, DELETE and AGG are not
/// tokenized here; they are kept as raw text for the query parser.
pub struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            lexer: Lexer::new(input),
            peeked: None,
        }
    }

    /// Parses the input into a statement. The trailing semicolon is optional.
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;
        self.next_if_token(Token::Semicolon);
        // No tokens allowed after the statement
        if let Some(token) = self.peek()? {
            return Err(Error::Query(format!("[Parser] Unexpected token {}", token)));
        }
        Ok(stmt)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Create)) => self.parse_create_table(),
            Some(Token::Keyword(Keyword::Alter)) => self.parse_alter_table(),
            Some(Token::Keyword(Keyword::Drop)) => self.parse_drop_table(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Join)) => self.parse_join(),
            Some(Token::Keyword(Keyword::Agg)) => self.parse_aggregate(),
            Some(Token::Keyword(Keyword::Tables)) => {
                self.next()?;
                Ok(Statement::ShowTables)
            }
            Some(Token::Keyword(Keyword::Describe)) => {
                self.next()?;
                Ok(Statement::Describe {
                    table_name: self.next_ident()?,
                })
            }
            Some(Token::Keyword(Keyword::Load)) => self.parse_load(),
            Some(t) => Err(Error::Query(format!("[Parser] Unexpected token {}", t))),
            None => Err(Error::Query("[Parser] Unexpected end of input".into())),
        }
    }

    /// CREATE TABLE name (column TYPE [PRIMARY KEY], ...)
    fn parse_create_table(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Create))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        let name = self.next_ident()?;
        self.next_expect(Token::OpenParen)?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        self.next_expect(Token::CloseParen)?;
        Ok(Statement::CreateTable { name, columns })
    }

    /// ALTER TABLE name ADD COLUMN column TYPE [PRIMARY KEY]
    fn parse_alter_table(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Alter))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Add))?;
        self.next_expect(Token::Keyword(Keyword::Column))?;
        Ok(Statement::AddColumn {
            table_name,
            column: self.parse_column()?,
        })
    }

    fn parse_drop_table(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Drop))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        Ok(Statement::DropTable {
            name: self.next_ident()?,
        })
    }

    fn parse_column(&mut self) -> Result<Column> {
        let name = self.next_ident()?;
        let datatype = match self.next()? {
            Token::Keyword(keyword) => DataType::from_name(keyword.to_str()).ok_or(
                Error::Query(format!("[Parser] Unknown column type {}", keyword)),
            )?,
            token => return Err(Error::Query(format!("[Parser] Unexpected token {}", token))),
        };
        let mut column = Column::new(name, datatype);
        if self.next_if_token(Token::Keyword(Keyword::Primary)).is_some() {
            self.next_expect(Token::Keyword(Keyword::Key))?;
            column = column.primary_key();
        }
        Ok(column)
    }

    /// INSERT INTO name [(column, ...)] VALUES (value, ...)[, (value, ...)]
    fn parse_insert(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Insert))?;
        self.next_expect(Token::Keyword(Keyword::Into))?;
        let table_name = self.next_ident()?;

        let columns = if self.next_if_token(Token::OpenParen).is_some() {
            let mut cols = Vec::new();
            loop {
                cols.push(self.next_ident()?);
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => {
                        return Err(Error::Query(format!("[Parser] Unexpected token {}", token)));
                    }
                }
            }
            Some(cols)
        } else {
            None
        };

        self.next_expect(Token::Keyword(Keyword::Values))?;
        let mut values = Vec::new();
        loop {
            self.next_expect(Token::OpenParen)?;
            let mut row = Vec::new();
            loop {
                row.push(self.parse_literal()?);
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => {
                        return Err(Error::Query(format!("[Parser] Unexpected token {}", token)));
                    }
                }
            }
            values.push(row);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(Statement::Insert {
            table_name,
            columns,
            values,
        })
    }

    /// UPDATE name SET column = value[, ...] [WHERE ...]
    fn parse_update(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Update))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Set))?;

        let mut columns = BTreeMap::new();
        loop {
            let col = self.next_ident()?;
            self.next_expect(Token::Equal)?;
            let value = self.parse_literal()?;
            if columns.contains_key(&col) {
                return Err(Error::Query(format!(
                    "[Parser] Duplicate column {} for update",
                    col
                )));
            }
            columns.insert(col, value);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(Statement::Update {
            table_name,
            columns,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// DELETE FROM name [WHERE ...]
    fn parse_delete(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Delete))?;
        self.next_expect(Token::Keyword(Keyword::From))?;
        Ok(Statement::Delete {
            table_name: self.next_ident()?,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// The whole SELECT is handed over verbatim
    fn parse_select(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Select))?;
        self.lexer.remainder();
        Ok(Statement::Select {
            query: self.input.trim().to_string(),
        })
    }

    /// JOIN left right ON left_column = right_column [INNER|LEFT|RIGHT]
    fn parse_join(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Join))?;
        let left = self.next_ident()?;
        let right = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::On))?;
        let left_column = self.next_ident()?;
        self.next_expect(Token::Equal)?;
        let right_column = self.next_ident()?;
        let join_type = match self.next_if_keyword() {
            None => JoinType::Inner,
            Some(Token::Keyword(Keyword::Inner)) => JoinType::Inner,
            Some(Token::Keyword(Keyword::Left)) => JoinType::Left,
            Some(Token::Keyword(Keyword::Right)) => JoinType::Right,
            Some(token) => return Err(Error::Query(format!("[Parser] Unexpected token {}", token))),
        };
        Ok(Statement::Join {
            left,
            right,
            left_column,
            right_column,
            join_type,
        })
    }

    /// AGG name FUNC(column|*) [WHERE ...]
    fn parse_aggregate(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Agg))?;
        let table_name = self.next_ident()?;
        let function = self.next_ident()?.to_uppercase();
        self.next_expect(Token::OpenParen)?;
        let column = match self.next()? {
            Token::Asterisk => "*".to_string(),
            Token::Ident(ident) => ident,
            token => return Err(Error::Query(format!("[Parser] Unexpected token {}", token))),
        };
        self.next_expect(Token::CloseParen)?;
        Ok(Statement::Aggregate {
            table_name,
            function,
            column,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// LOAD name FROM 'path' [DELIM = 'c']
    fn parse_load(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Load))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::From))?;
        let path = match self.next()? {
            Token::String(path) => path,
            token => {
                return Err(Error::Query(format!(
                    "[Parser] Path must be quoted with single quotes, got {}",
                    token
                )));
            }
        };
        let delimiter = if self.next_if_token(Token::Keyword(Keyword::Delim)).is_some() {
            self.next_expect(Token::Equal)?;
            match self.next()? {
                Token::String(d) if d == "\\t" => Some('\t'),
                Token::String(d) if d.chars().count() == 1 => d.chars().next(),
                token => {
                    return Err(Error::Query(format!(
                        "[Parser] DELIM must be one char: ',', ';' or '\\t', got {}",
                        token
                    )));
                }
            }
        } else {
            None
        };
        Ok(Statement::Load {
            table_name,
            path,
            delimiter,
        })
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let negative = match self.next_if(|t| matches!(t, Token::Minus | Token::Plus)) {
            Some(Token::Minus) => true,
            _ => false,
        };
        Ok(match self.next()? {
            // The lexer scans both 123 and 123.45 as Number
            Token::Number(n) => {
                if n.chars().all(|c| c.is_ascii_digit()) {
                    let v: i64 = n.parse()?;
                    Literal::Integer(if negative { -v } else { v })
                } else {
                    let v: f64 = n.parse()?;
                    Literal::Double(if negative { -v } else { v })
                }
            }
            token if negative => {
                return Err(Error::Query(format!(
                    "[Parser] Expected number after sign, got {}",
                    token
                )));
            }
            Token::String(s) => Literal::String(s),
            Token::Keyword(Keyword::True) => Literal::Boolean(true),
            Token::Keyword(Keyword::False) => Literal::Boolean(false),
            Token::Keyword(Keyword::Null) => Literal::Null,
            t => {
                return Err(Error::Query(format!(
                    "[Parser] Unexpected expression token {}",
                    t
                )));
            }
        })
    }

    /// Takes the raw WHERE body, up to the end of the input
    fn parse_where_clause(&mut self) -> Result<Option<String>> {
        if self.next_if_token(Token::Keyword(Keyword::Where)).is_none() {
            return Ok(None);
        }
        let raw = self.lexer.remainder().trim();
        let raw = raw.strip_suffix(';').unwrap_or(raw).trim();
        if raw.is_empty() {
            return Err(Error::Query("[Parser] Empty WHERE clause".into()));
        }
        Ok(Some(raw.to_string()))
    }

    fn peek(&mut self) -> Result<Option<Token>> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next().transpose()?;
        }
        Ok(self.peeked.clone())
    }

    fn next(&mut self) -> Result<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self
                .lexer
                .next()
                .unwrap_or_else(|| Err(Error::Query("[Parser] Unexpected end of input".into()))),
        }
    }

    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(Error::Query(format!(
                "[Parser] Expected ident, got token {}",
                token
            ))),
        }
    }

    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Query(format!(
                "[Parser] Expected token {}, got {}",
                expect, token
            )));
        }
        Ok(())
    }

    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    fn next_if_keyword(&mut self) -> Option<Token> {
        self.next_if(|t| matches!(t, Token::Keyword(_)))
    }

    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}
