//! Statement lexer - tokenizes command text into a stream of tokens

use std::{fmt::Display, iter::Peekable, str::CharIndices};

use crate::error::{Error, Result};

/// A single lexical token of the command language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Reserved keyword
    Keyword(Keyword),
    /// Identifier such as a table or column name, case preserved
    Ident(String),
    /// Single-quoted string literal, `''` unescaped
    String(String),
    /// Numeric literal (integer or decimal)
    Number(String),
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Asterisk,
    Plus,
    Minus,
    Equal,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Token::Keyword(keyword) => keyword.to_str(),
            Token::Ident(ident) => ident,
            Token::String(v) => v,
            Token::Number(n) => n,
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Asterisk => "*",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Equal => "=",
        })
    }
}

/// Reserved keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // DDL keywords
    Create,
    Table,
    Alter,
    Add,
    Column,
    Drop,
    Primary,
    Key,
    // Data type keywords
    Int,
    Integer,
    Double,
    Float,
    String,
    Text,
    Varchar,
    Boolean,
    Bool,
    // DML keywords
    Insert,
    Into,
    Values,
    Update,
    Set,
    Where,
    Delete,
    From,
    Select,
    // Literal keywords
    True,
    False,
    Null,
    // Utility keywords
    Join,
    On,
    Inner,
    Left,
    Right,
    Agg,
    Tables,
    Describe,
    Load,
    Delim,
}

impl Keyword {
    /// Attempts to parse a word as a keyword (case-insensitive)
    pub fn from_str(ident: &str) -> Option<Keyword> {
        Some(match ident.to_uppercase().as_ref() {
            "CREATE" => Keyword::Create,
            "TABLE" => Keyword::Table,
            "ALTER" => Keyword::Alter,
            "ADD" => Keyword::Add,
            "COLUMN" => Keyword::Column,
            "DROP" => Keyword::Drop,
            "PRIMARY" => Keyword::Primary,
            "KEY" => Keyword::Key,
            "INT" => Keyword::Int,
            "INTEGER" => Keyword::Integer,
            "DOUBLE" => Keyword::Double,
            "FLOAT" => Keyword::Float,
            "STRING" => Keyword::String,
            "TEXT" => Keyword::Text,
            "VARCHAR" => Keyword::Varchar,
            "BOOLEAN" => Keyword::Boolean,
            "BOOL" => Keyword::Bool,
            "INSERT" => Keyword::Insert,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "UPDATE" => Keyword::Update,
            "SET" => Keyword::Set,
            "WHERE" => Keyword::Where,
            "DELETE" => Keyword::Delete,
            "FROM" => Keyword::From,
            "SELECT" => Keyword::Select,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "NULL" => Keyword::Null,
            "JOIN" => Keyword::Join,
            "ON" => Keyword::On,
            "INNER" => Keyword::Inner,
            "LEFT" => Keyword::Left,
            "RIGHT" => Keyword::Right,
            "AGG" => Keyword::Agg,
            "TABLES" => Keyword::Tables,
            "DESCRIBE" => Keyword::Describe,
            "LOAD" => Keyword::Load,
            "DELIM" => Keyword::Delim,
            _ => return None,
        })
    }

    /// Returns the uppercase spelling of the keyword
    pub fn to_str(&self) -> &'static str {
        match self {
            Keyword::Create => "CREATE",
            Keyword::Table => "TABLE",
            Keyword::Alter => "ALTER",
            Keyword::Add => "ADD",
            Keyword::Column => "COLUMN",
            Keyword::Drop => "DROP",
            Keyword::Primary => "PRIMARY",
            Keyword::Key => "KEY",
            Keyword::Int => "INT",
            Keyword::Integer => "INTEGER",
            Keyword::Double => "DOUBLE",
            Keyword::Float => "FLOAT",
            Keyword::String => "STRING",
            Keyword::Text => "TEXT",
            Keyword::Varchar => "VARCHAR",
            Keyword::Boolean => "BOOLEAN",
            Keyword::Bool => "BOOL",
            Keyword::Insert => "INSERT",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Update => "UPDATE",
            Keyword::Set => "SET",
            Keyword::Where => "WHERE",
            Keyword::Delete => "DELETE",
            Keyword::From => "FROM",
            Keyword::Select => "SELECT",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Null => "NULL",
            Keyword::Join => "JOIN",
            Keyword::On => "ON",
            Keyword::Inner => "INNER",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Agg => "AGG",
            Keyword::Tables => "TABLES",
            Keyword::Describe => "DESCRIBE",
            Keyword::Load => "LOAD",
            Keyword::Delim => "DELIM",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Lexical analyzer over a borrowed input.
///
/// Tracks byte offsets so a caller can take the untokenized remainder of the
/// input, which is how raw WHERE bodies reach the query parser.
pub struct Lexer<'a> {
    input: &'a str,
    iter: Peekable<CharIndices<'a>>,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => self.iter.peek().map(|(_, c)| {
                Err(Error::Query(format!("[Lexer] Unexpected character {}", c)))
            }),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            iter: input.char_indices().peekable(),
        }
    }

    /// Byte offset of the next unconsumed character
    pub fn offset(&mut self) -> usize {
        self.iter.peek().map_or(self.input.len(), |(i, _)| *i)
    }

    /// Consumes and returns everything not yet tokenized
    pub fn remainder(&mut self) -> &'a str {
        let start = self.offset();
        self.iter.by_ref().for_each(drop);
        &self.input[start..]
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.next_if(|&(_, c)| predicate(c)).map(|(_, c)| c)
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Consumes the next character if it maps to a token
    fn next_if_token<F: Fn(char) -> Option<Token>>(&mut self, predicate: F) -> Option<Token> {
        let token = self.iter.peek().and_then(|(_, c)| predicate(*c))?;
        self.iter.next();
        Some(token)
    }

    fn erase_whitespace(&mut self) {
        self.next_while(|c| c.is_whitespace());
    }

    fn scan(&mut self) -> Result<Option<Token>> {
        self.erase_whitespace();
        match self.iter.peek().map(|(_, c)| *c) {
            Some('\'') => self.scan_string(),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || c == '_' => Ok(self.scan_ident()),
            Some(_) => Ok(self.scan_symbol()),
            None => Ok(None),
        }
    }

    /// Scans a single-quoted string. A doubled quote stands for one quote.
    fn scan_string(&mut self) -> Result<Option<Token>> {
        self.iter.next();
        let mut val = String::new();
        loop {
            match self.iter.next() {
                Some((_, '\'')) => {
                    if self.next_if(|c| c == '\'').is_none() {
                        break;
                    }
                    val.push('\'');
                }
                Some((_, c)) => val.push(c),
                None => return Err(Error::Query("[Lexer] Unexpected end of string".into())),
            }
        }
        Ok(Some(Token::String(val)))
    }

    fn scan_number(&mut self) -> Option<Token> {
        let mut val = self.next_while(|c| c.is_ascii_digit())?;
        if let Some(sep) = self.next_if(|c| c == '.') {
            val.push(sep);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        Some(Token::Number(val))
    }

    fn scan_ident(&mut self) -> Option<Token> {
        let mut val = self.next_if(|c| c.is_alphabetic() || c == '_')?.to_string();
        while let Some(c) = self.next_if(|c| c.is_alphanumeric() || c == '_') {
            val.push(c);
        }
        Some(Keyword::from_str(&val).map_or(Token::Ident(val), Token::Keyword))
    }

    fn scan_symbol(&mut self) -> Option<Token> {
        self.next_if_token(|c| match c {
            '*' => Some(Token::Asterisk),
            '(' => Some(Token::OpenParen),
            ')' => Some(Token::CloseParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '=' => Some(Token::Equal),
            _ => None,
        })
    }
}
