//! Values and result sets exchanged with the storage collaborator.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{JournalError, Result};

/// Storage format for timestamps.
///
/// Fixed width, so lexical order equals chronological order. Sub-microsecond
/// digits are truncated on write; journals stamp rows with
/// [`Clock::now_micros`](crate::Clock::now_micros) so nothing is lost.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| JournalError::Storage(format!("Invalid timestamp {:?}: {}", raw, e)))
}

/// A scalar passed to or read from storage.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Render as an ANSI SQL literal.
    ///
    /// Decimals and timestamps become text literals so they round-trip
    /// without loss.
    pub fn ansi_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(true) => "1".to_string(),
            SqlValue::Bool(false) => "0".to_string(),
            SqlValue::Integer(value) => value.to_string(),
            SqlValue::Real(value) if value.is_finite() => format!("{:?}", value),
            SqlValue::Real(_) => "NULL".to_string(),
            SqlValue::Text(value) => quote_text(value),
            SqlValue::Decimal(value) => quote_text(&value.to_string()),
            SqlValue::Timestamp(value) => quote_text(&format_timestamp(value)),
            SqlValue::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
                format!("X'{}'", hex)
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

fn quote_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ansi_literal())
    }
}

/// One row of a result set, addressed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
    }

    fn require(&self, column: &str) -> Result<&SqlValue> {
        self.get(column)
            .ok_or_else(|| JournalError::Storage(format!("Missing column: {}", column)))
    }

    pub fn text(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            SqlValue::Text(value) => Ok(value.clone()),
            SqlValue::Integer(value) => Ok(value.to_string()),
            SqlValue::Decimal(value) => Ok(value.to_string()),
            SqlValue::Timestamp(value) => Ok(format_timestamp(value)),
            other => Err(unexpected(column, "text", other)),
        }
    }

    pub fn integer(&self, column: &str) -> Result<i64> {
        match self.require(column)? {
            SqlValue::Integer(value) => Ok(*value),
            SqlValue::Bool(value) => Ok(i64::from(*value)),
            SqlValue::Text(value) => value
                .parse()
                .map_err(|e| JournalError::Storage(format!("Invalid integer in {}: {}", column, e))),
            other => Err(unexpected(column, "integer", other)),
        }
    }

    pub fn boolean(&self, column: &str) -> Result<bool> {
        match self.require(column)? {
            SqlValue::Bool(value) => Ok(*value),
            SqlValue::Integer(value) => Ok(*value != 0),
            other => Err(unexpected(column, "boolean", other)),
        }
    }

    pub fn decimal(&self, column: &str) -> Result<Decimal> {
        match self.require(column)? {
            SqlValue::Decimal(value) => Ok(*value),
            SqlValue::Integer(value) => Ok(Decimal::from(*value)),
            SqlValue::Text(value) => Decimal::from_str(value)
                .or_else(|_| Decimal::from_scientific(value))
                .map_err(|e| JournalError::Storage(format!("Invalid decimal in {}: {}", column, e))),
            SqlValue::Real(value) => Decimal::try_from(*value)
                .map_err(|e| JournalError::Storage(format!("Invalid decimal in {}: {}", column, e))),
            other => Err(unexpected(column, "decimal", other)),
        }
    }

    pub fn timestamp(&self, column: &str) -> Result<DateTime<Utc>> {
        match self.require(column)? {
            SqlValue::Timestamp(value) => Ok(*value),
            SqlValue::Text(value) => parse_timestamp(value),
            other => Err(unexpected(column, "timestamp", other)),
        }
    }
}

fn unexpected(column: &str, wanted: &str, found: &SqlValue) -> JournalError {
    JournalError::Storage(format!(
        "Column {} is not a {} (found {})",
        column, wanted, found
    ))
}

/// Materialised result of one statement.
///
/// Statements that return no columns yield an empty set whose
/// [`rows_affected`](ResultSet::rows_affected) reports the change count.
#[derive(Debug, Default)]
pub struct ResultSet {
    rows: VecDeque<Row>,
    rows_affected: usize,
}

impl ResultSet {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into(),
            rows_affected: 0,
        }
    }

    pub fn affected(rows_affected: usize) -> Self {
        Self {
            rows: VecDeque::new(),
            rows_affected,
        }
    }

    /// Rows not yet consumed by [`next_row`](ResultSet::next_row).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn next_row(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Iterator for ResultSet {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.next_row()
    }
}
