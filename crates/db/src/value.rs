//! Column values exchanged between mappings, conditions, and stores.

use std::cmp::Ordering;
use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use time::{macros::format_description, Date};

use crate::error::{Result, StoreError};

/// Storage type of a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    /// Calendar date without timezone, persisted as `YYYY-MM-DD` text.
    Date,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text | ColumnType::Date => "TEXT",
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Date(Date),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Integer(_) => ColumnType::Integer,
            Value::Text(_) => ColumnType::Text,
            Value::Date(_) => ColumnType::Date,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Value::Date(date) => Some(*date),
            _ => None,
        }
    }

    /// Ordering between values of the same type; `None` across types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Decode a raw SQLite cell according to the mapped column type.
    pub(crate) fn from_sql(column: &str, ty: ColumnType, raw: ValueRef<'_>) -> Result<Self> {
        match (ty, raw) {
            (ColumnType::Integer, ValueRef::Integer(value)) => Ok(Value::Integer(value)),
            (ColumnType::Text, ValueRef::Text(bytes)) => {
                Ok(Value::Text(utf8(column, bytes)?.to_string()))
            }
            (ColumnType::Date, ValueRef::Text(bytes)) => {
                Date::parse(utf8(column, bytes)?, format_description!("[year]-[month]-[day]"))
                    .map(Value::Date)
                    .map_err(|err| StoreError::mapping(column, err.to_string()))
            }
            (ty, other) => Err(StoreError::mapping(
                column,
                format!("expected {:?}, found {:?}", ty, other.data_type()),
            )),
        }
    }
}

fn utf8<'a>(column: &str, bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|err| StoreError::mapping(column, err.to_string()))
}

pub(crate) fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| {
            format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            )
        })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Value::Date(date) => write!(f, "'{}'", format_date(*date)),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Integer(value) => ToSqlOutput::Owned(SqlValue::Integer(*value)),
            Value::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
            Value::Date(date) => ToSqlOutput::Owned(SqlValue::Text(format_date(*date))),
        })
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Value::Date(value)
    }
}
