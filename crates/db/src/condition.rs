//! Canonical predicate tree shared by every query style.
//!
//! A [`Condition`] is rendered to SQL by the SQLite store and evaluated
//! directly by the in-memory store, so both must agree on its meaning.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, StoreError};
use crate::schema::TableMapping;
use crate::store::Record;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Matches every row.
    True,
    /// Matches no row.
    False,
    Eq(&'static str, Value),
    /// Inclusive on both ends.
    Between(&'static str, Value, Value),
    /// Calendar year of a date column.
    YearEq(&'static str, i32),
    And(Vec<Condition>),
}

impl Condition {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Eq(column, value.into())
    }

    pub fn between(column: &'static str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Condition::Between(column, low.into(), high.into())
    }

    pub fn year_eq(column: &'static str, year: i32) -> Self {
        Condition::YearEq(column, year)
    }

    /// Conjunction of `terms`, flattening nested conjunctions and dropping `True`.
    pub fn and(terms: impl IntoIterator<Item = Condition>) -> Self {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Condition::True => {}
                Condition::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Condition::True,
            1 => flat.remove(0),
            _ => Condition::And(flat),
        }
    }

    /// Conjunction of the present terms; absent ones impose no constraint.
    pub fn all_of(terms: impl IntoIterator<Item = Option<Condition>>) -> Self {
        Self::and(terms.into_iter().flatten())
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Condition::True)
    }

    /// Render as a SQL boolean expression, appending bind values in placeholder order.
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Condition::True => "1 = 1".to_string(),
            Condition::False => "1 = 0".to_string(),
            Condition::Eq(column, value) => {
                params.push(value.clone());
                format!("{} = ?", column)
            }
            Condition::Between(column, low, high) => {
                params.push(low.clone());
                params.push(high.clone());
                format!("{} BETWEEN ? AND ?", column)
            }
            Condition::YearEq(column, year) => {
                params.push(Value::Integer(i64::from(*year)));
                format!("CAST(strftime('%Y', {}) AS INTEGER) = ?", column)
            }
            Condition::And(terms) if terms.is_empty() => "1 = 1".to_string(),
            Condition::And(terms) => terms
                .iter()
                .map(|term| match term {
                    Condition::And(_) => format!("({})", term.to_sql(params)),
                    _ => term.to_sql(params),
                })
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }

    /// Evaluate against a stored record.
    pub fn matches(&self, mapping: &TableMapping, record: &Record) -> Result<bool> {
        match self {
            Condition::True => Ok(true),
            Condition::False => Ok(false),
            Condition::Eq(column, expected) => {
                let actual = record.get(mapping, column)?;
                Ok(compare(column, &actual, expected)? == Ordering::Equal)
            }
            Condition::Between(column, low, high) => {
                let actual = record.get(mapping, column)?;
                Ok(compare(column, &actual, low)? != Ordering::Less
                    && compare(column, &actual, high)? != Ordering::Greater)
            }
            Condition::YearEq(column, year) => {
                let actual = record.get(mapping, column)?;
                let date = actual.as_date().ok_or_else(|| {
                    StoreError::mapping(*column, "year extraction needs a date column")
                })?;
                Ok(date.year() == *year)
            }
            Condition::And(terms) => {
                for term in terms {
                    if !term.matches(mapping, record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

fn compare(column: &str, actual: &Value, expected: &Value) -> Result<Ordering> {
    actual.compare(expected).ok_or_else(|| {
        StoreError::mapping(
            column,
            format!(
                "cannot compare {:?} with {:?}",
                actual.column_type(),
                expected.column_type()
            ),
        )
    })
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::True => write!(f, "true"),
            Condition::False => write!(f, "false"),
            Condition::Eq(column, value) => write!(f, "{} = {}", column, value),
            Condition::Between(column, low, high) => {
                write!(f, "{} between {} and {}", column, low, high)
            }
            Condition::YearEq(column, year) => write!(f, "year({}) = {}", column, year),
            Condition::And(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    match term {
                        Condition::And(_) => write!(f, "({})", term)?,
                        _ => write!(f, "{}", term)?,
                    }
                }
                Ok(())
            }
        }
    }
}
