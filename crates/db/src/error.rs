//! Error types for shelf-db

use thiserror::Error;

/// Failures surfaced by a [`crate::Store`].
///
/// Driver errors pass through untouched; only failures that originate in
/// this crate (hydration, lock poisoning, bad URLs) get their own variant.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("column '{column}' could not be mapped: {message}")]
    Mapping { column: String, message: String },

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("no row with identity {id} in '{table}'")]
    MissingRow { table: String, id: i64 },

    #[error("store lock poisoned")]
    Poisoned,

    #[error(
        "unsupported database url '{0}'; \
         expected sqlite::memory:, sqlite://<path> or memory://"
    )]
    UnsupportedUrl(String),
}

impl StoreError {
    pub fn mapping(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            column: column.into(),
            message: message.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
