//! Explicit table mappings handed to a store at startup.

use crate::error::{Result, StoreError};
use crate::value::{ColumnType, Value};

/// How the identity column receives its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityStrategy {
    /// Monotonic; identities of deleted rows are never handed out again.
    #[default]
    Autoincrement,
    /// Next identity is one past the current maximum, so deleted ids may return.
    Rowid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl ColumnMapping {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

/// Field-to-column mapping for one entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    pub table: &'static str,
    pub identity: &'static str,
    pub strategy: IdentityStrategy,
    pub columns: Vec<ColumnMapping>,
}

impl TableMapping {
    pub fn new(table: &'static str, identity: &'static str) -> Self {
        Self {
            table,
            identity,
            strategy: IdentityStrategy::default(),
            columns: Vec::new(),
        }
    }

    pub fn strategy(mut self, strategy: IdentityStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn column(mut self, name: &'static str, ty: ColumnType) -> Self {
        self.columns.push(ColumnMapping::new(name, ty));
        self
    }

    /// Position of a non-identity column.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }

    pub fn create_table_sql(&self) -> String {
        let identity = match self.strategy {
            IdentityStrategy::Autoincrement => "INTEGER PRIMARY KEY AUTOINCREMENT",
            IdentityStrategy::Rowid => "INTEGER PRIMARY KEY",
        };
        let mut columns = vec![format!("{} {}", self.identity, identity)];
        columns.extend(
            self.columns
                .iter()
                .map(|c| format!("{} {} NOT NULL", c.name, c.ty.sql_type())),
        );
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            columns.join(", ")
        )
    }

    /// Check that `values` line up with the mapped columns before they reach a store.
    pub fn check_values(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(StoreError::mapping(
                self.table,
                format!(
                    "expected {} values, got {}",
                    self.columns.len(),
                    values.len()
                ),
            ));
        }
        for (column, value) in self.columns.iter().zip(values) {
            if column.ty != value.column_type() {
                return Err(StoreError::mapping(
                    column.name,
                    format!("expected {:?}, got {:?}", column.ty, value.column_type()),
                ));
            }
        }
        Ok(())
    }
}
