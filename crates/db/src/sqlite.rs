//! SQLite-backed store.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params_from_iter, Connection};

use crate::condition::Condition;
use crate::error::{Result, StoreError};
use crate::schema::TableMapping;
use crate::store::{Record, Select, Store};
use crate::value::Value;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(target: "shelf-db", path = %path.display(), "opening sqlite store");
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        tracing::info!(target: "shelf-db", "opening in-memory sqlite store");
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

fn select_sql(mapping: &TableMapping, select: &Select, params: &mut Vec<Value>) -> String {
    let columns = std::iter::once(mapping.identity)
        .chain(mapping.columns.iter().map(|c| c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("SELECT {} FROM {}", columns, mapping.table);
    if !select.condition.is_true() {
        sql.push_str(" WHERE ");
        sql.push_str(&select.condition.to_sql(params));
    }
    sql.push_str(&format!(" ORDER BY {} ASC", mapping.identity));
    if let Some(page) = select.page {
        params.push(Value::Integer(i64::from(page.size)));
        params.push(Value::Integer(
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ));
        sql.push_str(" LIMIT ? OFFSET ?");
    }
    sql
}

impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn ensure_table(&self, mapping: &TableMapping) -> Result<()> {
        let sql = mapping.create_table_sql();
        tracing::debug!(target: "shelf-db", %sql, "ensuring table");
        self.conn.lock()?.execute_batch(&sql)?;
        Ok(())
    }

    fn insert(&self, mapping: &TableMapping, values: Vec<Value>) -> Result<i64> {
        mapping.check_values(&values)?;
        let names = mapping
            .columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; mapping.columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            mapping.table, names, placeholders
        );

        let conn = self.conn.lock()?;
        conn.execute(&sql, params_from_iter(values.iter()))?;
        let id = conn.last_insert_rowid();
        tracing::debug!(target: "shelf-db", table = mapping.table, id, "inserted row");
        Ok(id)
    }

    fn update(&self, mapping: &TableMapping, id: i64, values: Vec<Value>) -> Result<()> {
        mapping.check_values(&values)?;
        let assignments = mapping
            .columns
            .iter()
            .map(|c| format!("{} = ?", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            mapping.table, assignments, mapping.identity
        );

        let mut params = values;
        params.push(Value::Integer(id));
        let updated = self
            .conn
            .lock()?
            .execute(&sql, params_from_iter(params.iter()))?;
        if updated == 0 {
            return Err(StoreError::MissingRow {
                table: mapping.table.to_string(),
                id,
            });
        }
        tracing::debug!(target: "shelf-db", table = mapping.table, id, "updated row");
        Ok(())
    }

    fn select(&self, mapping: &TableMapping, select: &Select) -> Result<Vec<Record>> {
        let mut params = Vec::new();
        let sql = select_sql(mapping, select, &mut params);
        tracing::debug!(target: "shelf-db", %sql, params = params.len(), "executing select");

        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let mut values = Vec::with_capacity(mapping.columns.len());
            for (i, column) in mapping.columns.iter().enumerate() {
                values.push(Value::from_sql(column.name, column.ty, row.get_ref(i + 1)?)?);
            }
            records.push(Record::new(id, values));
        }
        Ok(records)
    }

    fn delete(&self, mapping: &TableMapping, condition: &Condition) -> Result<usize> {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", mapping.table);
        if !condition.is_true() {
            sql.push_str(" WHERE ");
            sql.push_str(&condition.to_sql(&mut params));
        }
        let removed = self
            .conn
            .lock()?
            .execute(&sql, params_from_iter(params.iter()))?;
        tracing::debug!(target: "shelf-db", table = mapping.table, removed, "deleted rows");
        Ok(removed)
    }
}
