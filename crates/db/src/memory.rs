//! In-process store evaluating conditions directly against rows.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::condition::Condition;
use crate::error::{Result, StoreError};
use crate::schema::{IdentityStrategy, TableMapping};
use crate::store::{Record, Select, Store};
use crate::value::Value;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    // highest identity ever handed out
    sequence: i64,
}

impl Table {
    fn next_id(&mut self, strategy: IdentityStrategy) -> i64 {
        let id = match strategy {
            IdentityStrategy::Autoincrement => self.sequence + 1,
            IdentityStrategy::Rowid => self.rows.iter().map(|r| r.id).max().unwrap_or(0) + 1,
        };
        self.sequence = self.sequence.max(id);
        id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn ensure_table(&self, mapping: &TableMapping) -> Result<()> {
        self.tables.write()?.entry(mapping.table).or_default();
        Ok(())
    }

    fn insert(&self, mapping: &TableMapping, values: Vec<Value>) -> Result<i64> {
        mapping.check_values(&values)?;
        let mut tables = self.tables.write()?;
        let table = tables
            .get_mut(mapping.table)
            .ok_or_else(|| StoreError::UnknownTable(mapping.table.to_string()))?;
        let id = table.next_id(mapping.strategy);
        table.rows.push(Record::new(id, values));
        tracing::debug!(target: "shelf-db", table = mapping.table, id, "inserted row");
        Ok(id)
    }

    fn update(&self, mapping: &TableMapping, id: i64, values: Vec<Value>) -> Result<()> {
        mapping.check_values(&values)?;
        let mut tables = self.tables.write()?;
        let row = tables
            .get_mut(mapping.table)
            .ok_or_else(|| StoreError::UnknownTable(mapping.table.to_string()))?
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::MissingRow {
                table: mapping.table.to_string(),
                id,
            })?;
        row.values = values;
        Ok(())
    }

    fn select(&self, mapping: &TableMapping, select: &Select) -> Result<Vec<Record>> {
        let tables = self.tables.read()?;
        let table = tables
            .get(mapping.table)
            .ok_or_else(|| StoreError::UnknownTable(mapping.table.to_string()))?;

        let mut matched = Vec::new();
        for row in &table.rows {
            if select.condition.matches(mapping, row)? {
                matched.push(row.clone());
            }
        }
        matched.sort_by_key(|r| r.id);

        Ok(match select.page {
            Some(page) => matched
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(page.size as usize)
                .collect(),
            None => matched,
        })
    }

    fn delete(&self, mapping: &TableMapping, condition: &Condition) -> Result<usize> {
        let mut tables = self.tables.write()?;
        let table = tables
            .get_mut(mapping.table)
            .ok_or_else(|| StoreError::UnknownTable(mapping.table.to_string()))?;

        // evaluate everything first so a failing condition leaves the table intact
        let doomed = table
            .rows
            .iter()
            .map(|row| condition.matches(mapping, row))
            .collect::<Result<Vec<_>>>()?;
        let mut verdicts = doomed.iter();
        table.rows.retain(|_| !verdicts.next().copied().unwrap_or(false));

        let removed = doomed.iter().filter(|d| **d).count();
        tracing::debug!(target: "shelf-db", table = mapping.table, removed, "deleted rows");
        Ok(removed)
    }
}
