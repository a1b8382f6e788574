use crate::condition::Condition;
use crate::error::{Result, StoreError};
use crate::schema::TableMapping;
use crate::value::Value;

/// A persisted row: store-assigned identity plus mapped column values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(id: i64, values: Vec<Value>) -> Self {
        Self { id, values }
    }

    /// Value of `column`, including the identity column.
    pub fn get(&self, mapping: &TableMapping, column: &str) -> Result<Value> {
        if column == mapping.identity {
            return Ok(Value::Integer(self.id));
        }
        mapping
            .position(column)
            .and_then(|i| self.values.get(i))
            .cloned()
            .ok_or_else(|| {
                StoreError::mapping(column, format!("not mapped on '{}'", mapping.table))
            })
    }
}

/// Zero-based page request, passed through to the store as LIMIT/OFFSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number) * u64::from(self.size)
    }
}

/// A read against one table. Rows always come back in identity order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub condition: Condition,
    pub page: Option<Page>,
}

impl Select {
    pub fn all() -> Self {
        Self {
            condition: Condition::True,
            page: None,
        }
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }
}

impl Default for Select {
    fn default() -> Self {
        Self::all()
    }
}

/// Persistence capability the repositories are written against.
///
/// Implementations are blocking and must be safe to share across threads.
pub trait Store: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Create the mapped table if it does not exist yet.
    fn ensure_table(&self, mapping: &TableMapping) -> Result<()>;

    /// Insert one row and return its generated identity.
    fn insert(&self, mapping: &TableMapping, values: Vec<Value>) -> Result<i64>;

    /// Overwrite the mapped columns of the row with identity `id`.
    fn update(&self, mapping: &TableMapping, id: i64, values: Vec<Value>) -> Result<()>;

    fn select(&self, mapping: &TableMapping, select: &Select) -> Result<Vec<Record>>;

    /// Delete every row matching `condition`, returning how many were removed.
    fn delete(&self, mapping: &TableMapping, condition: &Condition) -> Result<usize>;
}
