//! Typed access to a [`Store`] for one mapped entity.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::condition::Condition;
use crate::error::Result;
use crate::schema::TableMapping;
use crate::store::{Record, Select, Store};
use crate::value::Value;

/// An entity persisted through an explicit [`TableMapping`].
pub trait Entity: Sized {
    /// Entity name as used by query languages, e.g. `Book`.
    fn name() -> &'static str;

    fn mapping() -> &'static TableMapping;

    /// Store-assigned identity, `None` until first saved.
    fn id(&self) -> Option<i64>;

    /// Column values in mapping order, identity excluded.
    fn to_values(&self) -> Vec<Value>;

    fn from_record(record: Record) -> Result<Self>;
}

/// Save / find / delete for one entity type over a shared store.
pub struct EntityRepository<E> {
    store: Arc<dyn Store>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityRepository<E> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Insert a new entity, or overwrite the row of one that already has an identity.
    pub fn save(&self, entity: E) -> Result<E> {
        let values = entity.to_values();
        let id = match entity.id() {
            Some(id) => {
                self.store.update(E::mapping(), id, values.clone())?;
                id
            }
            None => self.store.insert(E::mapping(), values.clone())?,
        };
        E::from_record(Record::new(id, values))
    }

    pub fn find(&self, select: &Select) -> Result<Vec<E>> {
        self.store
            .select(E::mapping(), select)?
            .into_iter()
            .map(E::from_record)
            .collect()
    }

    pub fn delete_where(&self, condition: &Condition) -> Result<usize> {
        self.store.delete(E::mapping(), condition)
    }

    pub fn delete_all(&self) -> Result<()> {
        let removed = self.delete_where(&Condition::True)?;
        tracing::debug!(target: "shelf-db", entity = E::name(), removed, "deleted all");
        Ok(())
    }
}
