//! In-memory record store for testing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use gasp_common::{Entity, EntityId, StoreError, StoreResult};

use crate::store::RecordStore;

#[derive(Debug)]
struct Inner<E> {
    records: BTreeMap<EntityId, E>,
    handles: usize,
}

/// In-memory record store.
///
/// Useful for testing and development. Records survive close/open cycles
/// but are lost on drop.
pub struct MemoryStore<E: Entity> {
    inner: Mutex<Inner<E>>,
}

impl<E: Entity> MemoryStore<E> {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: BTreeMap::new(),
                handles: 0,
            }),
        }
    }

    /// Create a store pre-populated with `records`.
    ///
    /// Later records with an id already seen are ignored.
    pub fn with_records(records: impl IntoIterator<Item = E>) -> Self {
        let mut map = BTreeMap::new();
        for record in records {
            map.entry(record.id()).or_insert(record);
        }
        Self {
            inner: Mutex::new(Inner {
                records: map,
                handles: 0,
            }),
        }
    }

    /// Ids currently stored, ascending. Does not require the store to be open.
    pub fn ids(&self) -> Vec<EntityId> {
        match self.inner.lock() {
            Ok(inner) => inner.records.keys().copied().collect(),
            Err(poisoned) => poisoned.into_inner().records.keys().copied().collect(),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner<E>>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn lock_open(&self) -> StoreResult<MutexGuard<'_, Inner<E>>> {
        let inner = self.lock()?;
        if inner.handles == 0 {
            return Err(StoreError::NotOpen);
        }
        Ok(inner)
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for MemoryStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("kind", &E::KIND)
            .field("records", &self.ids().len())
            .finish()
    }
}

impl<E: Entity> RecordStore for MemoryStore<E> {
    type Record = E;

    fn open(&self) -> StoreResult<()> {
        self.lock()?.handles += 1;
        Ok(())
    }

    fn close(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.handles = inner.handles.saturating_sub(1);
        }
    }

    fn is_open(&self) -> bool {
        self.inner.lock().map(|i| i.handles > 0).unwrap_or(false)
    }

    fn highest_id(&self) -> StoreResult<EntityId> {
        let inner = self.lock_open()?;
        Ok(inner
            .records
            .keys()
            .next_back()
            .copied()
            .unwrap_or(EntityId::NONE))
    }

    fn insert(&self, record: &E) -> StoreResult<()> {
        let mut inner = self.lock_open()?;
        let id = record.id();
        if inner.records.contains_key(&id) {
            return Err(StoreError::DuplicateKey(id));
        }
        inner.records.insert(id, record.clone());
        Ok(())
    }

    fn get(&self, id: EntityId) -> StoreResult<Option<E>> {
        Ok(self.lock_open()?.records.get(&id).cloned())
    }

    fn all_ordered_descending(&self) -> StoreResult<Vec<E>> {
        Ok(self.lock_open()?.records.values().rev().cloned().collect())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.lock_open()?.records.len())
    }
}
