//! Record store trait definition.

use std::ops::Deref;

use gasp_common::{Entity, EntityId, StoreResult};

/// Keyed local storage for one entity type.
///
/// All data operations require the store to be open. Opens are reference
/// counted: every successful [`RecordStore::open`] must be paired with one
/// [`RecordStore::close`], and the underlying handle is released when the
/// last holder closes. Prefer [`RecordStore::open_scoped`], which pairs them
/// automatically.
///
/// Implementations must serialize access internally; concurrent callers
/// may interleave inserts, and duplicate-key rejection is the only
/// guarantee they rely on.
pub trait RecordStore: Send + Sync {
    /// The entity type held by this store.
    type Record: Entity;

    /// Acquire a handle on the underlying storage.
    ///
    /// # Errors
    /// - `StoreError::Unavailable` if the storage cannot be opened
    fn open(&self) -> StoreResult<()>;

    /// Release one handle. Closing an already closed store is a no-op.
    fn close(&self);

    /// Whether at least one handle is held.
    fn is_open(&self) -> bool;

    /// Highest stored id, or `EntityId::NONE` when the store is empty.
    ///
    /// Correct regardless of the order records were inserted in.
    fn highest_id(&self) -> StoreResult<EntityId>;

    /// Add a record that is not yet stored.
    ///
    /// # Postconditions
    /// - On success the record is durably stored under its id
    /// - On failure existing records are unchanged
    ///
    /// # Errors
    /// - `StoreError::DuplicateKey` if a record with the same id exists
    /// - `StoreError::NotOpen` if no handle is held
    fn insert(&self, record: &Self::Record) -> StoreResult<()>;

    /// Look up a record by id.
    fn get(&self, id: EntityId) -> StoreResult<Option<Self::Record>>;

    /// All records, newest (highest id) first.
    fn all_ordered_descending(&self) -> StoreResult<Vec<Self::Record>>;

    /// Number of stored records.
    fn count(&self) -> StoreResult<usize>;

    /// Open the store for the lifetime of the returned guard.
    fn open_scoped(&self) -> StoreResult<OpenStore<'_, Self>>
    where
        Self: Sized,
    {
        self.open()?;
        Ok(OpenStore { store: self })
    }
}

/// An open handle on a record store; closes the handle on drop.
#[derive(Debug)]
pub struct OpenStore<'a, S: RecordStore> {
    store: &'a S,
}

impl<S: RecordStore> Deref for OpenStore<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: RecordStore> Drop for OpenStore<'_, S> {
    fn drop(&mut self) {
        self.store.close();
    }
}
