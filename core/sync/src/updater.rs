//! Targeted refresh of a single record.

use std::sync::Arc;

use tracing::{error, info};

use gasp_common::{Entity, EntityId, Error, FailureCause, ResourceUri, Result, StoreError};
use gasp_remote::RemoteFetcher;
use gasp_storage::RecordStore;

use crate::status::{NullSink, StatusEvent, StatusSink};

/// Fetches and stores one named record, e.g. on a push notification.
///
/// Unlike a bulk pass, a record that is already stored is reported to the
/// caller as `FailureCause::AlreadyExists` instead of being skipped.
pub struct RecordUpdater<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    sink: Arc<dyn StatusSink>,
}

impl<S, F> RecordUpdater<S, F>
where
    S: RecordStore,
    F: RemoteFetcher,
{
    pub fn new(store: Arc<S>, fetcher: Arc<F>) -> Self {
        Self {
            store,
            fetcher,
            sink: Arc::new(NullSink),
        }
    }

    /// Publish updates to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Fetch record `id` from the collection at `source` and store it.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if `id` is the "no id" sentinel; nothing is fetched
    /// - `Error::UpdateFailed` with a fetch cause if retrieval fails
    /// - `Error::StoreUnavailable` if the store cannot be opened
    /// - `Error::UpdateFailed` with `AlreadyExists` if the record is already stored
    /// - `Error::UpdateFailed` with a store cause on any other store failure
    pub async fn update_one(&self, source: &ResourceUri, id: EntityId) -> Result<S::Record> {
        let kind = <S::Record as Entity>::KIND;
        if id.is_none() {
            return Err(Error::InvalidArgument(format!(
                "no {} id provided",
                kind.label()
            )));
        }

        let record = self
            .fetcher
            .fetch_one::<S::Record>(source, id)
            .await
            .map_err(|e| {
                error!("Fetching {} {} failed: {}", kind.label(), id, e);
                Error::update_failed(e)
            })?;

        let store = self.store.open_scoped().map_err(|e| {
            error!("Cannot open {} store: {}", kind, e);
            Error::StoreUnavailable(e.to_string())
        })?;

        store.insert(&record).map_err(|e| match e {
            StoreError::DuplicateKey(id) => {
                info!("{} {} is already stored", kind.label(), id);
                Error::update_failed(FailureCause::AlreadyExists(id))
            }
            other => {
                error!("Storing {} {} failed: {}", kind.label(), id, other);
                Error::update_failed(other)
            }
        })?;
        drop(store);

        let event = StatusEvent::Updated { kind, id };
        info!("{}", event);
        self.sink.publish(event);

        Ok(record)
    }
}
