//! Bulk sync pass for one entity type.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use gasp_common::{Entity, EntityId, EntityKind, Error, ResourceUri, Result, StoreError};
use gasp_remote::RemoteFetcher;
use gasp_storage::RecordStore;

use crate::status::{NullSink, StatusEvent, StatusSink};

/// Summary of one completed pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    pub kind: EntityKind,
    /// High-water mark observed before ingestion.
    pub found: EntityId,
    /// Records inserted during this pass.
    pub loaded: usize,
    /// Candidates rejected as already present.
    pub skipped: usize,
    pub source: ResourceUri,
    pub duration: Duration,
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sync: Found {}, Loaded {} {} from {}",
            self.found, self.loaded, self.kind, self.source
        )
    }
}

/// Result of attempting to ingest one record.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted,
    /// Already stored; the pass continues.
    Duplicate,
    /// The pass must stop.
    Fatal(StoreError),
}

impl From<std::result::Result<(), StoreError>> for InsertOutcome {
    fn from(result: std::result::Result<(), StoreError>) -> Self {
        match result {
            Ok(()) => InsertOutcome::Inserted,
            Err(StoreError::DuplicateKey(_)) => InsertOutcome::Duplicate,
            Err(e) => InsertOutcome::Fatal(e),
        }
    }
}

/// Catches a local store up with a remote collection.
///
/// The engine holds no state between passes. Each pass reads the local
/// high-water mark, fetches the whole remote collection and inserts, in the
/// order received, every record with a higher id. Records rejected as
/// duplicates are skipped; any other store failure ends the pass, leaving
/// the records already inserted in place.
pub struct SyncEngine<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    sink: Arc<dyn StatusSink>,
}

impl<S, F> SyncEngine<S, F>
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

    /// Publish pass results to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one pass against the collection at `source`.
    ///
    /// # Errors
    /// - `Error::StoreUnavailable` if the store cannot be opened; nothing is fetched
    /// - `Error::SyncFailed` with a fetch cause if retrieval fails; the store is untouched
    /// - `Error::SyncFailed` with a store cause if a non-duplicate insert fails
    pub async fn sync(&self, source: &ResourceUri) -> Result<SyncResult> {
        let start = Instant::now();
        let kind = <S::Record as Entity>::KIND;

        let store = self.store.open_scoped().map_err(|e| {
            error!("Cannot open {} store: {}", kind, e);
            Error::StoreUnavailable(e.to_string())
        })?;

        let found = store.highest_id().map_err(Error::sync_failed)?;
        info!("Syncing {} from {} (local high-water mark {})", kind, source, found);

        let records = self
            .fetcher
            .fetch_all::<S::Record>(source)
            .await
            .map_err(|e| {
                error!("Fetching {} failed: {}", kind, e);
                Error::sync_failed(e)
            })?;

        let mut loaded = 0;
        let mut skipped = 0;

        for record in records.iter().filter(|r| r.id() > found) {
            match InsertOutcome::from(store.insert(record)) {
                InsertOutcome::Inserted => loaded += 1,
                InsertOutcome::Duplicate => {
                    debug!("Skipping {} {}: already present", kind.label(), record.id());
                    skipped += 1;
                }
                InsertOutcome::Fatal(e) => {
                    error!(
                        "Sync of {} aborted at {} {} after {} inserts: {}",
                        kind,
                        kind.label(),
                        record.id(),
                        loaded,
                        e
                    );
                    return Err(Error::sync_failed(e));
                }
            }
        }
        drop(store);

        let result = SyncResult {
            kind,
            found,
            loaded,
            skipped,
            source: source.clone(),
            duration: start.elapsed(),
        };
        info!("{}", result);
        self.sink.publish(StatusEvent::Synced(result.clone()));

        Ok(result)
    }
}
