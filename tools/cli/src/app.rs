//! Wires configuration, stores and the HTTP fetcher into sync operations.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use gasp_common::{Entity, EntityId, EntityKind, Error, Restaurant, Review, User};
use gasp_remote::{HttpConfig, HttpFetcher};
use gasp_storage::{RecordStore, SqliteStore};
use gasp_sync::{BroadcastSink, RecordUpdater, StatusEvent, SyncEngine, SyncRequest};

use crate::config::GaspConfig;

/// One store per entity kind, all sharing the configured database file.
pub struct Gasp {
    config: GaspConfig,
    fetcher: Arc<HttpFetcher>,
    sink: Arc<BroadcastSink>,
    reviews: Arc<SqliteStore<Review>>,
    users: Arc<SqliteStore<User>>,
    restaurants: Arc<SqliteStore<Restaurant>>,
}

impl Gasp {
    pub fn new(config: GaspConfig, sink: Arc<BroadcastSink>) -> Result<Self> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        debug!("Using database {}", db_path.display());

        let fetcher = HttpFetcher::new(HttpConfig {
            timeout: config.request_timeout(),
            ..Default::default()
        })
        .context("Failed to create HTTP client")?;

        Ok(Self {
            fetcher: Arc::new(fetcher),
            sink,
            reviews: Arc::new(SqliteStore::new(&db_path)),
            users: Arc::new(SqliteStore::new(&db_path)),
            restaurants: Arc::new(SqliteStore::new(&db_path)),
            config,
        })
    }

    pub fn config(&self) -> &GaspConfig {
        &self.config
    }

    /// Run one unit of sync work.
    pub async fn handle(&self, request: SyncRequest) -> gasp_common::Result<StatusEvent> {
        match request {
            SyncRequest::Pass(EntityKind::Review) => self.pass(&self.reviews).await,
            SyncRequest::Pass(EntityKind::User) => self.pass(&self.users).await,
            SyncRequest::Pass(EntityKind::Restaurant) => self.pass(&self.restaurants).await,
            SyncRequest::Update { kind, id } => match kind {
                EntityKind::Review => self.update(&self.reviews, id).await,
                EntityKind::User => self.update(&self.users, id).await,
                EntityKind::Restaurant => self.update(&self.restaurants, id).await,
            },
            SyncRequest::Shutdown => Err(Error::InvalidArgument(
                "shutdown is not a unit of sync work".to_string(),
            )),
        }
    }

    async fn pass<E: Entity>(
        &self,
        store: &Arc<SqliteStore<E>>,
    ) -> gasp_common::Result<StatusEvent> {
        let source = self.config.resource_uri(E::KIND)?;
        let result = SyncEngine::new(store.clone(), self.fetcher.clone())
            .with_sink(self.sink.clone())
            .sync(&source)
            .await?;
        Ok(StatusEvent::Synced(result))
    }

    async fn update<E: Entity>(
        &self,
        store: &Arc<SqliteStore<E>>,
        id: EntityId,
    ) -> gasp_common::Result<StatusEvent> {
        let source = self.config.resource_uri(E::KIND)?;
        let record = RecordUpdater::new(store.clone(), self.fetcher.clone())
            .with_sink(self.sink.clone())
            .update_one(&source, id)
            .await?;
        Ok(StatusEvent::Updated {
            kind: E::KIND,
            id: record.id(),
        })
    }

    /// Stored records of `kind` as JSON lines, newest first.
    pub fn list(&self, kind: EntityKind, limit: usize) -> Result<Vec<String>> {
        match kind {
            EntityKind::Review => Self::list_store(&self.reviews, limit),
            EntityKind::User => Self::list_store(&self.users, limit),
            EntityKind::Restaurant => Self::list_store(&self.restaurants, limit),
        }
    }

    fn list_store<E: Entity>(store: &SqliteStore<E>, limit: usize) -> Result<Vec<String>> {
        let open = store
            .open_scoped()
            .with_context(|| format!("Failed to open {} store", E::KIND))?;
        let records = open
            .all_ordered_descending()
            .with_context(|| format!("Failed to read {}", E::KIND))?;

        records
            .iter()
            .take(limit)
            .map(|record| serde_json::to_string(record).context("Failed to encode record"))
            .collect()
    }
}
