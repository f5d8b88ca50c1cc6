//! Sync scheduling - manual and periodic triggering.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use gasp_common::{EntityId, EntityKind, Error, Result};

use crate::status::StatusEvent;

/// Sync mode configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// Sync only when requested.
    Manual,
    /// Additionally run a pass for every kind at regular intervals.
    Periodic { interval: Duration },
}

/// Work the scheduler can be asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    /// Bulk pass for one entity kind.
    Pass(EntityKind),
    /// Targeted update of one record.
    Update { kind: EntityKind, id: EntityId },
    /// Stop the scheduler.
    Shutdown,
}

type Reply = oneshot::Sender<Result<StatusEvent>>;

/// Front end for submitting sync work to a running scheduler.
#[derive(Clone)]
pub struct SyncScheduler {
    mode: Arc<RwLock<SyncMode>>,
    request_tx: mpsc::Sender<(SyncRequest, Reply)>,
}

impl SyncScheduler {
    /// Create a new scheduler with the given mode.
    ///
    /// `kinds` are the entity kinds synchronized on every periodic tick.
    pub fn new(mode: SyncMode, kinds: Vec<EntityKind>) -> (Self, SyncSchedulerHandle) {
        let (request_tx, request_rx) = mpsc::channel(100);
        let mode = Arc::new(RwLock::new(mode));

        let scheduler = Self {
            mode: mode.clone(),
            request_tx,
        };

        let handle = SyncSchedulerHandle {
            mode,
            kinds,
            request_rx,
        };

        (scheduler, handle)
    }

    /// Run a bulk pass for `kind` and wait for its outcome.
    pub async fn request_pass(&self, kind: EntityKind) -> Result<StatusEvent> {
        self.request(SyncRequest::Pass(kind)).await
    }

    /// Fetch and store record `id` of `kind` and wait for the outcome.
    pub async fn request_update(&self, kind: EntityKind, id: EntityId) -> Result<StatusEvent> {
        self.request(SyncRequest::Update { kind, id }).await
    }

    async fn request(&self, request: SyncRequest) -> Result<StatusEvent> {
        let (response_tx, response_rx) = oneshot::channel();

        self.request_tx
            .send((request, response_tx))
            .await
            .map_err(|_| Error::SchedulerStopped)?;

        response_rx.await.map_err(|_| Error::SchedulerStopped)?
    }

    /// Change the sync mode.
    ///
    /// The running loop picks the new mode up after its next request or tick.
    pub async fn set_mode(&self, mode: SyncMode) {
        *self.mode.write().await = mode;
    }

    /// Get current sync mode.
    pub async fn get_mode(&self) -> SyncMode {
        self.mode.read().await.clone()
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&self) {
        let (response_tx, _) = oneshot::channel();
        let _ = self
            .request_tx
            .send((SyncRequest::Shutdown, response_tx))
            .await;
    }
}

/// Handle for the scheduler background task.
pub struct SyncSchedulerHandle {
    mode: Arc<RwLock<SyncMode>>,
    kinds: Vec<EntityKind>,
    request_rx: mpsc::Receiver<(SyncRequest, Reply)>,
}

impl SyncSchedulerHandle {
    /// Run the scheduler background task.
    ///
    /// This should be spawned in a tokio task. `sync_fn` is called for every
    /// requested or periodic unit of work; requests run one at a time. The
    /// loop ends on a shutdown request or once every [`SyncScheduler`] is
    /// dropped.
    pub async fn run<F, Fut>(mut self, sync_fn: F)
    where
        F: Fn(SyncRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StatusEvent>> + Send,
    {
        let mut current_mode = self.mode.read().await.clone();
        let mut periodic = Self::create_periodic_interval(&current_mode);

        info!("Sync scheduler started ({:?})", current_mode);

        loop {
            tokio::select! {
                received = self.request_rx.recv() => {
                    let Some((request, response_tx)) = received else {
                        info!("All schedulers dropped, stopping");
                        break;
                    };
                    if request == SyncRequest::Shutdown {
                        info!("Received shutdown request");
                        break;
                    }
                    debug!("Processing sync request: {:?}", request);
                    let result = sync_fn(request).await;
                    let _ = response_tx.send(result);
                }

                _ = Self::wait_for_periodic(&mut periodic) => {
                    debug!("Triggering periodic sync");
                    for kind in &self.kinds {
                        match sync_fn(SyncRequest::Pass(*kind)).await {
                            Ok(event) => info!("Periodic sync completed: {}", event),
                            Err(e) => error!("Periodic sync of {} failed: {}", kind, e),
                        }
                    }
                }
            }

            let mode = self.mode.read().await.clone();
            if mode != current_mode {
                info!("Sync mode changed to {:?}", mode);
                periodic = Self::create_periodic_interval(&mode);
                current_mode = mode;
            }
        }
    }

    fn create_periodic_interval(mode: &SyncMode) -> Option<Interval> {
        match mode {
            SyncMode::Periodic { interval: period } => {
                let mut ticker = interval(*period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(ticker)
            }
            SyncMode::Manual => None,
        }
    }

    async fn wait_for_periodic(interval: &mut Option<Interval>) {
        match interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
