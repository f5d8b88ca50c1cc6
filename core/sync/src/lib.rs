//! Gasp Sync Engine
//!
//! This module provides incremental synchronization of remote collections
//! into local record stores, including:
//! - Bulk passes filtered by the local high-water mark
//! - Targeted single-record updates
//! - Status events for listeners
//! - A scheduler for manual and periodic triggering

pub mod engine;
pub mod scheduler;
pub mod status;
pub mod updater;

// Re-export main types
pub use engine::{InsertOutcome, SyncEngine, SyncResult};
pub use scheduler::{SyncMode, SyncRequest, SyncScheduler, SyncSchedulerHandle};
pub use status::{BroadcastSink, NullSink, StatusEvent, StatusSink};
pub use updater::RecordUpdater;
