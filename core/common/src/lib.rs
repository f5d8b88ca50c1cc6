//! Common utilities and types shared across the Gasp sync modules.
//!
//! This module provides the entity model and error taxonomy used by the
//! record stores, the remote fetchers and the sync engine.

pub mod error;
pub mod types;

pub use error::{Error, FailureCause, FetchError, FetchResult, Result, StoreError, StoreResult};
pub use types::{Entity, EntityId, EntityKind, ResourceUri, Restaurant, Review, User};
