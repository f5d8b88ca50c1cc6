//! Local record stores for synchronized Gasp entities.
//!
//! This module provides a trait-based interface over keyed, per-entity-type
//! storage, plus an in-memory backend and a SQLite backend.
//!
//! # Design Principles
//! - Ids are assigned remotely; a store never invents or rewrites them
//! - Insert-if-new: a second insert of the same id is rejected, never merged
//! - Scoped access: handles are reference counted and closed on drop
//! - No high-water mark is persisted; it is always derived from the rows

pub mod memory;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{OpenStore, RecordStore};
