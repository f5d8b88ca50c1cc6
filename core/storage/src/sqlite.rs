//! SQLite-backed record store.
//!
//! Each entity kind lives in its own table keyed by the remote id. The
//! record itself is kept as its JSON wire form so the table layout does not
//! depend on the entity's fields.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use gasp_common::{Entity, EntityId, StoreError, StoreResult};

use crate::store::RecordStore;

struct Inner {
    conn: Option<Connection>,
    handles: usize,
}

/// Record store persisted in a SQLite database file.
///
/// The connection is opened by the first [`RecordStore::open`] and dropped
/// by the matching last [`RecordStore::close`]. Several stores (one per
/// entity kind) may share the same database file.
pub struct SqliteStore<E: Entity> {
    path: PathBuf,
    inner: Mutex<Inner>,
    _record: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteStore<E> {
    /// Create a store backed by the database at `path`.
    ///
    /// Nothing is touched on disk until the store is opened.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            inner: Mutex::new(Inner {
                conn: None,
                handles: 0,
            }),
            _record: PhantomData,
        }
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table() -> &'static str {
        E::KIND.table()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("sqlite store lock poisoned".to_string()))
    }

    fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.path).map_err(|e| {
            StoreError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                body TEXT NOT NULL,
                ingested_at INTEGER NOT NULL
            );
            "#,
            table = Self::table()
        ))
        .map_err(|e| StoreError::Unavailable(format!("schema init failed: {}", e)))?;

        info!(
            "Opened {} store at {}",
            Self::table(),
            self.path.display()
        );
        Ok(conn)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let inner = self.lock()?;
        let conn = inner.conn.as_ref().ok_or(StoreError::NotOpen)?;
        f(conn)
    }

    fn decode(body: &str) -> StoreResult<E> {
        serde_json::from_str(body).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

impl<E: Entity> fmt::Debug for SqliteStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("kind", &E::KIND)
            .field("path", &self.path)
            .finish()
    }
}

impl<E: Entity> RecordStore for SqliteStore<E> {
    type Record = E;

    fn open(&self) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.handles == 0 {
            inner.conn = Some(self.connect()?);
        }
        inner.handles += 1;
        Ok(())
    }

    fn close(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.handles == 0 {
            return;
        }
        inner.handles -= 1;
        if inner.handles == 0 {
            inner.conn = None;
            debug!("Closed {} store", Self::table());
        }
    }

    fn is_open(&self) -> bool {
        self.inner.lock().map(|i| i.handles > 0).unwrap_or(false)
    }

    fn highest_id(&self) -> StoreResult<EntityId> {
        self.with_conn(|conn| {
            let max: i64 = conn
                .query_row(
                    &format!("SELECT COALESCE(MAX(id), 0) FROM {}", Self::table()),
                    [],
                    |row| row.get(0),
                )
                .map_err(backend)?;
            Ok(EntityId::new(max))
        })
    }

    fn insert(&self, record: &E) -> StoreResult<()> {
        let id = record.id();
        let body =
            serde_json::to_string(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, body, ingested_at) VALUES (?1, ?2, ?3)",
                    Self::table()
                ),
                params![id.get(), body, Utc::now().timestamp()],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref failure, _)
                    if failure.code == ErrorCode::ConstraintViolation =>
                {
                    StoreError::DuplicateKey(id)
                }
                other => backend(other),
            })?;
            debug!("Inserted {} {}", E::KIND.label(), id);
            Ok(())
        })
    }

    fn get(&self, id: EntityId) -> StoreResult<Option<E>> {
        self.with_conn(|conn| {
            let body: Option<String> = conn
                .query_row(
                    &format!("SELECT body FROM {} WHERE id = ?1", Self::table()),
                    [id.get()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(backend)?;
            body.as_deref().map(Self::decode).transpose()
        })
    }

    fn all_ordered_descending(&self) -> StoreResult<Vec<E>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT body FROM {} ORDER BY id DESC", Self::table()))
                .map_err(backend)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(backend)?;

            let mut records = Vec::new();
            for body in rows {
                records.push(Self::decode(&body.map_err(backend)?)?);
            }
            Ok(records)
        })
    }

    fn count(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", Self::table()), [], |row| {
                    row.get(0)
                })
                .map_err(backend)?;
            Ok(count as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasp_common::{Review, User};
    use tempfile::TempDir;

    fn review(id: i64) -> Review {
        Review {
            id: EntityId::new(id),
            url: format!("/reviews/{}", id),
            star: 4,
            comment: format!("comment {}", id),
            restaurant: "/restaurants/1".to_string(),
            user: "/users/1".to_string(),
        }
    }

    fn store_in(dir: &TempDir) -> SqliteStore<Review> {
        SqliteStore::new(dir.path().join("gasp.db"))
    }

    #[test]
    fn test_empty_store_highest_id_is_zero() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let open = store.open_scoped().unwrap();
        assert_eq!(open.highest_id().unwrap(), EntityId::NONE);
        assert_eq!(open.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_query() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let open = store.open_scoped().unwrap();

        for id in [3, 1, 2] {
            open.insert(&review(id)).unwrap();
        }

        assert_eq!(open.highest_id().unwrap(), EntityId::new(3));
        assert_eq!(open.get(EntityId::new(2)).unwrap(), Some(review(2)));
        assert_eq!(open.get(EntityId::new(8)).unwrap(), None);

        let ids: Vec<_> = open
            .all_ordered_descending()
            .unwrap()
            .iter()
            .map(|r| r.id.get())
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let open = store.open_scoped().unwrap();

        open.insert(&review(5)).unwrap();
        let mut changed = review(5);
        changed.comment = "rewritten".to_string();

        let err = open.insert(&changed).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(id) if id == EntityId::new(5)));
        assert_eq!(open.get(EntityId::new(5)).unwrap().unwrap().comment, "comment 5");
    }

    #[test]
    fn test_closed_store_is_not_open() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(matches!(store.highest_id(), Err(StoreError::NotOpen)));

        drop(store.open_scoped().unwrap());
        assert!(!store.is_open());
        assert!(matches!(store.insert(&review(1)), Err(StoreError::NotOpen)));
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let store = store_in(&dir);
            let open = store.open_scoped().unwrap();
            open.insert(&review(10)).unwrap();
        }

        let store = store_in(&dir);
        let open = store.open_scoped().unwrap();
        assert_eq!(open.highest_id().unwrap(), EntityId::new(10));
    }

    #[test]
    fn test_kinds_share_database_file() {
        let dir = TempDir::new().unwrap();
        let reviews = store_in(&dir);
        let users: SqliteStore<User> = SqliteStore::new(dir.path().join("gasp.db"));

        let r = reviews.open_scoped().unwrap();
        let u = users.open_scoped().unwrap();
        r.insert(&review(4)).unwrap();
        u.insert(&User {
            id: EntityId::new(1),
            url: "/users/1".to_string(),
            name: "alice".to_string(),
        })
        .unwrap();

        assert_eq!(r.highest_id().unwrap(), EntityId::new(4));
        assert_eq!(u.highest_id().unwrap(), EntityId::new(1));
    }

    #[test]
    fn test_unopenable_path_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store: SqliteStore<Review> =
            SqliteStore::new(dir.path().join("missing").join("gasp.db"));
        assert!(matches!(store.open(), Err(StoreError::Unavailable(_))));
        assert!(!store.is_open());
    }
}
