use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use gasp_common::{EntityId, Error, FailureCause, ResourceUri, Review, User};
use gasp_remote::MemoryFetcher;
use gasp_storage::{MemoryStore, RecordStore, SqliteStore};
use gasp_sync::{RecordUpdater, SyncEngine};

fn user(id: i64) -> User {
    User {
        id: EntityId::new(id),
        url: format!("/users/{}", id),
        name: format!("user {}", id),
    }
}

fn review(id: i64) -> Review {
    Review {
        id: EntityId::new(id),
        url: format!("/reviews/{}", id),
        star: 5,
        comment: "ok".to_string(),
        restaurant: "/restaurants/1".to_string(),
        user: "/users/1".to_string(),
    }
}

fn users_uri() -> ResourceUri {
    ResourceUri::new("http://gasp.test/users").unwrap()
}

fn reviews_uri() -> ResourceUri {
    ResourceUri::new("http://gasp.test/reviews").unwrap()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn pass_inserts_exactly_ids_above_mark(
        local in prop::collection::btree_set(1i64..50, 0..20),
        remote in prop::collection::vec(1i64..80, 0..40),
    ) {
        let mark = local.iter().copied().max().unwrap_or(0);
        let store = Arc::new(MemoryStore::with_records(local.iter().copied().map(user)));
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.respond_with(&users_uri(), &remote.iter().copied().map(user).collect::<Vec<_>>());
        let engine = SyncEngine::new(store.clone(), fetcher);

        let result = block_on(engine.sync(&users_uri())).unwrap();

        let expected_new: BTreeSet<i64> = remote.iter().copied().filter(|id| *id > mark).collect();
        let candidates = remote.iter().filter(|id| **id > mark).count();
        prop_assert_eq!(result.found, EntityId::new(mark));
        prop_assert_eq!(result.loaded, expected_new.len());
        prop_assert_eq!(result.skipped, candidates - expected_new.len());

        let expected: Vec<EntityId> = local
            .union(&expected_new)
            .copied()
            .map(EntityId::new)
            .collect();
        prop_assert_eq!(store.ids(), expected);
    }

    #[test]
    fn repeated_pass_loads_nothing(remote in prop::collection::vec(1i64..100, 0..30)) {
        let store = Arc::new(MemoryStore::<User>::new());
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.respond_with(&users_uri(), &remote.iter().copied().map(user).collect::<Vec<_>>());
        let engine = SyncEngine::new(store.clone(), fetcher);

        block_on(engine.sync(&users_uri())).unwrap();
        let before = store.ids();
        let second = block_on(engine.sync(&users_uri())).unwrap();

        prop_assert_eq!(second.loaded, 0);
        prop_assert_eq!(store.ids(), before);
    }
}

#[tokio::test]
async fn sqlite_catch_up_scenarios() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::<Review>::new(dir.path().join("gasp.db")));
    let fetcher = Arc::new(MemoryFetcher::new());
    let engine = SyncEngine::new(store.clone(), fetcher.clone());

    fetcher.respond_with(&reviews_uri(), &[review(3), review(1), review(2)]);
    let first = engine.sync(&reviews_uri()).await.unwrap();
    assert_eq!((first.found, first.loaded), (EntityId::NONE, 3));

    fetcher.respond_with(&reviews_uri(), &[1, 2, 3, 4, 5].map(review));
    let second = engine.sync(&reviews_uri()).await.unwrap();
    assert_eq!((second.found, second.loaded), (EntityId::new(3), 2));

    let open = store.open_scoped().unwrap();
    assert_eq!(open.highest_id().unwrap(), EntityId::new(5));
    assert_eq!(open.count().unwrap(), 5);
}

#[tokio::test]
async fn sqlite_targeted_update_after_pass() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::<Review>::new(dir.path().join("gasp.db")));
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.respond_with(&reviews_uri(), &[review(1), review(2)]);

    SyncEngine::new(store.clone(), fetcher.clone())
        .sync(&reviews_uri())
        .await
        .unwrap();

    let updater = RecordUpdater::new(store.clone(), fetcher.clone());
    let err = updater
        .update_one(&reviews_uri(), EntityId::new(2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UpdateFailed {
            cause: FailureCause::AlreadyExists(_)
        }
    ));

    fetcher.respond_with(&reviews_uri(), &[review(1), review(2), review(3)]);
    let stored = updater
        .update_one(&reviews_uri(), EntityId::new(3))
        .await
        .unwrap();
    assert_eq!(stored, review(3));
    assert!(!store.is_open());
}
