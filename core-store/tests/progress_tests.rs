//! Integration tests for the SQLite progress store

use core_store::db::create_test_pool;
use core_store::{ProgressStatus, ProgressStore, SqliteProgressStore};

async fn fresh_store() -> SqliteProgressStore {
    let pool = create_test_pool().await.expect("pool should open");
    let store = SqliteProgressStore::new(pool);
    store.initialize().await.expect("schema should initialize");
    store
}

#[tokio::test]
async fn test_lookup_unknown_path_returns_none() {
    let store = fresh_store().await;

    let record = store.lookup("/in/unseen.mp3").await.unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn test_mark_completed_then_lookup() {
    let store = fresh_store().await;

    store
        .mark_completed("/in/song.mp3", "/out/Artist/Album/track.mp3")
        .await
        .unwrap();

    let record = store.lookup("/in/song.mp3").await.unwrap().unwrap();
    assert_eq!(record.file_path, "/in/song.mp3");
    assert_eq!(record.status, ProgressStatus::Completed);
    assert_eq!(
        record.target_path.as_deref(),
        Some("/out/Artist/Album/track.mp3")
    );
    assert!(record.completed_at > 0);
}

#[tokio::test]
async fn test_mark_completed_is_an_upsert() {
    let store = fresh_store().await;

    store
        .mark_completed("/in/song.mp3", "/out/first.mp3")
        .await
        .unwrap();
    store
        .mark_completed("/in/song.mp3", "/out/second.mp3")
        .await
        .unwrap();

    let record = store.lookup("/in/song.mp3").await.unwrap().unwrap();
    assert_eq!(record.target_path.as_deref(), Some("/out/second.mp3"));
    assert_eq!(store.count_completed().await.unwrap(), 1);
}

#[tokio::test]
async fn test_count_completed() {
    let store = fresh_store().await;
    assert_eq!(store.count_completed().await.unwrap(), 0);

    store.mark_completed("/in/a.mp3", "/out/a.mp3").await.unwrap();
    store.mark_completed("/in/b.mp3", "/out/b.mp3").await.unwrap();

    assert_eq!(store.count_completed().await.unwrap(), 2);
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let store = fresh_store().await;
    store.initialize().await.expect("second initialize is fine");
}
