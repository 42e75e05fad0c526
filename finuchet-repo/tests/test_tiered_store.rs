use chrono::Duration;
use finuchet_repo::kv::{
    FileStore, KeyValueStore, MemStore, TierKind, TierPolicy, TieredStore, WriteMode,
};
use finuchet_repo::kv_repo;
use serde_json::json;
use std::sync::Arc;

fn build_store(path: &std::path::Path, write_mode: WriteMode) -> TieredStore {
    TieredStore::new(
        vec![
            Arc::new(MemStore::new()) as Arc<dyn KeyValueStore>,
            Arc::new(FileStore::new(path)) as Arc<dyn KeyValueStore>,
        ],
        TierPolicy {
            write_mode,
            ..TierPolicy::default()
        },
    )
}

#[actix_rt::test]
async fn test_file_tier_outlives_memory_tier() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = build_store(&path, WriteMode::AllAvailable);
    let report = store.set("greeting", json!("hello")).await.unwrap();
    assert_eq!(report.written, vec![TierKind::Memory, TierKind::LocalFile]);
    drop(store);

    // a fresh memory tier misses, the file tier answers and backfills it
    let store = build_store(&path, WriteMode::AllAvailable);
    assert_eq!(store.get("greeting").await.unwrap(), Some(json!("hello")));
    assert_eq!(store.current_mode().unwrap(), Some(TierKind::Memory));
}

#[actix_rt::test]
async fn test_first_available_skips_file_tier() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = build_store(&path, WriteMode::FirstAvailable);
    let report = store.set("greeting", json!("hello")).await.unwrap();
    assert_eq!(report.written, vec![TierKind::Memory]);
    assert!(!path.exists());
}

#[actix_rt::test]
async fn test_probe_all_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let store = build_store(&dir.path().join("store.json"), WriteMode::AllAvailable);

    let results = store.probe_all().await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert!(store.keys("").await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = Arc::new(build_store(&path, WriteMode::AllAvailable));
    let (session_repo, _) = kv_repo::create_repos(store);
    let session = session_repo
        .create_session("user-1", Duration::days(1))
        .await
        .unwrap();
    drop(session_repo);

    let store = Arc::new(build_store(&path, WriteMode::AllAvailable));
    let (session_repo, _) = kv_repo::create_repos(store);
    let resolved = session_repo.get_session(&session.id).await.unwrap();
    assert_eq!(resolved.user_id, "user-1");
}
