use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn missing_slot_reads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.get_slot("predictionResults").await.expect("read"), None);
    assert!(!storage.remove_slot("predictionResults").await.expect("remove"));
}

#[tokio::test]
async fn put_slot_overwrites_previous_value() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.put_slot("k", "first").await.expect("write");
    let first = storage.slot_record("k").await.expect("read").expect("slot");

    storage.put_slot("k", "second").await.expect("overwrite");
    let second = storage.slot_record("k").await.expect("read").expect("slot");

    assert_eq!(second.value, "second");
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(storage.slot_keys().await.expect("keys"), vec!["k".to_string()]);
}

#[tokio::test]
async fn remove_slot_reports_presence() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.put_slot("k", "v").await.expect("write");
    assert!(storage.remove_slot("k").await.expect("remove"));
    assert_eq!(storage.get_slot("k").await.expect("read"), None);
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("sicklescan_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn memory_store_behaves_like_sqlite_store() {
    let store = MemorySlotStore::new();
    assert!(store.is_empty().await);
    store.put_slot("k", "v").await.expect("write");
    store.put_slot("k", "w").await.expect("overwrite");
    assert_eq!(store.len().await, 1);
    assert_eq!(store.get_slot("k").await.expect("read"), Some("w".to_string()));
    assert!(store.remove_slot("k").await.expect("remove"));
    assert!(!store.remove_slot("k").await.expect("remove again"));
}

#[test]
fn sqlite_path_ignores_memory_and_query_suffix() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("sqlite://file:x?mode=memory"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/app.db?mode=rwc"),
        Some(PathBuf::from("./data/app.db"))
    );
}
