use super::*;
use shared::domain::UserId;

fn sample_session() -> Session {
    Session::new(UserId(1), "A")
}

#[tokio::test]
async fn memory_store_starts_absent() {
    let store = MemorySessionStore::new();
    assert_eq!(store.load().await, None);
}

#[tokio::test]
async fn memory_store_set_then_load_round_trips() {
    let store = MemorySessionStore::new();
    store.set(&sample_session()).await.expect("set");

    assert_eq!(store.load().await, Some(sample_session()));
    assert_eq!(store.raw().await.as_deref(), Some(r#"{"id":1,"nombre":"A"}"#));
}

#[tokio::test]
async fn set_replaces_existing_session() {
    let store = MemorySessionStore::new();
    store.set(&sample_session()).await.expect("first");
    store
        .set(&Session::new(UserId(2), "B"))
        .await
        .expect("second");

    assert_eq!(store.load().await.map(|s| s.id), Some(UserId(2)));
}

#[tokio::test]
async fn malformed_entry_loads_as_absent() {
    for raw in ["not json", "{}", r#"{"nombre":"A"}"#, "null", r#"{"id":"x","nombre":"A"}"#] {
        let store = MemorySessionStore::with_raw(raw);
        assert_eq!(store.load().await, None, "raw entry {raw:?} should be ignored");
    }
}

#[tokio::test]
async fn clear_is_idempotent() {
    let store = MemorySessionStore::new();
    store.set(&sample_session()).await.expect("set");
    store.clear().await.expect("clear");
    store.clear().await.expect("clear again");

    assert_eq!(store.load().await, None);
    assert_eq!(store.raw().await, None);
}

#[tokio::test]
async fn durable_store_persists_under_session_key() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let store = DurableSessionStore::new(storage.clone());

    store.set(&sample_session()).await.expect("set");

    let raw = storage
        .load_local_entry(SESSION_ENTRY_KEY)
        .await
        .expect("raw entry");
    assert_eq!(raw.as_deref(), Some(r#"{"id":1,"nombre":"A"}"#));
    assert_eq!(store.load().await, Some(sample_session()));
}

#[tokio::test]
async fn durable_store_ignores_corrupted_entry() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .save_local_entry(SESSION_ENTRY_KEY, "{truncated")
        .await
        .expect("seed");

    let store = DurableSessionStore::new(storage);
    assert_eq!(store.load().await, None);
}

#[tokio::test]
async fn durable_store_clear_removes_entry() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let store = DurableSessionStore::new(storage.clone());
    store.set(&sample_session()).await.expect("set");
    store.clear().await.expect("clear");

    assert_eq!(
        storage
            .load_local_entry(SESSION_ENTRY_KEY)
            .await
            .expect("raw entry"),
        None
    );
    assert_eq!(store.load().await, None);
}

#[tokio::test]
async fn open_checks_storage_before_use() {
    let store = DurableSessionStore::open("sqlite::memory:")
        .await
        .expect("open");
    store.set(&sample_session()).await.expect("set");
    assert_eq!(store.load().await, Some(sample_session()));
}
