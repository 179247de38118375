use gigboard_store::{CollectionStore, Document, MemoryStore, Selector, StoreError};
use serde_json::json;
use std::sync::{Arc, Mutex};

type Deliveries = Arc<Mutex<Vec<Vec<Document>>>>;
type Failures = Arc<Mutex<Vec<String>>>;

async fn watch(
    store: &MemoryStore,
    selector: Selector,
) -> (gigboard_store::StoreSubscription, Deliveries, Failures) {
    let deliveries: Deliveries = Arc::new(Mutex::new(Vec::new()));
    let failures: Failures = Arc::new(Mutex::new(Vec::new()));
    let d = deliveries.clone();
    let f = failures.clone();
    let handle = store
        .subscribe(
            selector,
            Arc::new(move |snapshot| d.lock().unwrap().push(snapshot)),
            Arc::new(move |error| f.lock().unwrap().push(error.to_string())),
        )
        .await
        .unwrap();
    (handle, deliveries, failures)
}

#[tokio::test]
async fn test_subscribe_delivers_initial_and_full_snapshots() {
    let store = MemoryStore::new();
    store
        .create("services", json!({"title": "a", "domain": "Writing"}))
        .await
        .unwrap();

    let (_handle, deliveries, _) = watch(&store, Selector::all("services")).await;
    assert_eq!(deliveries.lock().unwrap().len(), 1);
    assert_eq!(deliveries.lock().unwrap()[0].len(), 1);

    let second = store
        .create("services", json!({"title": "b", "domain": "Marketing"}))
        .await
        .unwrap();
    store.delete("services", &second).await.unwrap();

    let seen = deliveries.lock().unwrap();
    let sizes: Vec<usize> = seen.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![1, 2, 1]);
}

#[tokio::test]
async fn test_other_collections_do_not_notify() {
    let store = MemoryStore::new();
    let (_handle, deliveries, _) = watch(&store, Selector::all("services")).await;

    store.create("profiles", json!({"displayName": "x"})).await.unwrap();
    assert_eq!(deliveries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_selector_filters_snapshot() {
    let store = MemoryStore::new();
    store.create("services", json!({"domain": "Writing"})).await.unwrap();
    store.create("services", json!({"domain": "Marketing"})).await.unwrap();

    let (_handle, deliveries, _) =
        watch(&store, Selector::all("services").eq("domain", "Writing")).await;
    let seen = deliveries.lock().unwrap();
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[0][0].get("domain"), Some(&json!("Writing")));
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent_and_stops_delivery() {
    let store = MemoryStore::new();
    let (mut handle, deliveries, _) = watch(&store, Selector::all("services")).await;
    assert_eq!(store.subscriber_count(), 1);

    handle.unsubscribe();
    handle.unsubscribe();
    assert!(!handle.is_active());
    assert_eq!(store.subscriber_count(), 0);

    store.create("services", json!({"title": "late"})).await.unwrap();
    assert_eq!(deliveries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dropping_handle_unsubscribes() {
    let store = MemoryStore::new();
    {
        let _ = watch(&store, Selector::all("services")).await;
    }
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test]
async fn test_get_missing_is_none_and_update_missing_is_not_found() {
    let store = MemoryStore::new();
    assert!(store.get("services", "nope").await.unwrap().is_none());

    let result = store.update("services", "nope", json!({"title": "x"})).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));

    // deleting a missing document is fine
    assert!(store.delete("services", "nope").await.is_ok());
}

#[tokio::test]
async fn test_create_with_id_keeps_caller_id_once() {
    let store = MemoryStore::new();
    store
        .create_with_id("profiles", "u1", json!({"displayName": "Ana"}))
        .await
        .unwrap();

    let document = store.get("profiles", "u1").await.unwrap().unwrap();
    assert_eq!(document.get("displayName"), Some(&json!("Ana")));
    assert!(document.get("createdAt").unwrap().is_string());

    let again = store
        .create_with_id("profiles", "u1", json!({"displayName": "Other"}))
        .await;
    assert!(matches!(again, Err(StoreError::AlreadyExists { .. })));
    assert_eq!(store.len("profiles"), 1);
}

#[tokio::test]
async fn test_update_merges_top_level_fields() {
    let store = MemoryStore::new();
    let id = store
        .create("profiles", json!({"displayName": "Ana", "description": "old"}))
        .await
        .unwrap();

    store
        .update("profiles", &id, json!({"description": "new", "id": "ignored"}))
        .await
        .unwrap();

    let doc = store.get("profiles", &id).await.unwrap().unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.get("displayName"), Some(&json!("Ana")));
    assert_eq!(doc.get("description"), Some(&json!("new")));
}

#[tokio::test]
async fn test_read_only_store_rejects_writes_without_notifying() {
    let store = MemoryStore::new();
    let (_handle, deliveries, _) = watch(&store, Selector::all("services")).await;
    store.set_read_only(true);

    let result = store.create("services", json!({"title": "x"})).await;
    let error = result.unwrap_err();
    assert!(error.is_permission_denied());
    assert_eq!(deliveries.lock().unwrap().len(), 1);
    assert!(store.is_empty("services"));
}

#[tokio::test]
async fn test_pending_timestamps_resolve_later() {
    let store = MemoryStore::new().with_pending_timestamps();
    let id = store.create("services", json!({"title": "x"})).await.unwrap();

    let doc = store.get("services", &id).await.unwrap().unwrap();
    assert_eq!(doc.get("createdAt"), Some(&json!(null)));

    let (_handle, deliveries, _) = watch(&store, Selector::all("services")).await;
    assert_eq!(store.resolve_pending(), 1);
    assert_eq!(deliveries.lock().unwrap().len(), 2);

    let doc = store.get("services", &id).await.unwrap().unwrap();
    assert!(doc.get("createdAt").unwrap().is_string());
    assert_eq!(store.resolve_pending(), 0);
}

#[tokio::test]
async fn test_revoked_access_is_terminal() {
    let store = MemoryStore::new();
    let (handle, deliveries, failures) = watch(&store, Selector::all("services")).await;

    store.revoke_access("services", "rules changed");
    assert_eq!(failures.lock().unwrap().len(), 1);
    assert!(failures.lock().unwrap()[0].contains("rules changed"));
    assert_eq!(store.subscriber_count(), 0);

    store.create("services", json!({"title": "x"})).await.unwrap();
    assert_eq!(deliveries.lock().unwrap().len(), 1);
    drop(handle);
}

#[tokio::test]
async fn test_disconnect_fails_every_subscription_once() {
    let store = MemoryStore::new();
    let (_a, _, failures_a) = watch(&store, Selector::all("services")).await;
    let (_b, _, failures_b) = watch(&store, Selector::all("profiles")).await;

    store.disconnect("socket closed");
    store.disconnect("socket closed");

    assert_eq!(failures_a.lock().unwrap().len(), 1);
    assert_eq!(failures_b.lock().unwrap().len(), 1);
}
