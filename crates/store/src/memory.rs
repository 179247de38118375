use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::document::{Document, Selector};
use crate::error::StoreError;
use crate::subscription::{ErrorCallback, SnapshotCallback, StoreSubscription};
use crate::CollectionStore;

const CREATED_AT: &str = "createdAt";

/// In-process collection store
///
/// Writes are applied and delivered to matching subscribers before the
/// write call returns, one write at a time. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    subscribers: Mutex<HashMap<String, Subscriber>>,
    // serializes write + delivery
    turn: Mutex<()>,
    read_only: AtomicBool,
    defer_timestamps: AtomicBool,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

#[derive(Clone)]
struct Subscriber {
    selector: Selector,
    on_snapshot: SnapshotCallback,
    on_error: ErrorCallback,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `createdAt` unresolved on create until [`resolve_pending`]
    /// runs, like a server timestamp that has not round-tripped yet.
    ///
    /// [`resolve_pending`]: MemoryStore::resolve_pending
    pub fn with_pending_timestamps(self) -> Self {
        self.inner.defer_timestamps.store(true, Ordering::SeqCst);
        self
    }

    /// Reject every write with `PermissionDenied`
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    pub fn len(&self, collection: &str) -> usize {
        lock(&self.inner.collections)
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Stamp every pending `createdAt` and notify subscribers.
    /// Returns how many documents were resolved.
    pub fn resolve_pending(&self) -> usize {
        let _turn = lock(&self.inner.turn);
        let mut touched = Vec::new();
        {
            let mut collections = lock(&self.inner.collections);
            for (name, documents) in collections.iter_mut() {
                let mut resolved = 0;
                for document in documents.iter_mut() {
                    if matches!(document.get(CREATED_AT), None | Some(Value::Null)) {
                        let stamp = self.next_timestamp();
                        document
                            .fields
                            .insert(CREATED_AT.to_string(), Value::String(stamp.to_rfc3339()));
                        resolved += 1;
                    }
                }
                if resolved > 0 {
                    touched.push((name.clone(), resolved));
                }
            }
        }
        let mut total = 0;
        for (name, resolved) in touched {
            debug!("Resolved {} pending timestamps in {}", resolved, name);
            self.deliver(&name);
            total += resolved;
        }
        total
    }

    /// Terminate every subscription on `collection` with a permission error,
    /// as when access rules change under a live listener
    pub fn revoke_access(&self, collection: &str, reason: &str) {
        let reason = reason.to_string();
        self.fail_where(
            |s| s.selector.collection() == collection,
            move || StoreError::PermissionDenied(reason.clone()),
        );
    }

    /// Terminate every subscription with a transport error
    pub fn disconnect(&self, reason: &str) {
        let reason = reason.to_string();
        self.fail_where(|_| true, move || {
            StoreError::SubscriptionError(format!("connection lost: {}", reason))
        });
    }

    fn fail_where<P, E>(&self, predicate: P, make_error: E)
    where
        P: Fn(&Subscriber) -> bool,
        E: Fn() -> StoreError,
    {
        let _turn = lock(&self.inner.turn);
        let failed: Vec<(String, Subscriber)> = {
            let mut subscribers = lock(&self.inner.subscribers);
            let ids: Vec<String> = subscribers
                .iter()
                .filter(|(_, s)| predicate(s))
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| subscribers.remove(&id).map(|s| (id, s)))
                .collect()
        };
        for (id, subscriber) in failed {
            let error = make_error();
            warn!("Terminating subscription {}: {}", id, error);
            (subscriber.on_error)(error);
        }
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.inner.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied(
                "store is read-only".to_string(),
            ));
        }
        Ok(())
    }

    // Server timestamps are strictly increasing within one store
    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = lock(&self.inner.last_timestamp);
        let mut now = Utc::now();
        if let Some(previous) = *last {
            if now <= previous {
                now = previous + Duration::milliseconds(1);
            }
        }
        *last = Some(now);
        now
    }

    fn matching(&self, selector: &Selector) -> Vec<Document> {
        lock(&self.inner.collections)
            .get(selector.collection())
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| selector.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn insert(&self, collection: &str, id: &str, record: Value) -> Result<(), StoreError> {
        self.check_writable()?;
        let Value::Object(mut fields) = record else {
            return Err(StoreError::InvalidRecord(
                "record must be a JSON object".to_string(),
            ));
        };
        fields.remove("id");
        let created_at = if self.inner.defer_timestamps.load(Ordering::SeqCst) {
            Value::Null
        } else {
            Value::String(self.next_timestamp().to_rfc3339())
        };
        fields.insert(CREATED_AT.to_string(), created_at);

        let _turn = lock(&self.inner.turn);
        {
            let mut collections = lock(&self.inner.collections);
            let documents = collections.entry(collection.to_string()).or_default();
            if documents.iter().any(|d| d.id == id) {
                return Err(StoreError::already_exists(collection, id));
            }
            documents.push(Document::new(id, fields));
        }
        debug!("Created {}/{}", collection, id);
        self.deliver(collection);
        Ok(())
    }

    // Caller holds `turn`
    fn deliver(&self, collection: &str) {
        let subscribers: Vec<Subscriber> = lock(&self.inner.subscribers)
            .values()
            .filter(|s| s.selector.collection() == collection)
            .cloned()
            .collect();
        for subscriber in subscribers {
            let snapshot = self.matching(&subscriber.selector);
            (subscriber.on_snapshot)(snapshot);
        }
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn create(&self, collection: &str, record: Value) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.insert(collection, &id, record)?;
        Ok(id)
    }

    async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        self.insert(collection, id, record)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let _turn = lock(&self.inner.turn);
        let removed = {
            let mut collections = lock(&self.inner.collections);
            match collections.get_mut(collection) {
                Some(documents) => {
                    let before = documents.len();
                    documents.retain(|d| d.id != id);
                    before != documents.len()
                }
                None => false,
            }
        };
        if removed {
            debug!("Deleted {}/{}", collection, id);
            self.deliver(collection);
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(lock(&self.inner.collections)
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| d.id == id).cloned()))
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        self.check_writable()?;
        let Value::Object(fields) = fields else {
            return Err(StoreError::InvalidRecord(
                "update fields must be a JSON object".to_string(),
            ));
        };
        let _turn = lock(&self.inner.turn);
        {
            let mut collections = lock(&self.inner.collections);
            let document = collections
                .get_mut(collection)
                .and_then(|documents| documents.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            for (key, value) in fields {
                if key != "id" {
                    document.fields.insert(key, value);
                }
            }
        }
        debug!("Updated {}/{}", collection, id);
        self.deliver(collection);
        Ok(())
    }

    async fn subscribe(
        &self,
        selector: Selector,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> Result<StoreSubscription, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let _turn = lock(&self.inner.turn);
        lock(&self.inner.subscribers).insert(
            id.clone(),
            Subscriber {
                selector: selector.clone(),
                on_snapshot: on_snapshot.clone(),
                on_error,
            },
        );
        info!(
            "Subscription {} opened on {}",
            id,
            selector.collection()
        );

        // initial delivery, like a first snapshot from the server
        on_snapshot(self.matching(&selector));

        let inner = Arc::downgrade(&self.inner);
        let handle_id = id.clone();
        Ok(StoreSubscription::new(id, move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner.subscribers).remove(&handle_id);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_strictly_increase() {
        let store = MemoryStore::new();
        let a = store.next_timestamp();
        let b = store.next_timestamp();
        let c = store.next_timestamp();
        assert!(a < b && b < c);
    }

    #[test]
    fn create_strips_client_id_and_stamps_created_at() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let id = store
                .create("services", serde_json::json!({"id": "forged", "title": "x"}))
                .await
                .unwrap();
            assert_ne!(id, "forged");
            let doc = store.get("services", &id).await.unwrap().unwrap();
            assert!(doc.get(CREATED_AT).map_or(false, Value::is_string));
        });
    }
}
