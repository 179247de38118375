//! gigboard store
//!
//! The remote mutable collection store that gigboard delegates persistence
//! to. [`CollectionStore`] is the contract; [`MemoryStore`] keeps everything
//! in-process and [`RestStore`] talks to a PostgREST-style HTTP API.
//!
//! Subscriptions always deliver the *entire* matching result set, never a
//! diff.

mod document;
mod error;
mod memory;
mod rest;
mod subscription;

pub use document::{Document, Selector};
pub use error::{ApiErrorDetails, StoreError};
pub use memory::MemoryStore;
pub use rest::RestStore;
pub use subscription::{ErrorCallback, SnapshotCallback, StoreSubscription};

use async_trait::async_trait;
use serde_json::Value;

/// Remote collection of JSON documents with live full-snapshot subscriptions
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Insert `record` and return the id the store assigned. The store also
    /// assigns `createdAt`.
    async fn create(&self, collection: &str, record: Value) -> Result<String, StoreError>;

    /// Insert `record` under a caller-chosen `id`; fails with
    /// [`StoreError::AlreadyExists`] when the id is taken.
    async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        record: Value,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Fetch one document; `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge the top-level `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError>;

    /// Start a live feed over the documents matching `selector`.
    ///
    /// `on_snapshot` receives the full result set on every change.
    /// `on_error` is invoked at most once, after which the feed is dead;
    /// there is no automatic retry.
    async fn subscribe(
        &self,
        selector: Selector,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> Result<StoreSubscription, StoreError>;
}
