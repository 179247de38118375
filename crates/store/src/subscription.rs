use std::fmt;
use std::sync::Arc;

use crate::document::Document;
use crate::error::StoreError;

/// Receives the complete matching result set on every change
pub type SnapshotCallback = Arc<dyn Fn(Vec<Document>) + Send + Sync>;

/// Receives the terminal failure of a subscription
pub type ErrorCallback = Arc<dyn Fn(StoreError) + Send + Sync>;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Handle to a live store subscription
///
/// Unsubscribing is idempotent, and dropping the handle unsubscribes.
pub struct StoreSubscription {
    id: String,
    cancel: Option<CancelFn>,
}

impl StoreSubscription {
    pub fn new<F>(id: String, cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            log::debug!("Unsubscribing store subscription {}", self.id);
            cancel();
        }
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for StoreSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSubscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
