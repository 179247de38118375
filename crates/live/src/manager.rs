use gigboard_core::{Listing, PendingOrder, ProjectionCache};
use gigboard_store::{CollectionStore, Document, Selector, StoreError, StoreSubscription};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;

use crate::error::LiveError;

/// What the presentation layer should show for a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// No subscription
    Idle,
    /// Subscribed, first snapshot not delivered yet
    Loading,
    /// `len` listings cached after `generation` snapshots
    Ready { generation: u64, len: usize },
    /// The subscription failed and is dead; re-subscribe to recover
    Failed(String),
}

/// Owns the single active store subscription and the projection cache it
/// feeds
///
/// Deliveries carry the generation of the subscription that produced them;
/// anything from a superseded subscription is dropped under the cache lock,
/// so once [`subscribe`](Self::subscribe) or
/// [`unsubscribe`](Self::unsubscribe) returns no older feed can touch the
/// cache again.
pub struct SubscriptionManager {
    store: Arc<dyn CollectionStore>,
    shared: Arc<Shared>,
    handle: Mutex<Option<StoreSubscription>>,
    next_generation: AtomicU64,
}

struct Shared {
    projection: Mutex<Projection>,
    state_tx: watch::Sender<ViewState>,
}

struct Projection {
    cache: ProjectionCache,
    // 0 means no subscription is accepted
    active: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn CollectionStore>, pending_order: PendingOrder) -> Self {
        let (state_tx, _) = watch::channel(ViewState::Idle);
        Self {
            store,
            shared: Arc::new(Shared {
                projection: Mutex::new(Projection {
                    cache: ProjectionCache::new(pending_order),
                    active: 0,
                }),
                state_tx,
            }),
            handle: Mutex::new(None),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Replace any active subscription with a new one over `selector`
    pub async fn subscribe(&self, selector: Selector) -> Result<(), LiveError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut projection = lock(&self.shared.projection);
            projection.active = generation;
            self.shared.state_tx.send_replace(ViewState::Loading);
        }
        let previous = lock(&self.handle).take();
        if let Some(mut previous) = previous {
            info!("Unsubscribing from previous listener {}", previous.id());
            previous.unsubscribe();
        }

        info!(
            "Setting up new snapshot listener on {} (generation {})",
            selector.collection(),
            generation
        );
        let on_snapshot = {
            let shared = Arc::downgrade(&self.shared);
            Arc::new(move |documents: Vec<Document>| {
                deliver_snapshot(&shared, generation, documents);
            })
        };
        let on_error = {
            let shared = Arc::downgrade(&self.shared);
            Arc::new(move |error: StoreError| {
                deliver_error(&shared, generation, error);
            })
        };

        let handle = match self.store.subscribe(selector, on_snapshot, on_error).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to subscribe: {}", e);
                let mut projection = lock(&self.shared.projection);
                if projection.active == generation {
                    projection.active = 0;
                    self.shared
                        .state_tx
                        .send_replace(ViewState::Failed(e.to_string()));
                }
                return Err(e.into());
            }
        };

        let mut slot = lock(&self.handle);
        if lock(&self.shared.projection).active == generation {
            *slot = Some(handle);
        } else {
            // superseded while the store was setting up; `handle` drops here
            debug!("Discarding superseded subscription {}", handle.id());
        }
        Ok(())
    }

    /// Stop the active subscription, if any. The cache keeps its contents.
    pub fn unsubscribe(&self) {
        {
            let mut projection = lock(&self.shared.projection);
            if projection.active != 0 {
                projection.active = 0;
                self.shared.state_tx.send_replace(ViewState::Idle);
            }
        }
        let handle = lock(&self.handle).take();
        if let Some(mut handle) = handle {
            handle.unsubscribe();
        }
    }

    /// Unsubscribe and empty the cache
    pub fn release(&self) {
        self.unsubscribe();
        let mut projection = lock(&self.shared.projection);
        if !projection.cache.is_empty() {
            projection.cache.replace(Vec::new());
        }
        self.shared.state_tx.send_replace(ViewState::Idle);
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.shared.projection).active != 0
    }

    pub fn state(&self) -> ViewState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ViewState> {
        self.shared.state_tx.subscribe()
    }

    /// Run `f` against the current cache
    pub fn read<R>(&self, f: impl FnOnce(&ProjectionCache) -> R) -> R {
        f(&lock(&self.shared.projection).cache)
    }
}

fn decode_listings(documents: Vec<Document>) -> Vec<Listing> {
    documents
        .into_iter()
        .filter_map(|document| match document.decode::<Listing>() {
            Ok(listing) => Some(listing),
            Err(e) => {
                warn!("Skipping malformed listing {}: {}", document.id, e);
                None
            }
        })
        .collect()
}

fn deliver_snapshot(shared: &Weak<Shared>, generation: u64, documents: Vec<Document>) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    debug!(
        "Received snapshot (generation {}), docs count: {}",
        generation,
        documents.len()
    );
    let listings = decode_listings(documents);

    let mut projection = lock(&shared.projection);
    if projection.active != generation {
        debug!("Dropping snapshot from superseded generation {}", generation);
        return;
    }
    let len = projection.cache.replace(listings);
    let cache_generation = projection.cache.generation();
    shared.state_tx.send_replace(ViewState::Ready {
        generation: cache_generation,
        len,
    });
}

fn deliver_error(shared: &Weak<Shared>, generation: u64, error: StoreError) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let mut projection = lock(&shared.projection);
    if projection.active != generation {
        return;
    }
    warn!("Error fetching listings: {}", error);
    projection.active = 0;
    shared
        .state_tx
        .send_replace(ViewState::Failed(error.to_string()));
}
