use gigboard_core::{
    count_by_category, distinct_owners, filter_by_category, listings_by_owner, CategoryCounts,
    CategoryFilter, CategorySet, Listing, ListingSummary, PendingOrder,
};
use gigboard_store::{CollectionStore, Selector};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::error::LiveError;
use crate::manager::{SubscriptionManager, ViewState};

/// Live, filterable view over the listing collection
///
/// The subscription is acquired by [`activate`](Self::activate) and
/// released by [`deactivate`](Self::deactivate) or when the view is
/// dropped. All derived views are computed from the local cache; none of
/// them touches the store.
pub struct LiveListingView {
    manager: SubscriptionManager,
    selector: Selector,
    categories: CategorySet,
    filter: Mutex<CategoryFilter>,
}

impl LiveListingView {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        selector: Selector,
        categories: CategorySet,
        pending_order: PendingOrder,
    ) -> Self {
        Self {
            manager: SubscriptionManager::new(store, pending_order),
            selector,
            categories,
            filter: Mutex::new(CategoryFilter::All),
        }
    }

    /// (Re)subscribe; any previous subscription is torn down first
    pub async fn activate(&self) -> Result<(), LiveError> {
        self.manager.subscribe(self.selector.clone()).await
    }

    /// Tear down the subscription and forget the cached listings
    pub fn deactivate(&self) {
        self.manager.release();
    }

    pub fn is_active(&self) -> bool {
        self.manager.is_subscribed()
    }

    pub fn state(&self) -> ViewState {
        self.manager.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ViewState> {
        self.manager.watch_state()
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    /// Every cached listing, newest first
    pub fn snapshot(&self) -> Vec<Listing> {
        self.manager.read(|cache| cache.snapshot().to_vec())
    }

    pub fn get(&self, id: &str) -> Option<Listing> {
        self.manager.read(|cache| cache.get(id).cloned())
    }

    pub fn filtered(&self, filter: &CategoryFilter) -> Vec<Listing> {
        self.manager.read(|cache| {
            filter_by_category(cache.snapshot(), filter)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Remember `filter` as the active one; it applies to every later
    /// snapshot through [`visible`](Self::visible)
    pub fn set_filter(&self, filter: CategoryFilter) {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner) = filter;
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Listings under the active filter
    pub fn visible(&self) -> Vec<Listing> {
        let filter = self.filter();
        self.filtered(&filter)
    }

    pub fn counts(&self) -> CategoryCounts {
        self.manager
            .read(|cache| count_by_category(cache.snapshot(), &self.categories))
    }

    pub fn distinct_owners(&self) -> BTreeSet<String> {
        self.manager.read(|cache| {
            distinct_owners(cache.snapshot())
                .into_iter()
                .map(str::to_string)
                .collect()
        })
    }

    pub fn listings_by_owner(&self, owner_id: &str) -> Vec<Listing> {
        self.manager.read(|cache| {
            listings_by_owner(cache.snapshot(), owner_id)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    pub fn summary(&self) -> ListingSummary {
        self.manager
            .read(|cache| ListingSummary::of(cache.snapshot(), &self.categories))
    }
}
