use std::cmp::Ordering;
use std::str::FromStr;

use log::trace;

use crate::error::CoreError;
use crate::model::Listing;

/// Where listings without a resolved `created_at` are placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PendingOrder {
    /// Pending listings were just created, so they sort first
    #[default]
    Newest,
    /// Pending listings sort last, as if created at the epoch
    Oldest,
}

impl FromStr for PendingOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            other => Err(CoreError::UnknownPendingOrder(other.to_string())),
        }
    }
}

/// Last full snapshot of the listing collection, newest first
///
/// The only writer is [`ProjectionCache::replace`]; every delivery swaps
/// the contents wholesale.
#[derive(Debug, Clone, Default)]
pub struct ProjectionCache {
    listings: Vec<Listing>,
    pending_order: PendingOrder,
    generation: u64,
}

impl ProjectionCache {
    pub fn new(pending_order: PendingOrder) -> Self {
        Self {
            listings: Vec::new(),
            pending_order,
            generation: 0,
        }
    }

    /// Discard the current contents and store `snapshot`, sorted.
    /// Returns the number of cached listings.
    pub fn replace(&mut self, mut snapshot: Vec<Listing>) -> usize {
        let order = self.pending_order;
        snapshot.sort_by(|a, b| compare(a, b, order));
        self.listings = snapshot;
        self.generation += 1;
        trace!(
            "projection cache replaced: generation={} len={}",
            self.generation,
            self.listings.len()
        );
        self.listings.len()
    }

    pub fn snapshot(&self) -> &[Listing] {
        &self.listings
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Number of snapshots applied so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_order(&self) -> PendingOrder {
        self.pending_order
    }
}

fn compare(a: &Listing, b: &Listing, order: PendingOrder) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match order {
            PendingOrder::Newest => Ordering::Less,
            PendingOrder::Oldest => Ordering::Greater,
        },
        (Some(_), None) => match order {
            PendingOrder::Newest => Ordering::Greater,
            PendingOrder::Oldest => Ordering::Less,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(id: &str, secs: Option<i64>) -> Listing {
        Listing {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            category: "Writing".to_string(),
            owner_id: "u1".to_string(),
            owner_name: None,
            owner_email: None,
            created_at: secs.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
        }
    }

    fn ids(cache: &ProjectionCache) -> Vec<&str> {
        cache.snapshot().iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn pending_sorts_first_by_default() {
        let mut cache = ProjectionCache::default();
        cache.replace(vec![at("t3", Some(3)), at("t1", Some(1)), at("t2", Some(2)), at("p", None)]);
        assert_eq!(ids(&cache), vec!["p", "t3", "t2", "t1"]);
    }

    #[test]
    fn pending_sorts_last_when_oldest() {
        let mut cache = ProjectionCache::new(PendingOrder::Oldest);
        cache.replace(vec![at("p", None), at("t1", Some(1)), at("t2", Some(2))]);
        assert_eq!(ids(&cache), vec!["t2", "t1", "p"]);
    }

    #[test]
    fn replace_is_total() {
        let mut cache = ProjectionCache::default();
        cache.replace(vec![at("a", Some(1)), at("b", Some(2))]);
        cache.replace(vec![at("b", Some(2)), at("c", Some(3))]);
        assert_eq!(ids(&cache), vec!["c", "b"]);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn equal_timestamps_keep_snapshot_order() {
        let mut cache = ProjectionCache::default();
        cache.replace(vec![at("x", Some(5)), at("y", Some(5)), at("z", Some(5))]);
        assert_eq!(ids(&cache), vec!["x", "y", "z"]);
    }

    #[test]
    fn parses_pending_order() {
        assert_eq!("Oldest".parse::<PendingOrder>().unwrap(), PendingOrder::Oldest);
        assert!("sideways".parse::<PendingOrder>().is_err());
    }
}
