//! Derived views over the projection cache.
//!
//! Every function here is a pure function of its inputs and preserves the
//! cache order. Collections are small (hundreds of listings), so plain
//! linear scans are used throughout.

use std::collections::BTreeSet;

use crate::category::{CategoryFilter, CategorySet};
use crate::model::Listing;

/// Listings matching `filter`, in cache order
pub fn filter_by_category<'a>(cache: &'a [Listing], filter: &CategoryFilter) -> Vec<&'a Listing> {
    cache.iter().filter(|l| filter.matches(l)).collect()
}

/// Listings posted by `owner_id`, in cache order
pub fn listings_by_owner<'a>(cache: &'a [Listing], owner_id: &str) -> Vec<&'a Listing> {
    cache.iter().filter(|l| l.owner_id == owner_id).collect()
}

/// Owner ids with at least one listing
pub fn distinct_owners(cache: &[Listing]) -> BTreeSet<&str> {
    cache.iter().map(|l| l.owner_id.as_str()).collect()
}

/// Per-category tally over a fixed category set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    /// One entry for every known category, in set order, zero when absent
    pub by_category: Vec<(String, usize)>,
    /// Every listing, known category or not
    pub total: usize,
    /// Listings whose category is outside the known set
    pub uncategorized: usize,
}

impl CategoryCounts {
    pub fn get(&self, label: &str) -> usize {
        self.by_category
            .iter()
            .find(|(known, _)| known == label)
            .map_or(0, |(_, count)| *count)
    }

    /// Whether `label` belongs to the counted category set
    pub fn contains(&self, label: &str) -> bool {
        self.by_category.iter().any(|(known, _)| known == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.by_category
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
    }
}

pub fn count_by_category(cache: &[Listing], categories: &CategorySet) -> CategoryCounts {
    let mut by_category: Vec<(String, usize)> =
        categories.iter().map(|label| (label.to_string(), 0)).collect();
    let mut uncategorized = 0;

    for listing in cache {
        match by_category
            .iter_mut()
            .find(|(label, _)| *label == listing.category)
        {
            Some((_, count)) => *count += 1,
            None => uncategorized += 1,
        }
    }

    CategoryCounts {
        by_category,
        total: cache.len(),
        uncategorized,
    }
}

/// Dashboard numbers for one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSummary {
    pub total: usize,
    pub categories: CategoryCounts,
    pub contributors: usize,
}

impl ListingSummary {
    pub fn of(cache: &[Listing], categories: &CategorySet) -> Self {
        Self {
            total: cache.len(),
            categories: count_by_category(cache, categories),
            contributors: distinct_owners(cache).len(),
        }
    }
}
