use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::model::Listing;

const DEFAULT_CATEGORIES: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "Graphic Design",
    "Writing",
    "Marketing",
    "Video Editing",
    "Data Science",
];

/// The fixed, ordered set of categories the view layer knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    labels: Vec<String>,
}

impl CategorySet {
    /// Build a set from labels; duplicates keep their first position
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        Self { labels: unique }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().copied())
    }
}

/// Active category filter of a view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn only(label: &str) -> Self {
        Self::Only(label.to_string())
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        match self {
            Self::All => true,
            Self::Only(label) => listing.category == *label,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "all" {
            Self::All
        } else {
            Self::Only(s.to_string())
        })
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(label) => write!(f, "{}", label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_keyword() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Writing".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::only("Writing")
        );
    }

    #[test]
    fn set_dedupes_and_keeps_order() {
        let set = CategorySet::new(["B", "A", "B"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["B", "A"]);
        assert!(set.contains("A"));
        assert!(!set.contains("a"));
    }
}
