//! Configuration options for the gigboard client

use std::time::Duration;

use gigboard_core::{CategorySet, PendingOrder};

use crate::error::Error;

/// Configuration options for the gigboard client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Collection holding service listings
    pub listings_collection: String,

    /// Collection holding actor profiles
    pub profiles_collection: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// How often a polling store re-reads a subscribed collection
    pub poll_interval: Duration,

    /// Where listings without a resolved creation time sort
    pub pending_order: PendingOrder,

    /// The fixed category set listings are counted against
    pub categories: CategorySet,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            listings_collection: "services".to_string(),
            profiles_collection: "profiles".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            poll_interval: Duration::from_secs(5),
            pending_order: PendingOrder::default(),
            categories: CategorySet::default(),
        }
    }
}

impl ClientOptions {
    /// Set the listings collection name
    pub fn with_listings_collection(mut self, value: &str) -> Self {
        self.listings_collection = value.to_string();
        self
    }

    /// Set the profiles collection name
    pub fn with_profiles_collection(mut self, value: &str) -> Self {
        self.profiles_collection = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the polling interval; zero is rejected by [`validate`](Self::validate)
    pub fn with_poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }

    /// Set where pending listings sort
    pub fn with_pending_order(mut self, value: PendingOrder) -> Self {
        self.pending_order = value;
        self
    }

    /// Set the category set
    pub fn with_categories(mut self, value: CategorySet) -> Self {
        self.categories = value;
        self
    }

    /// Reject settings no backend can run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.poll_interval.is_zero() {
            return Err(Error::config("poll interval must be non-zero"));
        }
        if self.categories.is_empty() {
            return Err(Error::config("category set must not be empty"));
        }
        Ok(())
    }

    /// Defaults overridden by any `GIGBOARD_*` variables present in the
    /// process environment:
    ///
    /// | variable | meaning |
    /// |---|---|
    /// | `GIGBOARD_LISTINGS_COLLECTION` | listings collection name |
    /// | `GIGBOARD_PROFILES_COLLECTION` | profiles collection name |
    /// | `GIGBOARD_REQUEST_TIMEOUT_SECS` | request timeout, `0` disables it |
    /// | `GIGBOARD_POLL_INTERVAL_MS` | polling interval |
    /// | `GIGBOARD_PENDING_ORDER` | `newest` or `oldest` |
    /// | `GIGBOARD_CATEGORIES` | comma-separated category labels |
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(value) = lookup("GIGBOARD_LISTINGS_COLLECTION") {
            options = options.with_listings_collection(value.trim());
        }
        if let Some(value) = lookup("GIGBOARD_PROFILES_COLLECTION") {
            options = options.with_profiles_collection(value.trim());
        }
        if let Some(value) = lookup("GIGBOARD_REQUEST_TIMEOUT_SECS") {
            let secs = parse_number("GIGBOARD_REQUEST_TIMEOUT_SECS", &value)?;
            options.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(value) = lookup("GIGBOARD_POLL_INTERVAL_MS") {
            let millis = parse_number("GIGBOARD_POLL_INTERVAL_MS", &value)?;
            if millis == 0 {
                return Err(Error::config("GIGBOARD_POLL_INTERVAL_MS must be positive"));
            }
            options.poll_interval = Duration::from_millis(millis);
        }
        if let Some(value) = lookup("GIGBOARD_PENDING_ORDER") {
            options.pending_order = value.parse()?;
        }
        if let Some(value) = lookup("GIGBOARD_CATEGORIES") {
            let categories = CategorySet::new(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|label| !label.is_empty()),
            );
            if categories.is_empty() {
                return Err(Error::config("GIGBOARD_CATEGORIES names no category"));
            }
            options.categories = categories;
        }

        Ok(options)
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} is not a number: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.listings_collection, "services");
        assert_eq!(options.profiles_collection, "profiles");
        assert_eq!(options.pending_order, PendingOrder::Newest);
        assert_eq!(options.categories.len(), 7);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let options = ClientOptions::from_lookup(lookup(&[
            ("GIGBOARD_LISTINGS_COLLECTION", "gigs"),
            ("GIGBOARD_REQUEST_TIMEOUT_SECS", "0"),
            ("GIGBOARD_POLL_INTERVAL_MS", "250"),
            ("GIGBOARD_PENDING_ORDER", "oldest"),
            ("GIGBOARD_CATEGORIES", "Writing, Marketing,,"),
        ]))
        .unwrap();

        assert_eq!(options.listings_collection, "gigs");
        assert_eq!(options.profiles_collection, "profiles");
        assert_eq!(options.request_timeout, None);
        assert_eq!(options.poll_interval, Duration::from_millis(250));
        assert_eq!(options.pending_order, PendingOrder::Oldest);
        assert_eq!(
            options.categories.iter().collect::<Vec<_>>(),
            vec!["Writing", "Marketing"]
        );
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let bad_poll = ClientOptions::from_lookup(lookup(&[("GIGBOARD_POLL_INTERVAL_MS", "soon")]));
        assert!(matches!(bad_poll, Err(Error::Config(_))));

        let bad_order = ClientOptions::from_lookup(lookup(&[("GIGBOARD_PENDING_ORDER", "sideways")]));
        assert!(matches!(bad_order, Err(Error::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        assert!(ClientOptions::default().validate().is_ok());

        let zero = ClientOptions::default().with_poll_interval(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(Error::Config(_))));

        let no_categories =
            ClientOptions::default().with_categories(CategorySet::new(Vec::<String>::new()));
        assert!(matches!(no_categories.validate(), Err(Error::Config(_))));
    }
}
