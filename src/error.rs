//! Error handling for the gigboard client

use std::fmt;
use thiserror::Error;

use gigboard_auth::AuthError;
use gigboard_core::CoreError;
use gigboard_live::LiveError;
use gigboard_store::StoreError;

/// Unified error type for the gigboard client
#[derive(Error, Debug)]
pub enum Error {
    /// Identity service errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Collection store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Live view errors
    #[error("Live view error: {0}")]
    Live(#[from] LiveError),

    /// Rejected input: bad score, empty title and the like
    #[error("Invalid input: {0}")]
    Invalid(#[from] CoreError),

    /// Network or HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The operation needs a signed-in actor
    #[error("{0}")]
    NotSignedIn(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The signed-in actor does not own the target
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("You cannot rate your own profile")]
    SelfRating,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new not-signed-in error
    pub fn not_signed_in<T: fmt::Display>(msg: T) -> Self {
        Error::NotSignedIn(msg.to_string())
    }

    /// Create a new not-found error
    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }

    /// Create a new forbidden error
    pub fn forbidden<T: fmt::Display>(msg: T) -> Self {
        Error::Forbidden(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Whether the store or the ownership check refused the write
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::Forbidden(_) => true,
            Error::Store(e) => e.is_permission_denied(),
            Error::Live(LiveError::SubscriptionError(e)) => e.is_permission_denied(),
            _ => false,
        }
    }
}
