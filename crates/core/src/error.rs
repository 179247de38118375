use thiserror::Error;

/// Validation errors raised by the core model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Rating score must be between 1 and 5, got {0}")]
    InvalidScore(u8),

    #[error("Invalid listing: {0}")]
    InvalidListing(String),

    #[error("Unknown pending order: {0} (expected \"newest\" or \"oldest\")")]
    UnknownPendingOrder(String),
}
