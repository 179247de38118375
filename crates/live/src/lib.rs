//! gigboard live view
//!
//! Keeps a local projection of the listing collection in sync with the
//! remote store: one active subscription per view, full-snapshot replace
//! on every delivery, and derived views computed from the local cache.

mod error;
mod manager;
mod session;
mod view;

pub use error::LiveError;
pub use manager::{SubscriptionManager, ViewState};
pub use session::{bind_to_identity, SessionBinding};
pub use view::LiveListingView;
