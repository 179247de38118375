//! gigboard core
//!
//! Data model, local projection cache and derived views for the gigboard
//! listing feed. Everything in this crate is synchronous and works over
//! already-materialized collections; the remote side lives in
//! `gigboard-store` and the subscription plumbing in `gigboard-live`.

mod cache;
mod category;
mod error;
mod model;
mod rating;
mod view;

pub use cache::{PendingOrder, ProjectionCache};
pub use category::{CategoryFilter, CategorySet};
pub use error::CoreError;
pub use model::{Actor, Listing, ListingAction, NewListing, Profile, ProfileUpdate, Rating};
pub use rating::{average_rating, upsert_rating};
pub use view::{
    count_by_category, distinct_owners, filter_by_category, listings_by_owner, CategoryCounts,
    ListingSummary,
};
