//! gigboard
//!
//! Client library for a freelance service marketplace. Listings live in a
//! remote collection store; [`Gigboard::live_listings`] keeps a local,
//! always-current projection of them, and the marketplace operations
//! (posting, removing, profiles and ratings) write through the same store.
//!
//! The store and the identity service are both pluggable: use
//! [`Gigboard::connect`] for a hosted PostgREST + auth backend, or
//! [`Gigboard::with_backends`] to bring your own (an in-memory store and an
//! [`IdentityHub`](gigboard_auth::IdentityHub) work well for tests).

pub mod config;
pub mod error;
mod marketplace;
mod profiles;

use std::sync::Arc;

use log::info;
use reqwest::Client;
use url::Url;

use gigboard_auth::{Actor, HostedIdentity, IdentityHub, IdentityService, Session};
use gigboard_live::{bind_to_identity, LiveListingView, SessionBinding};
use gigboard_store::{CollectionStore, RestStore, Selector};

use crate::config::ClientOptions;
use crate::error::Error;

pub use gigboard_auth as auth;
pub use gigboard_core as model;
pub use gigboard_live as live;
pub use gigboard_store as store;

/// The main entry point for the gigboard client
pub struct Gigboard {
    store: Arc<dyn CollectionStore>,
    identity: Arc<dyn IdentityService>,
    hosted: Option<Hosted>,
    options: ClientOptions,
}

// Concrete handles kept when the hosted backend is in use. Sign-in reaches
// `hub` (what views observe) only after the store holds the access token.
struct Hosted {
    identity: HostedIdentity,
    store: Arc<RestStore>,
    hub: IdentityHub,
}

impl Gigboard {
    /// Connect to a hosted backend
    ///
    /// # Arguments
    ///
    /// * `url` - Base URL of the backend (`/rest/v1` and `/auth/v1` live under it)
    /// * `key` - The anonymous API key
    ///
    /// # Example
    ///
    /// ```
    /// use gigboard::Gigboard;
    ///
    /// let gigboard = Gigboard::connect("https://your-project.example.com", "your-anon-key").unwrap();
    /// ```
    pub fn connect(url: &str, key: &str) -> Result<Self, Error> {
        Self::connect_with_options(url, key, ClientOptions::default())
    }

    /// Connect to a hosted backend with custom options
    pub fn connect_with_options(
        url: &str,
        key: &str,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        options.validate()?;
        let base = Url::parse(url)?;
        let base = base.as_str().trim_end_matches('/');

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let identity = HostedIdentity::new(base, key, http_client.clone());
        let store = Arc::new(RestStore::new_with_poll_interval(
            base,
            key,
            http_client,
            options.poll_interval,
        )?);
        let hub = IdentityHub::new();
        info!("Connected gigboard client to {}", base);

        Ok(Self {
            store: store.clone(),
            identity: Arc::new(hub.clone()),
            hosted: Some(Hosted {
                identity,
                store,
                hub,
            }),
            options,
        })
    }

    /// Build a client over caller-supplied backends
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use gigboard::{config::ClientOptions, Gigboard};
    /// use gigboard::auth::IdentityHub;
    /// use gigboard::store::MemoryStore;
    ///
    /// let gigboard = Gigboard::with_backends(
    ///     Arc::new(MemoryStore::new()),
    ///     Arc::new(IdentityHub::new()),
    ///     ClientOptions::default(),
    /// );
    /// assert!(gigboard.current_actor().is_none());
    /// ```
    pub fn with_backends(
        store: Arc<dyn CollectionStore>,
        identity: Arc<dyn IdentityService>,
        options: ClientOptions,
    ) -> Self {
        Self {
            store,
            identity,
            hosted: None,
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn CollectionStore> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<dyn IdentityService> {
        &self.identity
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The signed-in actor, if any
    pub fn current_actor(&self) -> Option<Actor> {
        self.identity.current_actor()
    }

    pub(crate) fn require_actor(&self, message: &str) -> Result<Actor, Error> {
        self.identity
            .current_actor()
            .ok_or_else(|| Error::not_signed_in(message))
    }

    /// A live view over every listing; call
    /// [`activate`](LiveListingView::activate) to start receiving snapshots
    pub fn live_listings(&self) -> LiveListingView {
        LiveListingView::new(
            self.store.clone(),
            Selector::all(&self.options.listings_collection),
            self.options.categories.clone(),
            self.options.pending_order,
        )
    }

    /// A live listing view that follows the session: subscribed while
    /// someone is signed in, released on sign-out
    ///
    /// Must be called inside a tokio runtime.
    pub fn session_listings(&self) -> (Arc<LiveListingView>, SessionBinding) {
        let view = Arc::new(self.live_listings());
        let binding = bind_to_identity(view.clone(), self.identity.as_ref());
        (view, binding)
    }

    fn hosted(&self) -> Result<&Hosted, Error> {
        self.hosted
            .as_ref()
            .ok_or_else(|| Error::config("no hosted identity service configured"))
    }

    /// Register with the hosted identity service and create the new
    /// actor's profile
    pub async fn sign_up(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, Error> {
        let hosted = self.hosted()?;
        let session = hosted.identity.sign_up(display_name, email, password).await?;
        hosted.start_session(&session).await;
        self.ensure_profile().await?;
        Ok(session)
    }

    /// Sign in with the hosted identity service
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let hosted = self.hosted()?;
        let session = hosted
            .identity
            .sign_in_with_password(email, password)
            .await?;
        hosted.start_session(&session).await;
        Ok(session)
    }

    /// Sign out of the hosted identity service. Local session state is
    /// dropped even when the server call fails.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let hosted = self.hosted()?;
        let result = hosted.identity.sign_out().await;
        hosted.hub.sign_out();
        hosted.store.set_auth(None).await;
        result.map_err(Error::from)
    }
}

impl Hosted {
    async fn start_session(&self, session: &Session) {
        self.store
            .set_auth(Some(session.access_token.clone()))
            .await;
        self.hub.sign_in(session.user.to_actor());
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::Gigboard;
    pub use gigboard_core::{
        Actor, CategoryFilter, CategorySet, Listing, ListingAction, NewListing, PendingOrder,
        Profile, ProfileUpdate, Rating,
    };
    pub use gigboard_live::{LiveListingView, ViewState};
}
