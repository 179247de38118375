//! gigboard auth
//!
//! gigboard never authenticates anyone itself. This crate defines the
//! identity service contract the rest of the workspace depends on, the
//! in-process [`IdentityHub`] that carries sign-in/sign-out transitions, and
//! [`HostedIdentity`], a thin client for a hosted GoTrue-style auth API.

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::watch;

pub use gigboard_core::Actor;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

/// Source of the current actor and of sign-in/sign-out transitions
pub trait IdentityService: Send + Sync {
    /// The signed-in actor, if any
    fn current_actor(&self) -> Option<Actor>;

    /// Receiver that observes every transition; the current value is the
    /// current actor
    fn watch(&self) -> watch::Receiver<Option<Actor>>;
}

/// Shared session state that identity adapters publish into
///
/// Hosts that authenticate elsewhere can drive it directly with
/// [`IdentityHub::sign_in`] and [`IdentityHub::sign_out`].
#[derive(Clone)]
pub struct IdentityHub {
    tx: Arc<watch::Sender<Option<Actor>>>,
}

impl IdentityHub {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Publish `actor` as signed in. Re-publishing the same actor is not a
    /// transition and notifies no one.
    pub fn sign_in(&self, actor: Actor) {
        let id = actor.id.clone();
        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&actor) {
                false
            } else {
                *current = Some(actor);
                true
            }
        });
        if changed {
            info!("Auth state changed: signed in as {}", id);
        }
    }

    pub fn sign_out(&self) {
        let changed = self.tx.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("Auth state changed: signed out");
        }
    }
}

impl Default for IdentityHub {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityService for IdentityHub {
    fn current_actor(&self) -> Option<Actor> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Actor>> {
        self.tx.subscribe()
    }
}

/// User record returned by the hosted auth API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    pub fn display_name(&self) -> Option<String> {
        ["display_name", "full_name", "name"]
            .iter()
            .find_map(|key| self.user_metadata.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
    }

    pub fn to_actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            display_name: self.display_name(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: User,
}

/// Client for a hosted auth API (`/auth/v1/...`)
pub struct HostedIdentity {
    url: String,
    key: String,
    http_client: Client,
    hub: IdentityHub,
    current_session: RwLock<Option<Session>>,
}

impl HostedIdentity {
    pub fn new(url: &str, key: &str, http_client: Client) -> Self {
        Self::new_with_hub(url, key, http_client, IdentityHub::new())
    }

    /// Publish transitions into an existing hub
    pub fn new_with_hub(url: &str, key: &str, http_client: Client, hub: IdentityHub) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            hub,
            current_session: RwLock::new(None),
        }
    }

    pub fn hub(&self) -> &IdentityHub {
        &self.hub
    }

    pub fn get_session(&self) -> Option<Session> {
        self.current_session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.get_session().map(|s| s.access_token)
    }

    /// Register a new account; the display name goes into user metadata
    pub async fn sign_up(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/signup", self.url);
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "display_name": display_name },
        });
        let session = self.post_session(&url, &payload).await?;
        debug!("User signed up: {}", session.user.id);
        self.store_session(session.clone());
        Ok(session)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.url);
        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let session = self.post_session(&url, &payload).await?;
        debug!("User logged in: {}", session.user.id);
        self.store_session(session.clone());
        Ok(session)
    }

    /// Change the signed-in user's display name
    pub async fn update_display_name(&self, display_name: &str) -> Result<User, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        let url = format!("{}/auth/v1/user", self.url);

        let response = self
            .http_client
            .put(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .json(&serde_json::json!({ "data": { "display_name": display_name } }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::ApiError(error_text));
        }

        let user: User = response.json().await?;
        self.store_session(Session {
            user: user.clone(),
            ..session
        });
        Ok(user)
    }

    /// End the session. Local state is cleared even if the server call
    /// fails, so the actor never stays signed in client-side.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        let url = format!("{}/auth/v1/logout", self.url);

        let result = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await;

        *self
            .current_session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.hub.sign_out();

        let response = result?;
        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::ApiError(error_text));
        }
        Ok(())
    }

    async fn post_session(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Session, AuthError> {
        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.key)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::ApiError(error_text));
        }

        Ok(response.json().await?)
    }

    fn store_session(&self, session: Session) {
        let actor = session.user.to_actor();
        *self
            .current_session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session);
        self.hub.sign_in(actor);
    }
}

impl IdentityService for HostedIdentity {
    fn current_actor(&self) -> Option<Actor> {
        self.hub.current_actor()
    }

    fn watch(&self) -> watch::Receiver<Option<Actor>> {
        self.hub.watch()
    }
}
