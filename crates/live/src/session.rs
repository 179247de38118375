use gigboard_auth::IdentityService;
use log::{info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::view::LiveListingView;

/// Keeps a view's subscription tied to the signed-in session; stops
/// following the session when dropped
pub struct SessionBinding {
    task: JoinHandle<()>,
}

impl SessionBinding {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SessionBinding {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Activate `view` whenever someone signs in and deactivate it on sign-out,
/// so no listing updates reach a signed-out context.
///
/// Must be called inside a tokio runtime.
pub fn bind_to_identity(
    view: Arc<LiveListingView>,
    identity: &dyn IdentityService,
) -> SessionBinding {
    let mut rx = identity.watch();
    let task = tokio::spawn(async move {
        loop {
            let actor = rx.borrow_and_update().clone();
            match actor {
                Some(actor) => {
                    info!("Session active for {}, subscribing listings", actor.id);
                    if let Err(e) = view.activate().await {
                        warn!("Could not subscribe listings: {}", e);
                    }
                }
                None => {
                    info!("No session, releasing listing subscription");
                    view.deactivate();
                }
            }
            if rx.changed().await.is_err() {
                // identity service is gone; nobody is signed in anymore
                view.deactivate();
                break;
            }
        }
    });
    SessionBinding { task }
}
