use log::info;

use gigboard_core::{Listing, NewListing};

use crate::error::Error;
use crate::Gigboard;

impl Gigboard {
    /// Publish a new listing owned by the signed-in actor and return the id
    /// the store assigned
    ///
    /// The listing reaches every live view through the normal snapshot
    /// path; nothing is inserted into a local cache here.
    pub async fn post_listing(&self, draft: NewListing) -> Result<String, Error> {
        let actor = self.require_actor("You must be logged in to post a service.")?;
        draft.validate()?;

        let record = draft.into_record(&actor);
        let id = self
            .store
            .create(&self.options.listings_collection, record)
            .await?;
        info!("Service {} posted by {}", id, actor.id);
        Ok(id)
    }

    /// Delete a listing the signed-in actor owns
    pub async fn remove_listing(&self, id: &str) -> Result<(), Error> {
        let actor = self.require_actor("You must be logged in to remove a service.")?;
        let collection = &self.options.listings_collection;

        let listing: Listing = self
            .store
            .get(collection, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("service {}", id)))?
            .decode()?;
        if !listing.is_owned_by(&actor) {
            return Err(Error::forbidden("only the owner can remove a service"));
        }

        self.store.delete(collection, id).await?;
        info!("Service {} removed by {}", id, actor.id);
        Ok(())
    }
}
