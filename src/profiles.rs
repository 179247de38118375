use log::{debug, info};
use serde_json::{Map, Value};

use gigboard_core::{Profile, ProfileUpdate, Rating};
use gigboard_store::StoreError;

use crate::error::Error;
use crate::Gigboard;

impl Gigboard {
    /// Load a profile; a missing profile is `Ok(None)`
    pub async fn profile(&self, id: &str) -> Result<Option<Profile>, Error> {
        let document = self
            .store
            .get(&self.options.profiles_collection, id)
            .await?;
        match document {
            Some(document) => Ok(Some(document.decode()?)),
            None => Ok(None),
        }
    }

    /// The signed-in actor's profile, created on first use
    pub async fn ensure_profile(&self) -> Result<Profile, Error> {
        let actor = self.require_actor("You must be logged in to set up a profile.")?;
        if let Some(profile) = self.profile(&actor.id).await? {
            return Ok(profile);
        }

        let profile = Profile::for_actor(&actor);
        let record = serde_json::to_value(&profile)?;
        match self
            .store
            .create_with_id(&self.options.profiles_collection, &actor.id, record)
            .await
        {
            Ok(()) => {
                info!("Created profile for {}", actor.id);
                Ok(profile)
            }
            Err(StoreError::AlreadyExists { .. }) => {
                // created concurrently by another session of the same actor
                debug!("Profile for {} appeared concurrently", actor.id);
                self.profile(&actor.id)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("profile {}", actor.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply owner-editable changes to the signed-in actor's own profile
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, Error> {
        let mut profile = self.ensure_profile().await?;
        if update.is_empty() {
            return Ok(profile);
        }

        // identity first: a rejected name leaves the profile untouched
        if let (Some(name), Some(hosted)) = (&update.display_name, &self.hosted) {
            let user = hosted.identity.update_display_name(name).await?;
            hosted.hub.sign_in(user.to_actor());
        }

        let fields = serde_json::to_value(&update)?;
        self.store
            .update(&self.options.profiles_collection, &profile.id, fields)
            .await?;
        profile.apply_update(&update);
        info!("Profile {} updated", profile.id);
        Ok(profile)
    }

    /// Rate another actor's profile; a second rating by the same actor
    /// replaces the first
    ///
    /// Ratings and the recomputed average are written together in one
    /// update. Two raters writing at the same moment can still overwrite
    /// each other; the last write wins.
    pub async fn submit_rating(
        &self,
        profile_id: &str,
        score: u8,
        comment: &str,
    ) -> Result<Profile, Error> {
        let actor = self.require_actor("You must be logged in to rate a freelancer.")?;
        let rating = Rating::new(&actor, score, comment)?;
        if profile_id == actor.id {
            return Err(Error::SelfRating);
        }

        let collection = &self.options.profiles_collection;
        let mut profile = self
            .profile(profile_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("profile {}", profile_id)))?;
        profile.apply_rating(rating);

        let mut fields = Map::new();
        fields.insert("ratings".to_string(), serde_json::to_value(&profile.ratings)?);
        fields.insert(
            "averageRating".to_string(),
            serde_json::to_value(profile.average_rating)?,
        );
        self.store
            .update(collection, profile_id, Value::Object(fields))
            .await?;

        info!(
            "{} rated profile {} with {} (average now {:.2})",
            actor.id, profile_id, score, profile.average_rating
        );
        Ok(profile)
    }
}
