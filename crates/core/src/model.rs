use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::rating::{average_rating, upsert_rating};

const FALLBACK_OWNER_NAME: &str = "Freelancer";

/// The signed-in identity as reported by the identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Actor {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Name used to greet the actor: display name, then email, then id
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// One advertised service
///
/// Field names on the wire follow the stored documents (`domain`,
/// `userId`, `createdAt`, ...). `created_at` is `None` while the store has
/// not resolved the server timestamp yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "domain")]
    pub category: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    #[serde(rename = "userName", default)]
    pub owner_name: Option<String>,
    #[serde(rename = "userEmail", default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// What the viewer can do with a listing card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingAction {
    /// The viewer owns the listing and may delete it
    Remove,
    /// Anyone else may contact the owner; `mailto` is absent when the
    /// owner left no email
    Connect { mailto: Option<String> },
}

impl Listing {
    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.owner_id == actor.id
    }

    pub fn is_pending(&self) -> bool {
        self.created_at.is_none()
    }

    pub fn owner_display_name(&self) -> &str {
        self.owner_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(FALLBACK_OWNER_NAME)
    }

    /// `mailto:` link pre-filled with an inquiry subject
    pub fn contact_link(&self) -> Option<String> {
        let email = self.owner_email.as_deref().filter(|e| !e.is_empty())?;
        let subject = format!("Inquiry about your service: {}", self.title);
        Some(format!(
            "mailto:{}?subject={}",
            email,
            urlencoding::encode(&subject)
        ))
    }

    /// Owner-aware action for the given viewer (`None` when signed out)
    pub fn action_for(&self, viewer: Option<&Actor>) -> ListingAction {
        match viewer {
            Some(actor) if self.is_owned_by(actor) => ListingAction::Remove,
            _ => ListingAction::Connect {
                mailto: self.contact_link(),
            },
        }
    }
}

/// Draft of a listing before the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub category: String,
}

impl NewListing {
    pub fn new(title: &str, description: &str, category: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::InvalidListing("title must not be empty".to_string()));
        }
        if self.category.trim().is_empty() {
            return Err(CoreError::InvalidListing(
                "category must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Stored record for this draft, stamped with the owner's identity.
    /// `createdAt` is left to the store.
    pub fn into_record(self, owner: &Actor) -> serde_json::Value {
        serde_json::json!({
            "title": self.title.trim(),
            "description": self.description.trim(),
            "domain": self.category,
            "userId": owner.id,
            "userName": owner.display_name,
            "userEmail": owner.email,
        })
    }
}

/// One actor's scored review of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub rater_id: String,
    #[serde(default)]
    pub rater_name: Option<String>,
    pub score: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub const MIN_SCORE: u8 = 1;
    pub const MAX_SCORE: u8 = 5;

    /// Build a rating from `rater`, timestamped now
    pub fn new(rater: &Actor, score: u8, comment: &str) -> Result<Self, CoreError> {
        Self::check_score(score)?;
        Ok(Self {
            rater_id: rater.id.clone(),
            rater_name: Some(rater.greeting_name().to_string()),
            score,
            comment: comment.trim().to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn check_score(score: u8) -> Result<(), CoreError> {
        if (Self::MIN_SCORE..=Self::MAX_SCORE).contains(&score) {
            Ok(())
        } else {
            Err(CoreError::InvalidScore(score))
        }
    }
}

/// A registered actor's public-facing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub average_rating: f64,
}

impl Profile {
    /// Fresh profile for an actor signing in for the first time
    pub fn for_actor(actor: &Actor) -> Self {
        Self {
            id: actor.id.clone(),
            display_name: actor.display_name.clone(),
            email: actor.email.clone(),
            avatar_url: None,
            description: String::new(),
            links: BTreeMap::new(),
            ratings: Vec::new(),
            average_rating: 0.0,
        }
    }

    pub fn rating_by(&self, rater_id: &str) -> Option<&Rating> {
        self.ratings.iter().find(|r| r.rater_id == rater_id)
    }

    /// Replace the rater's previous rating (if any) and refresh the average
    pub fn apply_rating(&mut self, incoming: Rating) {
        self.ratings = upsert_rating(&self.ratings, incoming);
        self.average_rating = average_rating(&self.ratings);
    }

    pub fn apply_update(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.display_name {
            self.display_name = Some(name.clone());
        }
        if let Some(avatar) = &update.avatar_url {
            self.avatar_url = Some(avatar.clone());
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(links) = &update.links {
            self.links = links.clone();
        }
    }
}

/// Owner-editable profile fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<BTreeMap<String, String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.avatar_url.is_none()
            && self.description.is_none()
            && self.links.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(owner: &str, email: Option<&str>) -> Listing {
        Listing {
            id: "l1".to_string(),
            title: "Logo design".to_string(),
            description: String::new(),
            category: "Graphic Design".to_string(),
            owner_id: owner.to_string(),
            owner_name: None,
            owner_email: email.map(str::to_string),
            created_at: None,
        }
    }

    #[test]
    fn owner_sees_remove_others_see_connect() {
        let item = listing("u1", Some("ana@example.com"));
        let owner = Actor::new("u1");
        let visitor = Actor::new("u2");

        assert_eq!(item.action_for(Some(&owner)), ListingAction::Remove);
        assert_eq!(
            item.action_for(Some(&visitor)),
            ListingAction::Connect {
                mailto: Some(
                    "mailto:ana@example.com?subject=Inquiry%20about%20your%20service%3A%20Logo%20design"
                        .to_string()
                )
            }
        );
        assert!(matches!(item.action_for(None), ListingAction::Connect { .. }));
    }

    #[test]
    fn connect_without_email_has_no_link() {
        let item = listing("u1", None);
        assert_eq!(
            item.action_for(Some(&Actor::new("u2"))),
            ListingAction::Connect { mailto: None }
        );
        assert_eq!(item.owner_display_name(), "Freelancer");
    }

    #[test]
    fn decodes_stored_document_shape() {
        let raw = serde_json::json!({
            "id": "abc",
            "title": "Landing page",
            "description": "Responsive",
            "domain": "Web Development",
            "userId": "u9",
            "userName": "Kim",
            "userEmail": "kim@example.com",
            "createdAt": "2024-03-01T10:00:00Z"
        });
        let item: Listing = serde_json::from_value(raw).unwrap();
        assert_eq!(item.category, "Web Development");
        assert_eq!(item.owner_id, "u9");
        assert!(!item.is_pending());

        let pending: Listing = serde_json::from_value(serde_json::json!({
            "title": "x", "domain": "Writing", "userId": "u1", "createdAt": null
        }))
        .unwrap();
        assert!(pending.is_pending());
    }

    #[test]
    fn draft_validation() {
        assert!(NewListing::new("Copywriting", "", "Writing").validate().is_ok());
        assert!(matches!(
            NewListing::new("  ", "", "Writing").validate(),
            Err(CoreError::InvalidListing(_))
        ));
        assert!(NewListing::new("Copywriting", "", "").validate().is_err());
    }

    #[test]
    fn greeting_prefers_display_name() {
        let actor = Actor::new("u1").with_email("a@example.com");
        assert_eq!(actor.greeting_name(), "a@example.com");
        assert_eq!(actor.with_display_name("Ana").greeting_name(), "Ana");
    }

    #[test]
    fn rating_score_bounds() {
        let rater = Actor::new("u1");
        assert!(Rating::new(&rater, 0, "").is_err());
        assert!(Rating::new(&rater, 6, "").is_err());
        assert_eq!(Rating::new(&rater, 5, " great ").unwrap().comment, "great");
    }
}
