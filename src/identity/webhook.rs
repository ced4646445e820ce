use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::UserUpsert;
use crate::types::UserProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

/// User object as the identity provider serialises it, in API responses and
/// in webhook payloads alike
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
}

impl ProviderUser {
    /// The primary address when flagged, else the first one listed
    pub fn primary_email(&self) -> Option<&str> {
        let primary = self
            .primary_email_address_id
            .as_deref()
            .and_then(|id| self.email_addresses.iter().find(|e| e.id == id));

        primary
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }

    pub fn to_upsert(&self) -> UserUpsert {
        UserUpsert {
            id: self.id.clone(),
            email: self.primary_email().unwrap_or_default().to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            image_url: self.image_url.clone(),
        }
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: UserProfile::display_name(
                self.username.as_deref(),
                self.first_name.as_deref(),
                self.last_name.as_deref(),
                self.primary_email().unwrap_or_default(),
            ),
            image_url: self.image_url.clone(),
        }
    }
}

/// Deleted-user payloads carry only the id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedUser {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// Raw webhook body: an event type plus its payload
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone)]
pub enum WebhookEvent {
    UserCreated(ProviderUser),
    UserUpdated(ProviderUser),
    UserDeleted(DeletedUser),
    Unsupported(String),
}

impl WebhookEnvelope {
    pub fn into_event(self) -> Result<WebhookEvent, serde_json::Error> {
        Ok(match self.event_type.as_str() {
            "user.created" => WebhookEvent::UserCreated(serde_json::from_value(self.data)?),
            "user.updated" => WebhookEvent::UserUpdated(serde_json::from_value(self.data)?),
            "user.deleted" => WebhookEvent::UserDeleted(serde_json::from_value(self.data)?),
            other => WebhookEvent::Unsupported(other.to_string()),
        })
    }
}

/// Claims carried by the webhook bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
}
