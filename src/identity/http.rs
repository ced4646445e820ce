use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::webhook::ProviderUser;
use super::{IdentityDirectory, IdentityError};
use crate::config::IdentityConfig;
use crate::types::UserProfile;

/// Upper bound on ids per provider request
const MAX_IDS_PER_REQUEST: usize = 100;

/// Identity provider backend API client
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Returns `None` when no provider URL is configured
    pub fn from_config(config: &IdentityConfig) -> Result<Option<Self>, IdentityError> {
        match &config.api_url {
            Some(url) => Self::new(
                url.clone(),
                config.api_key.clone(),
                Duration::from_millis(config.request_timeout_ms),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_chunk(&self, ids: &[String]) -> Result<Vec<ProviderUser>, IdentityError> {
        let mut query: Vec<(&str, String)> = ids.iter().map(|id| ("user_id", id.clone())).collect();
        query.push(("limit", ids.len().to_string()));

        let mut request = self
            .client
            .get(format!("{}/v1/users", self.base_url))
            .query(&query);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Identity provider returned {} for {} ids", status, ids.len());
            return Err(IdentityError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Vec<ProviderUser>>().await?)
    }
}

#[async_trait]
impl IdentityDirectory for HttpIdentityProvider {
    async fn profiles(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>, IdentityError> {
        let mut profiles = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let users = self.fetch_chunk(chunk).await?;
            debug!("Resolved {} of {} users from identity provider", users.len(), chunk.len());
            for user in users {
                profiles.insert(user.id.clone(), user.to_profile());
            }
        }

        Ok(profiles)
    }
}
