use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{CommentView, LikeOutcome, PostView};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{code} ({status}): {message}")]
    Api { status: u16, code: String, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Decode(_) => None,
        }
    }
}

/// Fields sent when an author edits a post
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEdit {
    pub post_id: Uuid,
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
}

/// The calls the feed needs from the server
#[async_trait]
pub trait HubApi: Send + Sync {
    async fn list_posts(&self, community_id: Uuid) -> Result<Vec<PostView>, ClientError>;
    async fn toggle_like(&self, post_id: Uuid) -> Result<LikeOutcome, ClientError>;
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>, ClientError>;
    async fn create_comment(&self, post_id: Uuid, content: &str) -> Result<CommentView, ClientError>;
    async fn update_post(&self, edit: &PostEdit) -> Result<PostView, ClientError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// reqwest-backed client with a per-request timeout
pub struct HttpHubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpHubClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        // Non-JSON error bodies (proxies, HTML pages) still keep their status
        if !status.is_success() {
            let (code, message) = serde_json::from_slice::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .map(|e| (e.code, e.message))
                .unwrap_or_else(|| ("UNKNOWN".to_string(), status.to_string()));
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(format!("{} ({})", e, status)))?;
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("response has no data".to_string()))
    }
}

#[async_trait]
impl HubApi for HttpHubClient {
    async fn list_posts(&self, community_id: Uuid) -> Result<Vec<PostView>, ClientError> {
        let request = self
            .client
            .get(self.url("/api/posts"))
            .query(&[("communityId", community_id.to_string())]);
        self.send(request).await
    }

    async fn toggle_like(&self, post_id: Uuid) -> Result<LikeOutcome, ClientError> {
        let request = self.client.post(self.url("/api/likes")).json(&json!({ "postId": post_id }));
        self.send(request).await
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>, ClientError> {
        let request = self
            .client
            .get(self.url("/api/comments"))
            .query(&[("postId", post_id.to_string())]);
        self.send(request).await
    }

    async fn create_comment(&self, post_id: Uuid, content: &str) -> Result<CommentView, ClientError> {
        let request = self
            .client
            .post(self.url("/api/comments"))
            .json(&json!({ "postId": post_id, "content": content }));
        self.send(request).await
    }

    async fn update_post(&self, edit: &PostEdit) -> Result<PostView, ClientError> {
        let request = self.client.put(self.url("/api/posts")).json(edit);
        self.send(request).await
    }
}
