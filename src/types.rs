/// Shared rows and views used across the store, handlers and client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Identity-provider user id. Opaque, never parsed.
pub type UserId = String;

/// Mirrored subset of the identity provider's user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display fields attached to posts and comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub image_url: Option<String>,
}

impl UserProfile {
    /// Placeholder used when the directory has no record for an author
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            username: "unknown".to_string(),
            image_url: None,
        }
    }

    /// Username when set, else full name, else the email's local part
    pub fn display_name(
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: &str,
    ) -> String {
        match (username, first_name, last_name) {
            (Some(username), _, _) if !username.is_empty() => username.to_string(),
            (_, Some(first), Some(last)) => format!("{} {}", first, last),
            (_, Some(first), None) => first.to_string(),
            _ => match email.split('@').next() {
                Some(local) if !local.is_empty() => local.to_string(),
                _ => "unknown".to_string(),
            },
        }
    }
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: Self::display_name(
                user.username.as_deref(),
                user.first_name.as_deref(),
                user.last_name.as_deref(),
                &user.email,
            ),
            image_url: user.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub hashtags: Vec<String>,
    pub banner_url: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub community_id: Uuid,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post as returned by every post endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub author_profile_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked_by_me: Option<bool>,
}

impl PostView {
    pub fn new(post: Post, author: &UserProfile) -> Self {
        Self {
            post,
            author_username: author.username.clone(),
            author_profile_image_url: author.image_url.clone(),
            liked_by_me: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_username: String,
    pub author_profile_image_url: Option<String>,
}

impl CommentView {
    pub fn new(comment: Comment, author: &UserProfile) -> Self {
        Self {
            comment,
            author_username: author.username.clone(),
            author_profile_image_url: author.image_url.clone(),
        }
    }
}

/// Authoritative like state returned by a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResearchGroup {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Metadata for a file stored in object storage on behalf of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub group_id: Uuid,
    pub uploader_id: UserId,
    pub file_name: String,
    pub object_key: String,
    pub content_type: String,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub communities: Vec<Community>,
    pub posts: Vec<Post>,
    pub events: Vec<Event>,
}

/// Paging window; `limit = None` returns everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = self.offset.max(0) as usize;
        let iter = items.into_iter().skip(skip);
        match self.limit {
            Some(limit) => iter.take(limit.max(0) as usize).collect(),
            None => iter.collect(),
        }
    }
}

/// Lower-case, strip `#`, drop blanks and duplicates
pub fn normalize_hashtags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
