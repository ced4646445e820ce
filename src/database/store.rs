use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::types::{
    Comment, Community, Event, LikeOutcome, Page, Post, ResearchGroup, Resource, SearchResults, User,
};

pub type StoreResult<T> = Result<T, DatabaseError>;

/// Profile fields mirrored from the identity provider
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpsert {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCommunity {
    pub name: String,
    pub description: String,
    pub hashtags: Vec<String>,
    pub banner_url: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub community_id: Uuid,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub group_id: Uuid,
    pub uploader_id: String,
    pub file_name: String,
    pub object_key: String,
    pub content_type: String,
    pub size_bytes: Option<i64>,
}

/// A post whose denormalised counter disagrees with its like rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct LikeDrift {
    pub post_id: Uuid,
    pub recorded: i64,
    pub actual: i64,
}

/// Mirror of identity-provider users. Only the webhook path writes here.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert_user(&self, user: UserUpsert) -> StoreResult<User>;
    async fn delete_user(&self, id: &str) -> StoreResult<bool>;
    async fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait CommunityStore: Send + Sync {
    /// Newest first
    async fn list_communities(&self) -> StoreResult<Vec<Community>>;
    async fn get_community(&self, id: Uuid) -> StoreResult<Option<Community>>;
    async fn create_community(&self, community: NewCommunity) -> StoreResult<Community>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest first within a community
    async fn list_posts(&self, community_id: Uuid, page: Page) -> StoreResult<Vec<Post>>;
    async fn get_post(&self, id: Uuid) -> StoreResult<Option<Post>>;
    /// Fails with `NotFound` when the community does not exist
    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;
    /// Applies only when `author_id` owns the post; `None` otherwise
    async fn update_post(&self, id: Uuid, author_id: &str, changes: PostChanges) -> StoreResult<Option<Post>>;
    /// Subset of `post_ids` the user has liked
    async fn liked_post_ids(&self, user_id: &str, post_ids: &[Uuid]) -> StoreResult<Vec<Uuid>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Oldest first
    async fn list_comments(&self, post_id: Uuid) -> StoreResult<Vec<Comment>>;
    /// Fails with `NotFound` when the post does not exist
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;
}

#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Flip the (user, post) like and adjust the post's counter as one unit
    async fn toggle_like(&self, user_id: &str, post_id: Uuid) -> StoreResult<LikeOutcome>;
    async fn count_likes(&self, post_id: Uuid) -> StoreResult<i64>;
    async fn like_count_drift(&self) -> StoreResult<Vec<LikeDrift>>;
    /// Reset every drifted counter to its row count; returns posts fixed
    async fn repair_like_counts(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Ordered by start time; with `not_ended_at`, drops events already over
    async fn list_events(&self, not_ended_at: Option<DateTime<Utc>>) -> StoreResult<Vec<Event>>;
    async fn create_event(&self, event: NewEvent) -> StoreResult<Event>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn list_groups(&self) -> StoreResult<Vec<ResearchGroup>>;
    async fn get_group(&self, id: Uuid) -> StoreResult<Option<ResearchGroup>>;
    async fn create_group(&self, group: NewGroup) -> StoreResult<ResearchGroup>;
    /// Newest first
    async fn list_resources(&self, group_id: Uuid) -> StoreResult<Vec<Resource>>;
    async fn get_resource(&self, id: Uuid) -> StoreResult<Option<Resource>>;
    /// Fails with `NotFound` when the group does not exist
    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource>;
}

#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Rows where every keyword occurs case-insensitively in a searchable field
    async fn search(&self, keywords: &[String], limit: i64) -> StoreResult<SearchResults>;
}

/// Everything the handlers need from persistence
#[async_trait]
pub trait Store:
    UserStore + CommunityStore + PostStore + CommentStore + LikeStore + EventStore + GroupStore + SearchStore
{
    async fn health_check(&self) -> StoreResult<()>;
}
