use std::collections::HashMap;
use std::collections::HashSet;

use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::distinct_ids;
use crate::server::AppState;
use crate::types::{Comment, CommentView, Post, PostView, UserProfile};

/// Trimmed, non-blank value of a request field
pub fn required(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::bad_request(format!("{} is required", field))),
    }
}

/// Required field that must also parse as a UUID
pub fn required_uuid(value: Option<&str>, field: &str) -> Result<Uuid, ApiError> {
    let raw = required(value, field)?;
    parse_uuid(&raw, field)
}

pub fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("{} must be a valid UUID", field)))
}

/// Blank optional strings are treated as absent
pub fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// One directory call for every distinct author in the batch
async fn author_profiles<'a>(
    state: &AppState,
    author_ids: impl IntoIterator<Item = &'a str>,
) -> Result<HashMap<String, UserProfile>, ApiError> {
    let ids = distinct_ids(author_ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(state.identity.profiles(&ids).await?)
}

fn profile_for(profiles: &HashMap<String, UserProfile>, id: &str) -> UserProfile {
    profiles.get(id).cloned().unwrap_or_else(|| UserProfile::unknown(id))
}

/// Attach author display fields, and `liked_by_me` when a viewer is known
pub async fn enrich_posts(
    state: &AppState,
    posts: Vec<Post>,
    viewer: Option<&str>,
) -> Result<Vec<PostView>, ApiError> {
    let profiles = author_profiles(state, posts.iter().map(|p| p.author_id.as_str())).await?;

    let liked: Option<HashSet<Uuid>> = match viewer {
        Some(user_id) if !posts.is_empty() => {
            let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
            Some(state.store.liked_post_ids(user_id, &ids).await?.into_iter().collect())
        }
        Some(_) => Some(HashSet::new()),
        None => None,
    };

    Ok(posts
        .into_iter()
        .map(|post| {
            let profile = profile_for(&profiles, &post.author_id);
            let mut view = PostView::new(post, &profile);
            view.liked_by_me = liked.as_ref().map(|set| set.contains(&view.post.id));
            view
        })
        .collect())
}

pub async fn enrich_post(state: &AppState, post: Post, viewer: Option<&str>) -> Result<PostView, ApiError> {
    enrich_posts(state, vec![post], viewer)
        .await?
        .pop()
        .ok_or_else(|| ApiError::internal_server_error("Failed to build post view"))
}

pub async fn enrich_comments(state: &AppState, comments: Vec<Comment>) -> Result<Vec<CommentView>, ApiError> {
    let profiles = author_profiles(state, comments.iter().map(|c| c.author_id.as_str())).await?;

    Ok(comments
        .into_iter()
        .map(|comment| {
            let profile = profile_for(&profiles, &comment.author_id);
            CommentView::new(comment, &profile)
        })
        .collect())
}
