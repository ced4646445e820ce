use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::utils::{enrich_post, enrich_posts, optional, parse_uuid, required, required_uuid};
use crate::database::{NewPost, PostChanges};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::types::{Page, PostView};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub community_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub community_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub post_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub media_url: Option<String>,
}

fn page_from(query: &ListQuery, max_page_size: i64) -> Result<Page, ApiError> {
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::bad_request("offset must not be negative"));
    }
    let limit = match query.limit {
        Some(limit) if limit < 1 => return Err(ApiError::bad_request("limit must be positive")),
        Some(limit) => Some(limit.min(max_page_size)),
        None => None,
    };
    Ok(Page { limit, offset })
}

/// GET /api/posts?communityId= - posts in a community, newest first
pub async fn list(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<PostView>> {
    let Query(query) = query?;
    let community_id = required_uuid(query.community_id.as_deref(), "communityId")?;
    let page = page_from(&query, state.config.feed.max_page_size)?;

    let posts = state.store.list_posts(community_id, page).await?;
    let views = enrich_posts(&state, posts, viewer.as_ref().map(|u| u.user_id.as_str())).await?;

    Ok(ApiResponse::success(views))
}

/// GET /api/posts/:id
pub async fn get(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<PostView> {
    let id = parse_uuid(&id, "postId")?;
    let post = state
        .store
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let view = enrich_post(&state, post, viewer.as_ref().map(|u| u.user_id.as_str())).await?;
    Ok(ApiResponse::success(view))
}

/// POST /api/posts - caller becomes the author
pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> ApiResult<PostView> {
    let Json(body) = body?;
    let community_id = required_uuid(body.community_id.as_deref(), "communityId")?;
    let title = required(body.title.as_deref(), "title")?;
    let content = required(body.content.as_deref(), "content")?;

    let post = state
        .store
        .create_post(NewPost {
            community_id,
            author_id: caller.user_id.clone(),
            title,
            content,
            media_url: optional(body.media_url),
        })
        .await?;

    tracing::info!("User {} created post {} in community {}", caller.user_id, post.id, community_id);

    let view = enrich_post(&state, post, Some(&caller.user_id)).await?;
    Ok(ApiResponse::created(view))
}

/// PUT /api/posts - author-only edit of title, content and media
pub async fn update(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> ApiResult<PostView> {
    let Json(body) = body?;
    let post_id = required_uuid(body.post_id.as_deref(), "postId")?;
    let changes = PostChanges {
        title: required(body.title.as_deref(), "title")?,
        content: required(body.content.as_deref(), "content")?,
        media_url: optional(body.media_url),
    };

    let post = state
        .store
        .update_post(post_id, &caller.user_id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found_or_unauthorized("Post not found or not owned by caller"))?;

    let view = enrich_post(&state, post, Some(&caller.user_id)).await?;
    Ok(ApiResponse::success(view))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<i64>, offset: Option<i64>) -> ListQuery {
        ListQuery { community_id: None, limit, offset }
    }

    #[test]
    fn default_page_is_unbounded() {
        assert_eq!(page_from(&query(None, None), 500).unwrap(), Page::all());
    }

    #[test]
    fn limit_is_capped() {
        let page = page_from(&query(Some(10_000), Some(5)), 500).unwrap();
        assert_eq!(page, Page { limit: Some(500), offset: 5 });
    }

    #[test]
    fn negative_paging_is_rejected() {
        assert!(page_from(&query(Some(0), None), 500).is_err());
        assert!(page_from(&query(None, Some(-1)), 500).is_err());
    }
}
