use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use super::utils::{enrich_comments, required, required_uuid};
use crate::database::NewComment;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::types::CommentView;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub post_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: Option<String>,
    pub content: Option<String>,
}

/// GET /api/comments?postId= - oldest first
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<CommentView>> {
    let Query(query) = query?;
    let post_id = required_uuid(query.post_id.as_deref(), "postId")?;

    let comments = state.store.list_comments(post_id).await?;
    Ok(ApiResponse::success(enrich_comments(&state, comments).await?))
}

/// POST /api/comments - append a comment authored by the caller
pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<CommentView> {
    let Json(body) = body?;
    let post_id = required_uuid(body.post_id.as_deref(), "postId")?;
    let content = required(body.content.as_deref(), "content")?;

    let comment = state
        .store
        .create_comment(NewComment {
            post_id,
            author_id: caller.user_id,
            content,
        })
        .await?;

    let view = enrich_comments(&state, vec![comment])
        .await?
        .pop()
        .ok_or_else(|| ApiError::internal_server_error("Failed to build comment view"))?;

    Ok(ApiResponse::created(view))
}
