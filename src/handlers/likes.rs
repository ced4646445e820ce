use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use super::utils::required_uuid;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::types::LikeOutcome;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub post_id: Option<String>,
}

/// POST /api/likes - flip the caller's like, answering with the post's
/// authoritative state afterwards
pub async fn toggle(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Result<Json<ToggleLikeRequest>, JsonRejection>,
) -> ApiResult<LikeOutcome> {
    let Json(body) = body?;
    let post_id = required_uuid(body.post_id.as_deref(), "postId")?;

    let outcome = state.store.toggle_like(&caller.user_id, post_id).await?;
    tracing::debug!(
        "User {} toggled like on {}: liked={} count={}",
        caller.user_id,
        post_id,
        outcome.liked,
        outcome.like_count
    );

    Ok(ApiResponse::success(outcome))
}
