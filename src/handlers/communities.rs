use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;

use super::utils::{optional, parse_uuid, required};
use crate::database::NewCommunity;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::types::{normalize_hashtags, Community};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunityRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub banner_url: Option<String>,
}

/// GET /api/communities
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Community>> {
    Ok(ApiResponse::success(state.store.list_communities().await?))
}

/// GET /api/communities/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Community> {
    let id = parse_uuid(&id, "communityId")?;
    let community = state
        .store
        .get_community(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Community not found"))?;
    Ok(ApiResponse::success(community))
}

/// POST /api/communities
pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Result<Json<CreateCommunityRequest>, JsonRejection>,
) -> ApiResult<Community> {
    let Json(body) = body?;
    let name = required(body.name.as_deref(), "name")?;

    let community = state
        .store
        .create_community(NewCommunity {
            name,
            description: optional(body.description).unwrap_or_default(),
            hashtags: normalize_hashtags(&body.hashtags),
            banner_url: optional(body.banner_url),
            created_by: caller.user_id,
        })
        .await?;

    tracing::info!("Created community {} ({})", community.name, community.id);
    Ok(ApiResponse::created(community))
}
