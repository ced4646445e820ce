use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Redirect,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::utils::{optional, parse_uuid, required};
use crate::database::{NewGroup, NewResource};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::storage::{key_belongs_to_group, resource_key};
use crate::types::{ResearchGroup, Resource};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub object_key: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    pub file_name: Option<String>,
    pub object_key: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

async fn existing_group(state: &AppState, raw_id: &str) -> Result<ResearchGroup, ApiError> {
    let id = parse_uuid(raw_id, "groupId")?;
    state
        .store
        .get_group(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Research group not found"))
}

/// GET /api/groups
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ResearchGroup>> {
    Ok(ApiResponse::success(state.store.list_groups().await?))
}

/// GET /api/groups/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ResearchGroup> {
    Ok(ApiResponse::success(existing_group(&state, &id).await?))
}

/// POST /api/groups
pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> ApiResult<ResearchGroup> {
    let Json(body) = body?;
    let group = state
        .store
        .create_group(NewGroup {
            name: required(body.name.as_deref(), "name")?,
            description: optional(body.description).unwrap_or_default(),
            created_by: caller.user_id,
        })
        .await?;
    Ok(ApiResponse::created(group))
}

/// POST /api/groups/:id/resources/upload-url - presigned PUT for a fresh key
pub async fn upload_url(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UploadUrlRequest>, JsonRejection>,
) -> ApiResult<UploadUrlResponse> {
    let Json(body) = body?;
    let file_name = required(body.file_name.as_deref(), "fileName")?;
    let content_type = required(body.content_type.as_deref(), "contentType")?;
    let group = existing_group(&state, &id).await?;

    let object_key = resource_key(group.id, &file_name);
    let signed = state.storage.presign_upload(&object_key, &content_type).await?;
    tracing::info!("User {} requested upload URL for {}", caller.user_id, object_key);

    Ok(ApiResponse::success(UploadUrlResponse {
        upload_url: signed.url,
        object_key,
        expires_at: signed.expires_at,
    }))
}

/// GET /api/groups/:id/resources - newest first
pub async fn list_resources(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Resource>> {
    let group = existing_group(&state, &id).await?;
    Ok(ApiResponse::success(state.store.list_resources(group.id).await?))
}

/// POST /api/groups/:id/resources - record metadata for an uploaded object
pub async fn create_resource(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<CreateResourceRequest>, JsonRejection>,
) -> ApiResult<Resource> {
    let Json(body) = body?;
    let group_id: Uuid = parse_uuid(&id, "groupId")?;
    let file_name = required(body.file_name.as_deref(), "fileName")?;
    let object_key = required(body.object_key.as_deref(), "objectKey")?;
    let content_type = required(body.content_type.as_deref(), "contentType")?;

    if !key_belongs_to_group(&object_key, group_id) {
        return Err(ApiError::bad_request("objectKey does not belong to this group"));
    }
    if matches!(body.size_bytes, Some(size) if size < 0) {
        return Err(ApiError::bad_request("sizeBytes must not be negative"));
    }

    let resource = state
        .store
        .create_resource(NewResource {
            group_id,
            uploader_id: caller.user_id,
            file_name,
            object_key,
            content_type,
            size_bytes: body.size_bytes,
        })
        .await?;
    Ok(ApiResponse::created(resource))
}

/// GET /api/resources/:id/download - 307 to a presigned GET
pub async fn download(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    let id = parse_uuid(&id, "resourceId")?;
    let resource = state
        .store
        .get_resource(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource not found"))?;

    let signed = state.storage.presign_download(&resource.object_key).await?;
    Ok(Redirect::temporary(&signed.url))
}
