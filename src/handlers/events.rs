use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::utils::{optional, required};
use crate::database::NewEvent;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::types::Event;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub upcoming: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// GET /api/events[?upcoming=true] - by start time
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Event>> {
    let Query(query) = query?;
    let not_ended_at = query.upcoming.then(Utc::now);
    Ok(ApiResponse::success(state.store.list_events(not_ended_at).await?))
}

/// POST /api/events
pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> ApiResult<Event> {
    let Json(body) = body?;
    let title = required(body.title.as_deref(), "title")?;
    let starts_at = body.starts_at.ok_or_else(|| ApiError::bad_request("startsAt is required"))?;
    if let Some(ends_at) = body.ends_at {
        if ends_at < starts_at {
            return Err(ApiError::bad_request("endsAt must not be before startsAt"));
        }
    }

    let event = state
        .store
        .create_event(NewEvent {
            title,
            description: optional(body.description).unwrap_or_default(),
            location: optional(body.location),
            starts_at,
            ends_at: body.ends_at,
            created_by: caller.user_id,
        })
        .await?;

    Ok(ApiResponse::created(event))
}
