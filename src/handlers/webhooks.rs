use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::identity::webhook::{WebhookEnvelope, WebhookEvent};
use crate::middleware::{ApiResponse, ApiResult, WebhookCaller};
use crate::server::AppState;

/// POST /api/webhooks/identity - keep the users mirror in step with the provider
pub async fn identity(
    State(state): State<AppState>,
    caller: WebhookCaller,
    body: Result<Json<WebhookEnvelope>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(envelope) = body?;
    let event_type = envelope.event_type.clone();
    let event = envelope
        .into_event()
        .map_err(|e| ApiError::invalid_json(format!("Malformed {} payload: {}", event_type, e)))?;

    match event {
        WebhookEvent::UserCreated(user) | WebhookEvent::UserUpdated(user) => {
            let upsert = user.to_upsert();
            if upsert.email.is_empty() {
                return Err(ApiError::bad_request("User has no email address"));
            }
            state.store.upsert_user(upsert).await?;
            state.identity.invalidate(&user.id).await;
            tracing::info!("Mirrored {} for user {}", event_type, user.id);
        }
        WebhookEvent::UserDeleted(user) => {
            let removed = state.store.delete_user(&user.id).await?;
            state.identity.invalidate(&user.id).await;
            tracing::info!("Deleted user {} (present: {})", user.id, removed);
        }
        WebhookEvent::Unsupported(other) => {
            tracing::debug!("Ignoring webhook event {} from {:?}", other, caller.issuer);
        }
    }

    Ok(ApiResponse::success(json!({ "received": true, "type": event_type })))
}
