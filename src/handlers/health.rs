use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::server::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "PhD Hub API",
            "version": version,
            "description": "Communities, posts, comments and likes for doctoral researchers",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "communities": "/api/communities[/:id] (write requires session)",
                "posts": "/api/posts[?communityId=] | /api/posts/:id (write requires session)",
                "comments": "/api/comments[?postId=] (write requires session)",
                "likes": "/api/likes (requires session)",
                "events": "/api/events[?upcoming=true] (write requires session)",
                "search": "/api/search?keywords= (public)",
                "groups": "/api/groups[/:id[/resources[/upload-url]]] (write requires session)",
                "resources": "/api/resources/:id/download (requires session)",
                "webhooks": "/api/webhooks/identity (webhook secret)",
            }
        }
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": {
                        "code": "SERVICE_UNAVAILABLE",
                        "message": "database unavailable"
                    },
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
