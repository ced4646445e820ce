use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};

use crate::auth::{verify_jwt, Claims};
use crate::error::ApiError;
use crate::identity::webhook::WebhookClaims;
use crate::server::AppState;
use crate::types::UserId;

/// Authenticated caller extracted from the session token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub session_id: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            session_id: claims.sid,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_from_headers(&parts.headers).map_err(ApiError::unauthorized)?;
        let claims = validate_jwt(&token, &state.config.security.session_secret).map_err(ApiError::unauthorized)?;

        if claims.sub.trim().is_empty() {
            return Err(ApiError::unauthorized("Session token has no subject"));
        }

        Ok(AuthUser::from(claims))
    }
}

/// Caller of the identity webhook, proven by a token signed with the webhook secret
#[derive(Clone, Debug)]
pub struct WebhookCaller {
    pub issuer: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for WebhookCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_from_headers(&parts.headers).map_err(ApiError::unauthorized)?;
        let claims: WebhookClaims = verify_jwt(&token, &state.config.security.webhook_secret).map_err(|e| {
            tracing::warn!("Rejected identity webhook: {}", e);
            ApiError::unauthorized("Invalid webhook signature")
        })?;

        Ok(WebhookCaller { issuer: claims.iss })
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty session token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Validate session token and extract claims
fn validate_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    if secret.is_empty() {
        return Err("Session secret not configured".to_string());
    }

    verify_jwt::<Claims>(token, secret).map_err(|e| e.to_string())
}
