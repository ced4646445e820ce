#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use phd_hub::auth::{generate_jwt, issue_session_token};
use phd_hub::config::AppConfig;
use phd_hub::database::{MemoryStore, UserStore, UserUpsert};
use phd_hub::identity::webhook::WebhookClaims;
use phd_hub::server::{self, AppState};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: AppConfig,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let config = AppConfig::development();
        let (state, store) = AppState::in_memory(config.clone())?;
        Ok(Self {
            router: server::app(state),
            store,
            config,
        })
    }

    pub fn token(&self, user_id: &str) -> String {
        issue_session_token(user_id, &self.config.security.session_secret, 1).expect("mint session token")
    }

    pub fn webhook_token(&self) -> String {
        let claims = WebhookClaims {
            iss: Some("tests".into()),
            exp: chrono::Utc::now().timestamp() + 300,
        };
        generate_jwt(&claims, &self.config.security.webhook_secret).expect("mint webhook token")
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await.context("router call")?;
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };

        Ok(TestResponse { status, location, body })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    /// Mirror a user so author lookups resolve to a real name
    pub async fn add_user(&self, id: &str, username: &str) -> Result<()> {
        self.store
            .upsert_user(UserUpsert {
                id: id.into(),
                email: format!("{}@uni.example", username),
                first_name: None,
                last_name: None,
                username: Some(username.into()),
                image_url: Some(format!("https://img.example/{}.png", username)),
            })
            .await?;
        Ok(())
    }

    pub async fn create_community(&self, token: &str, name: &str) -> Result<Uuid> {
        let res = self
            .post("/api/communities", Some(token), json!({ "name": name, "description": "", "hashtags": ["#ML"] }))
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "community create failed: {:?}", res.body);
        id_of(res.data())
    }

    pub async fn create_post(&self, token: &str, community_id: Uuid, title: &str, content: &str) -> Result<Uuid> {
        let res = self
            .post(
                "/api/posts",
                Some(token),
                json!({ "communityId": community_id, "title": title, "content": content }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "post create failed: {:?}", res.body);
        id_of(res.data())
    }

    pub async fn toggle_like(&self, token: &str, post_id: Uuid) -> Result<TestResponse> {
        self.post("/api/likes", Some(token), json!({ "postId": post_id })).await
    }
}

pub fn id_of(value: &Value) -> Result<Uuid> {
    let raw = value["id"].as_str().context("response has no id")?;
    Ok(Uuid::parse_str(raw)?)
}

/// Serve the router on an ephemeral local port, returning its base URL
pub async fn spawn_server(router: Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{}", addr))
}
