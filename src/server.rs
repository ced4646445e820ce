use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use thiserror::Error;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseError, DatabaseManager, MemoryStore, PgStore, Store};
use crate::handlers;
use crate::identity::{CachedDirectory, HttpIdentityProvider, IdentityDirectory, IdentityError, MirrorDirectory};
use crate::storage::{ObjectStorage, SignedUrlStorage, StorageError};

/// Process-wide state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityDirectory>,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppState {
    /// State over an in-process store, resolving authors from its users table
    pub fn in_memory(config: AppConfig) -> Result<(Self, Arc<MemoryStore>), StartupError> {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn Store> = memory.clone();
        let storage = SignedUrlStorage::from_config(&config.storage)?;

        let state = AppState {
            identity: Arc::new(MirrorDirectory::new(store.clone())),
            store,
            storage: Arc::new(storage),
            config: Arc::new(config),
        };
        Ok((state, memory))
    }
}

/// Wire collaborators from config. The pool, when there is one, is returned so
/// the caller can close it on shutdown.
pub async fn build_state(config: AppConfig) -> Result<(AppState, Option<PgPool>), StartupError> {
    let (store, pool): (Arc<dyn Store>, Option<PgPool>) = match config.server.store {
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on exit");
            (Arc::new(MemoryStore::new()), None)
        }
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await?;
            }
            (Arc::new(PgStore::new(pool.clone())), Some(pool))
        }
    };

    let identity: Arc<dyn IdentityDirectory> = match HttpIdentityProvider::from_config(&config.identity)? {
        Some(provider) => {
            info!("Resolving authors through identity provider API");
            let ttl = Duration::from_secs(config.identity.cache_ttl_secs);
            Arc::new(CachedDirectory::new(provider, ttl, config.identity.cache_capacity))
        }
        None => {
            info!("Resolving authors from local users mirror");
            Arc::new(MirrorDirectory::new(store.clone()))
        }
    };

    let storage = SignedUrlStorage::from_config(&config.storage)?;

    let state = AppState {
        store,
        identity,
        storage: Arc::new(storage),
        config: Arc::new(config),
    };
    Ok((state, pool))
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(community_routes())
        .merge(feed_routes())
        .merge(calendar_routes())
        .merge(group_routes())
        .merge(webhook_routes())
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn community_routes() -> Router<AppState> {
    use handlers::communities;

    Router::new()
        .route("/api/communities", get(communities::list).post(communities::create))
        .route("/api/communities/:id", get(communities::get))
}

fn feed_routes() -> Router<AppState> {
    use handlers::{comments, likes, posts};

    Router::new()
        .route("/api/posts", get(posts::list).post(posts::create).put(posts::update))
        .route("/api/posts/:id", get(posts::get))
        .route("/api/comments", get(comments::list).post(comments::create))
        .route("/api/likes", post(likes::toggle))
}

fn calendar_routes() -> Router<AppState> {
    use handlers::{events, search};

    Router::new()
        .route("/api/events", get(events::list).post(events::create))
        .route("/api/search", get(search::search))
}

fn group_routes() -> Router<AppState> {
    use handlers::groups;

    Router::new()
        .route("/api/groups", get(groups::list).post(groups::create))
        .route("/api/groups/:id", get(groups::get))
        .route(
            "/api/groups/:id/resources",
            get(groups::list_resources).post(groups::create_resource),
        )
        .route("/api/groups/:id/resources/upload-url", post(groups::upload_url))
        .route("/api/resources/:id/download", get(groups::download))
}

fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/webhooks/identity", post(handlers::webhooks::identity))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
