use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub store: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity provider's backend API; unset means resolve
    /// authors from the local users mirror
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub public_url: String,
    pub bucket: String,
    pub signing_secret: String,
    pub upload_expiry_mins: i64,
    pub download_expiry_mins: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub session_secret: String,
    pub webhook_secret: String,
    pub session_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub max_page_size: i64,
    pub search_result_limit: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("HUB_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("STORE") {
            self.server.store = match v.as_str() {
                "memory" => StoreBackend::Memory,
                _ => StoreBackend::Postgres,
            };
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Identity overrides
        if let Ok(v) = env::var("IDENTITY_API_URL") {
            self.identity.api_url = Some(v);
        }
        if let Ok(v) = env::var("IDENTITY_API_KEY") {
            self.identity.api_key = Some(v);
        }
        if let Ok(v) = env::var("IDENTITY_TIMEOUT_MS") {
            self.identity.request_timeout_ms = v.parse().unwrap_or(self.identity.request_timeout_ms);
        }
        if let Ok(v) = env::var("IDENTITY_CACHE_TTL_SECS") {
            self.identity.cache_ttl_secs = v.parse().unwrap_or(self.identity.cache_ttl_secs);
        }
        if let Ok(v) = env::var("IDENTITY_CACHE_CAPACITY") {
            self.identity.cache_capacity = v.parse().unwrap_or(self.identity.cache_capacity);
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_PUBLIC_URL") {
            self.storage.public_url = v;
        }
        if let Ok(v) = env::var("STORAGE_BUCKET") {
            self.storage.bucket = v;
        }
        if let Ok(v) = env::var("STORAGE_SIGNING_SECRET") {
            self.storage.signing_secret = v;
        }
        if let Ok(v) = env::var("STORAGE_UPLOAD_EXPIRY_MINS") {
            self.storage.upload_expiry_mins = v.parse().unwrap_or(self.storage.upload_expiry_mins);
        }
        if let Ok(v) = env::var("STORAGE_DOWNLOAD_EXPIRY_MINS") {
            self.storage.download_expiry_mins = v.parse().unwrap_or(self.storage.download_expiry_mins);
        }

        // Security overrides
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.security.session_secret = v;
        }
        if let Ok(v) = env::var("WEBHOOK_SECRET") {
            self.security.webhook_secret = v;
        }
        if let Ok(v) = env::var("SESSION_EXPIRY_HOURS") {
            self.security.session_expiry_hours = v.parse().unwrap_or(self.security.session_expiry_hours);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Feed overrides
        if let Ok(v) = env::var("FEED_MAX_PAGE_SIZE") {
            self.feed.max_page_size = v.parse().unwrap_or(self.feed.max_page_size);
        }
        if let Ok(v) = env::var("SEARCH_RESULT_LIMIT") {
            self.feed.search_result_limit = v.parse().unwrap_or(self.feed.search_result_limit);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                store: StoreBackend::Postgres,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                acquire_timeout_secs: 30,
                run_migrations: true,
            },
            identity: IdentityConfig {
                api_url: None,
                api_key: None,
                request_timeout_ms: 5_000,
                cache_ttl_secs: 60,
                cache_capacity: 10_000,
            },
            storage: StorageConfig {
                public_url: "http://localhost:9000".to_string(),
                bucket: "phd-hub-dev".to_string(),
                signing_secret: "dev-storage-secret".to_string(),
                upload_expiry_mins: 15,
                download_expiry_mins: 5,
            },
            security: SecurityConfig {
                session_secret: "dev-session-secret".to_string(),
                webhook_secret: "dev-webhook-secret".to_string(),
                session_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            feed: FeedConfig {
                max_page_size: 500,
                search_result_limit: 50,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.acquire_timeout_secs = 10;
        config.database.run_migrations = false;
        config.identity.request_timeout_ms = 3_000;
        config.security.session_expiry_hours = 24;
        config.security.cors_origins = vec!["https://staging.phdhub.example".to_string()];
        config.feed.max_page_size = 200;
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.acquire_timeout_secs = 5;
        config.database.run_migrations = false;
        config.identity.request_timeout_ms = 2_000;
        config.identity.cache_ttl_secs = 30;
        // Secrets must come from the environment in production
        config.storage.signing_secret = String::new();
        config.security.session_secret = String::new();
        config.security.webhook_secret = String::new();
        config.security.session_expiry_hours = 4;
        config.security.cors_origins = vec!["https://phdhub.example".to_string()];
        config.feed.max_page_size = 100;
        config.feed.search_result_limit = 25;
        config
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.store, StoreBackend::Postgres);
        assert!(config.database.run_migrations);
        assert!(!config.security.session_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.run_migrations);
        assert!(config.security.session_secret.is_empty());
        assert_eq!(config.feed.max_page_size, 100);
        assert!(config.security.session_expiry_hours < AppConfig::development().security.session_expiry_hours);
    }
}
