use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ObjectStorage, PresignedUrl, StorageError, UrlMethod};
use crate::auth::{generate_jwt, verify_jwt};
use crate::config::StorageConfig;

/// Claims embedded in a signed URL. The storage gateway checks them before
/// serving the object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlClaims {
    pub key: String,
    pub method: UrlMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub exp: i64,
}

/// Issues `{public_url}/{bucket}/{key}?token=…` URLs whose token is an
/// HS256-signed grant for exactly one method on exactly one key
pub struct SignedUrlStorage {
    public_url: url::Url,
    bucket: String,
    secret: String,
    upload_expiry: Duration,
    download_expiry: Duration,
}

impl SignedUrlStorage {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.signing_secret.is_empty() {
            return Err(StorageError::NotConfigured("STORAGE_SIGNING_SECRET"));
        }
        let public_url = url::Url::parse(&config.public_url)
            .map_err(|_| StorageError::NotConfigured("STORAGE_PUBLIC_URL"))?;

        Ok(Self {
            public_url,
            bucket: config.bucket.clone(),
            secret: config.signing_secret.clone(),
            upload_expiry: Duration::minutes(config.upload_expiry_mins),
            download_expiry: Duration::minutes(config.download_expiry_mins),
        })
    }

    /// Check a token against the key and method it is presented for
    pub fn verify(&self, token: &str, object_key: &str, method: UrlMethod) -> Result<UrlClaims, StorageError> {
        let claims: UrlClaims =
            verify_jwt(token, &self.secret).map_err(|e| StorageError::Signing(e.to_string()))?;
        if claims.key != object_key || claims.method != method {
            return Err(StorageError::InvalidKey(object_key.to_string()));
        }
        Ok(claims)
    }

    fn sign(
        &self,
        object_key: &str,
        method: UrlMethod,
        content_type: Option<&str>,
        expiry: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        if object_key.is_empty() || object_key.starts_with('/') {
            return Err(StorageError::InvalidKey(object_key.to_string()));
        }

        let expires_at = Utc::now() + expiry;
        let claims = UrlClaims {
            key: object_key.to_string(),
            method,
            content_type: content_type.map(str::to_string),
            exp: expires_at.timestamp(),
        };
        let token = generate_jwt(&claims, &self.secret).map_err(|e| StorageError::Signing(e.to_string()))?;

        let mut url = self.public_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::NotConfigured("STORAGE_PUBLIC_URL"))?;
            segments.pop_if_empty().push(&self.bucket);
            for part in object_key.split('/') {
                segments.push(part);
            }
        }
        url.query_pairs_mut().append_pair("token", &token);

        Ok(PresignedUrl {
            url: url.to_string(),
            method,
            object_key: object_key.to_string(),
            expires_at,
        })
    }
}

#[async_trait]
impl ObjectStorage for SignedUrlStorage {
    async fn presign_upload(&self, object_key: &str, content_type: &str) -> Result<PresignedUrl, StorageError> {
        self.sign(object_key, UrlMethod::Put, Some(content_type), self.upload_expiry)
    }

    async fn presign_download(&self, object_key: &str) -> Result<PresignedUrl, StorageError> {
        self.sign(object_key, UrlMethod::Get, None, self.download_expiry)
    }
}
