//! Object storage collaborator seam: short-lived signed URLs for direct
//! client upload and download. The application never proxies file bytes.

pub mod signed;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use signed::SignedUrlStorage;

const MAX_FILE_NAME_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to sign URL: {0}")]
    Signing(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage is not configured: {0}")]
    NotConfigured(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UrlMethod {
    Put,
    Get,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedUrl {
    pub url: String,
    pub method: UrlMethod,
    pub object_key: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn presign_upload(&self, object_key: &str, content_type: &str) -> Result<PresignedUrl, StorageError>;
    async fn presign_download(&self, object_key: &str) -> Result<PresignedUrl, StorageError>;
}

/// Key prefix owned by a research group
pub fn group_prefix(group_id: Uuid) -> String {
    format!("groups/{}/", group_id)
}

/// `groups/{group}/{uuid}-{name}` with the name reduced to a safe charset
pub fn resource_key(group_id: Uuid, file_name: &str) -> String {
    format!("{}{}-{}", group_prefix(group_id), Uuid::new_v4(), sanitize_file_name(file_name))
}

pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Keys must be a single segment directly under the group's prefix. Dots
/// inside a file name are fine; a `.` or `..` segment is not.
pub fn key_belongs_to_group(object_key: &str, group_id: Uuid) -> bool {
    match object_key.strip_prefix(&group_prefix(group_id)) {
        Some(rest) => !rest.is_empty() && !rest.contains(['/', '\\']) && !matches!(rest, "." | ".."),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("Thesis draft (v2).pdf"), "Thesis_draft__v2_.pdf");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn generated_keys_belong_to_their_group() {
        let group = Uuid::new_v4();
        let key = resource_key(group, "data.csv");
        assert!(key.ends_with("-data.csv"));
        assert!(key_belongs_to_group(&key, group));
        assert!(!key_belongs_to_group(&key, Uuid::new_v4()));
    }

    #[test]
    fn rejects_keys_escaping_the_prefix() {
        let group = Uuid::new_v4();
        assert!(!key_belongs_to_group(&format!("groups/{}/../x", group), group));
        assert!(!key_belongs_to_group(&format!("groups/{}/a/b", group), group));
        assert!(!key_belongs_to_group(&format!("groups/{}/", group), group));
        assert!(!key_belongs_to_group(&format!("groups/{}/..", group), group));
    }

    #[test]
    fn repeated_dots_inside_a_name_are_accepted() {
        let group = Uuid::new_v4();
        let key = resource_key(group, "thesis..v2.pdf");
        assert!(key.ends_with("-thesis..v2.pdf"));
        assert!(key_belongs_to_group(&key, group));
    }
}
