//! Identity collaborator seam.
//!
//! Author display fields are resolved through an [`IdentityDirectory`] in a
//! single batched call per list, either from the local users mirror or from
//! the identity provider's API behind a short-lived cache.

pub mod cache;
pub mod http;
pub mod mirror;
pub mod webhook;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::UserProfile;

pub use cache::CachedDirectory;
pub use http::HttpIdentityProvider;
pub use mirror::MirrorDirectory;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Identity provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("User mirror lookup failed: {0}")]
    Mirror(#[from] crate::database::DatabaseError),
}

/// Batched profile lookup. Ids without a record are simply absent from the
/// returned map.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn profiles(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>, IdentityError>;

    /// Forget anything held locally for this user
    async fn invalidate(&self, _id: &str) {}
}

/// Unique ids in first-seen order
pub fn distinct_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        if seen.insert(id) {
            out.push(id.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_keeps_first_occurrence_order() {
        let ids = distinct_ids(["b", "a", "b", "c", "a"]);
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn distinct_ids_handles_large_batches() {
        let raw: Vec<String> = (0..20_000).map(|i| format!("user_{}", i % 5_000)).collect();
        let ids = distinct_ids(raw.iter().map(String::as_str));
        assert_eq!(ids.len(), 5_000);
        assert_eq!(ids[4_999], "user_4999");
    }
}
