use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::{IdentityDirectory, IdentityError};
use crate::types::UserProfile;

/// Short-lived profile cache in front of another directory. Only misses are
/// forwarded, still as a single batched call. Ids the provider does not know
/// are cached as `None` so they are not asked for again until they expire.
pub struct CachedDirectory<D> {
    inner: D,
    entries: Cache<String, Option<UserProfile>>,
}

impl<D: IdentityDirectory> CachedDirectory<D> {
    pub fn new(inner: D, ttl: Duration, capacity: u64) -> Self {
        Self {
            inner,
            entries: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
        }
    }
}

#[async_trait]
impl<D: IdentityDirectory> IdentityDirectory for CachedDirectory<D> {
    async fn profiles(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>, IdentityError> {
        let mut found = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self.entries.get(id).await {
                Some(Some(profile)) => {
                    found.insert(id.clone(), profile);
                }
                Some(None) => {}
                None => missing.push(id.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(found);
        }

        let fetched = self.inner.profiles(&missing).await?;
        for id in missing {
            self.entries.insert(id.clone(), fetched.get(&id).cloned()).await;
        }

        found.extend(fetched);
        Ok(found)
    }

    async fn invalidate(&self, id: &str) {
        self.entries.invalidate(id).await;
        self.inner.invalidate(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingDirectory {
        calls: Arc<AtomicUsize>,
        requested: Arc<std::sync::Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl IdentityDirectory for CountingDirectory {
        async fn profiles(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(ids.to_vec());
            Ok(ids
                .iter()
                .filter(|id| !id.starts_with("ghost"))
                .map(|id| {
                    (
                        id.clone(),
                        UserProfile {
                            id: id.clone(),
                            username: format!("name-{}", id),
                            image_url: None,
                        },
                    )
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let inner = CountingDirectory::default();
        let cache = CachedDirectory::new(inner.clone(), Duration::from_secs(60), 100);
        let ids = vec!["a".to_string(), "b".to_string()];

        cache.profiles(&ids).await.unwrap();
        let again = cache.profiles(&ids).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(again["b"].username, "name-b");
    }

    #[tokio::test]
    async fn only_misses_are_forwarded() {
        let inner = CountingDirectory::default();
        let cache = CachedDirectory::new(inner.clone(), Duration::from_secs(60), 100);

        cache.profiles(&["a".to_string()]).await.unwrap();
        cache.profiles(&["a".to_string(), "c".to_string()]).await.unwrap();

        let requested = inner.requested.lock().unwrap().clone();
        assert_eq!(requested, vec![vec!["a".to_string()], vec!["c".to_string()]]);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let inner = CountingDirectory::default();
        let cache = CachedDirectory::new(inner.clone(), Duration::from_millis(50), 100);

        cache.profiles(&["a".to_string()]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        cache.profiles(&["a".to_string()]).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let inner = CountingDirectory::default();
        let cache = CachedDirectory::new(inner.clone(), Duration::from_secs(60), 100);

        cache.profiles(&["a".to_string()]).await.unwrap();
        cache.invalidate("a").await;
        cache.profiles(&["a".to_string()]).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_ids_are_remembered() {
        let inner = CountingDirectory::default();
        let cache = CachedDirectory::new(inner.clone(), Duration::from_secs(60), 100);
        let ids = vec!["a".to_string(), "ghost_1".to_string()];

        let first = cache.profiles(&ids).await.unwrap();
        let second = cache.profiles(&ids).await.unwrap();

        assert!(!first.contains_key("ghost_1"));
        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
