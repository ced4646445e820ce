use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{IdentityDirectory, IdentityError};
use crate::database::Store;
use crate::types::UserProfile;

/// Resolves profiles from the webhook-maintained users table
pub struct MirrorDirectory {
    store: Arc<dyn Store>,
}

impl MirrorDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityDirectory for MirrorDirectory {
    async fn profiles(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>, IdentityError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self.store.users_by_ids(ids).await?;
        Ok(users
            .iter()
            .map(|user| (user.id.clone(), UserProfile::from(user)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, UserStore, UserUpsert};

    #[tokio::test]
    async fn resolves_only_known_users_in_one_query() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_user(UserUpsert {
                id: "user_1".into(),
                email: "grace@uni.example".into(),
                first_name: Some("Grace".into()),
                last_name: Some("Hopper".into()),
                username: None,
                image_url: Some("https://img.example/grace.png".into()),
            })
            .await
            .unwrap();

        let directory = MirrorDirectory::new(store.clone());
        let before = store.query_count();
        let profiles = directory
            .profiles(&["user_1".to_string(), "user_missing".to_string()])
            .await
            .unwrap();

        assert_eq!(store.query_count() - before, 1);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles["user_1"].username, "Grace Hopper");
    }
}
