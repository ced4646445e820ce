use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::*;
use crate::types::{
    Comment, Community, Event, LikeOutcome, Page, Post, ResearchGroup, Resource, SearchResults, User,
};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    communities: Vec<Community>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    likes: HashSet<(String, Uuid)>,
    events: Vec<Event>,
    groups: Vec<ResearchGroup>,
    resources: Vec<Resource>,
}

/// In-process store with the same ordering and atomicity guarantees as the
/// Postgres store. Vectors keep insertion order, so "newest first" is a
/// reverse scan. Each operation holds the lock for its whole duration.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

fn matches_all(haystack: &str, keywords: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    keywords.iter().all(|k| haystack.contains(&k.to_lowercase()))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(&self, user: UserUpsert) -> StoreResult<User> {
        self.record_query();
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(existing) = state.users.iter_mut().find(|u| u.id == user.id) {
            existing.email = user.email;
            existing.first_name = user.first_name;
            existing.last_name = user.last_name;
            existing.username = user.username;
            existing.image_url = user.image_url;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let row = User {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            image_url: user.image_url,
            created_at: now,
            updated_at: now,
        };
        state.users.push(row.clone());
        Ok(row)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        self.record_query();
        let mut state = self.state.write().await;
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        Ok(state.users.len() != before)
    }

    async fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }
}

#[async_trait]
impl CommunityStore for MemoryStore {
    async fn list_communities(&self) -> StoreResult<Vec<Community>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state.communities.iter().rev().cloned().collect())
    }

    async fn get_community(&self, id: Uuid) -> StoreResult<Option<Community>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state.communities.iter().find(|c| c.id == id).cloned())
    }

    async fn create_community(&self, community: NewCommunity) -> StoreResult<Community> {
        self.record_query();
        let mut state = self.state.write().await;
        let row = Community {
            id: Uuid::new_v4(),
            name: community.name,
            description: community.description,
            hashtags: community.hashtags,
            banner_url: community.banner_url,
            created_by: community.created_by,
            created_at: Utc::now(),
        };
        state.communities.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self, community_id: Uuid, page: Page) -> StoreResult<Vec<Post>> {
        self.record_query();
        let state = self.state.read().await;
        let posts: Vec<Post> = state
            .posts
            .iter()
            .rev()
            .filter(|p| p.community_id == community_id)
            .cloned()
            .collect();
        Ok(page.apply(posts))
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        self.record_query();
        let mut state = self.state.write().await;
        if !state.communities.iter().any(|c| c.id == post.community_id) {
            return Err(DatabaseError::NotFound(format!("Community {} not found", post.community_id)));
        }

        let now = Utc::now();
        let row = Post {
            id: Uuid::new_v4(),
            community_id: post.community_id,
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            media_url: post.media_url,
            like_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(row.clone());
        Ok(row)
    }

    async fn update_post(&self, id: Uuid, author_id: &str, changes: PostChanges) -> StoreResult<Option<Post>> {
        self.record_query();
        let mut state = self.state.write().await;
        let Some(post) = state
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.author_id == author_id)
        else {
            return Ok(None);
        };

        post.title = changes.title;
        post.content = changes.content;
        post.media_url = changes.media_url;
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn liked_post_ids(&self, user_id: &str, post_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(post_ids
            .iter()
            .filter(|id| state.likes.contains(&(user_id.to_string(), **id)))
            .copied()
            .collect())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn list_comments(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state.comments.iter().filter(|c| c.post_id == post_id).cloned().collect())
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        self.record_query();
        let mut state = self.state.write().await;
        if !state.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(DatabaseError::NotFound(format!("Post {} not found", comment.post_id)));
        }

        let row = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: Utc::now(),
        };
        state.comments.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl LikeStore for MemoryStore {
    async fn toggle_like(&self, user_id: &str, post_id: Uuid) -> StoreResult<LikeOutcome> {
        self.record_query();
        let mut state = self.state.write().await;
        let state = &mut *state;

        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Post {} not found", post_id)))?;

        let key = (user_id.to_string(), post_id);
        let liked = if state.likes.remove(&key) {
            post.like_count -= 1;
            false
        } else {
            state.likes.insert(key);
            post.like_count += 1;
            true
        };

        Ok(LikeOutcome { liked, like_count: post.like_count })
    }

    async fn count_likes(&self, post_id: Uuid) -> StoreResult<i64> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state.likes.iter().filter(|(_, p)| *p == post_id).count() as i64)
    }

    async fn like_count_drift(&self) -> StoreResult<Vec<LikeDrift>> {
        self.record_query();
        let state = self.state.read().await;
        let mut drift: Vec<LikeDrift> = state
            .posts
            .iter()
            .filter_map(|p| {
                let actual = state.likes.iter().filter(|(_, id)| *id == p.id).count() as i64;
                (actual != p.like_count).then(|| LikeDrift {
                    post_id: p.id,
                    recorded: p.like_count,
                    actual,
                })
            })
            .collect();
        drift.sort_by_key(|d| d.post_id);
        Ok(drift)
    }

    async fn repair_like_counts(&self) -> StoreResult<u64> {
        self.record_query();
        let mut state = self.state.write().await;
        let state = &mut *state;
        let mut fixed = 0;
        for post in state.posts.iter_mut() {
            let actual = state.likes.iter().filter(|(_, id)| *id == post.id).count() as i64;
            if post.like_count != actual {
                post.like_count = actual;
                fixed += 1;
            }
        }
        Ok(fixed)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list_events(&self, not_ended_at: Option<DateTime<Utc>>) -> StoreResult<Vec<Event>> {
        self.record_query();
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|e| match not_ended_at {
                Some(at) => e.ends_at.unwrap_or(e.starts_at) >= at,
                None => true,
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        self.record_query();
        let mut state = self.state.write().await;
        let row = Event {
            id: Uuid::new_v4(),
            title: event.title,
            description: event.description,
            location: event.location,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            created_by: event.created_by,
            created_at: Utc::now(),
        };
        state.events.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn list_groups(&self) -> StoreResult<Vec<ResearchGroup>> {
        self.record_query();
        let state = self.state.read().await;
        let mut groups = state.groups.clone();
        groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn get_group(&self, id: Uuid) -> StoreResult<Option<ResearchGroup>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn create_group(&self, group: NewGroup) -> StoreResult<ResearchGroup> {
        self.record_query();
        let mut state = self.state.write().await;
        let row = ResearchGroup {
            id: Uuid::new_v4(),
            name: group.name,
            description: group.description,
            created_by: group.created_by,
            created_at: Utc::now(),
        };
        state.groups.push(row.clone());
        Ok(row)
    }

    async fn list_resources(&self, group_id: Uuid) -> StoreResult<Vec<Resource>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state
            .resources
            .iter()
            .rev()
            .filter(|r| r.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn get_resource(&self, id: Uuid) -> StoreResult<Option<Resource>> {
        self.record_query();
        let state = self.state.read().await;
        Ok(state.resources.iter().find(|r| r.id == id).cloned())
    }

    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource> {
        self.record_query();
        let mut state = self.state.write().await;
        if !state.groups.iter().any(|g| g.id == resource.group_id) {
            return Err(DatabaseError::NotFound(format!("Research group {} not found", resource.group_id)));
        }

        let row = Resource {
            id: Uuid::new_v4(),
            group_id: resource.group_id,
            uploader_id: resource.uploader_id,
            file_name: resource.file_name,
            object_key: resource.object_key,
            content_type: resource.content_type,
            size_bytes: resource.size_bytes,
            created_at: Utc::now(),
        };
        state.resources.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn search(&self, keywords: &[String], limit: i64) -> StoreResult<SearchResults> {
        self.record_query();
        let state = self.state.read().await;
        let limit = limit.max(0) as usize;

        let communities = state
            .communities
            .iter()
            .rev()
            .filter(|c| {
                let haystack = format!("{} {} {}", c.name, c.description, c.hashtags.join(" "));
                matches_all(&haystack, keywords)
            })
            .take(limit)
            .cloned()
            .collect();

        let posts = state
            .posts
            .iter()
            .rev()
            .filter(|p| matches_all(&format!("{} {}", p.title, p.content), keywords))
            .take(limit)
            .cloned()
            .collect();

        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|e| {
                let haystack = format!(
                    "{} {} {}",
                    e.title,
                    e.description,
                    e.location.as_deref().unwrap_or_default()
                );
                matches_all(&haystack, keywords)
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.starts_at);
        events.truncate(limit);

        Ok(SearchResults { communities, posts, events })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let community = store
            .create_community(NewCommunity {
                name: "ML Group".into(),
                description: "Machine learning reading group".into(),
                hashtags: vec!["ml".into()],
                banner_url: None,
                created_by: "user_u".into(),
            })
            .await
            .unwrap();
        (store, community.id)
    }

    fn new_post(community_id: Uuid, title: &str) -> NewPost {
        NewPost {
            community_id,
            author_id: "user_u".into(),
            title: title.into(),
            content: "World".into(),
            media_url: None,
        }
    }

    #[tokio::test]
    async fn posts_list_newest_first() {
        let (store, community_id) = seeded().await;
        store.create_post(new_post(community_id, "first")).await.unwrap();
        let second = store.create_post(new_post(community_id, "second")).await.unwrap();

        let posts = store.list_posts(community_id, Page::all()).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, second.id);
    }

    #[tokio::test]
    async fn create_post_requires_community() {
        let store = MemoryStore::new();
        let err = store.create_post(new_post(Uuid::new_v4(), "orphan")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_post_only_by_author() {
        let (store, community_id) = seeded().await;
        let post = store.create_post(new_post(community_id, "Hello")).await.unwrap();
        let changes = PostChanges {
            title: "Edited".into(),
            content: "New".into(),
            media_url: None,
        };

        assert!(store.update_post(post.id, "user_v", changes.clone()).await.unwrap().is_none());
        assert_eq!(store.get_post(post.id).await.unwrap().unwrap().title, "Hello");

        let updated = store.update_post(post.id, "user_u", changes).await.unwrap().unwrap();
        assert_eq!(updated.title, "Edited");
    }

    #[tokio::test]
    async fn toggle_keeps_counter_in_step_with_rows() {
        let (store, community_id) = seeded().await;
        let post = store.create_post(new_post(community_id, "Hello")).await.unwrap();

        assert_eq!(store.toggle_like("u", post.id).await.unwrap(), LikeOutcome { liked: true, like_count: 1 });
        assert_eq!(store.toggle_like("v", post.id).await.unwrap(), LikeOutcome { liked: true, like_count: 2 });
        assert_eq!(store.toggle_like("u", post.id).await.unwrap(), LikeOutcome { liked: false, like_count: 1 });
        assert_eq!(store.count_likes(post.id).await.unwrap(), 1);
        assert!(store.like_count_drift().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_unknown_post_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.toggle_like("u", Uuid::new_v4()).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn repair_resets_drifted_counters() {
        let (store, community_id) = seeded().await;
        let post = store.create_post(new_post(community_id, "Hello")).await.unwrap();
        store.toggle_like("u", post.id).await.unwrap();
        store.state.write().await.posts[0].like_count = 7;

        let drift = store.like_count_drift().await.unwrap();
        assert_eq!(drift, vec![LikeDrift { post_id: post.id, recorded: 7, actual: 1 }]);
        assert_eq!(store.repair_like_counts().await.unwrap(), 1);
        assert!(store.like_count_drift().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_requires_every_keyword() {
        let (store, community_id) = seeded().await;
        store.create_post(new_post(community_id, "Transformers survey")).await.unwrap();

        let hits = store.search(&["transformers".into(), "WORLD".into()], 10).await.unwrap();
        assert_eq!(hits.posts.len(), 1);
        let misses = store.search(&["transformers".into(), "biology".into()], 10).await.unwrap();
        assert!(misses.posts.is_empty());
        let community_hits = store.search(&["ml".into()], 10).await.unwrap();
        assert_eq!(community_hits.communities.len(), 1);
    }

    #[tokio::test]
    async fn events_filter_out_finished() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (title, offset) in [("past", -48), ("future", 24)] {
            store
                .create_event(NewEvent {
                    title: title.into(),
                    description: String::new(),
                    location: None,
                    starts_at: now + chrono::Duration::hours(offset),
                    ends_at: Some(now + chrono::Duration::hours(offset + 2)),
                    created_by: "u".into(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.list_events(None).await.unwrap().len(), 2);
        let upcoming = store.list_events(Some(now)).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].title, "future");
    }
}
