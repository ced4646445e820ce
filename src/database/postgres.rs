use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::store::*;
use crate::types::{
    Comment, Community, Event, LikeOutcome, Page, Post, ResearchGroup, Resource, SearchResults, User,
};

const USER_COLUMNS: &str = "id, email, first_name, last_name, username, image_url, created_at, updated_at";
const COMMUNITY_COLUMNS: &str = "id, name, description, hashtags, banner_url, created_by, created_at";
const POST_COLUMNS: &str =
    "id, community_id, author_id, title, content, media_url, like_count, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, created_at";
const EVENT_COLUMNS: &str = "id, title, description, location, starts_at, ends_at, created_by, created_at";
const GROUP_COLUMNS: &str = "id, name, description, created_by, created_at";
const RESOURCE_COLUMNS: &str =
    "id, group_id, uploader_id, file_name, object_key, content_type, size_bytes, created_at";

/// Postgres-backed store sharing one pool across all requests
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Turn keywords into ILIKE patterns, escaping LIKE metacharacters
fn like_patterns(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| {
            let escaped = k
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{}%", escaped)
        })
        .collect()
}

#[async_trait]
impl UserStore for PgStore {
    async fn upsert_user(&self, user: UserUpsert) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, first_name, last_name, username, image_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                image_url = EXCLUDED.image_url,
                updated_at = now()
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, User>(&sql)
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.username)
            .bind(&user.image_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, User>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl CommunityStore for PgStore {
    async fn list_communities(&self) -> StoreResult<Vec<Community>> {
        let sql = format!("SELECT {COMMUNITY_COLUMNS} FROM communities ORDER BY created_at DESC, id DESC");
        Ok(sqlx::query_as::<_, Community>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_community(&self, id: Uuid) -> StoreResult<Option<Community>> {
        let sql = format!("SELECT {COMMUNITY_COLUMNS} FROM communities WHERE id = $1");
        Ok(sqlx::query_as::<_, Community>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_community(&self, community: NewCommunity) -> StoreResult<Community> {
        let sql = format!(
            "INSERT INTO communities (id, name, description, hashtags, banner_url, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COMMUNITY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Community>(&sql)
            .bind(Uuid::new_v4())
            .bind(&community.name)
            .bind(&community.description)
            .bind(&community.hashtags)
            .bind(&community.banner_url)
            .bind(&community.created_by)
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn list_posts(&self, community_id: Uuid, page: Page) -> StoreResult<Vec<Post>> {
        // LIMIT NULL means no limit
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE community_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(community_id)
            .bind(page.limit)
            .bind(page.offset.max(0))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let sql = format!(
            "INSERT INTO posts (id, community_id, author_id, title, content, media_url)
             SELECT $1, c.id, $3, $4, $5, $6 FROM communities c WHERE c.id = $2
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::new_v4())
            .bind(post.community_id)
            .bind(&post.author_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.media_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Community {} not found", post.community_id)))
    }

    async fn update_post(&self, id: Uuid, author_id: &str, changes: PostChanges) -> StoreResult<Option<Post>> {
        let sql = format!(
            "UPDATE posts SET title = $3, content = $4, media_url = $5, updated_at = now()
             WHERE id = $1 AND author_id = $2
             RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(author_id)
            .bind(&changes.title)
            .bind(&changes.content)
            .bind(&changes.media_url)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn liked_post_ids(&self, user_id: &str, post_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)")
                .bind(user_id)
                .bind(post_ids.to_vec())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn list_comments(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let sql = format!(
            "INSERT INTO comments (id, post_id, author_id, content)
             SELECT $1, p.id, $3, $4 FROM posts p WHERE p.id = $2
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::new_v4())
            .bind(comment.post_id)
            .bind(&comment.author_id)
            .bind(&comment.content)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Post {} not found", comment.post_id)))
    }
}

#[async_trait]
impl LikeStore for PgStore {
    async fn toggle_like(&self, user_id: &str, post_id: Uuid) -> StoreResult<LikeOutcome> {
        let mut tx = self.pool.begin().await?;

        // Unlike leg: the row delete and the decrement are one statement
        let removed: Option<(i64,)> = sqlx::query_as(
            "WITH removed AS (
                DELETE FROM likes WHERE user_id = $1 AND post_id = $2 RETURNING post_id
             )
             UPDATE posts SET like_count = like_count - 1
             WHERE id IN (SELECT post_id FROM removed)
             RETURNING like_count",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((like_count,)) = removed {
            tx.commit().await?;
            debug!("User {} unliked post {} (count {})", user_id, post_id, like_count);
            return Ok(LikeOutcome { liked: false, like_count });
        }

        // Like leg: the (user_id, post_id) key absorbs a concurrent duplicate
        let added: Option<(i64,)> = sqlx::query_as(
            "WITH added AS (
                INSERT INTO likes (user_id, post_id)
                SELECT $1, p.id FROM posts p WHERE p.id = $2
                ON CONFLICT (user_id, post_id) DO NOTHING
                RETURNING post_id
             )
             UPDATE posts SET like_count = like_count + 1
             WHERE id IN (SELECT post_id FROM added)
             RETURNING like_count",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((like_count,)) = added {
            tx.commit().await?;
            debug!("User {} liked post {} (count {})", user_id, post_id, like_count);
            return Ok(LikeOutcome { liked: true, like_count });
        }

        // Nothing inserted: either the post is missing or another session of
        // this user liked it first
        let current: Option<(i64,)> = sqlx::query_as("SELECT like_count FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        match current {
            Some((like_count,)) => Ok(LikeOutcome { liked: true, like_count }),
            None => Err(DatabaseError::NotFound(format!("Post {} not found", post_id))),
        }
    }

    async fn count_likes(&self, post_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn like_count_drift(&self) -> StoreResult<Vec<LikeDrift>> {
        Ok(sqlx::query_as::<_, LikeDrift>(
            "SELECT p.id AS post_id, p.like_count AS recorded, COUNT(l.user_id) AS actual
             FROM posts p
             LEFT JOIN likes l ON l.post_id = p.id
             GROUP BY p.id, p.like_count
             HAVING p.like_count <> COUNT(l.user_id)
             ORDER BY p.id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn repair_like_counts(&self) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE posts p SET like_count = counted.actual
             FROM (
                SELECT p2.id, COUNT(l.user_id) AS actual
                FROM posts p2
                LEFT JOIN likes l ON l.post_id = p2.id
                GROUP BY p2.id
             ) counted
             WHERE p.id = counted.id AND p.like_count <> counted.actual",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn list_events(&self, not_ended_at: Option<DateTime<Utc>>) -> StoreResult<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE $1::timestamptz IS NULL OR COALESCE(ends_at, starts_at) >= $1
             ORDER BY starts_at ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(not_ended_at)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let sql = format!(
            "INSERT INTO events (id, title, description, location, starts_at, ends_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {EVENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(Uuid::new_v4())
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.location)
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(&event.created_by)
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl GroupStore for PgStore {
    async fn list_groups(&self) -> StoreResult<Vec<ResearchGroup>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM research_groups ORDER BY name ASC, id ASC");
        Ok(sqlx::query_as::<_, ResearchGroup>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_group(&self, id: Uuid) -> StoreResult<Option<ResearchGroup>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM research_groups WHERE id = $1");
        Ok(sqlx::query_as::<_, ResearchGroup>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_group(&self, group: NewGroup) -> StoreResult<ResearchGroup> {
        let sql = format!(
            "INSERT INTO research_groups (id, name, description, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {GROUP_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, ResearchGroup>(&sql)
            .bind(Uuid::new_v4())
            .bind(&group.name)
            .bind(&group.description)
            .bind(&group.created_by)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_resources(&self, group_id: Uuid) -> StoreResult<Vec<Resource>> {
        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM group_resources WHERE group_id = $1 ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Resource>(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_resource(&self, id: Uuid) -> StoreResult<Option<Resource>> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM group_resources WHERE id = $1");
        Ok(sqlx::query_as::<_, Resource>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource> {
        let sql = format!(
            "INSERT INTO group_resources (id, group_id, uploader_id, file_name, object_key, content_type, size_bytes)
             SELECT $1, g.id, $3, $4, $5, $6, $7 FROM research_groups g WHERE g.id = $2
             RETURNING {RESOURCE_COLUMNS}"
        );
        sqlx::query_as::<_, Resource>(&sql)
            .bind(Uuid::new_v4())
            .bind(resource.group_id)
            .bind(&resource.uploader_id)
            .bind(&resource.file_name)
            .bind(&resource.object_key)
            .bind(&resource.content_type)
            .bind(resource.size_bytes)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Research group {} not found", resource.group_id)))
    }
}

#[async_trait]
impl SearchStore for PgStore {
    async fn search(&self, keywords: &[String], limit: i64) -> StoreResult<SearchResults> {
        let patterns = like_patterns(keywords);

        let communities_sql = format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities
             WHERE (name || ' ' || description || ' ' || array_to_string(hashtags, ' ')) ILIKE ALL ($1)
             ORDER BY created_at DESC LIMIT $2"
        );
        let posts_sql = format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE (title || ' ' || content) ILIKE ALL ($1)
             ORDER BY created_at DESC LIMIT $2"
        );
        let events_sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE (title || ' ' || description || ' ' || COALESCE(location, '')) ILIKE ALL ($1)
             ORDER BY starts_at ASC LIMIT $2"
        );

        let (communities, posts, events) = futures::try_join!(
            sqlx::query_as::<_, Community>(&communities_sql)
                .bind(&patterns)
                .bind(limit)
                .fetch_all(&self.pool),
            sqlx::query_as::<_, Post>(&posts_sql)
                .bind(&patterns)
                .bind(limit)
                .fetch_all(&self.pool),
            sqlx::query_as::<_, Event>(&events_sql)
                .bind(&patterns)
                .bind(limit)
                .fetch_all(&self.pool),
        )?;

        Ok(SearchResults { communities, posts, events })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        DatabaseManager::health_check(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_metacharacters() {
        let patterns = like_patterns(&["100%".to_string(), "snake_case".to_string()]);
        assert_eq!(patterns, vec!["%100\\%%".to_string(), "%snake\\_case%".to_string()]);
    }
}
