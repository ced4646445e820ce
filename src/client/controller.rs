use uuid::Uuid;

use super::api::{ClientError, HubApi};
use super::feed::FeedState;
use crate::types::{CommentView, LikeOutcome, PostView};

/// Drives [`FeedState`] transitions against a [`HubApi`], one request at a
/// time: each method holds `&mut self` until its response is applied.
///
/// A front end that lets clicks overlap in-flight requests drives the
/// state directly instead: `begin_like`, send through [`FeedController::api`]
/// (or any [`HubApi`]), then `settle_like` in whatever order responses land.
pub struct FeedController<A: HubApi> {
    api: A,
    pub state: FeedState,
}

impl<A: HubApi> FeedController<A> {
    pub fn new(api: A, state: FeedState) -> Self {
        Self { api, state }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn load(&mut self, community_id: Uuid) -> Result<usize, ClientError> {
        let posts = self.api.list_posts(community_id).await?;
        let count = posts.len();
        self.state.load_posts(posts);
        Ok(count)
    }

    /// `Ok(None)` when the post is not in the feed
    pub async fn toggle_like(&mut self, post_id: Uuid) -> Result<Option<LikeOutcome>, ClientError> {
        let Some(ticket) = self.state.begin_like(post_id) else {
            return Ok(None);
        };

        let result = self.api.toggle_like(post_id).await;
        self.state.settle_like(ticket, &result);
        if let Err(e) = &result {
            tracing::warn!("Like on {} failed, rolled back: {}", post_id, e);
        }
        result.map(Some)
    }

    /// Fetches only on the first expand; later expands reuse the thread
    pub async fn expand_comments(&mut self, post_id: Uuid) -> Result<(), ClientError> {
        let Some(fetch) = self.state.expand_comments(post_id) else {
            return Ok(());
        };

        match self.api.list_comments(fetch.post_id).await {
            Ok(comments) => {
                self.state.comments_loaded::<ClientError>(post_id, Ok(comments));
                Ok(())
            }
            Err(e) => {
                self.state.comments_loaded::<()>(post_id, Err(()));
                Err(e)
            }
        }
    }

    /// `Ok(None)` when there was nothing to send
    pub async fn submit_comment(&mut self, post_id: Uuid) -> Result<Option<CommentView>, ClientError> {
        let Some(submit) = self.state.begin_comment_submit(post_id) else {
            return Ok(None);
        };

        match self.api.create_comment(submit.post_id, &submit.content).await {
            Ok(comment) => {
                self.state.comment_submitted::<ClientError>(post_id, Ok(comment.clone()));
                Ok(Some(comment))
            }
            Err(e) => {
                self.state.comment_submitted::<()>(post_id, Err(()));
                Err(e)
            }
        }
    }

    pub async fn save_edit(&mut self, post_id: Uuid) -> Result<Option<PostView>, ClientError> {
        let Some(edit) = self.state.submit_edit(post_id) else {
            return Ok(None);
        };

        match self.api.update_post(&edit).await {
            Ok(updated) => {
                self.state.edit_finished::<ClientError>(post_id, Ok(updated.clone()));
                Ok(Some(updated))
            }
            Err(e) => {
                self.state.edit_finished::<()>(post_id, Err(()));
                Err(e)
            }
        }
    }
}
