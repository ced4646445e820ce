//! Optimistic feed state.
//!
//! Like clicks update the display immediately and are reconciled when the
//! server answers. Comments are fetched lazily and submitted without
//! optimism. Post edits only replace local content once the server accepts
//! them.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use super::api::PostEdit;
use crate::types::{CommentView, LikeOutcome, PostView, UserId};

/// Ticket for one in-flight like flip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PendingLike {
    pub post_id: Uuid,
    pub seq: u64,
}

#[derive(Debug, Clone, Default)]
struct LikeState {
    liked: bool,
    like_count: i64,
    /// Sequence of the response the confirmed state came from
    confirmed_seq: u64,
    pending: BTreeSet<u64>,
}

impl LikeState {
    fn from_view(view: &PostView) -> Self {
        Self {
            liked: view.liked_by_me.unwrap_or(false),
            like_count: view.post.like_count,
            confirmed_seq: 0,
            pending: BTreeSet::new(),
        }
    }

    /// Confirmed state with every flip newer than it applied
    fn displayed(&self) -> (bool, i64) {
        let flips = self.pending.range(self.confirmed_seq + 1..).count();
        let mut liked = self.liked;
        let mut count = self.like_count;
        for _ in 0..flips {
            if liked {
                count = (count - 1).max(0);
            } else {
                count += 1;
            }
            liked = !liked;
        }
        (liked, count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThreadState {
    NotLoaded,
    Loading,
    Loaded(Vec<CommentView>),
}

#[derive(Debug, Clone)]
struct CommentThread {
    state: ThreadState,
    expanded: bool,
    draft: String,
    submitting: bool,
}

impl Default for CommentThread {
    fn default() -> Self {
        Self {
            state: ThreadState::NotLoaded,
            expanded: false,
            draft: String::new(),
            submitting: false,
        }
    }
}

/// Local edit buffer for one post
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
    pub saving: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchComments {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitComment {
    pub post_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone)]
struct PostEntry {
    view: PostView,
    like: LikeState,
    thread: CommentThread,
}

/// What a renderer needs for one post
#[derive(Debug, Clone, PartialEq)]
pub struct PostDisplay<'a> {
    pub view: &'a PostView,
    pub liked: bool,
    pub like_count: i64,
    pub comments_expanded: bool,
    pub comments: &'a ThreadState,
    pub editing: Option<&'a EditSession>,
}

#[derive(Debug, Default)]
pub struct FeedState {
    viewer: Option<UserId>,
    order: Vec<Uuid>,
    posts: HashMap<Uuid, PostEntry>,
    edits: HashMap<Uuid, EditSession>,
    next_seq: u64,
}

impl FeedState {
    pub fn new(viewer: Option<UserId>) -> Self {
        Self {
            viewer,
            ..Self::default()
        }
    }

    /// Replace the feed with a fresh server listing. Posts with flips still in
    /// flight keep their like state so the pending responses reconcile.
    pub fn load_posts(&mut self, views: Vec<PostView>) {
        let mut previous = std::mem::take(&mut self.posts);
        self.order = views.iter().map(|v| v.post.id).collect();

        for view in views {
            let id = view.post.id;
            let entry = match previous.remove(&id) {
                Some(old) => PostEntry {
                    like: if old.like.pending.is_empty() {
                        LikeState::from_view(&view)
                    } else {
                        old.like
                    },
                    thread: old.thread,
                    view,
                },
                None => PostEntry {
                    like: LikeState::from_view(&view),
                    thread: CommentThread::default(),
                    view,
                },
            };
            self.posts.insert(id, entry);
        }
        self.edits.retain(|id, _| self.posts.contains_key(id));
    }

    pub fn post(&self, post_id: Uuid) -> Option<PostDisplay<'_>> {
        let entry = self.posts.get(&post_id)?;
        let (liked, like_count) = entry.like.displayed();
        Some(PostDisplay {
            view: &entry.view,
            liked,
            like_count,
            comments_expanded: entry.thread.expanded,
            comments: &entry.thread.state,
            editing: self.edits.get(&post_id),
        })
    }

    /// Posts in server order
    pub fn posts(&self) -> Vec<PostDisplay<'_>> {
        self.order.iter().filter_map(|id| self.post(*id)).collect()
    }

    // Likes

    /// Flip the displayed like now; `None` for a post not in the feed
    pub fn begin_like(&mut self, post_id: Uuid) -> Option<PendingLike> {
        let entry = self.posts.get_mut(&post_id)?;
        self.next_seq += 1;
        let seq = self.next_seq;
        entry.like.pending.insert(seq);
        Some(PendingLike { post_id, seq })
    }

    /// Retire a flip. Success adopts the server's state unless a later
    /// response was already adopted; failure just drops the flip.
    pub fn settle_like<E>(&mut self, ticket: PendingLike, result: &Result<LikeOutcome, E>) {
        let Some(entry) = self.posts.get_mut(&ticket.post_id) else {
            return;
        };
        let like = &mut entry.like;
        if !like.pending.remove(&ticket.seq) {
            return;
        }

        if let Ok(outcome) = result {
            if ticket.seq > like.confirmed_seq {
                like.liked = outcome.liked;
                like.like_count = outcome.like_count;
                like.confirmed_seq = ticket.seq;
                entry.view.post.like_count = outcome.like_count;
                entry.view.liked_by_me = Some(outcome.liked);
            }
        }
    }

    pub fn has_pending_likes(&self, post_id: Uuid) -> bool {
        self.posts
            .get(&post_id)
            .map(|e| !e.like.pending.is_empty())
            .unwrap_or(false)
    }

    // Comments

    /// Open the thread. Only the first expand (or one after a failed fetch)
    /// asks for a fetch.
    pub fn expand_comments(&mut self, post_id: Uuid) -> Option<FetchComments> {
        let thread = &mut self.posts.get_mut(&post_id)?.thread;
        thread.expanded = true;
        match thread.state {
            ThreadState::NotLoaded => {
                thread.state = ThreadState::Loading;
                Some(FetchComments { post_id })
            }
            ThreadState::Loading | ThreadState::Loaded(_) => None,
        }
    }

    pub fn collapse_comments(&mut self, post_id: Uuid) {
        if let Some(entry) = self.posts.get_mut(&post_id) {
            entry.thread.expanded = false;
        }
    }

    pub fn comments_loaded<E>(&mut self, post_id: Uuid, result: Result<Vec<CommentView>, E>) {
        if let Some(entry) = self.posts.get_mut(&post_id) {
            entry.thread.state = match result {
                Ok(comments) => ThreadState::Loaded(comments),
                Err(_) => ThreadState::NotLoaded,
            };
        }
    }

    pub fn set_comment_draft(&mut self, post_id: Uuid, text: impl Into<String>) {
        if let Some(entry) = self.posts.get_mut(&post_id) {
            entry.thread.draft = text.into();
        }
    }

    pub fn comment_draft(&self, post_id: Uuid) -> Option<&str> {
        self.posts.get(&post_id).map(|e| e.thread.draft.as_str())
    }

    /// Blank drafts and double submits produce nothing to send
    pub fn begin_comment_submit(&mut self, post_id: Uuid) -> Option<SubmitComment> {
        let thread = &mut self.posts.get_mut(&post_id)?.thread;
        let content = thread.draft.trim();
        if content.is_empty() || thread.submitting {
            return None;
        }
        thread.submitting = true;
        Some(SubmitComment {
            post_id,
            content: content.to_string(),
        })
    }

    /// Append the server's comment and clear the draft; on failure keep it
    pub fn comment_submitted<E>(&mut self, post_id: Uuid, result: Result<CommentView, E>) {
        let Some(entry) = self.posts.get_mut(&post_id) else {
            return;
        };
        let thread = &mut entry.thread;
        thread.submitting = false;

        if let Ok(comment) = result {
            if let ThreadState::Loaded(comments) = &mut thread.state {
                if !comments.iter().any(|c| c.comment.id == comment.comment.id) {
                    comments.push(comment);
                }
            }
            thread.draft.clear();
        }
    }

    // Edits

    /// Open edit mode seeded from the current content. Only the author may edit.
    pub fn begin_edit(&mut self, post_id: Uuid) -> bool {
        let Some(entry) = self.posts.get(&post_id) else {
            return false;
        };
        if self.viewer.as_deref() != Some(entry.view.post.author_id.as_str()) {
            return false;
        }

        let post = &entry.view.post;
        self.edits.entry(post_id).or_insert_with(|| EditSession {
            title: post.title.clone(),
            content: post.content.clone(),
            media_url: post.media_url.clone(),
            saving: false,
        });
        true
    }

    pub fn edit_mut(&mut self, post_id: Uuid) -> Option<&mut EditSession> {
        self.edits.get_mut(&post_id).filter(|e| !e.saving)
    }

    pub fn cancel_edit(&mut self, post_id: Uuid) {
        self.edits.remove(&post_id);
    }

    /// Build the update request; blank title or content sends nothing
    pub fn submit_edit(&mut self, post_id: Uuid) -> Option<PostEdit> {
        let session = self.edits.get_mut(&post_id)?;
        if session.saving || session.title.trim().is_empty() || session.content.trim().is_empty() {
            return None;
        }
        session.saving = true;
        Some(PostEdit {
            post_id,
            title: session.title.trim().to_string(),
            content: session.content.trim().to_string(),
            media_url: session.media_url.clone().filter(|m| !m.trim().is_empty()),
        })
    }

    /// Success replaces the entry with the server's row and closes edit mode;
    /// failure keeps the original content and leaves edit mode open
    pub fn edit_finished<E>(&mut self, post_id: Uuid, result: Result<PostView, E>) {
        match result {
            Ok(mut updated) => {
                if let Some(entry) = self.posts.get_mut(&post_id) {
                    if updated.liked_by_me.is_none() {
                        updated.liked_by_me = Some(entry.like.liked);
                    }
                    if entry.like.pending.is_empty() {
                        entry.like = LikeState::from_view(&updated);
                    }
                    entry.view = updated;
                }
                self.edits.remove(&post_id);
            }
            Err(_) => {
                if let Some(session) = self.edits.get_mut(&post_id) {
                    session.saving = false;
                }
            }
        }
    }
}
