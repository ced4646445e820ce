//! Client side of the feed: an HTTP API wrapper and the optimistic state
//! machine a front end (or the `hub feed` commands) drives.

pub mod api;
pub mod controller;
pub mod feed;

pub use api::{ClientError, HttpHubClient, HubApi, PostEdit};
pub use controller::FeedController;
pub use feed::{FeedState, PendingLike, PostDisplay, ThreadState};
