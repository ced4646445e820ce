// handlers/mod.rs - one module per resource
//
// Reads are public unless noted; writes take an `AuthUser` extractor, which
// rejects with 401 before the request body is looked at.
pub mod comments;
pub mod communities;
pub mod events;
pub mod groups;
pub mod health;
pub mod likes;
pub mod posts;
pub mod search;
pub mod utils;
pub mod webhooks;

pub use health::{health, root};
