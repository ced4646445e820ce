pub mod auth;
pub mod response;

pub use auth::{AuthUser, WebhookCaller};
pub use response::{ApiResponse, ApiResult};
