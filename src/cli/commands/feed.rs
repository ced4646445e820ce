use std::time::Duration;

use clap::{Args, Subcommand};
use serde_json::json;
use uuid::Uuid;

use crate::auth::Claims;
use crate::cli::utils::{flag_or_env, output_collection, output_empty_collection, output_success, truncate};
use crate::cli::OutputFormat;
use crate::client::{FeedController, FeedState, HttpHubClient, ThreadState};

#[derive(Args, Clone)]
pub struct ServerArgs {
    #[arg(long, help = "Server base URL (or HUB_URL, default http://localhost:3000)")]
    pub server: Option<String>,
    #[arg(long, help = "Session token (or HUB_TOKEN)")]
    pub token: Option<String>,
    #[arg(long, default_value_t = 10, help = "Per-request timeout in seconds")]
    pub timeout: u64,
}

#[derive(Subcommand)]
pub enum FeedCommands {
    #[command(about = "Show a community's posts, newest first")]
    Show {
        #[arg(help = "Community id")]
        community_id: Uuid,
        #[command(flatten)]
        server: ServerArgs,
    },

    #[command(about = "Toggle your like on a post")]
    Like {
        #[arg(help = "Community id the post belongs to")]
        community_id: Uuid,
        #[arg(help = "Post id")]
        post_id: Uuid,
        #[command(flatten)]
        server: ServerArgs,
    },

    #[command(about = "Show a post's comments, optionally adding one")]
    Comments {
        #[arg(help = "Community id the post belongs to")]
        community_id: Uuid,
        #[arg(help = "Post id")]
        post_id: Uuid,
        #[arg(long, help = "Comment text to add")]
        add: Option<String>,
        #[command(flatten)]
        server: ServerArgs,
    },
}

async fn connect(args: &ServerArgs, community_id: Uuid) -> anyhow::Result<FeedController<HttpHubClient>> {
    let base_url = flag_or_env(args.server.clone(), "HUB_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
    let token = flag_or_env(args.token.clone(), "HUB_TOKEN");
    let viewer = token.as_deref().and_then(token_subject);

    let client = HttpHubClient::new(base_url, token, Duration::from_secs(args.timeout))?;
    let mut controller = FeedController::new(client, FeedState::new(viewer));
    controller.load(community_id).await?;
    Ok(controller)
}

/// Subject of a session token, read without checking the signature. The
/// server does the checking; this only decides which posts are editable.
fn token_subject(token: &str) -> Option<String> {
    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    jsonwebtoken::decode::<Claims>(token, &jsonwebtoken::DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.sub)
}

pub async fn handle(cmd: FeedCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        FeedCommands::Show { community_id, server } => {
            let controller = connect(&server, community_id).await?;
            let posts = controller.state.posts();
            if posts.is_empty() {
                return output_empty_collection(&output_format, "posts", "No posts in this community");
            }

            let views: Vec<_> = posts.iter().map(|p| p.view).collect();
            output_collection(&output_format, "posts", &views, |view| {
                let liked = if view.liked_by_me == Some(true) { "♥" } else { "♡" };
                format!(
                    "{}  {} {:>3}  {}  by {}",
                    view.post.id,
                    liked,
                    view.post.like_count,
                    truncate(&view.post.title, 40),
                    view.author_username
                )
            })
        }
        FeedCommands::Like { community_id, post_id, server } => {
            let mut controller = connect(&server, community_id).await?;
            match controller.toggle_like(post_id).await? {
                Some(outcome) => output_success(
                    &output_format,
                    &format!(
                        "{} ({} like{})",
                        if outcome.liked { "Liked" } else { "Unliked" },
                        outcome.like_count,
                        if outcome.like_count == 1 { "" } else { "s" }
                    ),
                    Some(json!({ "liked": outcome.liked, "like_count": outcome.like_count })),
                ),
                None => Err(anyhow::anyhow!("Post {} is not in community {}", post_id, community_id)),
            }
        }
        FeedCommands::Comments { community_id, post_id, add, server } => {
            let mut controller = connect(&server, community_id).await?;
            controller.expand_comments(post_id).await?;

            if let Some(text) = add {
                controller.state.set_comment_draft(post_id, text);
                if controller.submit_comment(post_id).await?.is_none() {
                    anyhow::bail!("Comment is empty");
                }
            }

            let Some(post) = controller.state.post(post_id) else {
                anyhow::bail!("Post {} is not in community {}", post_id, community_id);
            };
            match post.comments {
                ThreadState::Loaded(comments) if !comments.is_empty() => {
                    output_collection(&output_format, "comments", comments, |c| {
                        format!("{}: {}", c.author_username, truncate(&c.comment.content, 80))
                    })
                }
                _ => output_empty_collection(&output_format, "comments", "No comments yet"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::issue_session_token;

    #[test]
    fn subject_is_read_from_any_session_token() {
        let token = issue_session_token("user_42", "whatever-secret", 1).unwrap();
        assert_eq!(token_subject(&token).as_deref(), Some("user_42"));
        assert_eq!(token_subject("garbage"), None);
    }
}
