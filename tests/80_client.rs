mod common;

use std::time::Duration;

use anyhow::{Context, Result};

use common::{spawn_server, TestApp};
use phd_hub::client::{FeedController, FeedState, HttpHubClient, HubApi, ThreadState};

async fn connected(app: &TestApp, user: &str) -> Result<FeedController<HttpHubClient>> {
    let base_url = spawn_server(app.router.clone()).await?;
    let client = HttpHubClient::new(base_url, Some(app.token(user)), Duration::from_secs(5))?;
    Ok(FeedController::new(client, FeedState::new(Some(user.to_string()))))
}

#[tokio::test]
async fn feed_round_trip_over_http() -> Result<()> {
    let app = TestApp::new()?;
    app.add_user("user_u", "ada").await?;
    let u = app.token("user_u");
    let community = app.create_community(&u, "ML Group").await?;
    let post = app.create_post(&u, community, "Hello", "World").await?;

    let mut feed = connected(&app, "user_u").await?;
    assert_eq!(feed.load(community).await?, 1);

    let outcome = feed.toggle_like(post).await?.context("post is in the feed")?;
    assert!(outcome.liked);
    assert_eq!(outcome.like_count, 1);
    let shown = feed.state.post(post).context("post shown")?;
    assert!(shown.liked);
    assert_eq!(shown.like_count, 1);
    assert!(!feed.state.has_pending_likes(post));

    feed.expand_comments(post).await?;
    assert_eq!(feed.state.post(post).map(|p| p.comments.clone()), Some(ThreadState::Loaded(vec![])));

    feed.state.set_comment_draft(post, "Nice work");
    let created = feed.submit_comment(post).await?.context("comment sent")?;
    assert_eq!(created.author_username, "ada");
    match feed.state.post(post).map(|p| p.comments.clone()) {
        Some(ThreadState::Loaded(comments)) => assert_eq!(comments.len(), 1),
        other => anyhow::bail!("unexpected thread state {:?}", other),
    }

    assert!(feed.state.begin_edit(post));
    if let Some(edit) = feed.state.edit_mut(post) {
        edit.title = "Hello again".into();
    }
    let updated = feed.save_edit(post).await?.context("edit saved")?;
    assert_eq!(updated.post.title, "Hello again");
    assert_eq!(feed.state.post(post).map(|p| p.view.post.title.clone()), Some("Hello again".to_string()));
    Ok(())
}

#[tokio::test]
async fn server_errors_surface_as_api_errors() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let community = app.create_community(&u, "ML Group").await?;
    let post = app.create_post(&u, community, "Hello", "World").await?;

    let base_url = spawn_server(app.router.clone()).await?;
    let anonymous = HttpHubClient::new(base_url, None, Duration::from_secs(5))?;

    let err = match anonymous.toggle_like(post).await {
        Ok(outcome) => anyhow::bail!("anonymous like succeeded: {:?}", outcome),
        Err(e) => e,
    };
    assert_eq!(err.status(), Some(401));

    // Listing is public
    assert_eq!(anonymous.list_posts(community).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn non_author_cannot_start_an_edit() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let community = app.create_community(&u, "ML Group").await?;
    let post = app.create_post(&u, community, "Hello", "World").await?;

    let mut feed = connected(&app, "user_v").await?;
    feed.load(community).await?;
    assert!(!feed.state.begin_edit(post));
    assert_eq!(feed.save_edit(post).await?, None);
    Ok(())
}

#[tokio::test]
async fn html_error_pages_keep_their_status() -> Result<()> {
    use axum::{http::StatusCode, routing::get, Router};

    let proxy = Router::new().route(
        "/api/posts",
        get(|| async { (StatusCode::BAD_GATEWAY, "<html><body>upstream down</body></html>") }),
    );
    let base_url = spawn_server(proxy).await?;
    let client = HttpHubClient::new(base_url, None, Duration::from_secs(5))?;

    let err = match client.list_posts(uuid::Uuid::new_v4()).await {
        Ok(posts) => anyhow::bail!("expected an error, got {:?}", posts),
        Err(e) => e,
    };
    assert_eq!(err.status(), Some(502));
    assert!(matches!(err, phd_hub::client::ClientError::Api { ref code, .. } if code == "UNKNOWN"));
    Ok(())
}
