mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use phd_hub::database::LikeStore;

#[tokio::test]
async fn like_scenario_across_two_users() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let v = app.token("user_v");
    let community = app.create_community(&u, "ML Group").await?;
    let post = app.create_post(&u, community, "Hello", "World").await?;

    let listed = app.get(&format!("/api/posts/{}", post), None).await?;
    assert_eq!(listed.data()["like_count"], 0);

    let res = app.toggle_like(&u, post).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data(), &json!({ "liked": true, "like_count": 1 }));

    let res = app.toggle_like(&v, post).await?;
    assert_eq!(res.data(), &json!({ "liked": true, "like_count": 2 }));

    let res = app.toggle_like(&u, post).await?;
    assert_eq!(res.data(), &json!({ "liked": false, "like_count": 1 }));

    assert_eq!(app.store.count_likes(post).await?, 1);
    Ok(())
}

#[tokio::test]
async fn toggling_twice_restores_state() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let community = app.create_community(&u, "ML Group").await?;
    let post = app.create_post(&u, community, "Hello", "World").await?;

    let first = app.toggle_like(&u, post).await?;
    let second = app.toggle_like(&u, post).await?;
    assert_eq!(first.data()["liked"], true);
    assert_eq!(second.data(), &json!({ "liked": false, "like_count": 0 }));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_keep_counter_exact() -> Result<()> {
    let app = Arc::new(TestApp::new()?);
    let owner = app.token("owner");
    let community = app.create_community(&owner, "ML Group").await?;
    let post = app.create_post(&owner, community, "Hello", "World").await?;

    let mut handles = Vec::new();
    for user in 0..8 {
        for _ in 0..(user % 3 + 1) {
            let app = app.clone();
            let token = app.token(&format!("user_{}", user));
            handles.push(tokio::spawn(async move { app.toggle_like(&token, post).await }));
        }
    }
    for handle in handles {
        let res = handle.await??;
        assert_eq!(res.status, StatusCode::OK);
    }

    // Users 0,3,6 toggled once, 1,4,7 twice, 2,5 three times
    let recorded = app.get(&format!("/api/posts/{}", post), None).await?.data()["like_count"].clone();
    let actual = app.store.count_likes(post).await?;
    assert_eq!(recorded, json!(actual));
    assert_eq!(actual, 5);
    assert!(app.store.like_count_drift().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn toggle_validation() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let community = app.create_community(&u, "ML Group").await?;
    let post = app.create_post(&u, community, "Hello", "World").await?;

    let res = app.post("/api/likes", None, json!({ "postId": post })).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.count_likes(post).await?, 0);

    let res = app.post("/api/likes", Some(&u), json!({})).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_code(), "INVALID_REQUEST");

    let res = app.toggle_like(&u, Uuid::new_v4()).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}
