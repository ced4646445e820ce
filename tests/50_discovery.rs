mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use common::{id_of, TestApp};

#[tokio::test]
async fn communities_normalise_hashtags_and_list_newest_first() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");

    app.create_community(&u, "Older").await?;
    let res = app
        .post(
            "/api/communities",
            Some(&u),
            json!({ "name": "NLP Circle", "description": "Language", "hashtags": ["#NLP", "nlp", " #Linguistics "] }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["hashtags"], json!(["nlp", "linguistics"]));
    let id = id_of(res.data())?;

    let list = app.get("/api/communities", None).await?;
    assert_eq!(id_of(&list.data()[0])?, id);

    let one = app.get(&format!("/api/communities/{}", id), None).await?;
    assert_eq!(one.data()["name"], "NLP Circle");

    let missing = app.get(&format!("/api/communities/{}", uuid::Uuid::new_v4()), None).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let blank = app.post("/api/communities", Some(&u), json!({ "name": " " })).await?;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn events_order_and_upcoming_filter() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let now = Utc::now();

    let past = json!({ "title": "Past defence", "startsAt": now - Duration::days(3), "endsAt": now - Duration::days(2) });
    let later = json!({ "title": "Thesis workshop", "startsAt": now + Duration::days(7), "location": "Room 101" });
    let soon = json!({ "title": "Reading group", "startsAt": now + Duration::days(1) });
    for body in [past, later, soon] {
        let res = app.post("/api/events", Some(&u), body).await?;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let all = app.get("/api/events", None).await?;
    let titles: Vec<_> = all.data().as_array().cloned().unwrap_or_default().iter().map(|e| e["title"].clone()).collect();
    assert_eq!(titles, vec![json!("Past defence"), json!("Reading group"), json!("Thesis workshop")]);

    let upcoming = app.get("/api/events?upcoming=true", None).await?;
    assert_eq!(upcoming.data().as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn event_validation() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let now = Utc::now();

    let backwards = app
        .post("/api/events", Some(&u), json!({ "title": "x", "startsAt": now, "endsAt": now - Duration::hours(1) }))
        .await?;
    assert_eq!(backwards.status, StatusCode::BAD_REQUEST);

    let no_start = app.post("/api/events", Some(&u), json!({ "title": "x" })).await?;
    assert_eq!(no_start.status, StatusCode::BAD_REQUEST);

    let anonymous = app.post("/api/events", None, json!({ "title": "x", "startsAt": now })).await?;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn search_requires_every_keyword() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let community = app.create_community(&u, "Machine Learning").await?;
    app.create_post(&u, community, "Deep learning reading list", "Transformers and more").await?;
    app.create_post(&u, community, "Deep sea biology", "Unrelated").await?;
    app.post(
        "/api/events",
        Some(&u),
        json!({ "title": "Deep learning meetup", "startsAt": Utc::now() + Duration::days(2) }),
    )
    .await?;

    let res = app.get("/api/search?keywords=deep%20LEARNING", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["posts"].as_array().map(Vec::len), Some(1));
    assert_eq!(res.data()["events"].as_array().map(Vec::len), Some(1));
    assert_eq!(res.data()["communities"].as_array().map(Vec::len), Some(0));

    let res = app.get("/api/search?keywords=machine", None).await?;
    assert_eq!(res.data()["communities"].as_array().map(Vec::len), Some(1));

    let blank = app.get("/api/search?keywords=%20%20", None).await?;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn search_posts_carry_author_fields() -> Result<()> {
    let app = TestApp::new()?;
    app.add_user("user_u", "ada").await?;
    let u = app.token("user_u");
    let community = app.create_community(&u, "Machine Learning").await?;
    let post = app.create_post(&u, community, "Transformer notes", "Attention").await?;
    app.toggle_like(&u, post).await?;

    let anonymous = app.get("/api/search?keywords=transformer", None).await?;
    let hit = &anonymous.data()["posts"][0];
    assert_eq!(id_of(hit)?, post);
    assert_eq!(hit["author_username"], "ada");
    assert_eq!(hit["author_profile_image_url"], "https://img.example/ada.png");
    assert!(hit.get("liked_by_me").is_none());

    let signed_in = app.get("/api/search?keywords=transformer", Some(&u)).await?;
    assert_eq!(signed_in.data()["posts"][0]["liked_by_me"], true);
    Ok(())
}
