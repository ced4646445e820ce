mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{id_of, TestApp};

async fn create_group(app: &TestApp, token: &str, name: &str) -> Result<Uuid> {
    let res = app
        .post("/api/groups", Some(token), json!({ "name": name, "description": "Weekly sync" }))
        .await?;
    anyhow::ensure!(res.status == StatusCode::CREATED, "group create failed: {:?}", res.body);
    id_of(res.data())
}

#[tokio::test]
async fn groups_list_by_name() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    create_group(&app, &u, "Vision Lab").await?;
    create_group(&app, &u, "Algebra Seminar").await?;

    let res = app.get("/api/groups", None).await?;
    let names: Vec<_> = res
        .data()
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|g| g["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("Algebra Seminar"), json!("Vision Lab")]);

    let missing = app.get(&format!("/api/groups/{}", Uuid::new_v4()), None).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn upload_then_record_then_download() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let group = create_group(&app, &u, "Vision Lab").await?;

    let res = app
        .post(
            &format!("/api/groups/{}/resources/upload-url", group),
            Some(&u),
            json!({ "fileName": "../Draft Chapter 1.pdf", "contentType": "application/pdf" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let upload_url = res.data()["upload_url"].as_str().context("upload_url")?.to_string();
    let object_key = res.data()["object_key"].as_str().context("object_key")?.to_string();
    assert!(object_key.starts_with(&format!("groups/{}/", group)));
    assert!(object_key.ends_with("-Draft_Chapter_1.pdf"));
    assert!(upload_url.starts_with("http://localhost:9000/phd-hub-dev/groups/"));
    assert!(upload_url.contains("token="));

    let res = app
        .post(
            &format!("/api/groups/{}/resources", group),
            Some(&u),
            json!({
                "fileName": "Draft Chapter 1.pdf",
                "objectKey": object_key,
                "contentType": "application/pdf",
                "sizeBytes": 2048
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["uploader_id"], "user_u");
    let resource = id_of(res.data())?;

    let list = app.get(&format!("/api/groups/{}/resources", group), None).await?;
    assert_eq!(list.data().as_array().map(Vec::len), Some(1));
    assert_eq!(list.data()[0]["size_bytes"], 2048);

    let res = app.get(&format!("/api/resources/{}/download", resource), Some(&u)).await?;
    assert_eq!(res.status, StatusCode::TEMPORARY_REDIRECT);
    let location = res.location.context("redirect location")?;
    assert!(location.contains(&object_key));
    assert!(location.contains("token="));
    Ok(())
}

#[tokio::test]
async fn resource_rules() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let group = create_group(&app, &u, "Vision Lab").await?;
    let other = create_group(&app, &u, "Algebra Seminar").await?;

    let foreign = app
        .post(
            &format!("/api/groups/{}/resources", group),
            Some(&u),
            json!({
                "fileName": "x.pdf",
                "objectKey": format!("groups/{}/abc-x.pdf", other),
                "contentType": "application/pdf"
            }),
        )
        .await?;
    assert_eq!(foreign.status, StatusCode::BAD_REQUEST);

    let negative = app
        .post(
            &format!("/api/groups/{}/resources", group),
            Some(&u),
            json!({
                "fileName": "x.pdf",
                "objectKey": format!("groups/{}/abc-x.pdf", group),
                "contentType": "application/pdf",
                "sizeBytes": -1
            }),
        )
        .await?;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let anonymous = app
        .post(
            &format!("/api/groups/{}/resources/upload-url", group),
            None,
            json!({ "fileName": "x.pdf", "contentType": "application/pdf" }),
        )
        .await?;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let unknown_group = app
        .post(
            &format!("/api/groups/{}/resources/upload-url", Uuid::new_v4()),
            Some(&u),
            json!({ "fileName": "x.pdf", "contentType": "application/pdf" }),
        )
        .await?;
    assert_eq!(unknown_group.status, StatusCode::NOT_FOUND);

    let download = app.get(&format!("/api/resources/{}/download", Uuid::new_v4()), Some(&u)).await?;
    assert_eq!(download.status, StatusCode::NOT_FOUND);

    let listing = app.get(&format!("/api/groups/{}/resources", Uuid::new_v4()), None).await?;
    assert_eq!(listing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn file_names_with_repeated_dots_round_trip() -> Result<()> {
    let app = TestApp::new()?;
    let u = app.token("user_u");
    let group = create_group(&app, &u, "Vision Lab").await?;

    let res = app
        .post(
            &format!("/api/groups/{}/resources/upload-url", group),
            Some(&u),
            json!({ "fileName": "thesis..v2.pdf", "contentType": "application/pdf" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let object_key = res.data()["object_key"].as_str().context("object_key")?.to_string();

    let res = app
        .post(
            &format!("/api/groups/{}/resources", group),
            Some(&u),
            json!({ "fileName": "thesis..v2.pdf", "objectKey": object_key, "contentType": "application/pdf" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["object_key"], object_key.as_str());
    Ok(())
}
