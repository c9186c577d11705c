use axum::http::StatusCode;
use integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn create_and_retrieve_a_story() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;

    let created = app
        .post("/story/", &kendrick, json!({ "title": "Once upon a time" }))
        .await?;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["title"], "Once upon a time");
    assert_eq!(created.body["author"]["user"]["id"], kendrick.id);
    assert_eq!(created.body["num_vote_up"], 0);
    assert!(created.body["posted_on"].is_string());

    let id = created.body["id"].as_i64().unwrap_or_default();
    let fetched = app.get(&format!("/story/{id}/"), &kendrick).await?;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, created.body);
    Ok(())
}

#[tokio::test]
async fn title_length_is_validated() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;

    let short = app.post("/story/", &kendrick, json!({ "title": "ya" })).await?;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        short.body,
        json!({ "title": ["Ensure this field has at least 3 characters."] })
    );

    let long = app
        .post("/story/", &kendrick, json!({ "title": "fire".repeat(26) }))
        .await?;
    assert_eq!(long.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        long.body,
        json!({ "title": ["Ensure this field has no more than 100 characters."] })
    );

    let missing = app.post("/story/", &kendrick, json!({})).await?;
    assert_eq!(missing.body, json!({ "title": ["This field is required."] }));
    Ok(())
}

#[tokio::test]
async fn list_is_most_recent_first() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    app.create_story(&kendrick, "First story").await?;
    app.create_story(&kendrick, "Second story").await?;

    let listed = app.get("/story/", &kendrick).await?;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body[0]["title"], "Second story");
    assert_eq!(listed.body[1]["title"], "First story");
    Ok(())
}

#[tokio::test]
async fn missing_story_is_404() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;

    let response = app.get("/story/4242/", &kendrick).await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.detail(), Some("Not found."));
    Ok(())
}

#[tokio::test]
async fn only_the_author_deletes_a_story() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let other = app.sign_up("other").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;
    let uri = format!("/story/{story}/");

    let denied = app.delete(&uri, &other).await?;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(
        denied.detail(),
        Some("You do not have permission to perform this action.")
    );

    let deleted = app.delete(&uri, &kendrick).await?;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.message(), Some("Story successfully deleted."));

    assert_eq!(app.get(&uri, &kendrick).await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn deleting_a_story_removes_its_lines() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;
    let line = app.add_line(&kendrick, story, "there was a fox").await?;
    let line_id = line.body["id"].as_i64().unwrap_or_default();

    app.delete(&format!("/story/{story}/"), &kendrick).await?;

    let response = app
        .get(&format!("/story/{story}/storylines/{line_id}/"), &kendrick)
        .await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    Ok(())
}
