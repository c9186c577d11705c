use axum::http::StatusCode;
use integration_tests::TestApp;
use services::StoryPolicy;

#[tokio::test]
async fn personal_lists_only_my_stories() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let other = app.sign_up("other").await?;
    app.create_story(&kendrick, "First story").await?;
    app.create_story(&other, "Not mine").await?;
    app.create_story(&kendrick, "Second story").await?;

    let response = app.get("/story/personal/", &kendrick).await?;
    assert_eq!(response.status, StatusCode::OK);
    let titles: Vec<_> = response
        .body
        .as_array()
        .into_iter()
        .flatten()
        .map(|story| story["title"].clone())
        .collect();
    assert_eq!(titles, ["Second story", "First story"]);
    Ok(())
}

#[tokio::test]
async fn trending_puts_the_most_voted_first() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let popular = app.create_story(&kendrick, "Popular story").await?;
    let quiet = app.create_story(&kendrick, "Quiet story").await?;

    for name in ["fan1", "fan2", "fan3"] {
        let fan = app.sign_up(name).await?;
        app.put(&format!("/story/{popular}/vote/"), &fan).await?;
        if name == "fan1" {
            app.put(&format!("/story/{quiet}/vote/"), &fan).await?;
        }
    }

    let response = app.get("/story/trending/", &kendrick).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body[0]["id"], popular);
    assert_eq!(response.body[0]["num_vote_up"], 3);
    assert_eq!(response.body[1]["id"], quiet);
    assert_eq!(response.body[1]["num_vote_up"], 1);
    Ok(())
}

#[tokio::test]
async fn trending_is_capped() -> anyhow::Result<()> {
    let app = TestApp::with_policy(StoryPolicy {
        trending_limit: 3,
        ..StoryPolicy::default()
    });
    let kendrick = app.sign_up("DAMN").await?;
    for i in 0..5 {
        app.create_story(&kendrick, &format!("Story number {i}")).await?;
    }

    let response = app.get("/story/trending/", &kendrick).await?;
    assert_eq!(response.body.as_array().map(Vec::len), Some(3));

    let everything = app.get("/story/", &kendrick).await?;
    assert_eq!(everything.body.as_array().map(Vec::len), Some(5));
    Ok(())
}
