use axum::http::StatusCode;
use integration_tests::TestApp;
use services::StoryPolicy;

#[tokio::test]
async fn block_then_unblock_restores_contribution() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let troll = app.sign_up("troll").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;

    let blocked = app
        .put(&format!("/story/{story}/block/{}/", troll.id), &kendrick)
        .await?;
    assert_eq!(blocked.status, StatusCode::OK);
    assert_eq!(blocked.message(), Some("User successfully blocked."));

    let refused = app.add_line(&troll, story, "there was a fox").await?;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
    assert_eq!(
        refused.detail(),
        Some("You are not allowed to contribute to this story anymore.")
    );

    let unblocked = app
        .put(&format!("/story/{story}/unblock/{}/", troll.id), &kendrick)
        .await?;
    assert_eq!(unblocked.status, StatusCode::OK);
    assert_eq!(unblocked.message(), Some("User successfully unblocked."));

    let accepted = app.add_line(&troll, story, "there was a fox").await?;
    assert_eq!(accepted.status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn only_the_author_moderates() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let other = app.sign_up("other").await?;
    let troll = app.sign_up("troll").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;

    let response = app
        .put(&format!("/story/{story}/block/{}/", troll.id), &other)
        .await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.detail(),
        Some("You do not have permission to perform this action.")
    );
    Ok(())
}

#[tokio::test]
async fn author_cannot_block_themselves() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;

    let response = app
        .put(&format!("/story/{story}/block/{}/", kendrick.id), &kendrick)
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), Some("You cannot block yourself."));
    Ok(())
}

#[tokio::test]
async fn redundant_block_and_unblock_are_rejected() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let troll = app.sign_up("troll").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;
    let block = format!("/story/{story}/block/{}/", troll.id);
    let unblock = format!("/story/{story}/unblock/{}/", troll.id);

    let not_yet = app.put(&unblock, &kendrick).await?;
    assert_eq!(not_yet.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_yet.message(), Some("User is not blocked yet."));

    app.put(&block, &kendrick).await?;
    let again = app.put(&block, &kendrick).await?;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.message(), Some("User is already blocked."));
    Ok(())
}

#[tokio::test]
async fn blocking_an_unknown_user_is_404() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;

    let response = app
        .put(&format!("/story/{story}/block/4242/"), &kendrick)
        .await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn blacklisted_user_still_reads_by_default() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let troll = app.sign_up("troll").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;
    app.put(&format!("/story/{story}/block/{}/", troll.id), &kendrick)
        .await?;

    let detail = app.get(&format!("/story/{story}/"), &troll).await?;
    assert_eq!(detail.status, StatusCode::OK);
    let listed = app.get("/story/", &troll).await?;
    assert_eq!(listed.body.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn hiding_policy_takes_the_story_away() -> anyhow::Result<()> {
    let app = TestApp::with_policy(StoryPolicy {
        blacklist_hides_story: true,
        ..StoryPolicy::default()
    });
    let kendrick = app.sign_up("DAMN").await?;
    let troll = app.sign_up("troll").await?;
    let story = app.create_story(&kendrick, "Once upon a time").await?;
    app.put(&format!("/story/{story}/block/{}/", troll.id), &kendrick)
        .await?;

    let detail = app.get(&format!("/story/{story}/"), &troll).await?;
    assert_eq!(detail.status, StatusCode::FORBIDDEN);
    assert_eq!(
        detail.detail(),
        Some("You are not allowed to contribute to this story anymore.")
    );

    let lines = app.get(&format!("/story/{story}/storylines/"), &troll).await?;
    assert_eq!(lines.status, StatusCode::FORBIDDEN);

    let listed = app.get("/story/", &troll).await?;
    assert_eq!(listed.body.as_array().map(Vec::len), Some(0));

    let author_view = app.get("/story/", &kendrick).await?;
    assert_eq!(author_view.body.as_array().map(Vec::len), Some(1));
    Ok(())
}
