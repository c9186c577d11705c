use axum::http::{Method, StatusCode};
use integration_tests::{TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn register_then_login() -> anyhow::Result<()> {
    let app = TestApp::new();

    let registered = app
        .request(
            Method::POST,
            "/register/",
            None,
            Some(json!({
                "username": "DAMN",
                "first_name": "Kendrick",
                "last_name": "Lamar",
                "password": PASSWORD,
            })),
        )
        .await?;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(
        registered.message(),
        Some("You successfully registered. You can log in now.")
    );

    let session = app
        .request(
            Method::POST,
            "/login/",
            None,
            Some(json!({ "username": "DAMN", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.body["username"], "DAMN");
    assert!(session.body["id"].is_i64());
    assert!(session.body["token"].is_string());
    Ok(())
}

#[tokio::test]
async fn username_must_be_unique() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.sign_up("DAMN").await?;

    let again = app
        .request(
            Method::POST,
            "/register/",
            None,
            Some(json!({
                "username": "DAMN",
                "first_name": "Other",
                "last_name": "Person",
                "password": PASSWORD,
            })),
        )
        .await?;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        again.body,
        json!({ "username": ["User with this username already exists."] })
    );
    Ok(())
}

#[tokio::test]
async fn registration_reports_field_errors() -> anyhow::Result<()> {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/register/",
            None,
            Some(json!({ "username": "ab", "first_name": "Kendrick", "password": "12345" })),
        )
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({
            "username": ["Ensure this field has at least 3 characters."],
            "last_name": ["This field is required."],
            "password": ["Ensure this field has at least 6 characters."],
        })
    );
    Ok(())
}

#[tokio::test]
async fn wrong_password_cannot_login() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.sign_up("DAMN").await?;

    let response = app
        .request(
            Method::POST,
            "/login/",
            None,
            Some(json!({ "username": "DAMN", "password": "not-the-password" })),
        )
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.message(),
        Some("Unable to login with the provided credentials.")
    );
    Ok(())
}

#[tokio::test]
async fn profile_shows_user_and_image() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let reader = app.sign_up("reader").await?;

    let response = app.get(&format!("/profile/{}/", kendrick.id), &reader).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["id"], kendrick.id);
    assert_eq!(response.body["user"]["username"], "DAMN");
    assert_eq!(response.body["user"]["first_name"], "Kendrick");
    assert!(response.body["profile_image"]
        .as_str()
        .is_some_and(|url| url.starts_with("https://")));
    assert!(response.body["user"].get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn owner_updates_profile() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let uri = format!("/profile/{}/", kendrick.id);

    let response = app
        .patch(
            &uri,
            &kendrick,
            json!({ "first_name": "Kung Fu", "profile_image": "https://example.com/k.png" }),
        )
        .await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["first_name"], "Kung Fu");
    assert_eq!(response.body["user"]["last_name"], "Lamar");
    assert_eq!(response.body["profile_image"], "https://example.com/k.png");

    let reread = app.get(&uri, &kendrick).await?;
    assert_eq!(reread.body, response.body);
    Ok(())
}

#[tokio::test]
async fn someone_else_cannot_update_a_profile() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;
    let other = app.sign_up("other").await?;

    let response = app
        .patch(
            &format!("/profile/{}/", kendrick.id),
            &other,
            json!({ "first_name": "Hacker" }),
        )
        .await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.detail(),
        Some("You do not have permission to perform this action.")
    );
    Ok(())
}

#[tokio::test]
async fn profile_image_must_be_a_url() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;

    let response = app
        .patch(
            &format!("/profile/{}/", kendrick.id),
            &kendrick,
            json!({ "profile_image": "not a url" }),
        )
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, json!({ "profile_image": ["Enter a valid URL."] }));
    Ok(())
}

#[tokio::test]
async fn unknown_profile_is_404() -> anyhow::Result<()> {
    let app = TestApp::new();
    let kendrick = app.sign_up("DAMN").await?;

    let response = app.get("/profile/9999/", &kendrick).await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.detail(), Some("Not found."));
    Ok(())
}
