//! # integration-tests
//!
//! Shared harness: the full service graph wired to the in-memory store,
//! driven either directly (`services()`) or over HTTP (`TestApp`).

use std::sync::Arc;

use auth_adapters::{Argon2Hasher, JwtTokens};
use services::{AccountService, StoryPolicy, StoryService};
use storage_adapters::InMemoryStore;

pub const PASSWORD: &str = "straightouttacompton";

/// Account and story services sharing one in-memory store.
pub fn services(policy: StoryPolicy) -> (AccountService, StoryService) {
    let store = Arc::new(InMemoryStore::new());
    let hasher = Argon2Hasher::with_params(8, 1, 1).unwrap_or_default();
    let accounts = AccountService::new(
        store.clone(),
        Arc::new(hasher),
        Arc::new(JwtTokens::new(b"integration-tests", chrono::Duration::hours(1))),
    );
    let stories = StoryService::new(store.clone(), store, policy);
    (accounts, stories)
}

#[cfg(feature = "web-axum")]
pub use http::{TestApp, TestResponse, TestUser};

#[cfg(feature = "web-axum")]
mod http {
    use anyhow::Context;
    use api_adapters::web::{router, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use services::StoryPolicy;
    use tower::ServiceExt;

    use super::{services, PASSWORD};

    pub struct TestApp {
        router: Router,
        pub state: AppState,
    }

    #[derive(Debug, Clone)]
    pub struct TestUser {
        pub id: i64,
        pub username: String,
        /// Ready-made `Authorization` header value.
        pub auth: String,
    }

    #[derive(Debug)]
    pub struct TestResponse {
        pub status: StatusCode,
        pub body: Value,
    }

    impl TestResponse {
        pub fn message(&self) -> Option<&str> {
            self.body["message"].as_str()
        }

        pub fn detail(&self) -> Option<&str> {
            self.body["detail"].as_str()
        }
    }

    impl Default for TestApp {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with_policy(StoryPolicy::default())
        }

        pub fn with_policy(policy: StoryPolicy) -> Self {
            let (accounts, stories) = services(policy);
            let state = AppState::new(accounts, stories);
            Self {
                router: router(state.clone()),
                state,
            }
        }

        pub async fn request(
            &self,
            method: Method,
            uri: &str,
            user: Option<&TestUser>,
            body: Option<Value>,
        ) -> anyhow::Result<TestResponse> {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(user) = user {
                builder = builder.header(header::AUTHORIZATION, &user.auth);
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))?,
                None => builder.body(Body::empty())?,
            };

            let response = self.router.clone().oneshot(request).await?;
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await?;
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).context("response body is not JSON")?
            };
            Ok(TestResponse { status, body })
        }

        pub async fn get(&self, uri: &str, user: &TestUser) -> anyhow::Result<TestResponse> {
            self.request(Method::GET, uri, Some(user), None).await
        }

        pub async fn post(
            &self,
            uri: &str,
            user: &TestUser,
            body: Value,
        ) -> anyhow::Result<TestResponse> {
            self.request(Method::POST, uri, Some(user), Some(body)).await
        }

        pub async fn put(&self, uri: &str, user: &TestUser) -> anyhow::Result<TestResponse> {
            self.request(Method::PUT, uri, Some(user), None).await
        }

        pub async fn patch(
            &self,
            uri: &str,
            user: &TestUser,
            body: Value,
        ) -> anyhow::Result<TestResponse> {
            self.request(Method::PATCH, uri, Some(user), Some(body)).await
        }

        pub async fn delete(&self, uri: &str, user: &TestUser) -> anyhow::Result<TestResponse> {
            self.request(Method::DELETE, uri, Some(user), None).await
        }

        /// Registers `username` and logs in.
        pub async fn sign_up(&self, username: &str) -> anyhow::Result<TestUser> {
            let registered = self
                .request(
                    Method::POST,
                    "/register/",
                    None,
                    Some(json!({
                        "username": username,
                        "first_name": "Kendrick",
                        "last_name": "Lamar",
                        "password": PASSWORD,
                    })),
                )
                .await?;
            anyhow::ensure!(
                registered.status == StatusCode::CREATED,
                "register {username}: {registered:?}"
            );

            let session = self
                .request(
                    Method::POST,
                    "/login/",
                    None,
                    Some(json!({ "username": username, "password": PASSWORD })),
                )
                .await?;
            anyhow::ensure!(session.status == StatusCode::OK, "login {username}: {session:?}");

            Ok(TestUser {
                id: session.body["id"].as_i64().context("login without id")?,
                username: username.to_string(),
                auth: format!(
                    "Bearer {}",
                    session.body["token"].as_str().context("login without token")?
                ),
            })
        }

        /// Creates a story and returns its id.
        pub async fn create_story(&self, user: &TestUser, title: &str) -> anyhow::Result<i64> {
            let response = self.post("/story/", user, json!({ "title": title })).await?;
            anyhow::ensure!(response.status == StatusCode::CREATED, "create story: {response:?}");
            response.body["id"].as_i64().context("story without id")
        }

        pub async fn add_line(
            &self,
            user: &TestUser,
            story_id: i64,
            content: &str,
        ) -> anyhow::Result<TestResponse> {
            self.post(
                &format!("/story/{story_id}/storylines/"),
                user,
                json!({ "content": content }),
            )
            .await
        }
    }
}
