//! # web
//!
//! The axum router. Every story and profile route requires a bearer token;
//! `/register/`, `/login/`, `/health` and `/metrics` are open.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod stories;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use services::{AccountService, StoryService};
use tracing::error;

pub use auth::CurrentUser;
pub use error::{ApiError, ApiResult};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub stories: Arc<StoryService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(accounts: AccountService, stories: StoryService) -> Self {
        Self {
            accounts: Arc::new(accounts),
            stories: Arc::new(stories),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/register/", post(accounts::register))
        .route("/login/", post(accounts::login))
        .route(
            "/profile/{id}/",
            get(accounts::profile).patch(accounts::update_profile),
        )
        .route(
            "/story/",
            get(stories::list_stories).post(stories::create_story),
        )
        .route(
            "/story/{id}/",
            get(stories::story_or_category).delete(stories::delete_story),
        )
        .route(
            "/story/{id}/storylines/",
            get(stories::list_lines).post(stories::create_line),
        )
        .route(
            "/story/{id}/storylines/{line_id}/",
            get(stories::line_detail).delete(stories::delete_line),
        )
        .route("/story/{id}/vote/", put(stories::vote))
        .route("/story/{id}/unvote/", put(stories::unvote))
        .route("/story/{id}/block/{user_id}/", put(stories::block))
        .route("/story/{id}/unblock/{user_id}/", put(stories::unblock))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .with_state(state);

    middleware::apply(api)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(%err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
