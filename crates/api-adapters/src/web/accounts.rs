//! Registration, login and author profiles.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use services::{Login, ProfileUpdate, Registration};

use super::auth::CurrentUser;
use super::error::ApiResult;
use super::stories::parse_id;
use super::AppState;
use crate::views::{AuthorView, LoginView, MessageBody, REGISTERED};

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageBody>)> {
    let Json(registration) = payload?;
    state.accounts.register(registration).await?;
    Ok((StatusCode::CREATED, Json(MessageBody::new(REGISTERED))))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Login>, JsonRejection>,
) -> ApiResult<Json<LoginView>> {
    let Json(login) = payload?;
    let session = state.accounts.login(login).await?;
    Ok(Json(session.into()))
}

pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<AuthorView>> {
    let author = state.accounts.profile(viewer, parse_id(&user_id)?).await?;
    Ok(Json(author.into()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<String>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<AuthorView>> {
    let user_id = parse_id(&user_id)?;
    let Json(update) = payload?;
    let author = state.accounts.update_profile(viewer, user_id, update).await?;
    Ok(Json(author.into()))
}
