//! Story, story line, vote and blacklist handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::ranking::Category;
use domains::{BlockAction, DomainError, Ledger, Story, StoryId, UserId, VoteAction};

use super::auth::CurrentUser;
use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::views::{
    MessageBody, StoryInput, StoryLineInput, StoryLineView, StoryView, LINE_DELETED,
    STORY_DELETED, USER_BLOCKED, USER_UNBLOCKED,
};

/// Ids in paths are unsigned decimal integers; anything else is not a route.
pub(super) fn parse_id(raw: &str) -> ApiResult<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::NotFound);
    }
    raw.parse().map_err(|_| ApiError::NotFound)
}

fn story_views(stories: Vec<Story>) -> Vec<StoryView> {
    stories.into_iter().map(StoryView::from).collect()
}

pub async fn list_stories(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
) -> ApiResult<Json<Vec<StoryView>>> {
    let stories = state.stories.list_stories(viewer).await?;
    Ok(Json(story_views(stories)))
}

pub async fn create_story(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    payload: Result<Json<StoryInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StoryView>)> {
    let Json(input) = payload?;
    let story = state.stories.create_story(viewer, input.title).await?;
    Ok((StatusCode::CREATED, Json(story.into())))
}

/// `/story/{id}/` serves both a single story and the lowercase ranking
/// categories (`personal`, `trending`).
pub async fn story_or_category(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    if let Ok(story_id) = parse_id(&key) {
        let story = state.stories.get_story(viewer, story_id).await?;
        return Ok(Json(StoryView::from(story)).into_response());
    }
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(ApiError::NotFound);
    }

    let category: Category = key.parse().map_err(|_| ApiError::InvalidCategory)?;
    let stories = state.stories.ranked(viewer, category).await?;
    Ok(Json(story_views(stories)).into_response())
}

pub async fn delete_story(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(story_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    let story_id = parse_id(&story_id)?;
    state.stories.delete_story(viewer, story_id).await?;
    Ok(Json(MessageBody::new(STORY_DELETED)))
}

pub async fn list_lines(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(story_id): Path<String>,
) -> ApiResult<Json<Vec<StoryLineView>>> {
    let story_id = parse_id(&story_id)?;
    let lines = state.stories.list_lines(viewer, story_id).await?;
    Ok(Json(lines.into_iter().map(StoryLineView::from).collect()))
}

pub async fn create_line(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(story_id): Path<String>,
    payload: Result<Json<StoryLineInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StoryLineView>)> {
    let story_id = parse_id(&story_id)?;
    let Json(input) = payload?;

    match state.stories.add_line(viewer, story_id, input.content).await {
        Ok(line) => {
            state.metrics.line_appended();
            Ok((StatusCode::CREATED, Json(line.into())))
        }
        Err(err) => {
            if let DomainError::Rejected(rejection) = &err {
                state.metrics.contribution_rejected(rejection.rule());
            }
            Err(err.into())
        }
    }
}

pub async fn line_detail(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path((story_id, line_id)): Path<(String, String)>,
) -> ApiResult<Json<StoryLineView>> {
    let (story_id, line_id) = (parse_id(&story_id)?, parse_id(&line_id)?);
    let line = state.stories.get_line(viewer, story_id, line_id).await?;
    Ok(Json(line.into()))
}

pub async fn delete_line(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path((story_id, line_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageBody>> {
    let (story_id, line_id) = (parse_id(&story_id)?, parse_id(&line_id)?);
    state.stories.delete_line(viewer, story_id, line_id).await?;
    Ok(Json(MessageBody::new(LINE_DELETED)))
}

async fn cast(
    state: AppState,
    viewer: UserId,
    story_id: StoryId,
    action: VoteAction,
) -> ApiResult<Json<StoryView>> {
    let story = state.stories.vote(viewer, story_id, action).await?;
    state.metrics.ledger_changed(Ledger::Votes, action.toggle());
    Ok(Json(story.into()))
}

pub async fn vote(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(story_id): Path<String>,
) -> ApiResult<Json<StoryView>> {
    cast(state, viewer, parse_id(&story_id)?, VoteAction::Vote).await
}

pub async fn unvote(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(story_id): Path<String>,
) -> ApiResult<Json<StoryView>> {
    cast(state, viewer, parse_id(&story_id)?, VoteAction::Unvote).await
}

async fn moderate(
    state: AppState,
    viewer: UserId,
    (story_id, target): (String, String),
    action: BlockAction,
) -> ApiResult<Json<MessageBody>> {
    let (story_id, target) = (parse_id(&story_id)?, parse_id(&target)?);
    state.stories.moderate(viewer, story_id, target, action).await?;
    state.metrics.ledger_changed(Ledger::Blacklist, action.toggle());

    Ok(Json(MessageBody::new(match action {
        BlockAction::Block => USER_BLOCKED,
        BlockAction::Unblock => USER_UNBLOCKED,
    })))
}

pub async fn block(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(ids): Path<(String, String)>,
) -> ApiResult<Json<MessageBody>> {
    moderate(state, viewer, ids, BlockAction::Block).await
}

pub async fn unblock(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(ids): Path<(String, String)>,
) -> ApiResult<Json<MessageBody>> {
    moderate(state, viewer, ids, BlockAction::Unblock).await
}
