//! Maps failures to status codes and JSON error bodies.

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use thiserror::Error;
use tracing::{debug, error};

use crate::views::{
    DetailBody, MessageBody, INVALID_CATEGORY, INVALID_TOKEN, NOT_AUTHENTICATED, NOT_FOUND,
    SERVER_ERROR,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("authentication credentials were not provided")]
    MissingCredentials,

    #[error("invalid category")]
    InvalidCategory,

    /// Unmatched route or an id that is not an integer.
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    MalformedBody(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

fn detail(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(DetailBody::new(detail))).into_response()
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(MessageBody::new(message))).into_response()
}

fn unauthorized(text: &str) -> Response {
    let mut response = detail(StatusCode::UNAUTHORIZED, text);
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingCredentials => unauthorized(NOT_AUTHENTICATED),
            ApiError::InvalidCategory => message(StatusCode::BAD_REQUEST, INVALID_CATEGORY),
            ApiError::NotFound => detail(StatusCode::NOT_FOUND, NOT_FOUND),
            ApiError::MalformedBody(text) => detail(StatusCode::BAD_REQUEST, text),
            ApiError::Domain(err) => match err {
                DomainError::NotFound { entity, id } => {
                    debug!(entity, id, "not found");
                    detail(StatusCode::NOT_FOUND, NOT_FOUND)
                }
                DomainError::Validation(errors) => {
                    (StatusCode::BAD_REQUEST, Json(errors)).into_response()
                }
                DomainError::Rejected(rejection) => {
                    detail(StatusCode::FORBIDDEN, rejection.to_string())
                }
                DomainError::Forbidden(denial) => detail(StatusCode::FORBIDDEN, denial.to_string()),
                DomainError::Conflict(conflict) => {
                    message(StatusCode::BAD_REQUEST, conflict.to_string())
                }
                DomainError::InvalidCredentials => {
                    message(StatusCode::BAD_REQUEST, DomainError::InvalidCredentials.to_string())
                }
                DomainError::Unauthorized(reason) => {
                    debug!(%reason, "authentication failed");
                    unauthorized(INVALID_TOKEN)
                }
                DomainError::Internal(reason) => {
                    error!(%reason, "request failed");
                    detail(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)
                }
            },
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
