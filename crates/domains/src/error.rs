//! # DomainError
//!
//! Centralized error handling for storyweave.
//! Every failure a caller may need to tell apart has its own variant; the
//! `Display` text of the reason enums is the message shown to clients.

use thiserror::Error;

use crate::validation::FieldErrors;

/// Why the contribution rule engine refused a new story line.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionRejection {
    #[error("You are not allowed to contribute to this story anymore.")]
    Blacklisted,

    #[error("You are not allowed to add two consecutive story lines.")]
    ConsecutiveAuthor,

    #[error("Max number of story lines reached ({max}).")]
    StoryFull { max: usize },

    #[error("This story line already exists in the story.")]
    DuplicateContent,
}

impl ContributionRejection {
    /// Stable short name, used as a metrics label.
    pub fn rule(&self) -> &'static str {
        match self {
            ContributionRejection::Blacklisted => "blacklisted",
            ContributionRejection::ConsecutiveAuthor => "consecutive_author",
            ContributionRejection::StoryFull { .. } => "story_full",
            ContributionRejection::DuplicateContent => "duplicate_content",
        }
    }
}

/// Authenticated, but not allowed to touch this object.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    #[error("You do not have permission to perform this action.")]
    NotPermitted,

    #[error("You are not allowed to contribute to this story anymore.")]
    Blacklisted,
}

/// Redundant or contradictory state changes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    #[error("You have already voted for this story.")]
    AlreadyVoted,

    #[error("You have not voted for this story yet.")]
    NotVotedYet,

    #[error("User is already blocked.")]
    AlreadyBlocked,

    #[error("User is not blocked yet.")]
    NotBlockedYet,

    #[error("You cannot block yourself.")]
    SelfBlock,

    #[error("Deleting this story line would leave two consecutive lines by the same author.")]
    BreaksAlternation,
}

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Resource not found (story, story line, user)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Field-level validation failure
    #[error("validation error: {0}")]
    Validation(FieldErrors),

    /// A contribution rule tripped
    #[error(transparent)]
    Rejected(#[from] ContributionRejection),

    #[error(transparent)]
    Forbidden(#[from] Denial),

    #[error(transparent)]
    Conflict(#[from] Conflict),

    #[error("Unable to login with the provided credentials.")]
    InvalidCredentials,

    /// Token or session could not be verified
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g. DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn story_not_found(id: i64) -> Self {
        DomainError::NotFound { entity: "story", id }
    }

    pub fn line_not_found(id: i64) -> Self {
        DomainError::NotFound { entity: "story line", id }
    }

    pub fn user_not_found(id: i64) -> Self {
        DomainError::NotFound { entity: "user", id }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        DomainError::Internal(err.to_string())
    }
}

/// A specialized Result type for storyweave logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
