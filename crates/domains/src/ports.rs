//! # Ports
//!
//! Adapter crates implement these traits; services depend only on them.

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::models::{
    Author, Credentials, Ledger, NewUser, ProfilePatch, Story, StoryId, StoryLine, StoryLineId,
    StoryQuery, Toggle, UserId,
};
use crate::rules::ContributionPolicy;

/// Persistence contract for users and their author profiles.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates the user and its author profile together. A taken username
    /// is reported as a validation error on `username`.
    async fn create_user(&self, user: NewUser) -> DomainResult<Author>;

    async fn find_credentials(&self, username: &str) -> DomainResult<Option<Credentials>>;

    async fn find_author(&self, user_id: UserId) -> DomainResult<Option<Author>>;

    async fn update_profile(&self, user_id: UserId, patch: ProfilePatch) -> DomainResult<Author>;
}

/// Persistence contract for stories, their lines and membership ledgers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StoryRepository: Send + Sync {
    async fn create_story(&self, author_id: UserId, title: String) -> DomainResult<Story>;
    async fn find_story(&self, id: StoryId) -> DomainResult<Option<Story>>;
    async fn list_stories(&self, query: StoryQuery) -> DomainResult<Vec<Story>>;

    /// Removes the story with its lines, votes and blacklist.
    /// Returns `false` when nothing was deleted.
    async fn delete_story(&self, id: StoryId) -> DomainResult<bool>;

    /// Lines in narrative order.
    async fn list_lines(&self, story_id: StoryId) -> DomainResult<Vec<StoryLine>>;
    async fn find_line(
        &self,
        story_id: StoryId,
        line_id: StoryLineId,
    ) -> DomainResult<Option<StoryLine>>;

    /// Evaluates the contribution rules and inserts the line atomically
    /// with respect to other writers of the same story.
    async fn append_line(
        &self,
        story_id: StoryId,
        author_id: UserId,
        content: String,
        policy: ContributionPolicy,
    ) -> DomainResult<StoryLine>;

    /// Deletes a line unless that would put two lines by the same author
    /// next to each other.
    async fn delete_line(&self, story_id: StoryId, line_id: StoryLineId) -> DomainResult<bool>;

    /// Atomic insert-if-absent / delete-if-present. Returns whether the set
    /// changed.
    async fn update_membership(
        &self,
        story_id: StoryId,
        ledger: Ledger,
        user_id: UserId,
        toggle: Toggle,
    ) -> DomainResult<bool>;
}

/// One-way password hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> DomainResult<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Issues and checks bearer tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: UserId, username: &str) -> DomainResult<String>;

    /// Returns the user the token was issued to.
    fn verify(&self, token: &str) -> DomainResult<UserId>;
}
