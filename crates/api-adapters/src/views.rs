//! JSON bodies sent to and accepted from clients.

use chrono::{DateTime, Utc};
use domains::{Author, Story, StoryId, StoryLine, StoryLineId, User, UserId};
use serde::{Deserialize, Serialize};
use services::Session;

pub const REGISTERED: &str = "You successfully registered. You can log in now.";
pub const STORY_DELETED: &str = "Story successfully deleted.";
pub const LINE_DELETED: &str = "Story line successfully deleted.";
pub const USER_BLOCKED: &str = "User successfully blocked.";
pub const USER_UNBLOCKED: &str = "User successfully unblocked.";
pub const INVALID_CATEGORY: &str = "Invalid category.";
pub const NOT_FOUND: &str = "Not found.";
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const SERVER_ERROR: &str = "A server error occurred.";

/// `{ "message": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// `{ "detail": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailBody {
    pub detail: String,
}

impl DetailBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Author profile, also embedded in stories and story lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub user: UserView,
    pub profile_image: String,
}

impl From<Author> for AuthorView {
    fn from(author: Author) -> Self {
        Self {
            user: author.user.into(),
            profile_image: author.profile_image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryView {
    pub id: StoryId,
    pub title: String,
    pub author: AuthorView,
    pub posted_on: DateTime<Utc>,
    pub num_vote_up: usize,
}

impl From<Story> for StoryView {
    fn from(story: Story) -> Self {
        Self {
            num_vote_up: story.num_vote_up(),
            id: story.id,
            title: story.title,
            author: story.author.into(),
            posted_on: story.posted_on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryLineView {
    pub id: StoryLineId,
    pub story: StoryId,
    pub content: String,
    pub author: AuthorView,
    pub posted_on: DateTime<Utc>,
}

impl From<StoryLine> for StoryLineView {
    fn from(line: StoryLine) -> Self {
        Self {
            id: line.id,
            story: line.story_id,
            content: line.content,
            author: line.author.into(),
            posted_on: line.posted_on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginView {
    pub token: String,
    pub id: UserId,
    pub username: String,
}

impl From<Session> for LoginView {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            id: session.user_id,
            username: session.username,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryInput {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryLineInput {
    pub content: Option<String>,
}
