//! # Domain Models
//!
//! These structs represent the core entities of storyweave.
//! Identifiers are database-assigned, monotonically increasing integers,
//! so ordering by id is the same as ordering by insertion.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type StoryId = i64;
pub type StoryLineId = i64;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MIN_CHARS: usize = 3;
pub const CONTENT_MAX_CHARS: usize = 250;
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 25;
pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 25;
pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PROFILE_IMAGE_MAX_CHARS: usize = 200;

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// The public profile attached to every user at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub user: User,
    pub profile_image: String,
}

impl Author {
    pub fn id(&self) -> UserId {
        self.user.id
    }
}

/// Stored login material. Never leaves the accounts service.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
}

/// Input for user registration, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub profile_image: String,
}

/// Partial profile update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.profile_image.is_none()
    }
}

/// A collaboratively written narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub author: Author,
    pub posted_on: DateTime<Utc>,
    /// Users barred from contributing (and, depending on policy, reading).
    pub blacklist: BTreeSet<UserId>,
    /// Users who upvoted this story.
    pub voters: BTreeSet<UserId>,
}

impl Story {
    pub fn is_author(&self, user_id: UserId) -> bool {
        self.author.id() == user_id
    }

    pub fn is_blacklisted(&self, user_id: UserId) -> bool {
        self.blacklist.contains(&user_id)
    }

    pub fn has_voted(&self, user_id: UserId) -> bool {
        self.voters.contains(&user_id)
    }

    pub fn num_vote_up(&self) -> usize {
        self.voters.len()
    }
}

/// One sequential contribution to a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryLine {
    pub id: StoryLineId,
    pub story_id: StoryId,
    pub content: String,
    pub author: Author,
    pub posted_on: DateTime<Utc>,
}

/// The two per-story membership sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ledger {
    Votes,
    Blacklist,
}

/// Direction of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    Add,
    Remove,
}

/// Vote ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Vote,
    Unvote,
}

impl VoteAction {
    pub fn toggle(self) -> Toggle {
        match self {
            VoteAction::Vote => Toggle::Add,
            VoteAction::Unvote => Toggle::Remove,
        }
    }
}

/// Blacklist operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAction {
    Block,
    Unblock,
}

impl BlockAction {
    pub fn toggle(self) -> Toggle {
        match self {
            BlockAction::Block => Toggle::Add,
            BlockAction::Unblock => Toggle::Remove,
        }
    }
}

/// Which stories a listing should return, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryScope {
    /// Every story, most recent first.
    All,
    /// Stories written by one author, most recent first.
    AuthoredBy(UserId),
    /// Most voted first, limited.
    Trending { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryQuery {
    pub scope: StoryScope,
    /// Drop stories that blacklist this user.
    pub hide_from: Option<UserId>,
}

impl StoryQuery {
    pub fn new(scope: StoryScope) -> Self {
        Self { scope, hide_from: None }
    }

    pub fn hiding_from(mut self, user_id: Option<UserId>) -> Self {
        self.hide_from = user_id;
        self
    }
}
