//! # In-memory store
//!
//! Implements both repositories on top of `DashMap`. Every story lives in a
//! single map entry, so holding that entry's write guard serializes all
//! writers of the story: rule evaluation and insert happen under one guard.
//! Used for tests and for running without a database.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::ranking;
use domains::rules::{self, ContributionPolicy, LineDigest};
use domains::validation::{FieldErrors, USERNAME_TAKEN};
use domains::{
    Author, Conflict, Credentials, DomainError, DomainResult, Ledger, NewUser, ProfilePatch,
    Story, StoryId, StoryLine, StoryLineId, StoryQuery, StoryRepository, Toggle, User, UserId,
    UserRepository,
};
use tracing::debug;

struct UserRecord {
    user: User,
    password_hash: String,
    profile_image: String,
}

impl UserRecord {
    fn author(&self) -> Author {
        Author {
            user: self.user.clone(),
            profile_image: self.profile_image.clone(),
        }
    }
}

struct LineRecord {
    id: StoryLineId,
    author_id: UserId,
    content: String,
    posted_on: DateTime<Utc>,
}

struct StoryRecord {
    id: StoryId,
    title: String,
    author_id: UserId,
    posted_on: DateTime<Utc>,
    blacklist: BTreeSet<UserId>,
    voters: BTreeSet<UserId>,
    lines: Vec<LineRecord>,
}

impl StoryRecord {
    fn digests(&self) -> Vec<LineDigest<'_>> {
        self.lines
            .iter()
            .map(|line| LineDigest {
                author_id: line.author_id,
                content: &line.content,
            })
            .collect()
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<UserId, UserRecord>,
    usernames: DashMap<String, UserId>,
    stories: DashMap<StoryId, StoryRecord>,
    next_user_id: AtomicI64,
    next_story_id: AtomicI64,
    next_line_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn author(&self, user_id: UserId) -> DomainResult<Author> {
        self.users
            .get(&user_id)
            .map(|record| record.author())
            .ok_or_else(|| DomainError::user_not_found(user_id))
    }

    fn to_story(&self, record: &StoryRecord) -> DomainResult<Story> {
        Ok(Story {
            id: record.id,
            title: record.title.clone(),
            author: self.author(record.author_id)?,
            posted_on: record.posted_on,
            blacklist: record.blacklist.clone(),
            voters: record.voters.clone(),
        })
    }

    fn to_line(&self, story_id: StoryId, line: &LineRecord) -> DomainResult<StoryLine> {
        Ok(StoryLine {
            id: line.id,
            story_id,
            content: line.content.clone(),
            author: self.author(line.author_id)?,
            posted_on: line.posted_on,
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> DomainResult<Author> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                let mut errors = FieldErrors::new();
                errors.add("username", USERNAME_TAKEN);
                Err(DomainError::Validation(errors))
            }
            Entry::Vacant(slot) => {
                let id = Self::next_id(&self.next_user_id);
                let record = UserRecord {
                    user: User {
                        id,
                        username: user.username,
                        first_name: user.first_name,
                        last_name: user.last_name,
                    },
                    password_hash: user.password_hash,
                    profile_image: user.profile_image,
                };
                let author = record.author();
                self.users.insert(id, record);
                slot.insert(id);
                Ok(author)
            }
        }
    }

    async fn find_credentials(&self, username: &str) -> DomainResult<Option<Credentials>> {
        let Some(user_id) = self.usernames.get(username).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|record| Credentials {
            user_id,
            username: record.user.username.clone(),
            password_hash: record.password_hash.clone(),
        }))
    }

    async fn find_author(&self, user_id: UserId) -> DomainResult<Option<Author>> {
        Ok(self.users.get(&user_id).map(|record| record.author()))
    }

    async fn update_profile(&self, user_id: UserId, patch: ProfilePatch) -> DomainResult<Author> {
        let mut record = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::user_not_found(user_id))?;
        if let Some(first_name) = patch.first_name {
            record.user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            record.user.last_name = last_name;
        }
        if let Some(profile_image) = patch.profile_image {
            record.profile_image = profile_image;
        }
        Ok(record.author())
    }
}

#[async_trait]
impl StoryRepository for InMemoryStore {
    async fn create_story(&self, author_id: UserId, title: String) -> DomainResult<Story> {
        // Fails early for unknown authors, like a foreign key would.
        self.author(author_id)?;

        let id = Self::next_id(&self.next_story_id);
        let record = StoryRecord {
            id,
            title,
            author_id,
            posted_on: Utc::now(),
            blacklist: BTreeSet::new(),
            voters: BTreeSet::new(),
            lines: Vec::new(),
        };
        let story = self.to_story(&record)?;
        self.stories.insert(id, record);
        Ok(story)
    }

    async fn find_story(&self, id: StoryId) -> DomainResult<Option<Story>> {
        match self.stories.get(&id) {
            Some(record) => self.to_story(&record).map(Some),
            None => Ok(None),
        }
    }

    async fn list_stories(&self, query: StoryQuery) -> DomainResult<Vec<Story>> {
        let stories = self
            .stories
            .iter()
            .map(|entry| self.to_story(entry.value()))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(ranking::apply(&query, stories))
    }

    async fn delete_story(&self, id: StoryId) -> DomainResult<bool> {
        Ok(self.stories.remove(&id).is_some())
    }

    async fn list_lines(&self, story_id: StoryId) -> DomainResult<Vec<StoryLine>> {
        let record = self
            .stories
            .get(&story_id)
            .ok_or_else(|| DomainError::story_not_found(story_id))?;
        let lines = record
            .lines
            .iter()
            .map(|line| self.to_line(story_id, line))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(lines)
    }

    async fn find_line(
        &self,
        story_id: StoryId,
        line_id: StoryLineId,
    ) -> DomainResult<Option<StoryLine>> {
        let Some(record) = self.stories.get(&story_id) else {
            return Ok(None);
        };
        match record.lines.iter().find(|line| line.id == line_id) {
            Some(line) => self.to_line(story_id, line).map(Some),
            None => Ok(None),
        }
    }

    async fn append_line(
        &self,
        story_id: StoryId,
        author_id: UserId,
        content: String,
        policy: ContributionPolicy,
    ) -> DomainResult<StoryLine> {
        let mut record = self
            .stories
            .get_mut(&story_id)
            .ok_or_else(|| DomainError::story_not_found(story_id))?;

        rules::evaluate(
            &policy,
            author_id,
            &content,
            &record.blacklist,
            &record.digests(),
        )?;

        let line = LineRecord {
            id: Self::next_id(&self.next_line_id),
            author_id,
            content,
            posted_on: Utc::now(),
        };
        let created = self.to_line(story_id, &line)?;
        record.lines.push(line);
        debug!(story_id, lines = record.lines.len(), "line appended");
        Ok(created)
    }

    async fn delete_line(&self, story_id: StoryId, line_id: StoryLineId) -> DomainResult<bool> {
        let Some(mut record) = self.stories.get_mut(&story_id) else {
            return Ok(false);
        };
        let Some(index) = record.lines.iter().position(|line| line.id == line_id) else {
            return Ok(false);
        };
        if !rules::removal_preserves_alternation(&record.digests(), index) {
            return Err(Conflict::BreaksAlternation.into());
        }
        record.lines.remove(index);
        Ok(true)
    }

    async fn update_membership(
        &self,
        story_id: StoryId,
        ledger: Ledger,
        user_id: UserId,
        toggle: Toggle,
    ) -> DomainResult<bool> {
        let mut record = self
            .stories
            .get_mut(&story_id)
            .ok_or_else(|| DomainError::story_not_found(story_id))?;

        if ledger == Ledger::Blacklist && toggle == Toggle::Add && record.author_id == user_id {
            return Err(Conflict::SelfBlock.into());
        }

        let set = match ledger {
            Ledger::Votes => &mut record.voters,
            Ledger::Blacklist => &mut record.blacklist,
        };
        Ok(match toggle {
            Toggle::Add => set.insert(user_id),
            Toggle::Remove => set.remove(&user_id),
        })
    }
}
