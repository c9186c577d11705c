//! # StoryService
//!
//! Story lifecycle, story lines, the vote ledger and the blacklist.

use std::sync::Arc;

use domains::ranking::{Category, DEFAULT_TRENDING_LIMIT};
use domains::rules::ContributionPolicy;
use domains::validation::FieldErrors;
use domains::{
    BlockAction, Conflict, DomainError, DomainResult, Ledger, Story, StoryId, StoryLine,
    StoryLineId, StoryQuery, StoryRepository, StoryScope, UserId, UserRepository, VoteAction,
    CONTENT_MAX_CHARS, CONTENT_MIN_CHARS, TITLE_MAX_CHARS, TITLE_MIN_CHARS,
};
use tracing::{debug, info, instrument};

use crate::permissions::{AccessPolicy, Operation, Subject};

/// Tunables for story behaviour, usually built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryPolicy {
    pub contribution: ContributionPolicy,
    pub blacklist_hides_story: bool,
    pub trending_limit: usize,
}

impl Default for StoryPolicy {
    fn default() -> Self {
        Self {
            contribution: ContributionPolicy::default(),
            blacklist_hides_story: false,
            trending_limit: DEFAULT_TRENDING_LIMIT,
        }
    }
}

pub struct StoryService {
    stories: Arc<dyn StoryRepository>,
    users: Arc<dyn UserRepository>,
    policy: StoryPolicy,
    access: AccessPolicy,
}

impl StoryService {
    pub fn new(
        stories: Arc<dyn StoryRepository>,
        users: Arc<dyn UserRepository>,
        policy: StoryPolicy,
    ) -> Self {
        Self {
            stories,
            users,
            policy,
            access: AccessPolicy {
                blacklist_hides_story: policy.blacklist_hides_story,
            },
        }
    }

    pub fn policy(&self) -> &StoryPolicy {
        &self.policy
    }

    #[instrument(skip(self, title))]
    pub async fn create_story(&self, viewer: UserId, title: Option<String>) -> DomainResult<Story> {
        let title = title.map(|t| t.trim().to_string());
        let mut errors = FieldErrors::new();
        errors.require_length("title", title.as_deref(), TITLE_MIN_CHARS, TITLE_MAX_CHARS);
        errors.into_result()?;

        let story = self
            .stories
            .create_story(viewer, title.unwrap_or_default())
            .await?;
        info!(story_id = story.id, author_id = viewer, "story created");
        Ok(story)
    }

    /// Every story visible to `viewer`, most recent first.
    pub async fn list_stories(&self, viewer: UserId) -> DomainResult<Vec<Story>> {
        self.stories.list_stories(self.query(viewer, StoryScope::All)).await
    }

    /// The `personal` and `trending` views.
    pub async fn ranked(&self, viewer: UserId, category: Category) -> DomainResult<Vec<Story>> {
        let scope = category.scope(viewer, self.policy.trending_limit);
        self.stories.list_stories(self.query(viewer, scope)).await
    }

    pub async fn get_story(&self, viewer: UserId, story_id: StoryId) -> DomainResult<Story> {
        let story = self.load_story(story_id).await?;
        self.access
            .authorize(Operation::RetrieveStory, viewer, &Subject::story(&story))?;
        Ok(story)
    }

    #[instrument(skip(self))]
    pub async fn delete_story(&self, viewer: UserId, story_id: StoryId) -> DomainResult<()> {
        let story = self.load_story(story_id).await?;
        self.access
            .authorize(Operation::DestroyStory, viewer, &Subject::story(&story))?;

        if !self.stories.delete_story(story_id).await? {
            return Err(DomainError::story_not_found(story_id));
        }
        info!(story_id, "story deleted");
        Ok(())
    }

    pub async fn list_lines(&self, viewer: UserId, story_id: StoryId) -> DomainResult<Vec<StoryLine>> {
        let story = self.load_story(story_id).await?;
        self.access
            .authorize(Operation::ListLines, viewer, &Subject::story(&story))?;
        self.stories.list_lines(story_id).await
    }

    pub async fn get_line(
        &self,
        viewer: UserId,
        story_id: StoryId,
        line_id: StoryLineId,
    ) -> DomainResult<StoryLine> {
        let story = self.load_story(story_id).await?;
        let line = self.load_line(story_id, line_id).await?;
        self.access
            .authorize(Operation::RetrieveLine, viewer, &Subject::line(&story, &line))?;
        Ok(line)
    }

    /// Appends a line through the contribution rule engine.
    #[instrument(skip(self, content))]
    pub async fn add_line(
        &self,
        viewer: UserId,
        story_id: StoryId,
        content: Option<String>,
    ) -> DomainResult<StoryLine> {
        let story = self.load_story(story_id).await?;
        self.access
            .authorize(Operation::CreateLine, viewer, &Subject::story(&story))?;

        let content = content.map(|c| c.trim().to_string());
        let mut errors = FieldErrors::new();
        errors.require_length("content", content.as_deref(), CONTENT_MIN_CHARS, CONTENT_MAX_CHARS);
        errors.into_result()?;

        let result = self
            .stories
            .append_line(
                story_id,
                viewer,
                content.unwrap_or_default(),
                self.policy.contribution,
            )
            .await;

        match &result {
            Ok(line) => info!(story_id, line_id = line.id, "story line added"),
            Err(DomainError::Rejected(rejection)) => {
                info!(story_id, rule = rejection.rule(), "story line rejected")
            }
            Err(_) => {}
        }
        result
    }

    #[instrument(skip(self))]
    pub async fn delete_line(
        &self,
        viewer: UserId,
        story_id: StoryId,
        line_id: StoryLineId,
    ) -> DomainResult<()> {
        let story = self.load_story(story_id).await?;
        let line = self.load_line(story_id, line_id).await?;
        self.access
            .authorize(Operation::DestroyLine, viewer, &Subject::line(&story, &line))?;

        if !self.stories.delete_line(story_id, line_id).await? {
            return Err(DomainError::line_not_found(line_id));
        }
        info!(story_id, line_id, "story line deleted");
        Ok(())
    }

    /// Adds or withdraws `viewer`'s upvote. Redundant requests are
    /// rejected rather than ignored. Returns the updated story.
    #[instrument(skip(self))]
    pub async fn vote(&self, viewer: UserId, story_id: StoryId, action: VoteAction) -> DomainResult<Story> {
        let story = self.load_story(story_id).await?;
        self.access
            .authorize(Operation::Vote, viewer, &Subject::story(&story))?;

        let changed = self
            .stories
            .update_membership(story_id, Ledger::Votes, viewer, action.toggle())
            .await?;
        if !changed {
            return Err(match action {
                VoteAction::Vote => Conflict::AlreadyVoted,
                VoteAction::Unvote => Conflict::NotVotedYet,
            }
            .into());
        }
        debug!(story_id, ?action, "vote ledger updated");

        self.load_story(story_id).await
    }

    /// Blocks or unblocks `target` on a story. Author only.
    #[instrument(skip(self))]
    pub async fn moderate(
        &self,
        viewer: UserId,
        story_id: StoryId,
        target: UserId,
        action: BlockAction,
    ) -> DomainResult<Story> {
        let story = self.load_story(story_id).await?;
        self.access
            .authorize(Operation::Moderate, viewer, &Subject::story(&story))?;

        if self.users.find_author(target).await?.is_none() {
            return Err(DomainError::user_not_found(target));
        }
        if action == BlockAction::Block && story.is_author(target) {
            return Err(Conflict::SelfBlock.into());
        }

        let changed = self
            .stories
            .update_membership(story_id, Ledger::Blacklist, target, action.toggle())
            .await?;
        if !changed {
            return Err(match action {
                BlockAction::Block => Conflict::AlreadyBlocked,
                BlockAction::Unblock => Conflict::NotBlockedYet,
            }
            .into());
        }
        info!(story_id, target, ?action, "blacklist updated");

        self.load_story(story_id).await
    }

    fn query(&self, viewer: UserId, scope: StoryScope) -> StoryQuery {
        let hide_from = self.policy.blacklist_hides_story.then_some(viewer);
        StoryQuery::new(scope).hiding_from(hide_from)
    }

    async fn load_story(&self, story_id: StoryId) -> DomainResult<Story> {
        self.stories
            .find_story(story_id)
            .await?
            .ok_or_else(|| DomainError::story_not_found(story_id))
    }

    async fn load_line(&self, story_id: StoryId, line_id: StoryLineId) -> DomainResult<StoryLine> {
        self.stories
            .find_line(story_id, line_id)
            .await?
            .ok_or_else(|| DomainError::line_not_found(line_id))
    }
}
