//! Per-operation permission table.
//!
//! Every service operation names the capabilities it needs up front; the
//! table is evaluated against the loaded objects before anything mutates.
//! Contribution rules for new lines are not listed here: they must run
//! inside the store's per-story critical section.

use domains::{Denial, Story, StoryLine, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListStories,
    CreateStory,
    RetrieveStory,
    DestroyStory,
    ListLines,
    RetrieveLine,
    CreateLine,
    DestroyLine,
    Vote,
    Moderate,
    RetrieveProfile,
    UpdateProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The story is readable by the requester under the visibility policy.
    CanView,
    StoryAuthor,
    LineAuthor,
    NotBlacklisted,
    ProfileOwner,
}

impl Operation {
    pub const fn capabilities(self) -> &'static [Capability] {
        use Capability::*;

        match self {
            Operation::ListStories | Operation::CreateStory | Operation::RetrieveProfile => &[],
            Operation::RetrieveStory
            | Operation::ListLines
            | Operation::RetrieveLine
            | Operation::CreateLine => &[CanView],
            Operation::DestroyStory | Operation::Moderate => &[StoryAuthor],
            Operation::DestroyLine => &[CanView, LineAuthor],
            Operation::Vote => &[CanView, NotBlacklisted],
            Operation::UpdateProfile => &[ProfileOwner],
        }
    }
}

/// The objects an operation acts on, as far as they are known.
#[derive(Debug, Clone, Copy, Default)]
pub struct Subject<'a> {
    pub story: Option<&'a Story>,
    pub line: Option<&'a StoryLine>,
    pub profile: Option<UserId>,
}

impl<'a> Subject<'a> {
    pub fn story(story: &'a Story) -> Self {
        Self {
            story: Some(story),
            ..Self::default()
        }
    }

    pub fn line(story: &'a Story, line: &'a StoryLine) -> Self {
        Self {
            story: Some(story),
            line: Some(line),
            profile: None,
        }
    }

    pub fn profile(user_id: UserId) -> Self {
        Self {
            profile: Some(user_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Blacklisted users may not read the story at all.
    pub blacklist_hides_story: bool,
}

impl AccessPolicy {
    /// Checks every capability of `operation` in table order.
    pub fn authorize(
        &self,
        operation: Operation,
        viewer: UserId,
        subject: &Subject<'_>,
    ) -> Result<(), Denial> {
        operation
            .capabilities()
            .iter()
            .try_for_each(|capability| self.check(*capability, viewer, subject))
    }

    fn check(&self, capability: Capability, viewer: UserId, subject: &Subject<'_>) -> Result<(), Denial> {
        // A capability whose object was not supplied is never granted.
        let granted = match capability {
            Capability::CanView => match subject.story {
                Some(story) if self.blacklist_hides_story && story.is_blacklisted(viewer) => {
                    return Err(Denial::Blacklisted)
                }
                Some(_) => true,
                None => false,
            },
            Capability::NotBlacklisted => match subject.story {
                Some(story) if story.is_blacklisted(viewer) => return Err(Denial::Blacklisted),
                Some(_) => true,
                None => false,
            },
            Capability::StoryAuthor => subject.story.is_some_and(|story| story.is_author(viewer)),
            Capability::LineAuthor => subject.line.is_some_and(|line| line.author.id() == viewer),
            Capability::ProfileOwner => subject.profile == Some(viewer),
        };

        if granted {
            Ok(())
        } else {
            Err(Denial::NotPermitted)
        }
    }
}
