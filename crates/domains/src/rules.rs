//! # Contribution rules
//!
//! Decides whether a user may append a line to a story. Storage adapters
//! call [`evaluate`] while holding the story's lock, immediately before the
//! insert, so the check and the write are atomic.

use std::collections::BTreeSet;

use crate::error::ContributionRejection;
use crate::models::UserId;

pub const DEFAULT_MAX_STORY_LINES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionPolicy {
    pub max_lines: usize,
    /// Refuse a line whose content exactly matches an existing one.
    pub reject_duplicates: bool,
}

impl Default for ContributionPolicy {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_STORY_LINES,
            reject_duplicates: true,
        }
    }
}

/// The parts of an existing story line the rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDigest<'a> {
    pub author_id: UserId,
    pub content: &'a str,
}

/// Runs the rules in order; the first one that fails is returned.
///
/// `history` must be in narrative order.
pub fn evaluate(
    policy: &ContributionPolicy,
    contributor: UserId,
    content: &str,
    blacklist: &BTreeSet<UserId>,
    history: &[LineDigest<'_>],
) -> Result<(), ContributionRejection> {
    if blacklist.contains(&contributor) {
        return Err(ContributionRejection::Blacklisted);
    }

    if history.last().is_some_and(|last| last.author_id == contributor) {
        return Err(ContributionRejection::ConsecutiveAuthor);
    }

    if history.len() >= policy.max_lines {
        return Err(ContributionRejection::StoryFull {
            max: policy.max_lines,
        });
    }

    if policy.reject_duplicates && history.iter().any(|line| line.content == content) {
        return Err(ContributionRejection::DuplicateContent);
    }

    Ok(())
}

/// Whether removing `history[index]` keeps neighbouring lines by different
/// authors. Out-of-range indexes are trivially fine.
pub fn removal_preserves_alternation(history: &[LineDigest<'_>], index: usize) -> bool {
    if index == 0 || index + 1 >= history.len() {
        return true;
    }
    history[index - 1].author_id != history[index + 1].author_id
}
