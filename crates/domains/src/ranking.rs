//! Story orderings for listings.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::{Story, StoryQuery, StoryScope, UserId};

pub const DEFAULT_TRENDING_LIMIT: usize = 10;

/// Named ranking views exposed as `/story/{category}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Personal,
    Trending,
}

impl Category {
    pub fn scope(self, viewer: UserId, trending_limit: usize) -> StoryScope {
        match self {
            Category::Personal => StoryScope::AuthoredBy(viewer),
            Category::Trending => StoryScope::Trending {
                limit: trending_limit,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Category::Personal),
            "trending" => Ok(Category::Trending),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Most recent first; id breaks ties between identical timestamps.
pub fn newest_first(a: &Story, b: &Story) -> Ordering {
    b.posted_on.cmp(&a.posted_on).then_with(|| b.id.cmp(&a.id))
}

/// Most voted first, then most recent.
pub fn trending_first(a: &Story, b: &Story) -> Ordering {
    b.num_vote_up()
        .cmp(&a.num_vote_up())
        .then_with(|| newest_first(a, b))
}

/// Applies a query to an unordered set of stories. Used by stores that
/// cannot push the ordering down to the database.
pub fn apply(query: &StoryQuery, stories: impl IntoIterator<Item = Story>) -> Vec<Story> {
    let mut selected: Vec<Story> = stories
        .into_iter()
        .filter(|story| match query.hide_from {
            Some(viewer) => !story.is_blacklisted(viewer),
            None => true,
        })
        .filter(|story| match query.scope {
            StoryScope::AuthoredBy(author) => story.is_author(author),
            StoryScope::All | StoryScope::Trending { .. } => true,
        })
        .collect();

    match query.scope {
        StoryScope::All | StoryScope::AuthoredBy(_) => selected.sort_by(newest_first),
        StoryScope::Trending { limit } => {
            selected.sort_by(trending_first);
            selected.truncate(limit);
        }
    }
    selected
}
