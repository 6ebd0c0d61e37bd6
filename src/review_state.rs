use serde::Serialize;
use std::collections::BTreeMap;

use crate::gerrit::{AccountInfo, ReviewerInfo};

pub const DEFAULT_MIN_OWNER_VOTE_LEVEL: i32 = 1;

/// Reviewer and vote maps for one session round.
///
/// Built from the reviewer list of a change and rebuilt from scratch every
/// time that list is fetched again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewContext {
    // email -> account id, only for accounts that are reviewers
    reviewer_ids: BTreeMap<String, u64>,
    // email -> Code-Review vote, including the author's implied vote
    reviewer_votes: BTreeMap<String, i32>,
    // email -> Code-Review vote actually cast by a reviewer
    #[serde(skip)]
    cast_votes: BTreeMap<String, i32>,
    min_vote: i32,
}

impl ReviewContext {
    /// Builds the maps from the reviewer list.
    ///
    /// Reviewers without a Code-Review vote get 0. When the change author is
    /// not a reviewer with a non-zero vote, the author is recorded with a vote
    /// of exactly `min_vote`; the author does not become a reviewer.
    pub fn build(reviewers: &[ReviewerInfo], author: Option<&AccountInfo>, min_vote: i32) -> Self {
        let mut reviewer_ids = BTreeMap::new();
        let mut reviewer_votes = BTreeMap::new();

        for reviewer in reviewers {
            let Some(email) = reviewer.email.as_deref().filter(|e| !e.is_empty()) else {
                log::debug!(
                    "Skipping reviewer without email (account {:?})",
                    reviewer.account_id
                );
                continue;
            };
            if let Some(account_id) = reviewer.account_id {
                reviewer_ids.insert(email.to_string(), account_id);
            }
            reviewer_votes.insert(email.to_string(), reviewer.code_review_vote().unwrap_or(0));
        }
        let cast_votes = reviewer_votes.clone();

        if let Some(author_email) = author.and_then(|a| a.email.as_deref()) {
            let voted = reviewer_votes
                .get(author_email)
                .is_some_and(|vote| *vote != 0);
            if !voted {
                log::debug!(
                    "Counting change author {} with the minimum vote {}",
                    author_email,
                    min_vote
                );
                reviewer_votes.insert(author_email.to_string(), min_vote);
            }
        }

        Self {
            reviewer_ids,
            reviewer_votes,
            cast_votes,
            min_vote,
        }
    }

    pub fn min_vote(&self) -> i32 {
        self.min_vote
    }

    pub fn is_reviewer(&self, email: &str) -> bool {
        self.reviewer_ids.contains_key(email)
    }

    pub fn account_id(&self, email: &str) -> Option<u64> {
        self.reviewer_ids.get(email).copied()
    }

    /// Vote used for owner approval, counting the author's implied vote.
    pub fn vote(&self, email: &str) -> Option<i32> {
        self.reviewer_votes.get(email).copied()
    }

    /// Vote the reviewer actually cast. Never the author's implied vote.
    pub fn cast_vote(&self, email: &str) -> Option<i32> {
        self.cast_votes.get(email).copied()
    }

    pub fn reviewer_ids(&self) -> &BTreeMap<String, u64> {
        &self.reviewer_ids
    }

    pub fn reviewer_votes(&self) -> &BTreeMap<String, i32> {
        &self.reviewer_votes
    }

    /// Emails of current reviewers, sorted.
    pub fn reviewers(&self) -> impl Iterator<Item = &str> {
        self.reviewer_ids.keys().map(String::as_str)
    }
}
