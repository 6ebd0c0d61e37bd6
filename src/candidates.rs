use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::gerrit::{LevelCounts, OwnersResult};
use crate::review_state::ReviewContext;

/// One entry of the reviewer checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerCandidate {
    pub email: String,
    pub weights: Option<LevelCounts>,
    pub is_reviewer: bool,
    pub vote: i32,
}

impl ReviewerCandidate {
    /// `email [n1+n2+n3]`, or just the email without level counts.
    pub fn label(&self) -> String {
        match &self.weights {
            Some(weights) => format!("{} {}", self.email, weights),
            None => self.email.clone(),
        }
    }

    /// `(+2)` / `(-1)` for a non-zero vote.
    pub fn vote_text(&self) -> Option<String> {
        match self.vote {
            0 => None,
            vote if vote > 0 => Some(format!("(+{})", vote)),
            vote => Some(format!("({})", vote)),
        }
    }
}

/// Owners of the change followed by current reviewers that are not owners.
///
/// When the server sent level counts, owners closest to the changed files
/// come first; otherwise the server's order is kept. A candidate starts
/// selected when it is already a reviewer.
pub fn build_candidates(result: &OwnersResult, ctx: &ReviewContext) -> Vec<ReviewerCandidate> {
    let mut owners: Vec<_> = result
        .owners
        .iter()
        .filter(|owner| !owner.email.is_empty() && owner.email != crate::owners::STAR)
        .collect();

    if owners.iter().any(|owner| owner.weights.is_some()) {
        owners.sort_by_key(|owner| {
            let weights = owner.weights.unwrap_or_default();
            (
                Reverse(weights.level1),
                Reverse(weights.level2),
                Reverse(weights.level3),
                owner.email.as_str(),
            )
        });
    }

    let mut seen = BTreeSet::new();
    let mut candidates = Vec::new();
    let owner_entries = owners
        .into_iter()
        .map(|owner| (owner.email.as_str(), owner.weights));
    let reviewer_entries = ctx.reviewers().map(|email| (email, None));

    for (email, weights) in owner_entries.chain(reviewer_entries) {
        if !seen.insert(email.to_string()) {
            continue;
        }
        candidates.push(ReviewerCandidate {
            email: email.to_string(),
            weights,
            is_reviewer: ctx.is_reviewer(email),
            vote: ctx.cast_vote(email).unwrap_or(0),
        });
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gerrit::{AccountInfo, OwnerInfo};
    use crate::test_utils::{context, reviewer};

    fn owner(email: &str, weights: Option<(u32, u32, u32)>) -> OwnerInfo {
        OwnerInfo {
            email: email.to_string(),
            weights: weights.map(|(level1, level2, level3)| LevelCounts {
                level1,
                level2,
                level3,
            }),
        }
    }

    #[test]
    fn test_owners_sorted_by_weights() {
        let result = OwnersResult {
            owners: vec![
                owner("c@x", Some((1, 0, 0))),
                owner("b@x", Some((2, 0, 0))),
                owner("a@x", Some((1, 0, 0))),
                owner("d@x", Some((1, 3, 0))),
            ],
            ..Default::default()
        };
        let candidates = build_candidates(&result, &context(&[], 1));
        let emails: Vec<&str> = candidates.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, vec!["b@x", "d@x", "a@x", "c@x"]);
        assert_eq!(candidates[0].label(), "b@x [2+0+0]");
    }

    #[test]
    fn test_server_order_kept_without_weights() {
        let result = OwnersResult {
            owners: vec![owner("z@x", None), owner("a@x", None)],
            ..Default::default()
        };
        let candidates = build_candidates(&result, &context(&[], 1));
        let emails: Vec<&str> = candidates.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, vec!["z@x", "a@x"]);
        assert_eq!(candidates[0].label(), "z@x");
    }

    #[test]
    fn test_reviewers_appended_once() {
        let result = OwnersResult {
            owners: vec![owner("a@x", None), owner("*", None)],
            ..Default::default()
        };
        let ctx = context(
            &[reviewer("a@x", 1, Some("+1")), reviewer("r@x", 2, Some("-2"))],
            1,
        );
        let candidates = build_candidates(&result, &ctx);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].email, "a@x");
        assert!(candidates[0].is_reviewer);
        assert_eq!(candidates[0].vote_text().as_deref(), Some("(+1)"));
        assert_eq!(candidates[1].email, "r@x");
        assert_eq!(candidates[1].vote_text().as_deref(), Some("(-2)"));
    }

    #[test]
    fn test_author_shows_only_cast_vote() {
        let result = OwnersResult {
            owners: vec![owner("me@x", None)],
            ..Default::default()
        };
        let author = AccountInfo {
            account_id: Some(5),
            email: Some("me@x".to_string()),
            ..Default::default()
        };
        let ctx = ReviewContext::build(&[reviewer("me@x", 5, Some(" 0"))], Some(&author), 1);
        let candidates = build_candidates(&result, &ctx);

        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_reviewer);
        assert_eq!(candidates[0].vote, 0);
        assert_eq!(candidates[0].vote_text(), None);
    }

    #[test]
    fn test_non_reviewer_owner_not_selected() {
        let result = OwnersResult {
            owners: vec![owner("a@x", None)],
            ..Default::default()
        };
        let candidates = build_candidates(&result, &context(&[], 1));
        assert!(!candidates[0].is_reviewer);
        assert_eq!(candidates[0].vote_text(), None);
    }
}
