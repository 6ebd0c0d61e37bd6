use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::gerrit::{ChangeInfo, ChangeStatus, OwnersResult};
use crate::owners::OwnerSet;
use crate::review_state::ReviewContext;

/// Label whose presence on a change turns on the submit gate.
pub const OWNER_REVIEW_VOTE: &str = "Owner-Review-Vote";

// Accepts both "Exempt-" and "Exempted-"
static EXEMPT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Exempt(ed)?-From-Owner-Approval:").expect("Invalid exemption regex")
});

/// A change needs no owner approval when its commit message carries the
/// exemption marker or when it is already merged or abandoned.
pub fn is_exempt(commit_message: Option<&str>, status: ChangeStatus) -> bool {
    if commit_message.is_some_and(|message| EXEMPT_REGEX.is_match(message)) {
        return true;
    }
    matches!(status, ChangeStatus::Merged | ChangeStatus::Abandoned)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalVerdict {
    NotNeeded,
    Missing,
    Approved,
}

impl ApprovalVerdict {
    pub fn description(&self) -> &'static str {
        match self {
            ApprovalVerdict::NotNeeded => "Owner approval is not needed",
            ApprovalVerdict::Missing => "Owner approval is missing",
            ApprovalVerdict::Approved => "Owner approval found",
        }
    }
}

/// Whole-change verdict in the way a submit rule sees it.
///
/// Unlike the report classification, `*` counts as an approval here, and a
/// negative vote from any owner of a set still vetoes that set.
pub fn find_approval(
    change: &ChangeInfo,
    result: &OwnersResult,
    ctx: &ReviewContext,
) -> ApprovalVerdict {
    if is_exempt(change.commit_message(), change.status) {
        log::debug!("Change {} is exempt from owner approval", change.number);
        return ApprovalVerdict::NotNeeded;
    }

    let owner_sets: Vec<OwnerSet> = result
        .file2owners
        .values()
        .map(|owners| OwnerSet::new(owners.iter().cloned()))
        .filter(|owners| !owners.is_empty())
        .collect();
    if owner_sets.is_empty() {
        return ApprovalVerdict::NotNeeded;
    }

    for owners in &owner_sets {
        if !owners_in_votes(owners, ctx) {
            log::debug!("No owner approval from '{}'", owners);
            return ApprovalVerdict::Missing;
        }
    }
    ApprovalVerdict::Approved
}

fn owners_in_votes(owners: &OwnerSet, ctx: &ReviewContext) -> bool {
    let mut found_approval = false;
    let mut found_veto = false;
    for owner in owners.iter() {
        match ctx.vote(owner) {
            Some(vote) => {
                found_approval |= vote >= ctx.min_vote();
                found_veto |= vote < 0;
            }
            None if owner == crate::owners::STAR => found_approval = true,
            None => {}
        }
    }
    found_approval && !found_veto
}
