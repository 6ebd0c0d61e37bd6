use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

use crate::candidates::ReviewerCandidate;
use crate::gerrit::GerritWriter;
use crate::presenter::Presenter;
use crate::review_state::ReviewContext;

/// Reviewer additions and removals derived from a checklist selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewerChanges {
    pub to_add: Vec<String>,
    // (email, account id)
    pub to_remove: Vec<(String, u64)>,
}

impl ReviewerChanges {
    /// Diffs the selected candidates against the current reviewers.
    ///
    /// A selected candidate that is not a reviewer is added. An unselected
    /// candidate that is a reviewer is removed.
    pub fn compute(
        candidates: &[ReviewerCandidate],
        selected: &BTreeSet<String>,
        ctx: &ReviewContext,
    ) -> Self {
        let mut changes = Self::default();
        for candidate in candidates {
            let email = candidate.email.as_str();
            match (selected.contains(email), ctx.account_id(email)) {
                (true, None) => changes.to_add.push(email.to_string()),
                (false, Some(account_id)) => {
                    changes.to_remove.push((email.to_string(), account_id))
                }
                _ => {}
            }
        }
        changes
    }

    /// Explicit additions and removals by email, e.g. from command line flags.
    /// Removing an email that is not a reviewer is skipped with a warning.
    pub fn from_emails(add: &[String], remove: &[String], ctx: &ReviewContext) -> Self {
        let mut changes = Self::default();
        for email in add {
            if ctx.is_reviewer(email) {
                log::debug!("{} is already a reviewer", email);
            } else if !changes.to_add.contains(email) {
                changes.to_add.push(email.clone());
            }
        }
        for email in remove {
            match ctx.account_id(email) {
                Some(account_id) => {
                    let entry = (email.clone(), account_id);
                    if !changes.to_remove.contains(&entry) {
                        changes.to_remove.push(entry);
                    }
                }
                None => log::warn!("{} is not a reviewer, nothing to remove", email),
            }
        }
        changes
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Outcome of applying [`ReviewerChanges`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub add_failures: Vec<(String, String)>,
    pub remove_failures: Vec<(String, String)>,
    pub need_refresh: bool,
}

impl ApplyReport {
    pub fn has_failures(&self) -> bool {
        !self.add_failures.is_empty() || !self.remove_failures.is_empty()
    }
}

/// Applies the changes one request at a time: every addition first, then
/// every removal. A failed request never stops the sequence. Failed
/// additions are only logged; failed removals are also alerted.
pub async fn apply_reviewer_changes(
    writer: &impl GerritWriter,
    presenter: &mut impl Presenter,
    changes: ReviewerChanges,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut pending_adds: VecDeque<String> = changes.to_add.into();
    let mut pending_removes: VecDeque<(String, u64)> = changes.to_remove.into();

    while let Some(email) = pending_adds.pop_front() {
        report.need_refresh = true;
        match writer.add_reviewer(&email).await {
            Ok(_) => report.added.push(email),
            Err(e) => {
                log::warn!("Failed to add reviewer {}: {}", email, e);
                report.add_failures.push((email, e.to_string()));
            }
        }
    }

    while let Some((email, account_id)) = pending_removes.pop_front() {
        report.need_refresh = true;
        match writer.remove_reviewer(account_id).await {
            Ok(()) => report.removed.push(email),
            Err(e) => {
                log::warn!("Failed to remove reviewer {}: {}", email, e);
                presenter.alert(&format!("Failed to remove reviewer {}: {}", email, e));
                report.remove_failures.push((email, e.to_string()));
            }
        }
    }

    log::debug!(
        "Applied reviewer changes: {} added, {} removed, {} failed",
        report.added.len(),
        report.removed.len(),
        report.add_failures.len() + report.remove_failures.len()
    );
    report
}
