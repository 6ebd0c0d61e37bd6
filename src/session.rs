use crate::apply::{ApplyReport, ReviewerChanges, apply_reviewer_changes};
use crate::checker::{ApprovalVerdict, OWNER_REVIEW_VOTE, find_approval};
use crate::gerrit::{
    ChangeInfo, GerritApiError, GerritReader, GerritWriter, OwnersQuery, OwnersResult,
};
use crate::presenter::Presenter;
use crate::report::{OwnersReport, ReportOptions};
use crate::review_state::{DEFAULT_MIN_OWNER_VOTE_LEVEL, ReviewContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub report: ReportOptions,
    /// Minimum owner vote when the server does not report one.
    pub min_owner_vote_level: i32,
    pub patchset: Option<u32>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            report: ReportOptions::default(),
            min_owner_vote_level: DEFAULT_MIN_OWNER_VOTE_LEVEL,
            patchset: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to load owners of change {change}: {source}")]
    Fetch {
        change: String,
        source: GerritApiError,
    },
    #[error("Failed to submit change {change}: {source}")]
    Submit {
        change: String,
        source: GerritApiError,
    },
}

/// State of one change as fetched for a session round.
#[derive(Debug, Clone)]
pub struct ChangeSnapshot {
    pub change: ChangeInfo,
    pub owners: OwnersResult,
    pub context: ReviewContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The user closed the checklist without applying.
    Closed,
    Applied(ApplyReport),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(ChangeInfo),
    /// The change carries the owner review label, so the owners session ran
    /// instead of the submit.
    Gated(Vec<ApplyReport>),
}

/// Drives the find-owners flow for one change.
pub struct FindOwnersSession<'a, G, P> {
    gerrit: &'a G,
    presenter: &'a mut P,
    options: SessionOptions,
    change_label: String,
}

impl<'a, G, P> FindOwnersSession<'a, G, P>
where
    G: GerritReader + GerritWriter,
    P: Presenter,
{
    pub fn new(
        gerrit: &'a G,
        presenter: &'a mut P,
        options: SessionOptions,
        change_label: impl Into<String>,
    ) -> Self {
        Self {
            gerrit,
            presenter,
            options,
            change_label: change_label.into(),
        }
    }

    fn fetch_error(&mut self, source: GerritApiError) -> SessionError {
        self.presenter
            .alert(&format!("Cannot get owners of change {}: {}", self.change_label, source));
        SessionError::Fetch {
            change: self.change_label.clone(),
            source,
        }
    }

    /// Fetches change, owners and reviewers concurrently and builds the
    /// review context from them.
    pub async fn load(&mut self) -> Result<ChangeSnapshot, SessionError> {
        let query = OwnersQuery {
            debug: self.options.report.debug.then_some(true),
            patchset: self.options.patchset,
        };
        let fetched = futures::try_join!(
            self.gerrit.get_change(),
            self.gerrit.get_owners(&query),
            self.gerrit.get_reviewers(),
        );
        let (change, owners, reviewers) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => return Err(self.fetch_error(e)),
        };

        let min_vote = owners
            .min_owner_vote_level
            .unwrap_or(self.options.min_owner_vote_level);
        let context = ReviewContext::build(&reviewers, Some(&change.owner), min_vote);
        log::debug!(
            "Change {}: {} files, {} reviewers, minimum vote {}",
            change.number,
            owners.all_files().len(),
            context.reviewer_ids().len(),
            min_vote
        );

        Ok(ChangeSnapshot {
            change,
            owners,
            context,
        })
    }

    pub async fn report(&mut self) -> Result<OwnersReport, SessionError> {
        let snapshot = self.load().await?;
        Ok(OwnersReport::build(
            &snapshot.change,
            &snapshot.owners,
            &snapshot.context,
            self.options.report,
        ))
    }

    /// Shows the report once without asking for a selection.
    pub async fn show(&mut self) -> Result<OwnersReport, SessionError> {
        let report = self.report().await?;
        self.presenter.show_report(&report);
        Ok(report)
    }

    /// One round: load, show, ask for a selection and apply it.
    ///
    /// The reviewer list is fetched again right before the diff so the
    /// changes are computed against the server state at apply time.
    pub async fn run_round(&mut self) -> Result<RoundOutcome, SessionError> {
        let report = self.show().await?;

        let Some(selected) = self.presenter.select_reviewers(&report) else {
            log::debug!("Reviewer selection closed");
            self.presenter.hide();
            return Ok(RoundOutcome::Closed);
        };

        let current = self.current_context(report.min_vote).await?;
        let changes = ReviewerChanges::compute(&report.candidates, &selected, &current);
        if changes.is_empty() {
            log::info!("Selection matches the current reviewers. Nothing to apply");
        } else {
            log::debug!(
                "Reviewer changes: add {:?}, remove {:?}",
                changes.to_add,
                changes.to_remove
            );
        }

        let applied = apply_reviewer_changes(self.gerrit, &mut *self.presenter, changes).await;
        self.presenter.hide();
        if applied.need_refresh {
            self.presenter.refresh();
        }
        Ok(RoundOutcome::Applied(applied))
    }

    /// Repeats rounds until the user closes the checklist or a round
    /// changes nothing.
    pub async fn run(&mut self) -> Result<Vec<ApplyReport>, SessionError> {
        let mut applied = Vec::new();
        loop {
            match self.run_round().await? {
                RoundOutcome::Closed => break,
                RoundOutcome::Applied(report) => {
                    let refresh = report.need_refresh;
                    applied.push(report);
                    if !refresh {
                        break;
                    }
                }
            }
        }
        Ok(applied)
    }

    /// Adds and removes the given emails without prompting, then shows the
    /// refreshed report.
    pub async fn apply_emails(
        &mut self,
        add: &[String],
        remove: &[String],
    ) -> Result<ApplyReport, SessionError> {
        let current = self
            .current_context(self.options.min_owner_vote_level)
            .await?;
        let changes = ReviewerChanges::from_emails(add, remove, &current);
        let applied = apply_reviewer_changes(self.gerrit, &mut *self.presenter, changes).await;
        if applied.need_refresh {
            self.presenter.refresh();
        }
        self.show().await?;
        Ok(applied)
    }

    /// Server-style approval verdict for the change.
    pub async fn check(&mut self) -> Result<ApprovalVerdict, SessionError> {
        let snapshot = self.load().await?;
        let verdict = find_approval(&snapshot.change, &snapshot.owners, &snapshot.context);
        log::info!("Change {}: {}", snapshot.change.number, verdict.description());
        Ok(verdict)
    }

    /// Submits the change, unless it carries the owner review label, in
    /// which case the owners session runs instead.
    pub async fn submit_with_gate(&mut self) -> Result<SubmitOutcome, SessionError> {
        let change = match self.gerrit.get_change().await {
            Ok(change) => change,
            Err(e) => return Err(self.fetch_error(e)),
        };

        if change.has_label(OWNER_REVIEW_VOTE) {
            log::info!(
                "Change {} has the {} label. Showing owners instead of submitting",
                change.number,
                OWNER_REVIEW_VOTE
            );
            return Ok(SubmitOutcome::Gated(self.run().await?));
        }

        match self.gerrit.submit().await {
            Ok(submitted) => Ok(SubmitOutcome::Submitted(submitted)),
            Err(source) => {
                self.presenter
                    .alert(&format!("Cannot submit change {}: {}", self.change_label, source));
                Err(SessionError::Submit {
                    change: self.change_label.clone(),
                    source,
                })
            }
        }
    }

    async fn current_context(&mut self, min_vote: i32) -> Result<ReviewContext, SessionError> {
        match self.gerrit.get_reviewers().await {
            Ok(reviewers) => Ok(ReviewContext::build(&reviewers, None, min_vote)),
            Err(e) => Err(self.fetch_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gerrit::ChangeStatus;
    use crate::owners::GroupType;
    use crate::test_utils::{
        MockGerrit, PresenterEvent, RecordingPresenter, change, owners_result, reviewer,
    };
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn base_owners() -> OwnersResult {
        owners_result(&[("a.txt", &["x@y"]), ("b.txt", &["x@y"]), ("c.txt", &["z@y"])])
    }

    #[tokio::test]
    async fn test_show_builds_report_from_server_state() {
        let mut owners = base_owners();
        owners.min_owner_vote_level = Some(2);
        let gerrit = MockGerrit::builder()
            .with_owners(owners)
            .with_reviewer(reviewer("x@y", 1, Some("+2")))
            .with_reviewer(reviewer("z@y", 2, Some("+1")))
            .build();
        let mut presenter = RecordingPresenter::new();

        let report = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "1")
            .show()
            .await
            .unwrap();

        assert_eq!(report.min_vote, 2);
        assert_eq!(report.groups.section(GroupType::OwnerApproved).len(), 1);
        assert_eq!(report.groups.section(GroupType::NeedApproval).len(), 1);
        assert_eq!(presenter.reports().len(), 1);

        let mut calls = gerrit.calls();
        calls.sort();
        assert_eq!(calls, vec!["get_change", "get_owners:[]", "get_reviewers"]);
    }

    #[tokio::test]
    async fn test_configured_min_vote_used_when_server_silent() {
        let gerrit = MockGerrit::builder()
            .with_owners(base_owners())
            .with_reviewer(reviewer("z@y", 2, Some("+1")))
            .build();
        let mut presenter = RecordingPresenter::new();
        let options = SessionOptions {
            min_owner_vote_level: 2,
            ..Default::default()
        };

        let report = FindOwnersSession::new(&gerrit, &mut presenter, options, "1")
            .report()
            .await
            .unwrap();
        assert_eq!(report.min_vote, 2);
        assert_eq!(report.groups.section(GroupType::NeedApproval).len(), 1);
    }

    #[tokio::test]
    async fn test_author_counts_as_owner_approval() {
        let gerrit = MockGerrit::builder()
            .with_change(change(7, "z@y"))
            .with_owners(base_owners())
            .build();
        let mut presenter = RecordingPresenter::new();

        let report = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "7")
            .report()
            .await
            .unwrap();
        let approved = report.groups.section(GroupType::OwnerApproved);
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].key_file, "c.txt");
        // the author is not offered as a reviewer
        assert!(report.candidates.iter().all(|c| c.email != "z@y"));
    }

    #[tokio::test]
    async fn test_fetch_failure_alerts_and_aborts() {
        let gerrit = MockGerrit::builder().failing_owners().build();
        let mut presenter = RecordingPresenter::new().selecting(["x@y"]);

        let result = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "1")
            .run()
            .await;

        assert!(matches!(result, Err(SessionError::Fetch { .. })));
        assert_eq!(presenter.alerts().len(), 1);
        assert!(presenter.reports().is_empty());
        assert!(!gerrit.calls().iter().any(|c| c.starts_with("add_reviewer")));
    }

    #[tokio::test]
    async fn test_round_adds_then_removes_then_refreshes() {
        let mut owners = base_owners();
        owners.owners = serde_json::from_value::<Vec<_>>(Value::from(vec!["x@y", "z@y"])).unwrap();
        let gerrit = MockGerrit::builder()
            .with_owners(owners)
            .with_reviewer(reviewer("r@s", 5, None))
            .build();
        // keep nobody but x@y
        let mut presenter = RecordingPresenter::new().selecting(["x@y"]);

        let applied = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "1")
            .run()
            .await
            .unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].added, vec!["x@y"]);
        assert_eq!(applied[0].removed, vec!["r@s"]);

        let mutations: Vec<String> = gerrit
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("add_") || c.starts_with("remove_"))
            .collect();
        assert_eq!(mutations, vec!["add_reviewer:x@y", "remove_reviewer:5"]);
        assert_eq!(gerrit.reviewer_emails(), vec!["x@y"]);

        // first round: show, select, hide, refresh; second round is closed
        let events: Vec<&PresenterEvent> = presenter
            .events()
            .iter()
            .filter(|e| !matches!(e, PresenterEvent::Report(_)))
            .collect();
        assert_eq!(
            events,
            vec![
                &PresenterEvent::Select,
                &PresenterEvent::Hide,
                &PresenterEvent::Refresh,
                &PresenterEvent::Select,
                &PresenterEvent::Hide,
            ]
        );
        // the refreshed report shows x@y as a reviewer
        let last = presenter.reports().last().unwrap();
        assert_eq!(last.groups.section(GroupType::NeedApproval)[0].key_file, "a.txt");
    }

    #[tokio::test]
    async fn test_unchanged_selection_stops_after_one_round() {
        let gerrit = MockGerrit::builder()
            .with_owners(base_owners())
            .with_reviewer(reviewer("x@y", 1, None))
            .build();
        let mut presenter = RecordingPresenter::new().selecting(["x@y"]);

        let applied = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "1")
            .run()
            .await
            .unwrap();

        assert_eq!(applied.len(), 1);
        assert!(!applied[0].need_refresh);
        assert!(!presenter.events().contains(&PresenterEvent::Refresh));
    }

    #[tokio::test]
    async fn test_rejected_changes_keep_going() {
        let gerrit = MockGerrit::builder()
            .with_owners(base_owners())
            .with_reviewer(reviewer("r@s", 5, None))
            .with_reviewer(reviewer("t@s", 6, None))
            .rejecting_add("bad@y")
            .rejecting_remove(5)
            .build();
        let mut presenter = RecordingPresenter::new();

        let applied = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "1")
            .apply_emails(
                &["bad@y".to_string(), "x@y".to_string()],
                &["r@s".to_string(), "t@s".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(applied.added, vec!["x@y"]);
        assert_eq!(applied.removed, vec!["t@s"]);
        assert_eq!(applied.add_failures.len(), 1);
        assert_eq!(applied.remove_failures.len(), 1);
        assert_eq!(presenter.alerts().len(), 1);
        assert!(presenter.events().contains(&PresenterEvent::Refresh));
        assert_eq!(gerrit.reviewer_emails(), vec!["r@s", "x@y"]);
    }

    #[tokio::test]
    async fn test_check_verdict() {
        let gerrit = MockGerrit::builder()
            .with_owners(base_owners())
            .with_reviewer(reviewer("x@y", 1, Some("+1")))
            .build();
        let mut presenter = RecordingPresenter::new();
        let verdict = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "1")
            .check()
            .await
            .unwrap();
        assert_eq!(verdict, ApprovalVerdict::Missing);
    }

    #[tokio::test]
    async fn test_submit_without_label_submits() {
        let gerrit = MockGerrit::builder().build();
        let mut presenter = RecordingPresenter::new();
        let outcome = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "1")
            .submit_with_gate()
            .await
            .unwrap();

        match outcome {
            SubmitOutcome::Submitted(change) => assert_eq!(change.status, ChangeStatus::Merged),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(gerrit.calls(), vec!["get_change", "submit"]);
    }

    #[tokio::test]
    async fn test_submit_with_label_runs_owners_session() {
        let mut gated = change(3, "author@example.org");
        gated.labels = BTreeMap::from([(OWNER_REVIEW_VOTE.to_string(), Value::Null)]);
        let gerrit = MockGerrit::builder()
            .with_change(gated)
            .with_owners(base_owners())
            .build();
        let mut presenter = RecordingPresenter::new();

        let outcome = FindOwnersSession::new(&gerrit, &mut presenter, SessionOptions::default(), "3")
            .submit_with_gate()
            .await
            .unwrap();

        assert_eq!(outcome, SubmitOutcome::Gated(Vec::new()));
        assert!(!gerrit.calls().contains(&"submit".to_string()));
        assert_eq!(presenter.reports().len(), 1);
    }
}
