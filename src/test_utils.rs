//! Shared test helpers: fixture builders, a call-recording Gerrit mock and a
//! recording presenter.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::gerrit::{
    AccountInfo, AddReviewerResult, ChangeInfo, GerritApiError, GerritReader, GerritWriter,
    OwnersQuery, OwnersResult, ReviewerInfo,
};
use crate::presenter::Presenter;
use crate::report::OwnersReport;
use crate::review_state::ReviewContext;

pub fn reviewer(email: &str, account_id: u64, vote: Option<&str>) -> ReviewerInfo {
    ReviewerInfo {
        account_id: Some(account_id),
        name: None,
        email: Some(email.to_string()),
        approvals: vote
            .map(|v| BTreeMap::from([("Code-Review".to_string(), v.to_string())]))
            .unwrap_or_default(),
    }
}

/// Review context without a change author.
pub fn context(reviewers: &[ReviewerInfo], min_vote: i32) -> ReviewContext {
    ReviewContext::build(reviewers, None, min_vote)
}

pub fn owners_result(file2owners: &[(&str, &[&str])]) -> OwnersResult {
    OwnersResult {
        files: file2owners.iter().map(|(file, _)| file.to_string()).collect(),
        file2owners: file2owners
            .iter()
            .map(|(file, owners)| {
                (
                    file.to_string(),
                    owners.iter().map(|o| o.to_string()).collect(),
                )
            })
            .collect(),
        ..Default::default()
    }
}

pub fn change(number: u64, author: &str) -> ChangeInfo {
    ChangeInfo {
        number,
        project: "test-project".to_string(),
        branch: "main".to_string(),
        subject: "Test change".to_string(),
        owner: AccountInfo {
            account_id: Some(1000),
            email: Some(author.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn not_found(what: &str) -> GerritApiError {
    GerritApiError::Status {
        method: "GET",
        url: format!("https://review.example.org/a/changes/{}", what),
        status: 404,
        message: "Not found".to_string(),
    }
}

/// In-memory Gerrit change that records every call made against it.
///
/// Reviewer additions and removals change the stored reviewer list so a
/// later fetch sees them.
#[derive(Clone)]
pub struct MockGerrit {
    change: ChangeInfo,
    owners: OwnersResult,
    reviewers: Arc<Mutex<Vec<ReviewerInfo>>>,
    rejected_adds: BTreeSet<String>,
    rejected_removes: BTreeSet<u64>,
    fail_owners: bool,
    next_account_id: Arc<Mutex<u64>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockGerrit {
    pub fn builder() -> MockGerritBuilder {
        MockGerritBuilder::new()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reviewer_emails(&self) -> Vec<String> {
        self.reviewers
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.email.clone())
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct MockGerritBuilder {
    change: ChangeInfo,
    owners: OwnersResult,
    reviewers: Vec<ReviewerInfo>,
    rejected_adds: BTreeSet<String>,
    rejected_removes: BTreeSet<u64>,
    fail_owners: bool,
}

impl MockGerritBuilder {
    pub fn new() -> Self {
        Self {
            change: change(1, "author@example.org"),
            owners: OwnersResult::default(),
            reviewers: Vec::new(),
            rejected_adds: BTreeSet::new(),
            rejected_removes: BTreeSet::new(),
            fail_owners: false,
        }
    }

    pub fn with_change(mut self, change: ChangeInfo) -> Self {
        self.change = change;
        self
    }

    pub fn with_owners(mut self, owners: OwnersResult) -> Self {
        self.owners = owners;
        self
    }

    pub fn with_reviewer(mut self, reviewer: ReviewerInfo) -> Self {
        self.reviewers.push(reviewer);
        self
    }

    pub fn rejecting_add(mut self, email: impl Into<String>) -> Self {
        self.rejected_adds.insert(email.into());
        self
    }

    pub fn rejecting_remove(mut self, account_id: u64) -> Self {
        self.rejected_removes.insert(account_id);
        self
    }

    pub fn failing_owners(mut self) -> Self {
        self.fail_owners = true;
        self
    }

    pub fn build(self) -> MockGerrit {
        let next_id = self
            .reviewers
            .iter()
            .filter_map(|r| r.account_id)
            .max()
            .unwrap_or(0)
            + 1;
        MockGerrit {
            change: self.change,
            owners: self.owners,
            reviewers: Arc::new(Mutex::new(self.reviewers)),
            rejected_adds: self.rejected_adds,
            rejected_removes: self.rejected_removes,
            fail_owners: self.fail_owners,
            next_account_id: Arc::new(Mutex::new(next_id)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for MockGerritBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GerritReader for MockGerrit {
    async fn get_change(&self) -> Result<ChangeInfo, GerritApiError> {
        self.record("get_change".to_string());
        Ok(self.change.clone())
    }

    async fn get_reviewers(&self) -> Result<Vec<ReviewerInfo>, GerritApiError> {
        self.record("get_reviewers".to_string());
        Ok(self.reviewers.lock().unwrap().clone())
    }

    async fn get_owners(&self, query: &OwnersQuery) -> Result<OwnersResult, GerritApiError> {
        self.record(format!("get_owners:{:?}", query.pairs()));
        if self.fail_owners {
            return Err(not_found("owners"));
        }
        Ok(self.owners.clone())
    }
}

impl GerritWriter for MockGerrit {
    async fn add_reviewer(&self, email: &str) -> Result<AddReviewerResult, GerritApiError> {
        self.record(format!("add_reviewer:{}", email));
        if self.rejected_adds.contains(email) {
            return Err(GerritApiError::ReviewerRejected {
                reviewer: email.to_string(),
                message: format!("{} does not identify a registered user", email),
            });
        }
        let account_id = {
            let mut next = self.next_account_id.lock().unwrap();
            *next += 1;
            *next - 1
        };
        let added = reviewer(email, account_id, Some(" 0"));
        self.reviewers.lock().unwrap().push(added.clone());
        Ok(AddReviewerResult {
            input: email.to_string(),
            reviewers: vec![added],
            ..Default::default()
        })
    }

    async fn remove_reviewer(&self, account_id: u64) -> Result<(), GerritApiError> {
        self.record(format!("remove_reviewer:{}", account_id));
        if self.rejected_removes.contains(&account_id) {
            return Err(GerritApiError::Status {
                method: "DELETE",
                url: format!(
                    "https://review.example.org/a/changes/1/reviewers/{}",
                    account_id
                ),
                status: 403,
                message: "delete reviewer not permitted".to_string(),
            });
        }
        self.reviewers
            .lock()
            .unwrap()
            .retain(|r| r.account_id != Some(account_id));
        Ok(())
    }

    async fn submit(&self) -> Result<ChangeInfo, GerritApiError> {
        self.record("submit".to_string());
        let mut change = self.change.clone();
        change.status = crate::gerrit::ChangeStatus::Merged;
        Ok(change)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Report(String),
    Select,
    Alert(String),
    Hide,
    Refresh,
}

/// Presenter that records what it is asked to do and answers selection
/// prompts from a queue. An empty queue answers "closed".
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    selections: VecDeque<Option<BTreeSet<String>>>,
    events: Vec<PresenterEvent>,
    reports: Vec<OwnersReport>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selecting<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .push_back(Some(emails.into_iter().map(Into::into).collect()));
        self
    }

    pub fn events(&self) -> &[PresenterEvent] {
        &self.events
    }

    pub fn reports(&self) -> &[OwnersReport] {
        &self.reports
    }

    pub fn alerts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresenterEvent::Alert(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn show_report(&mut self, report: &OwnersReport) {
        self.events.push(PresenterEvent::Report(report.render()));
        self.reports.push(report.clone());
    }

    fn select_reviewers(&mut self, _report: &OwnersReport) -> Option<BTreeSet<String>> {
        self.events.push(PresenterEvent::Select);
        self.selections.pop_front().flatten()
    }

    fn alert(&mut self, message: &str) {
        self.events.push(PresenterEvent::Alert(message.to_string()));
    }

    fn hide(&mut self) {
        self.events.push(PresenterEvent::Hide);
    }

    fn refresh(&mut self) {
        self.events.push(PresenterEvent::Refresh);
    }
}
