use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::candidates::{ReviewerCandidate, build_candidates};
use crate::checker::is_exempt;
use crate::gerrit::{ChangeInfo, OwnersResult};
use crate::grouping::{GroupedFiles, OwnerGroup, group_files};
use crate::review_state::ReviewContext;
use crate::utils::strip_email_domains;

pub const EXEMPT_NOTICE: &str = "This commit is exempted from owner approval.";
pub const ALL_APPROVED: &str = "All files have owner approval.";
const NEED_APPROVAL_HINT: &str = "Add owners of the files above as reviewers, or add \
    'Exempt-From-Owner-Approval: <reason>' to the commit message.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub strip_email_domains: bool,
    pub debug: bool,
}

/// Diagnostics printed at the end of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugInfo {
    pub change: u64,
    pub project: String,
    pub branch: String,
    pub owner_revision: Option<String>,
    pub reviewer_ids: BTreeMap<String, u64>,
    pub reviewer_votes: BTreeMap<String, i32>,
    pub server_messages: Option<serde_json::Value>,
}

/// Everything shown for one change in one session round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnersReport {
    pub change: u64,
    pub project: String,
    pub branch: String,
    pub subject: String,
    pub min_vote: i32,
    pub exempt: bool,
    pub candidates: Vec<ReviewerCandidate>,
    pub groups: GroupedFiles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
    #[serde(skip)]
    strip_domains: bool,
}

impl OwnersReport {
    pub fn build(
        change: &ChangeInfo,
        result: &OwnersResult,
        ctx: &ReviewContext,
        options: ReportOptions,
    ) -> Self {
        let exempt = is_exempt(change.commit_message(), change.status);
        let debug = (options.debug || result.add_debug_msg).then(|| DebugInfo {
            change: change.number,
            project: change.project.clone(),
            branch: change.branch.clone(),
            owner_revision: result.owner_revision.clone(),
            reviewer_ids: ctx.reviewer_ids().clone(),
            reviewer_votes: ctx.reviewer_votes().clone(),
            server_messages: result.dbgmsgs.clone(),
        });

        Self {
            change: change.number,
            project: change.project.clone(),
            branch: change.branch.clone(),
            subject: change.subject.clone(),
            min_vote: ctx.min_vote(),
            exempt,
            candidates: build_candidates(result, ctx),
            groups: group_files(result, ctx),
            debug,
            strip_domains: options.strip_email_domains,
        }
    }

    pub fn group_line(&self, group: &OwnerGroup) -> String {
        let mut line = format!("★ {}", group.key_file);
        if group.file_count() > 1 {
            let _ = write!(line, " ({} files)", group.file_count());
        }
        if !group.owners.is_empty() {
            let owners = if self.strip_domains {
                strip_email_domains(&group.owners.key())
            } else {
                group.owners.key()
            };
            let _ = write!(line, " owned by: {}", owners);
        }
        line
    }

    pub fn candidate_line(candidate: &ReviewerCandidate) -> String {
        let mark = if candidate.is_reviewer { "[x]" } else { "[ ]" };
        match candidate.vote_text() {
            Some(vote) => format!("{} {} {}", mark, candidate.label(), vote),
            None => format!("{} {}", mark, candidate.label()),
        }
    }

    pub fn footer(&self) -> &'static str {
        if self.exempt {
            EXEMPT_NOTICE
        } else if self.groups.all_approved() {
            ALL_APPROVED
        } else {
            NEED_APPROVAL_HINT
        }
    }

    /// Plain text form of the report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Change {} in {} ({}): {}",
            self.change, self.project, self.branch, self.subject
        );
        let _ = writeln!(out, "Minimum owner vote: +{}", self.min_vote);

        out.push('\n');
        if self.candidates.is_empty() {
            out.push_str("No owners or reviewers found.\n");
        } else {
            out.push_str("Reviewer candidates:\n");
            for candidate in &self.candidates {
                let _ = writeln!(out, "  {}", Self::candidate_line(candidate));
            }
        }

        if !self.exempt {
            for (group_type, groups) in self.groups.sections() {
                out.push('\n');
                let _ = writeln!(out, "{}", group_type.title());
                if let Some(note) = group_type.note(self.min_vote) {
                    let _ = writeln!(out, "{}", note);
                }
                for group in groups {
                    let _ = writeln!(out, "  {}", self.group_line(group));
                }
            }
        }

        out.push('\n');
        let _ = writeln!(out, "{}", self.footer());

        if let Some(debug) = self.render_debug() {
            out.push('\n');
            out.push_str(&debug);
        }
        out
    }

    pub fn render_debug(&self) -> Option<String> {
        self.debug.as_ref().map(render_debug)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn render_debug(debug: &DebugInfo) -> String {
    let mut out = String::from("Debug:\n");
    let _ = writeln!(out, "  change: {}", debug.change);
    let _ = writeln!(out, "  project: {}", debug.project);
    let _ = writeln!(out, "  branch: {}", debug.branch);
    if let Some(revision) = &debug.owner_revision {
        let _ = writeln!(out, "  owner revision: {}", revision);
    }
    let _ = writeln!(out, "  reviewer ids: {:?}", debug.reviewer_ids);
    let _ = writeln!(out, "  reviewer votes: {:?}", debug.reviewer_votes);
    if let Some(messages) = &debug.server_messages {
        out.push_str("  server messages:\n");
        let pretty = serde_json::to_string_pretty(messages).unwrap_or_else(|_| messages.to_string());
        for line in pretty.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
    out
}
