//! Wire types of the Gerrit REST API and of the find-owners endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const CODE_REVIEW: &str = "Code-Review";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(rename = "_account_id", default)]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Entry of `GET /changes/{id}/reviewers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerInfo {
    #[serde(rename = "_account_id", default)]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    // label name -> vote, e.g. "Code-Review" -> "+1" or " 0"
    #[serde(default)]
    pub approvals: BTreeMap<String, String>,
}

impl ReviewerInfo {
    /// Parsed Code-Review vote. `None` when there is no vote or it is not a number.
    pub fn code_review_vote(&self) -> Option<i32> {
        let raw = self.approvals.get(CODE_REVIEW)?;
        match raw.trim().parse::<i32>() {
            Ok(vote) => Some(vote),
            Err(_) => {
                log::warn!(
                    "Ignoring unparsable Code-Review vote '{}' of {:?}",
                    raw,
                    self.email
                );
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeStatus {
    #[default]
    New,
    Merged,
    Abandoned,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfo {
    #[serde(rename = "_number", default)]
    pub number: u32,
    #[serde(default)]
    pub commit: Option<CommitInfo>,
}

/// Subset of Gerrit's ChangeInfo used here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeInfo {
    #[serde(rename = "_number")]
    pub number: u64,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub status: ChangeStatus,
    #[serde(default)]
    pub owner: AccountInfo,
    #[serde(default)]
    pub labels: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub current_revision: Option<String>,
    #[serde(default)]
    pub revisions: BTreeMap<String, RevisionInfo>,
}

impl ChangeInfo {
    pub fn commit_message(&self) -> Option<&str> {
        let revision = self.current_revision.as_ref()?;
        self.revisions
            .get(revision)?
            .commit
            .as_ref()
            .map(|commit| commit.message.as_str())
    }

    pub fn current_patchset(&self) -> Option<u32> {
        let revision = self.current_revision.as_ref()?;
        self.revisions.get(revision).map(|r| r.number)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }
}

/// Response of `POST /changes/{id}/reviewers`.
///
/// Some Gerrit versions answer an invalid reviewer with HTTP 200 and an
/// `error` field instead of an error status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddReviewerResult {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub reviewers: Vec<ReviewerInfo>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub confirm: bool,
}

/// Number of changed files an owner controls from the nearest OWNERS file
/// (level 1), the next one up (level 2), and anything further (level 3+).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub level1: u32,
    pub level2: u32,
    pub level3: u32,
}

impl LevelCounts {
    /// Parses the `[n1+n2+n3]` form.
    pub fn parse(text: &str) -> Option<Self> {
        let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
        let mut parts = inner.split('+').map(|p| p.trim().parse::<u32>());
        let level1 = parts.next()?.ok()?;
        let level2 = parts.next()?.ok()?;
        let level3 = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            level1,
            level2,
            level3,
        })
    }

    fn from_info(info: &[u32]) -> Option<Self> {
        match info {
            [level1, level2, level3, ..] => Some(Self {
                level1: *level1,
                level2: *level2,
                level3: *level3,
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for LevelCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}+{}+{}]", self.level1, self.level2, self.level3)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOwnerInfo")]
pub struct OwnerInfo {
    pub email: String,
    pub weights: Option<LevelCounts>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOwnerInfo {
    Object {
        email: String,
        #[serde(default)]
        info: Vec<u32>,
    },
    // "email [n1+n2+n3]"
    Legacy(String),
}

impl From<RawOwnerInfo> for OwnerInfo {
    fn from(raw: RawOwnerInfo) -> Self {
        match raw {
            RawOwnerInfo::Object { email, info } => Self {
                email,
                weights: LevelCounts::from_info(&info),
            },
            RawOwnerInfo::Legacy(text) => {
                let mut parts = text.splitn(2, ' ');
                let email = parts.next().unwrap_or_default().to_string();
                let weights = parts.next().and_then(LevelCounts::parse);
                Self { email, weights }
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOwnerList {
    List(Vec<String>),
    // space separated
    Joined(String),
}

impl RawOwnerList {
    fn into_vec(self) -> Vec<String> {
        match self {
            RawOwnerList::List(owners) => owners,
            RawOwnerList::Joined(joined) => {
                joined.split_whitespace().map(str::to_string).collect()
            }
        }
    }
}

fn deserialize_file2owners<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, RawOwnerList>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(file, owners)| (file, owners.into_vec()))
        .collect())
}

/// Response of the find-owners REST view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnersResult {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_file2owners")]
    pub file2owners: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub owners: Vec<OwnerInfo>,
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(rename = "minOwnerVoteLevel", default)]
    pub min_owner_vote_level: Option<i32>,
    #[serde(rename = "addDebugMsg", default)]
    pub add_debug_msg: bool,
    #[serde(default)]
    pub change: Option<u64>,
    #[serde(default)]
    pub patchset: Option<u32>,
    #[serde(rename = "owner_revision", default)]
    pub owner_revision: Option<String>,
    #[serde(default)]
    pub dbgmsgs: Option<serde_json::Value>,
}

impl OwnersResult {
    /// Every changed file: the `files` list plus any key of `file2owners`, sorted.
    pub fn all_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .files
            .iter()
            .chain(self.file2owners.keys())
            .cloned()
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

/// Query parameters of the owners endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnersQuery {
    pub debug: Option<bool>,
    pub patchset: Option<u32>,
}

impl OwnersQuery {
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(debug) = self.debug {
            pairs.push(("debug", debug.to_string()));
        }
        if let Some(patchset) = self.patchset {
            pairs.push(("patchset", patchset.to_string()));
        }
        pairs
    }
}
