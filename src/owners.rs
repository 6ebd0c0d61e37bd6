use serde::Serialize;
use std::fmt;

use crate::review_state::ReviewContext;

/// Owner entry meaning "anyone may approve".
pub const STAR: &str = "*";

/// A deduplicated, sorted set of owner identifiers for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OwnerSet(Vec<String>);

impl OwnerSet {
    pub fn new<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut owners: Vec<String> = owners
            .into_iter()
            .map(Into::into)
            .filter(|owner| !owner.is_empty())
            .collect();
        owners.sort();
        owners.dedup();
        Self(owners)
    }

    /// Key identifying the set: owners joined by a space.
    pub fn key(&self) -> String {
        self.0.join(" ")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_named_owner(&self) -> bool {
        self.iter().any(|owner| owner != STAR)
    }

    pub fn has_star(&self) -> bool {
        self.iter().any(|owner| owner == STAR)
    }

    /// True when some owner is currently a reviewer.
    pub fn has_owner_reviewer(&self, ctx: &ReviewContext) -> bool {
        self.iter().any(|owner| ctx.is_reviewer(owner))
    }

    /// True when some owner voted at least `min_vote` and no owner voted
    /// negatively. A single negative vote vetoes the whole set, so every
    /// owner is looked at before answering.
    pub fn has_owner_approval(&self, ctx: &ReviewContext) -> bool {
        let mut approved = false;
        for vote in self.iter().filter_map(|owner| ctx.vote(owner)) {
            if vote < 0 {
                return false;
            }
            approved |= vote >= ctx.min_vote();
        }
        approved
    }

    pub fn classify(&self, ctx: &ReviewContext) -> GroupType {
        if !self.has_named_owner() {
            GroupType::HasNoOwner
        } else if self.has_owner_approval(ctx) {
            GroupType::OwnerApproved
        } else if self.has_star() {
            GroupType::StarApproved
        } else if !self.has_owner_reviewer(ctx) {
            GroupType::NeedReviewer
        } else {
            GroupType::NeedApproval
        }
    }
}

impl fmt::Display for OwnerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Review status of a group of files. The declaration order is the order
/// in which sections are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupType {
    HasNoOwner,
    NeedReviewer,
    NeedApproval,
    StarApproved,
    OwnerApproved,
}

impl GroupType {
    pub const ALL: [GroupType; 5] = [
        GroupType::HasNoOwner,
        GroupType::NeedReviewer,
        GroupType::NeedApproval,
        GroupType::StarApproved,
        GroupType::OwnerApproved,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            GroupType::HasNoOwner => "Files without owner:",
            GroupType::NeedReviewer => "Files without owner reviewer:",
            GroupType::NeedApproval => "Files without owner approval:",
            GroupType::StarApproved => "Files with approval from any reviewer (*):",
            GroupType::OwnerApproved => "Files with owner approval:",
        }
    }

    pub fn note(&self, min_vote: i32) -> Option<String> {
        match self {
            GroupType::NeedReviewer => Some("(need an owner in Reviewers list)".to_string()),
            GroupType::NeedApproval => Some(format!(
                "(need +{} Code-Review vote from an owner)",
                min_vote
            )),
            _ => None,
        }
    }

    /// Whether files of this type still block owner approval.
    pub fn is_blocking(&self) -> bool {
        matches!(self, GroupType::NeedReviewer | GroupType::NeedApproval)
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GroupType::HasNoOwner => "HAS_NO_OWNER",
            GroupType::NeedReviewer => "NEED_REVIEWER",
            GroupType::NeedApproval => "NEED_APPROVAL",
            GroupType::StarApproved => "STAR_APPROVED",
            GroupType::OwnerApproved => "OWNER_APPROVED",
        };
        write!(f, "{}", text)
    }
}
