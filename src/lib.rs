mod apply;
mod candidates;
mod checker;
mod configuration;
mod gerrit;
mod grouping;
mod owners;
mod presenter;
mod report;
mod review_state;
mod session;
pub mod utils;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod test_utils;

pub use apply::{ApplyReport, ReviewerChanges, apply_reviewer_changes};
pub use candidates::{ReviewerCandidate, build_candidates};
pub use checker::{ApprovalVerdict, OWNER_REVIEW_VOTE, find_approval, is_exempt};
pub use configuration::{
    CONFIG_FILE_NAME, Configuration, ConfigurationError, configuration_status,
    determine_config_dir,
};
pub use gerrit::{
    AccountInfo, AddReviewerResult, AuthError, ChangeInfo, ChangeStatus, Credentials,
    GerritApiError, GerritInfo, GerritInfoError, GerritReader, GerritWriter, LevelCounts,
    OwnerInfo, OwnersQuery, OwnersResult, ReviewerInfo, get_credentials, parse_change_url,
    strip_magic_prefix,
};
pub use grouping::{GroupedFiles, OwnerGroup, group_files};
pub use owners::{GroupType, OwnerSet, STAR};
pub use presenter::Presenter;
pub use report::{ALL_APPROVED, DebugInfo, EXEMPT_NOTICE, OwnersReport, ReportOptions};
pub use review_state::{DEFAULT_MIN_OWNER_VOTE_LEVEL, ReviewContext};
pub use session::{
    ChangeSnapshot, FindOwnersSession, RoundOutcome, SessionError, SessionOptions, SubmitOutcome,
};
