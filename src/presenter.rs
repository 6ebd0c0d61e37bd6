use std::collections::BTreeSet;

use crate::report::OwnersReport;

/// The user-facing side of a find-owners session.
///
/// The session never prints or prompts itself; the CLI supplies a terminal
/// implementation and tests supply a recording one.
pub trait Presenter {
    fn show_report(&mut self, report: &OwnersReport);

    /// Asks which candidates should be reviewers. `None` means the user
    /// closed the dialog without applying anything.
    fn select_reviewers(&mut self, report: &OwnersReport) -> Option<BTreeSet<String>>;

    fn alert(&mut self, message: &str);

    /// Closes the report once the selection was applied.
    fn hide(&mut self);

    /// Reviewer state changed on the server; whatever is shown is stale.
    fn refresh(&mut self);
}
