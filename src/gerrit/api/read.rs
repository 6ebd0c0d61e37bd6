use std::future::Future;

use super::types::{ChangeInfo, OwnersQuery, OwnersResult, ReviewerInfo};
use super::{GerritApiError, Method};
use crate::gerrit::GerritInfo;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait GerritReader {
    /// Change details including labels, owner and the current commit message.
    fn get_change(&self) -> impl Future<Output = Result<ChangeInfo, GerritApiError>> + Send;
    fn get_reviewers(
        &self,
    ) -> impl Future<Output = Result<Vec<ReviewerInfo>, GerritApiError>> + Send;
    fn get_owners(
        &self,
        query: &OwnersQuery,
    ) -> impl Future<Output = Result<OwnersResult, GerritApiError>> + Send;
}

impl GerritReader for GerritInfo {
    fn get_change(&self) -> impl Future<Output = Result<ChangeInfo, GerritApiError>> + Send {
        let options = [
            "CURRENT_REVISION",
            "CURRENT_COMMIT",
            "DETAILED_ACCOUNTS",
            "LABELS",
        ];
        let query: Vec<(&str, String)> = options.iter().map(|o| ("o", o.to_string())).collect();
        let call = self.change_call(Method::Get, &[], &query);
        let change_id = self.change_id.clone();

        async move {
            log::debug!("Fetching change {}", change_id);
            let change: ChangeInfo = call?.json().await?;
            log::debug!(
                "Fetched change {} ({}/{}, {:?})",
                change.number,
                change.project,
                change.branch,
                change.status
            );
            Ok(change)
        }
    }

    fn get_reviewers(
        &self,
    ) -> impl Future<Output = Result<Vec<ReviewerInfo>, GerritApiError>> + Send {
        let call = self.change_call(Method::Get, &["reviewers"], &[]);
        let change_id = self.change_id.clone();

        async move {
            log::debug!("Fetching reviewers of change {}", change_id);
            let reviewers: Vec<ReviewerInfo> = call?.json().await?;
            log::debug!("Fetched {} reviewers", reviewers.len());
            Ok(reviewers)
        }
    }

    fn get_owners(
        &self,
        query: &OwnersQuery,
    ) -> impl Future<Output = Result<OwnersResult, GerritApiError>> + Send {
        let call = self.change_call(Method::Get, &[self.owners_endpoint.as_str()], &query.pairs());
        let change_id = self.change_id.clone();

        async move {
            log::debug!("Fetching owners of change {}", change_id);
            let owners: OwnersResult = call?.json().await?;
            log::debug!(
                "Fetched owners for {} files ({} candidate owners)",
                owners.file2owners.len(),
                owners.owners.len()
            );
            Ok(owners)
        }
    }
}
