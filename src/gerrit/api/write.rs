use std::future::Future;

use super::types::{AddReviewerResult, ChangeInfo};
use super::{GerritApiError, Method};
use crate::gerrit::GerritInfo;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait GerritWriter {
    /// Adds `email` as a reviewer. A reviewer Gerrit refuses comes back as
    /// `GerritApiError::ReviewerRejected`.
    fn add_reviewer(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<AddReviewerResult, GerritApiError>> + Send;
    fn remove_reviewer(
        &self,
        account_id: u64,
    ) -> impl Future<Output = Result<(), GerritApiError>> + Send;
    fn submit(&self) -> impl Future<Output = Result<ChangeInfo, GerritApiError>> + Send;
}

impl GerritWriter for GerritInfo {
    fn add_reviewer(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<AddReviewerResult, GerritApiError>> + Send {
        let call = self
            .change_call(Method::Post, &["reviewers"], &[])
            .map(|call| call.with_body(serde_json::json!({ "reviewer": email })));
        let email = email.to_string();

        async move {
            log::debug!("Adding reviewer {}", email);
            let result: AddReviewerResult = call?.json().await?;
            if let Some(message) = result.error.clone() {
                return Err(GerritApiError::ReviewerRejected {
                    reviewer: email,
                    message,
                });
            }
            log::info!("Added reviewer {}", email);
            Ok(result)
        }
    }

    fn remove_reviewer(
        &self,
        account_id: u64,
    ) -> impl Future<Output = Result<(), GerritApiError>> + Send {
        let account = account_id.to_string();
        let call = self.change_call(Method::Delete, &["reviewers", account.as_str()], &[]);

        async move {
            log::debug!("Removing reviewer account {}", account_id);
            call?.send().await?;
            log::info!("Removed reviewer account {}", account_id);
            Ok(())
        }
    }

    fn submit(&self) -> impl Future<Output = Result<ChangeInfo, GerritApiError>> + Send {
        let call = self
            .change_call(Method::Post, &["submit"], &[])
            .map(|call| call.with_body(serde_json::json!({})));
        let change_id = self.change_id.clone();

        async move {
            log::debug!("Submitting change {}", change_id);
            let change: ChangeInfo = call?.json().await?;
            log::info!("Submitted change {} ({:?})", change.number, change.status);
            Ok(change)
        }
    }
}
