mod read;
mod types;
mod write;

pub use read::GerritReader;
pub use types::{
    AccountInfo, AddReviewerResult, ChangeInfo, ChangeStatus, CommitInfo, LevelCounts, OwnerInfo,
    OwnersQuery, OwnersResult, ReviewerInfo, RevisionInfo,
};
pub use write::GerritWriter;

#[cfg(test)]
pub use write::MockGerritWriter;

use serde::de::DeserializeOwned;
use url::Url;

use crate::gerrit::GerritInfo;

/// Gerrit prefixes JSON responses with this line to defeat XSSI.
const MAGIC_PREFIX: &str = ")]}'";

/// Removes the `)]}'` guard line from a Gerrit response body.
pub fn strip_magic_prefix(body: &str) -> &str {
    match body.strip_prefix(MAGIC_PREFIX) {
        Some(rest) => rest.trim_start_matches(['\r', '\n']),
        None => body,
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GerritApiError {
    #[error("{method} {url} failed with HTTP {status}: {message}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        message: String,
    },
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        source: Box<ureq::Transport>,
    },
    #[error("Failed to read Gerrit response: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode Gerrit response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Cannot build request URL from {0}")]
    InvalidUrl(String),
    #[error("Gerrit request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Gerrit rejected reviewer {reviewer}: {message}")]
    ReviewerRejected { reviewer: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// One prepared REST request. Sending moves it onto tokio's blocking pool
/// since the ureq agent is synchronous.
#[derive(Debug)]
pub(crate) struct RestCall {
    agent: ureq::Agent,
    method: Method,
    url: Url,
    authorization: Option<String>,
    body: Option<serde_json::Value>,
}

impl RestCall {
    pub(crate) fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) async fn send(self) -> Result<String, GerritApiError> {
        tokio::task::spawn_blocking(move || self.send_blocking()).await?
    }

    pub(crate) async fn json<T: DeserializeOwned>(self) -> Result<T, GerritApiError> {
        let body = self.send().await?;
        Ok(serde_json::from_str(strip_magic_prefix(&body))?)
    }

    fn send_blocking(self) -> Result<String, GerritApiError> {
        let method = self.method.as_str();
        log::debug!("{} {}", method, self.url);

        let mut request = self
            .agent
            .request(method, self.url.as_str())
            .set("Accept", "application/json");
        if let Some(authorization) = &self.authorization {
            request = request.set("Authorization", authorization);
        }

        let result = match &self.body {
            Some(body) => request
                .set("Content-Type", "application/json; charset=UTF-8")
                .send_string(&body.to_string()),
            None => request.call(),
        };

        match result {
            Ok(response) => Ok(response.into_string()?),
            Err(ureq::Error::Status(status, response)) => {
                let message = response.into_string().unwrap_or_default();
                Err(GerritApiError::Status {
                    method,
                    url: self.url.to_string(),
                    status,
                    message: strip_magic_prefix(message.trim()).to_string(),
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(GerritApiError::Transport {
                method,
                url: self.url.to_string(),
                source: Box::new(transport),
            }),
        }
    }
}

impl GerritInfo {
    /// Prepares a request below `/changes/{id}/`, using the `/a/` prefix when
    /// credentials are available.
    pub(crate) fn change_call(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<RestCall, GerritApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GerritApiError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            if self.credentials.is_some() {
                path.push("a");
            }
            path.push("changes");
            path.push(&self.change_id);
            path.extend(segments);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(RestCall {
            agent: self.agent.clone(),
            method,
            url,
            authorization: self
                .credentials
                .as_ref()
                .map(|credentials| credentials.basic_auth_header()),
            body: None,
        })
    }
}
