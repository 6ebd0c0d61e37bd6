use std::time::Duration;
use url::Url;

pub(crate) mod api;
pub(crate) mod auth;

pub use api::{
    AccountInfo, AddReviewerResult, ChangeInfo, ChangeStatus, CommitInfo, GerritApiError,
    GerritReader, GerritWriter, LevelCounts, OwnerInfo, OwnersQuery, OwnersResult, ReviewerInfo,
    RevisionInfo, strip_magic_prefix,
};
#[cfg(test)]
pub use api::MockGerritWriter;
pub use auth::{AuthError, Credentials, get_credentials};

use crate::utils::EnvProvider;

/// Connection to one change on one Gerrit server.
#[derive(Debug, Clone)]
pub struct GerritInfo {
    pub(crate) base_url: Url,
    pub(crate) change_id: String,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) owners_endpoint: String,
    pub(crate) agent: ureq::Agent,
}

impl GerritInfo {
    /// Builds a client from a change URL such as
    /// `https://review.example.org/c/project/+/1234`.
    pub fn from_change_url(
        change_url: &str,
        username: Option<&str>,
        env: &impl EnvProvider,
    ) -> Result<Self, GerritInfoError> {
        let (base_url, change_id) = parse_change_url(change_url)?;
        Self::with_credential_lookup(base_url, change_id, username, env)
    }

    /// Builds a client from a server URL and a change id (`1234` or `project~1234`).
    pub fn from_server(
        server: &str,
        change_id: &str,
        username: Option<&str>,
        env: &impl EnvProvider,
    ) -> Result<Self, GerritInfoError> {
        let base_url = parse_server_url(server)?;
        let change_id = change_id.trim();
        if change_id.is_empty() {
            return Err(GerritInfoError::MissingChange);
        }
        Self::with_credential_lookup(base_url, change_id.to_string(), username, env)
    }

    fn with_credential_lookup(
        base_url: Url,
        change_id: String,
        username: Option<&str>,
        env: &impl EnvProvider,
    ) -> Result<Self, GerritInfoError> {
        let host = base_url
            .host_str()
            .ok_or_else(|| GerritInfoError::InvalidServerUrl(base_url.to_string()))?
            .to_string();

        let credentials = match get_credentials(&host, username, env) {
            Ok(credentials) => Some(credentials),
            Err(AuthError::NoAuth) => {
                log::warn!(
                    "No credentials found for {}. Requests will be anonymous and reviewer changes will fail",
                    host
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        log::debug!(
            "Initialized Gerrit client for change {} on {}",
            change_id,
            base_url
        );
        Ok(Self::new(base_url, change_id, credentials))
    }

    pub fn new(base_url: Url, change_id: String, credentials: Option<Credentials>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(60))
            .user_agent(concat!("gerrit-owners/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            base_url,
            change_id,
            credentials,
            owners_endpoint: "owners".to_string(),
            agent,
        }
    }

    pub fn with_owners_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.owners_endpoint = endpoint.into();
        self
    }

    pub fn change_id(&self) -> &str {
        &self.change_id
    }

    /// Web UI link to the change.
    pub fn change_url(&self) -> String {
        format!(
            "{}/c/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.change_id
        )
    }
}

fn parse_server_url(server: &str) -> Result<Url, GerritInfoError> {
    let with_scheme = if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    };
    let mut url = Url::parse(&with_scheme)
        .map_err(|_| GerritInfoError::InvalidServerUrl(server.to_string()))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(GerritInfoError::InvalidServerUrl(server.to_string()));
    }
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Splits a change URL into the server base URL and the change number.
///
/// Accepted forms:
/// * `https://host/c/project/+/123` (optionally followed by `/patchset` or a file path)
/// * `https://host/#/c/123/` (old UI)
/// * `https://host/123`
///
/// A path prefix in front of `/c/` (`https://host/gerrit/c/...`) is kept in the base URL.
pub fn parse_change_url(change_url: &str) -> Result<(Url, String), GerritInfoError> {
    let invalid = || GerritInfoError::InvalidChangeUrl(change_url.to_string());
    let url = Url::parse(change_url.trim()).map_err(|_| invalid())?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid());
    }

    let is_number = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    let path = url.path().to_string();

    let (prefix, change) = if let Some(fragment) = url.fragment().filter(|f| f.starts_with("/c/")) {
        let number = fragment
            .trim_start_matches("/c/")
            .split('/')
            .find(|segment| is_number(*segment))
            .ok_or_else(invalid)?;
        (path.as_str(), number.to_string())
    } else if let Some(index) = path.find("/c/") {
        let rest = &path[index + 3..];
        let number = match rest.split_once("/+/") {
            Some((_, after)) => after.split('/').next().unwrap_or_default(),
            None => rest.split('/').next().unwrap_or_default(),
        };
        if !is_number(number) {
            return Err(invalid());
        }
        (&path[..index + 1], number.to_string())
    } else {
        let trimmed = path.trim_end_matches('/');
        let (prefix, last) = trimmed.rsplit_once('/').ok_or_else(invalid)?;
        if !is_number(last) {
            return Err(invalid());
        }
        (&path[..prefix.len() + 1], last.to_string())
    };

    let mut base = url.clone();
    base.set_fragment(None);
    base.set_query(None);
    base.set_path(prefix);
    Ok((base, change))
}

#[derive(thiserror::Error, Debug)]
pub enum GerritInfoError {
    #[error("Invalid Gerrit change URL: {0}")]
    InvalidChangeUrl(String),
    #[error("Invalid Gerrit server URL: {0}")]
    InvalidServerUrl(String),
    #[error("No change id given")]
    MissingChange,
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}
