use anyhow::{Result, bail};

use crate::configuration::Configuration;
use crate::gerrit::GerritInfo;
use crate::report::ReportOptions;
use crate::session::SessionOptions;
use crate::utils::EnvProvider;

/// How the change was named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTarget {
    Url(String),
    Id { server: String, change_id: String },
}

impl ChangeTarget {
    /// A value containing `://` is a change URL. Anything else is a change id
    /// on `server`, which falls back to the configured server.
    pub fn resolve(
        change: &str,
        server: Option<&str>,
        configuration: &Configuration,
    ) -> Result<Self> {
        if change.contains("://") {
            return Ok(ChangeTarget::Url(change.to_string()));
        }
        let Some(server) = server.or(configuration.server.as_deref()) else {
            bail!(
                "'{}' is not a change URL. Pass --server or set `server` in the configuration",
                change
            );
        };
        Ok(ChangeTarget::Id {
            server: server.to_string(),
            change_id: change.to_string(),
        })
    }

    pub fn connect(
        &self,
        configuration: &Configuration,
        env: &impl EnvProvider,
    ) -> Result<GerritInfo> {
        let username = configuration.username.as_deref();
        let gerrit = match self {
            ChangeTarget::Url(url) => GerritInfo::from_change_url(url, username, env)?,
            ChangeTarget::Id { server, change_id } => {
                GerritInfo::from_server(server, change_id, username, env)?
            }
        };
        Ok(gerrit.with_owners_endpoint(configuration.owners_endpoint.clone()))
    }
}

/// Session options from the configuration, with command line overrides.
pub fn session_options(
    configuration: &Configuration,
    debug: bool,
    patchset: Option<u32>,
) -> SessionOptions {
    SessionOptions {
        report: ReportOptions {
            strip_email_domains: configuration.strip_email_domains,
            debug: debug || configuration.debug,
        },
        min_owner_vote_level: configuration.min_owner_vote_level,
        patchset,
    }
}
