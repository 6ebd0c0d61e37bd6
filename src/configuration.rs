use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::utils::EnvProvider;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
const CONFIG_DIR_ENV: &str = "GERRIT_OWNERS_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    // Gerrit server used when a bare change id is given
    pub server: Option<String>,
    // Account name for HTTP basic auth. Password comes from env/credential helpers
    pub username: Option<String>,
    // Path segment of the owners REST view under /changes/{id}/. Default: owners
    pub owners_endpoint: String,
    // Used when the server does not report minOwnerVoteLevel. Default: 1
    pub min_owner_vote_level: i32,
    // Show "alice" rather than "alice@example.org" in file sections. Default: true
    pub strip_email_domains: bool,
    // Ask the server for debug messages and print them. Default: false
    pub debug: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            server: None,
            username: None,
            owners_endpoint: "owners".to_string(),
            min_owner_vote_level: 1,
            strip_email_domains: true,
            debug: false,
        }
    }
}

impl Configuration {
    /// Loads `config.yaml` from the configuration directory.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// parsed is an error.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if !path.exists() {
            log::debug!("No configuration at {}. Using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let configuration: Configuration = serde_yaml::from_str(&content)?;
        configuration.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(configuration)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.owners_endpoint.trim().is_empty() || self.owners_endpoint.contains('/') {
            return Err(ConfigurationError::InvalidValue {
                key: "owners_endpoint",
                reason: format!(
                    "'{}' must be a single non-empty path segment",
                    self.owners_endpoint
                ),
            });
        }
        if self.min_owner_vote_level < 1 {
            return Err(ConfigurationError::InvalidValue {
                key: "min_owner_vote_level",
                reason: format!("{} must be at least 1", self.min_owner_vote_level),
            });
        }
        Ok(())
    }
}

/// Resolves the configuration directory: explicit flag, then the
/// `GERRIT_OWNERS_CONFIG_DIR` variable, then the platform config directory.
pub fn determine_config_dir(
    explicit: Option<PathBuf>,
    env: &impl EnvProvider,
) -> Result<PathBuf, ConfigurationError> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }

    if let Ok(dir) = env.var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            log::debug!("Using {} = {}", CONFIG_DIR_ENV, dir);
            return Ok(PathBuf::from(dir));
        }
    }

    use etcetera::BaseStrategy;
    let strategy = etcetera::choose_base_strategy()?;
    Ok(strategy.config_dir().join("gerrit-owners"))
}

/// Human readable summary of the configuration in use.
pub fn configuration_status(config_dir: &Path, configuration: &Configuration) -> String {
    let path = config_dir.join(CONFIG_FILE_NAME);
    let source = if path.exists() {
        format!("📁 Configuration file: {}", path.display())
    } else {
        format!("📁 No configuration file at {} (using defaults)", path.display())
    };
    let or_unset = |value: &Option<String>| value.clone().unwrap_or_else(|| "(not set)".to_string());

    [
        source,
        format!("   server: {}", or_unset(&configuration.server)),
        format!("   username: {}", or_unset(&configuration.username)),
        format!("   owners_endpoint: {}", configuration.owners_endpoint),
        format!(
            "   min_owner_vote_level: {}",
            configuration.min_owner_vote_level
        ),
        format!(
            "   strip_email_domains: {}",
            configuration.strip_email_domains
        ),
        format!("   debug: {}", configuration.debug),
    ]
    .join("\n")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    YamlParser(#[from] serde_yaml::Error),
    #[error("Could not determine home directory: {0}")]
    HomeDir(#[from] etcetera::HomeDirError),
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
