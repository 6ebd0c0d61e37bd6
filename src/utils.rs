use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

/// Access to process environment variables, mockable in tests.
#[cfg_attr(test, automock)]
pub trait EnvProvider {
    fn var(&self, key: &str) -> Result<String, std::env::VarError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdEnvProvider;

impl EnvProvider for StdEnvProvider {
    fn var(&self, key: &str) -> Result<String, std::env::VarError> {
        std::env::var(key)
    }
}

/// Home directory as seen through the environment: `HOME`, then `USERPROFILE`.
pub fn home_dir(env: &impl EnvProvider) -> Option<PathBuf> {
    env.var("HOME")
        .or_else(|_| env.var("USERPROFILE"))
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

/// Drops the `@domain` part of every email in a space separated list.
pub fn strip_email_domains(owners: &str) -> String {
    owners
        .split(' ')
        .map(|owner| owner.split_once('@').map_or(owner, |(name, _)| name))
        .collect::<Vec<_>>()
        .join(" ")
}
