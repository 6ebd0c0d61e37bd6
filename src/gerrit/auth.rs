use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::utils::{EnvProvider, home_dir};

pub const USERNAME_ENV: &str = "GERRIT_USERNAME";
pub const PASSWORD_ENV: &str = "GERRIT_HTTP_PASSWORD";

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error(
        "No credentials found. Try: GERRIT_USERNAME/GERRIT_HTTP_PASSWORD env vars, git credential manager, or ~/.netrc"
    )]
    NoAuth,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP credentials for Gerrit's authenticated `/a/` REST prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Looks up credentials for `host`, in priority order.
pub fn get_credentials(
    host: &str,
    username: Option<&str>,
    env: &impl EnvProvider,
) -> Result<Credentials, AuthError> {
    // 1. environment variables
    if let Ok(password) = env.var(PASSWORD_ENV) {
        let username = env
            .var(USERNAME_ENV)
            .ok()
            .or_else(|| username.map(str::to_string));
        if let Some(username) = username {
            log::debug!("Using {} environment variable", PASSWORD_ENV);
            return Ok(Credentials { username, password });
        }
        log::warn!(
            "{} is set but no username is configured; ignoring it",
            PASSWORD_ENV
        );
    }

    // 2. git credential manager
    if let Ok(credentials) = get_git_credentials(host, username) {
        log::debug!("Using git credential manager");
        return Ok(credentials);
    }

    // 3. .netrc file
    if let Ok(credentials) = get_netrc_credentials(host, username, env) {
        log::debug!("Using .netrc file credentials");
        return Ok(credentials);
    }

    Err(AuthError::NoAuth)
}

fn get_git_credentials(host: &str, username: Option<&str>) -> Result<Credentials, AuthError> {
    let mut input = format!("protocol=https\nhost={}\n", host);
    if let Some(username) = username {
        input.push_str(&format!("username={}\n", username));
    }
    input.push('\n');

    let mut child = Command::new("git")
        .args(["credential", "fill"])
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|_| AuthError::NoAuth)?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|_| AuthError::NoAuth)?;
    }

    let output = child.wait_with_output().map_err(|_| AuthError::NoAuth)?;
    if !output.status.success() {
        return Err(AuthError::NoAuth);
    }

    parse_credential_output(&String::from_utf8_lossy(&output.stdout)).ok_or(AuthError::NoAuth)
}

fn parse_credential_output(output: &str) -> Option<Credentials> {
    let mut username = None;
    let mut password = None;
    for line in output.lines() {
        if let Some(value) = line.strip_prefix("username=") {
            username = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("password=") {
            password = Some(value.to_string());
        }
    }
    Some(Credentials {
        username: username?,
        password: password?,
    })
}

fn get_netrc_credentials(
    host: &str,
    username: Option<&str>,
    env: &impl EnvProvider,
) -> Result<Credentials, AuthError> {
    let netrc_path = get_netrc_path(env)?;
    if !netrc_path.exists() {
        return Err(AuthError::NoAuth);
    }

    let content = std::fs::read_to_string(&netrc_path)?;
    parse_netrc(&content, host, username).ok_or(AuthError::NoAuth)
}

// Format: machine <host> login <user> password <secret>
fn parse_netrc(content: &str, host: &str, username: Option<&str>) -> Option<Credentials> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    let mut i = 0;

    while i < tokens.len() {
        if tokens[i] == "machine" && tokens.get(i + 1) == Some(&host) {
            let mut login = None;
            let mut password = None;
            let mut j = i + 2;
            while j + 1 < tokens.len() && tokens[j] != "machine" {
                match tokens[j] {
                    "login" => login = Some(tokens[j + 1]),
                    "password" => password = Some(tokens[j + 1]),
                    _ => {}
                }
                j += 1;
            }

            if let (Some(login), Some(password)) = (login, password) {
                if username.is_none_or(|wanted| wanted == login) {
                    return Some(Credentials {
                        username: login.to_string(),
                        password: password.to_string(),
                    });
                }
            }
            i = j;
        } else {
            i += 1;
        }
    }

    None
}

fn get_netrc_path(env: &impl EnvProvider) -> Result<PathBuf, AuthError> {
    let home = home_dir(env).ok_or(AuthError::NoAuth)?;
    let windows_netrc = home.join("_netrc");
    if windows_netrc.exists() {
        Ok(windows_netrc)
    } else {
        Ok(home.join(".netrc"))
    }
}
