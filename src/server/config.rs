use crate::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_SSH_USER: &str = "root";

/// How the remote shell authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Auth {
    Key { path: PathBuf },
    Password { password: String },
    /// Nothing configured; the ssh agent or the remote will decide.
    None,
}

impl Auth {
    /// Build from the two optional inputs. A key path wins over a password,
    /// matching the order in which ssh tries them.
    pub fn from_inputs(password: Option<&str>, key_path: Option<&str>) -> Self {
        let password = password.map(str::trim).filter(|p| !p.is_empty());
        let key_path = key_path.map(str::trim).filter(|k| !k.is_empty());

        match (key_path, password) {
            (Some(path), _) => Auth::Key {
                path: PathBuf::from(path),
            },
            (None, Some(password)) => Auth::Password {
                password: password.to_string(),
            },
            (None, None) => Auth::None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Auth::Key { .. } => "key",
            Auth::Password { .. } => "password",
            Auth::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerRecord {
    pub name: String,

    // Connection
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    pub auth: Auth,

    // What to back up
    pub app_path: String,
    pub db_container: String,
    pub db_root_password: String,

    // Where to send the archive
    pub bot_token: String,
    pub chat_id: String,
}

/// Names become directory names under the backup root, so they must stay
/// a single path component.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BackupError::InvalidConfig("Server name cannot be empty".into()));
    }
    if name != name.trim() || name.contains('/') || name.contains('\0') || name == "." || name == ".." {
        return Err(BackupError::InvalidConfig(format!(
            "Server name '{}' is not usable as a directory name",
            name
        )));
    }
    Ok(())
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_user() -> String {
    DEFAULT_SSH_USER.to_string()
}

impl ServerRecord {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            user: DEFAULT_SSH_USER.to_string(),
            auth: Auth::None,
            app_path: String::new(),
            db_container: String::new(),
            db_root_password: String::new(),
            bot_token: String::new(),
            chat_id: String::new(),
        }
    }

    /// Password, or empty when authenticating some other way.
    pub fn password(&self) -> &str {
        match &self.auth {
            Auth::Password { password } => password,
            _ => "",
        }
    }

    pub fn key_path(&self) -> Option<&Path> {
        match &self.auth {
            Auth::Key { path } => Some(path),
            _ => None,
        }
    }

    /// `user@host` as passed to ssh
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}
