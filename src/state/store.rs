use crate::{server::ServerRecord, BackupError, Result};
use chrono::{DateTime, Local};
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Owner read/write only
pub const CONFIG_MODE: u32 = 0o600;

const FORMAT_VERSION: u32 = 1;

/// Everything persisted in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigState {
    #[serde(default = "format_version")]
    pub version: u32,
    #[serde(default)]
    pub servers: Vec<ServerRecord>,
    #[serde(default)]
    pub last_backup: BTreeMap<String, DateTime<Local>>,
}

fn format_version() -> u32 {
    FORMAT_VERSION
}

impl Default for ConfigState {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            servers: vec![],
            last_backup: BTreeMap::new(),
        }
    }
}

impl ConfigState {
    pub fn server(&self, name: &str) -> Option<&ServerRecord> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.server(name).is_some()
    }
}

/// Exclusive advisory lock on the config file, released on drop.
pub struct StoreLock {
    _lock: Flock<File>,
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Load the current state. A missing file is an empty state.
    ///
    /// If the file is readable by anyone but its owner the mode is reset to
    /// 0600 before the content is read.
    pub fn load(&self) -> Result<ConfigState> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Config file not found, starting empty");
                return Ok(ConfigState::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mode = metadata.permissions().mode() & 0o777;
        if mode != CONFIG_MODE {
            tracing::warn!(
                path = %self.path.display(),
                mode = %format!("{:o}", mode),
                "Config file permissions too open, resetting to 600"
            );
            fs::set_permissions(&self.path, Permissions::from_mode(CONFIG_MODE))?;
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigState::default());
        }

        let state: ConfigState = serde_json::from_str(&content).map_err(|e| {
            BackupError::ConfigCorrupt(format!("{}: {}", self.path.display(), e))
        })?;

        if state.version > FORMAT_VERSION {
            return Err(BackupError::ConfigCorrupt(format!(
                "{}: unsupported format version {}",
                self.path.display(),
                state.version
            )));
        }

        Ok(state)
    }

    /// Rewrite the whole file: temp file in the same directory, fsync, rename.
    pub fn save(&self, state: &ConfigState) -> Result<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, state)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().set_permissions(Permissions::from_mode(CONFIG_MODE))?;
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path).map_err(|e| BackupError::Io(e.error))?;
        fs::set_permissions(&self.path, Permissions::from_mode(CONFIG_MODE))?;

        tracing::debug!(
            path = %self.path.display(),
            servers = state.servers.len(),
            "Config saved"
        );

        Ok(())
    }

    /// Take the single-writer lock. Blocks until any other holder is done.
    pub fn lock(&self) -> Result<StoreLock> {
        fs::create_dir_all(self.parent_dir())?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .mode(CONFIG_MODE)
            .open(self.lock_path())?;

        let lock = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, errno)| BackupError::Lock(errno.to_string()))?;

        Ok(StoreLock { _lock: lock })
    }

    /// Load, apply `f`, save, all under the lock. Nothing is written if `f` fails.
    pub fn update<T>(&self, f: impl FnOnce(&mut ConfigState) -> Result<T>) -> Result<T> {
        let _lock = self.lock()?;
        let mut state = self.load()?;
        let out = f(&mut state)?;
        self.save(&state)?;
        Ok(out)
    }
}
