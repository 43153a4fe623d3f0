use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config file is corrupt: {0}")]
    ConfigCorrupt(String),

    #[error("Server not found: {0}")]
    UnknownServer(String),

    #[error("Server already exists: {0}")]
    DuplicateServer(String),

    #[error("Invalid selection: {0}")]
    InvalidIndex(String),

    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Archive capture failed for {server}: {reason}")]
    ArchiveCaptureFailed { server: String, reason: String },

    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Failed to lock config file: {0}")]
    Lock(String),

    #[error("No servers configured")]
    NoServers,
}

pub type Result<T> = std::result::Result<T, BackupError>;
