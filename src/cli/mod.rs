// CLI module - commands, prompts and the interactive menu
pub mod add;
pub mod backup;
pub mod delete;
pub mod import;
pub mod list;
pub mod menu;
pub mod prompt;
pub mod schedule;
pub mod status;

use crate::{
    backup::{Orchestrator, SshTransport, TelegramNotifier},
    state::ConfigStore,
};
use std::path::PathBuf;
use std::time::Duration;

/// Everything a command needs, resolved once in `main`.
pub struct AppContext {
    pub store: ConfigStore,
    pub backup_root: PathBuf,
    pub retention: Duration,
    /// Where scheduled runs send stray stdout/stderr
    pub cron_log: PathBuf,
    /// Path of this executable, as installed in the crontab
    pub exe: PathBuf,
}

impl AppContext {
    pub fn orchestrator(&self) -> crate::Result<Orchestrator<'_>> {
        Ok(Orchestrator::new(
            &self.store,
            self.backup_root.clone(),
            self.retention,
            Box::new(SshTransport::new()),
            Box::new(TelegramNotifier::new()?),
        ))
    }
}
