// Backup orchestration: capture, prune, upload, record
pub mod notify;
pub mod retention;
pub mod transport;


pub use notify::{Notifier, TelegramNotifier};
pub use transport::{RemoteTransport, SshTransport};

use crate::{
    server::{validate_name, ServerRegistry},
    state::ConfigStore,
    BackupError, Result,
};
use byte_unit::{Byte, UnitType};
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Timestamp tag embedded in archive names
pub const TAG_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn archive_file_name(tag: &str) -> String {
    format!("complete-backup-{}{}", tag, retention::ARCHIVE_SUFFIX)
}

pub fn retention_days(days: u64) -> Duration {
    // Saturates so an absurd --retention-days means "keep everything"
    Duration::from_secs(days.saturating_mul(24 * 60 * 60))
}

/// Outcome of one successful server backup.
#[derive(Debug)]
pub struct BackupReport {
    pub server: String,
    pub started_at: DateTime<Local>,
    pub archive: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
    pub pruned: usize,
    pub prune_failures: usize,
    pub notified: bool,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<BackupReport>,
    pub failed: Vec<(String, BackupError)>,
}

pub struct Orchestrator<'a> {
    store: &'a ConfigStore,
    backup_root: PathBuf,
    retention: Duration,
    transport: Box<dyn RemoteTransport + 'a>,
    notifier: Box<dyn Notifier + 'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a ConfigStore,
        backup_root: PathBuf,
        retention: Duration,
        transport: Box<dyn RemoteTransport + 'a>,
        notifier: Box<dyn Notifier + 'a>,
    ) -> Self {
        Self {
            store,
            backup_root,
            retention,
            transport,
            notifier,
        }
    }

    /// Per-server archive directory
    pub fn server_dir(&self, name: &str) -> PathBuf {
        self.backup_root.join(name)
    }

    /// Back up one server.
    ///
    /// Fails on an unknown server or a failed capture. Pruning and upload
    /// problems are logged and reflected in the report but do not fail the run.
    pub fn run(&self, name: &str) -> Result<BackupReport> {
        // Resolve
        let record = self
            .store
            .load()?
            .server(name)
            .cloned()
            .ok_or_else(|| BackupError::UnknownServer(name.to_string()))?;
        // A hand-edited config can still carry a name that is not a single path component
        validate_name(&record.name)?;

        // Prepare
        let started_at = Local::now();
        let tag = started_at.format(TAG_FORMAT).to_string();
        let dir = self.server_dir(&record.name);
        fs::create_dir_all(&dir)?;
        let archive = dir.join(archive_file_name(&tag));

        tracing::info!(
            server = %record.name,
            host = %record.host,
            archive = %archive.display(),
            "Starting backup"
        );

        // Capture
        let script = transport::capture_script(&record);
        if let Err(e) = self.transport.capture(&record, &script, &archive) {
            let e = match e {
                e @ BackupError::ArchiveCaptureFailed { .. } => e,
                other => BackupError::ArchiveCaptureFailed {
                    server: record.name.clone(),
                    reason: other.to_string(),
                },
            };
            tracing::error!(server = %record.name, error = %e, "Backup failed");
            return Err(e);
        }

        let size_bytes = fs::metadata(&archive)?.len();
        let sha256 = file_sha256(&archive)?;
        tracing::info!(
            server = %record.name,
            size = %format_size(size_bytes),
            sha256 = %sha256,
            "Archive captured"
        );

        // Retention sweep
        let sweep = match retention::sweep(&dir, self.retention, SystemTime::now(), &archive) {
            Ok(sweep) => sweep,
            Err(e) => {
                tracing::warn!(server = %record.name, error = %e, "Retention sweep failed");
                retention::SweepResult {
                    failures: 1,
                    ..Default::default()
                }
            }
        };

        // Notify
        let caption = format!(
            "Backup of {} ({})\n{}\nsha256: {}",
            record.name,
            started_at.format("%Y-%m-%d %H:%M:%S"),
            format_size(size_bytes),
            sha256
        );
        let notified = match self.notifier.send_document(&record, &archive, &caption) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(server = %record.name, error = %e, "Failed to send archive");
                false
            }
        };

        // Record
        self.store.update(|state| {
            if state.contains(&record.name) {
                state.last_backup.insert(record.name.clone(), started_at);
            }
            Ok(())
        })?;

        tracing::info!(server = %record.name, "Backup completed");

        Ok(BackupReport {
            server: record.name,
            started_at,
            archive,
            size_bytes,
            sha256,
            pruned: sweep.removed.len(),
            prune_failures: sweep.failures,
            notified,
        })
    }

    /// Back up every registered server, one after another. A failing server
    /// never stops the rest.
    pub fn run_all(&self) -> Result<BatchSummary> {
        let names = ServerRegistry::new(self.store).list()?;
        if names.is_empty() {
            return Err(BackupError::NoServers);
        }

        tracing::info!(servers = names.len(), "Starting backup of all servers");

        let mut summary = BatchSummary::default();
        for name in names {
            match self.run(&name) {
                Ok(report) => summary.succeeded.push(report),
                Err(e) => summary.failed.push((name, e)),
            }
        }

        tracing::info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            "Finished backup of all servers"
        );

        Ok(summary)
    }
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn format_size(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.2}", adjusted)
}
