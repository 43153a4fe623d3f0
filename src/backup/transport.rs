use crate::{
    server::{Auth, ServerRecord},
    BackupError, Result,
};
use std::fs::{OpenOptions, Permissions};
use std::io::Read;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;
use std::process::{Command, Stdio};

/// Name of the dump file inside the archive
pub const DUMP_FILE_NAME: &str = "database.sql";

/// Runs a command on a server and streams its stdout to a local file.
pub trait RemoteTransport {
    fn capture(&self, server: &ServerRecord, script: &str, dest: &Path) -> Result<()>;
}

/// Archives may hold a full database dump
pub const ARCHIVE_MODE: u32 = 0o600;

/// `ssh` for key auth, `sshpass -e ssh` for password auth.
#[derive(Debug, Clone)]
pub struct SshTransport {
    ssh_command: Vec<String>,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SshTransport {
    pub fn new() -> Self {
        Self::with_ssh_command(vec!["ssh".to_string()])
    }

    /// Use `ssh_command` (program plus leading args) in place of plain `ssh`.
    pub fn with_ssh_command(ssh_command: Vec<String>) -> Self {
        Self { ssh_command }
    }

    /// Build the full argv, program first.
    pub fn build_args(&self, server: &ServerRecord, script: &str) -> Vec<String> {
        let mut args = vec![];

        if matches!(server.auth, Auth::Password { .. }) {
            // Password comes from $SSHPASS, never from argv
            args.push("sshpass".to_string());
            args.push("-e".to_string());
        }
        args.extend(self.ssh_command.iter().cloned());

        match &server.auth {
            Auth::Key { path } => {
                args.push("-i".to_string());
                args.push(path.to_string_lossy().to_string());
                args.push("-o".to_string());
                args.push("BatchMode=yes".to_string());
            }
            Auth::Password { .. } => {
                args.push("-o".to_string());
                args.push("PubkeyAuthentication=no".to_string());
            }
            Auth::None => {
                args.push("-o".to_string());
                args.push("BatchMode=yes".to_string());
            }
        }

        args.push("-p".to_string());
        args.push(server.port.to_string());
        args.push("-o".to_string());
        args.push("StrictHostKeyChecking=accept-new".to_string());
        args.push(server.destination());

        args.push(format!("sh -c {}", shell_quote(script)));
        args
    }
}

impl RemoteTransport for SshTransport {
    fn capture(&self, server: &ServerRecord, script: &str, dest: &Path) -> Result<()> {
        let args = self.build_args(server, script);
        let output_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(ARCHIVE_MODE)
            .open(dest)?;
        // `mode` only applies on creation
        output_file.set_permissions(Permissions::from_mode(ARCHIVE_MODE))?;

        tracing::debug!(
            server = %server.name,
            program = %args[0],
            destination = %server.destination(),
            "Running remote capture"
        );

        let mut command = Command::new(&args[0]);
        command
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::from(output_file))
            .stderr(Stdio::piped());
        if let Auth::Password { password } = &server.auth {
            command.env("SSHPASS", password);
        }

        let mut child = command.spawn().map_err(|e| BackupError::ArchiveCaptureFailed {
            server: server.name.clone(),
            reason: format!("Failed to run {}: {}", args[0], e),
        })?;

        // stderr is diagnostics only; its encoding never decides the outcome
        let mut stderr = Vec::new();
        let read = child.stderr.take().map(|mut pipe| pipe.read_to_end(&mut stderr));
        let status = child.wait()?;
        if let Some(Err(e)) = read {
            tracing::debug!(server = %server.name, error = %e, "Failed to read remote stderr");
        }

        if !status.success() {
            return Err(BackupError::ArchiveCaptureFailed {
                server: server.name.clone(),
                reason: format!(
                    "remote pipeline exited with {}: {}",
                    status,
                    String::from_utf8_lossy(&stderr).trim()
                ),
            });
        }

        Ok(())
    }
}

/// Shell script run on the remote host. Writes a gzipped tar of the app
/// directory plus a database dump to stdout.
pub fn capture_script(server: &ServerRecord) -> String {
    let (parent, target) = split_app_path(&server.app_path);

    format!(
        "set -e\n\
         tmp=$(mktemp -d)\n\
         trap 'rm -rf \"$tmp\"' EXIT\n\
         docker exec {container} mysqldump -uroot -p{password} --all-databases --single-transaction > \"$tmp/{dump}\"\n\
         tar -czf - -C {parent} {target} -C \"$tmp\" {dump}\n",
        container = shell_quote(&server.db_container),
        password = shell_quote(&server.db_root_password),
        dump = DUMP_FILE_NAME,
        parent = shell_quote(&parent),
        target = shell_quote(&target),
    )
}

/// `/var/www/app/` -> (`/var/www`, `app`)
fn split_app_path(app_path: &str) -> (String, String) {
    let trimmed = app_path.trim_end_matches('/');
    if trimmed.is_empty() {
        return ("/".to_string(), ".".to_string());
    }

    let path = Path::new(trimmed);
    let target = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string());
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().to_string(),
        _ if trimmed.starts_with('/') => "/".to_string(),
        _ => ".".to_string(),
    };

    (parent, target)
}

/// Quote for a POSIX shell: wrap in single quotes, escape embedded ones.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
