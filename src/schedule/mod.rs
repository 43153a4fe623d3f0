//! Recurring `--all` runs through the user's crontab.
//!
//! The installed line is found again by the path of this executable: any line
//! mentioning it is ours, and is replaced rather than duplicated.

use crate::{BackupError, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleInterval {
    ThirtyMinutes,
    Hourly,
    SixHours,
    TwelveHours,
    Daily,
}

impl ScheduleInterval {
    pub const ALL: [ScheduleInterval; 5] = [
        ScheduleInterval::ThirtyMinutes,
        ScheduleInterval::Hourly,
        ScheduleInterval::SixHours,
        ScheduleInterval::TwelveHours,
        ScheduleInterval::Daily,
    ];

    /// Menu choice `1`..`5`
    pub fn from_choice(choice: &str) -> Result<Self> {
        choice
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| BackupError::InvalidChoice(choice.trim().to_string()))
    }

    pub fn cron_expression(&self) -> &'static str {
        match self {
            ScheduleInterval::ThirtyMinutes => "*/30 * * * *",
            ScheduleInterval::Hourly => "0 * * * *",
            ScheduleInterval::SixHours => "0 */6 * * *",
            ScheduleInterval::TwelveHours => "0 */12 * * *",
            ScheduleInterval::Daily => "0 0 * * *",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScheduleInterval::ThirtyMinutes => "Every 30 minutes",
            ScheduleInterval::Hourly => "Every hour",
            ScheduleInterval::SixHours => "Every 6 hours",
            ScheduleInterval::TwelveHours => "Every 12 hours",
            ScheduleInterval::Daily => "Every 24 hours",
        }
    }
}

/// A per-user job table.
pub trait JobTable {
    fn read(&self) -> Result<String>;
    fn write(&self, table: &str) -> Result<()>;
}

/// The system `crontab` command.
#[derive(Debug, Default)]
pub struct Crontab;

impl JobTable for Crontab {
    fn read(&self) -> Result<String> {
        let output = Command::new("crontab")
            .arg("-l")
            .output()
            .map_err(|e| BackupError::CommandFailed(format!("Failed to run crontab: {}", e)))?;

        // `crontab -l` exits 1 with "no crontab for <user>" when there is none
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no crontab") {
                return Ok(String::new());
            }
            return Err(BackupError::CommandFailed(format!(
                "crontab -l failed: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn write(&self, table: &str) -> Result<()> {
        let mut child = Command::new("crontab")
            .arg("-")
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackupError::CommandFailed(format!("Failed to run crontab: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(table.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(BackupError::CommandFailed(format!(
                "crontab - failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

/// The line that runs `exe --all`, with output appended to `log`.
pub fn job_line(exe: &Path, log: &Path, interval: ScheduleInterval) -> String {
    format!(
        "{} {} --all >> {} 2>&1",
        interval.cron_expression(),
        exe.display(),
        log.display()
    )
}

/// Drop every line mentioning `exe`, then append `new_line` if given.
pub fn render_table(existing: &str, exe: &Path, new_line: Option<&str>) -> String {
    let needle = exe.to_string_lossy();
    let mut lines: Vec<&str> = existing
        .lines()
        .filter(|line| !line.contains(needle.as_ref()))
        .collect();

    // Trailing blank lines would pile up across reinstalls
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    if let Some(line) = new_line {
        lines.push(line);
    }

    let mut table = lines.join("\n");
    if !table.is_empty() {
        table.push('\n');
    }
    table
}

/// Install or replace the `--all` job. Returns the installed line.
pub fn install(
    table: &dyn JobTable,
    exe: &Path,
    log: &Path,
    interval: ScheduleInterval,
) -> Result<String> {
    let line = job_line(exe, log, interval);
    let existing = table.read()?;
    table.write(&render_table(&existing, exe, Some(line.as_str())))?;

    tracing::info!(schedule = %interval.cron_expression(), "Backup schedule installed");
    Ok(line)
}

/// Remove the job. Returns whether anything was removed.
pub fn remove(table: &dyn JobTable, exe: &Path) -> Result<bool> {
    let existing = table.read()?;
    let needle = exe.to_string_lossy();
    if !existing.lines().any(|line| line.contains(needle.as_ref())) {
        return Ok(false);
    }
    table.write(&render_table(&existing, exe, None))?;

    tracing::info!("Backup schedule removed");
    Ok(true)
}

/// The currently installed job line, if any.
pub fn current(table: &dyn JobTable, exe: &Path) -> Result<Option<String>> {
    let needle = exe.to_string_lossy().to_string();
    Ok(table
        .read()?
        .lines()
        .find(|line| line.contains(&needle))
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryTable {
        content: RefCell<String>,
    }

    impl JobTable for MemoryTable {
        fn read(&self) -> Result<String> {
            Ok(self.content.borrow().clone())
        }

        fn write(&self, table: &str) -> Result<()> {
            *self.content.borrow_mut() = table.to_string();
            Ok(())
        }
    }

    const EXE: &str = "/usr/local/bin/remote-backup";
    const LOG: &str = "/var/log/remote-backup.log";

    #[test]
    fn test_from_choice() {
        assert_eq!(
            ScheduleInterval::from_choice("1").unwrap(),
            ScheduleInterval::ThirtyMinutes
        );
        assert_eq!(
            ScheduleInterval::from_choice(" 5 ").unwrap(),
            ScheduleInterval::Daily
        );
        for bad in ["0", "6", "", "hourly"] {
            assert!(matches!(
                ScheduleInterval::from_choice(bad),
                Err(BackupError::InvalidChoice(_))
            ));
        }
    }

    #[test]
    fn test_job_line() {
        let line = job_line(Path::new(EXE), Path::new(LOG), ScheduleInterval::SixHours);
        assert_eq!(
            line,
            "0 */6 * * * /usr/local/bin/remote-backup --all >> /var/log/remote-backup.log 2>&1"
        );
    }

    #[test]
    fn test_install_twice_leaves_one_entry() {
        let table = MemoryTable::default();
        *table.content.borrow_mut() = "MAILTO=me@example.com\n15 3 * * * /usr/bin/other-job\n".into();

        install(&table, Path::new(EXE), Path::new(LOG), ScheduleInterval::Hourly).unwrap();
        install(&table, Path::new(EXE), Path::new(LOG), ScheduleInterval::Daily).unwrap();

        let content = table.content.borrow().clone();
        let ours: Vec<&str> = content.lines().filter(|l| l.contains(EXE)).collect();
        assert_eq!(ours.len(), 1);
        assert!(ours[0].starts_with("0 0 * * * "));
        assert!(content.contains("MAILTO=me@example.com"));
        assert!(content.contains("/usr/bin/other-job"));
    }

    #[test]
    fn test_current_and_remove() {
        let table = MemoryTable::default();
        assert_eq!(current(&table, Path::new(EXE)).unwrap(), None);
        assert!(!remove(&table, Path::new(EXE)).unwrap());

        install(&table, Path::new(EXE), Path::new(LOG), ScheduleInterval::TwelveHours).unwrap();
        assert!(current(&table, Path::new(EXE))
            .unwrap()
            .unwrap()
            .starts_with("0 */12 * * *"));

        assert!(remove(&table, Path::new(EXE)).unwrap());
        assert_eq!(current(&table, Path::new(EXE)).unwrap(), None);
        assert_eq!(*table.content.borrow(), "");
    }
}
