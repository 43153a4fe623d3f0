use remote_backup::{
    backup::{retention_days, Notifier, Orchestrator, RemoteTransport},
    cli::status,
    schedule::{self, JobTable, ScheduleInterval},
    server::{Auth, ServerRecord, ServerRegistry},
    state::{legacy, ConfigStore},
    BackupError, Result,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct ScriptedTransport {
    unreachable: Vec<String>,
}

impl RemoteTransport for ScriptedTransport {
    fn capture(&self, server: &ServerRecord, _script: &str, dest: &Path) -> Result<()> {
        if self.unreachable.contains(&server.name) {
            return Err(BackupError::ArchiveCaptureFailed {
                server: server.name.clone(),
                reason: "ssh: connect to host port 22: Connection refused".into(),
            });
        }
        std::fs::write(dest, format!("archive of {}", server.name))?;
        Ok(())
    }
}

struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn send_document(&self, _server: &ServerRecord, _document: &Path, _caption: &str) -> Result<()> {
        Ok(())
    }
}

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

fn create_test_environment() -> (ConfigStore, PathBuf, TempDir) {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::new(temp.path().join("state").join("servers.json"));
    let backup_root = temp.path().join("backups");
    (store, backup_root, temp)
}

fn create_test_server(name: &str, host: &str) -> ServerRecord {
    let mut record = ServerRecord::new(name, host);
    record.auth = Auth::Key {
        path: PathBuf::from("/home/u/.ssh/id_ed25519"),
    };
    record.app_path = "/var/www/app".to_string();
    record.db_container = "mysql".to_string();
    record.db_root_password = "rootpw".to_string();
    record.bot_token = "123:abc".to_string();
    record.chat_id = "-1001".to_string();
    record
}

#[test]
fn test_full_server_lifecycle() {
    let (store, backup_root, _temp) = create_test_environment();
    let registry = ServerRegistry::new(&store);

    registry.add(create_test_server("web", "203.0.113.5")).unwrap();
    registry.add(create_test_server("db", "203.0.113.6")).unwrap();
    assert_eq!(registry.list().unwrap(), vec!["db", "web"]);

    let orchestrator = Orchestrator::new(
        &store,
        backup_root.clone(),
        retention_days(7),
        Box::new(ScriptedTransport {
            unreachable: vec!["db".to_string()],
        }),
        Box::new(SilentNotifier),
    );

    let summary = orchestrator.run_all().unwrap();
    assert_eq!(summary.succeeded.len(), 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(matches!(
        summary.failed[0].1,
        BackupError::ArchiveCaptureFailed { .. }
    ));

    let archive = &summary.succeeded[0].archive;
    assert_eq!(std::fs::read_to_string(archive).unwrap(), "archive of web");
    assert!(archive.starts_with(backup_root.join("web")));

    let state = store.load().unwrap();
    let rendered = status::render(&state);
    assert!(rendered.contains(status::NO_BACKUP_YET));
    assert!(state.last_backup.contains_key("web"));
    assert!(!state.last_backup.contains_key("db"));

    registry.delete("web").unwrap();
    let state = store.load().unwrap();
    assert_eq!(state.servers.len(), 1);
    assert!(state.last_backup.is_empty());

    // Archives stay on disk after the server is gone
    assert!(archive.exists());
}

#[test]
fn test_round_trip_ignores_order() {
    let (store, _backup_root, _temp) = create_test_environment();
    let registry = ServerRegistry::new(&store);

    let names = ["zulu", "alpha", "mike"];
    for name in names {
        registry.add(create_test_server(name, "198.51.100.7")).unwrap();
    }

    let first = store.load().unwrap();
    store.save(&first).unwrap();
    let second = store.load().unwrap();

    let mut a: Vec<_> = first.servers.clone();
    let mut b: Vec<_> = second.servers.clone();
    a.sort_by(|x, y| x.name.cmp(&y.name));
    b.sort_by(|x, y| x.name.cmp(&y.name));
    assert_eq!(a, b);
    assert_eq!(first.last_backup, second.last_backup);
}

#[test]
fn test_legacy_import_then_backup() {
    let (store, backup_root, _temp) = create_test_environment();

    let imported = legacy::parse(
        "# old config\nSERVERS[edge1]=\"198.51.100.7|22|root||/home/u/.ssh/id_ed25519|/srv/app|db|pw|t|1\"\n",
    );
    store.save(&imported).unwrap();

    let orchestrator = Orchestrator::new(
        &store,
        backup_root,
        retention_days(7),
        Box::new(ScriptedTransport { unreachable: vec![] }),
        Box::new(SilentNotifier),
    );
    let report = orchestrator.run("edge1").unwrap();

    assert_eq!(report.server, "edge1");
    assert!(store.load().unwrap().last_backup.contains_key("edge1"));
}

#[test]
fn test_schedule_reinstall_replaces_entry() {
    let table = MemoryTable::default();
    let exe = Path::new("/opt/remote-backup/bin/remote-backup");
    let log = Path::new("/tmp/cron.log");

    schedule::install(&table, exe, log, ScheduleInterval::ThirtyMinutes).unwrap();
    schedule::install(&table, exe, log, ScheduleInterval::TwelveHours).unwrap();

    let content = table.content.borrow().clone();
    assert_eq!(content.matches("remote-backup --all").count(), 1);
    assert!(content.starts_with("0 */12 * * *"));
}
