use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directories::{BaseDirs, ProjectDirs};
use remote_backup::{
    backup::{retention_days, DEFAULT_RETENTION_DAYS},
    cli::{self, add::AddOptions, prompt::Prompter, AppContext},
    schedule::Crontab,
    server::{DEFAULT_SSH_PORT, DEFAULT_SSH_USER},
    state::ConfigStore,
    BackupError,
};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "remote-backup")]
#[command(about = "Back up remote app directories and databases over SSH", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Back up every registered server and exit
    #[arg(long)]
    all: bool,

    /// State directory override (config file and logs)
    #[arg(long, global = true, env = "REMOTE_BACKUP_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Local directory that receives the archives
    #[arg(long, global = true, env = "REMOTE_BACKUP_DIR")]
    backup_dir: Option<PathBuf>,

    /// Delete archives older than this many days
    #[arg(long, global = true, default_value_t = DEFAULT_RETENTION_DAYS)]
    retention_days: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new server
    Add {
        /// Server name
        name: String,

        /// IP address or domain
        #[arg(long)]
        host: String,

        /// SSH port
        #[arg(long, default_value_t = DEFAULT_SSH_PORT)]
        port: u16,

        /// SSH user
        #[arg(long, default_value = DEFAULT_SSH_USER)]
        user: String,

        /// SSH private key (prompts for a password if not given)
        #[arg(long)]
        key: Option<String>,

        /// Application directory on the server
        #[arg(long)]
        app_path: String,

        /// Name of the database container
        #[arg(long)]
        db_container: String,

        /// Telegram chat to send archives to
        #[arg(long)]
        chat_id: String,
    },

    /// List registered servers
    List,

    /// Remove a server
    Delete {
        /// Server name
        name: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Back up one server now
    Backup {
        /// Server name
        name: String,
    },

    /// Install the recurring backup of all servers
    Schedule {
        /// 1) 30 min 2) 1 h 3) 6 h 4) 12 h 5) 24 h (prompts if omitted)
        choice: Option<String>,

        /// Remove the installed schedule instead
        #[arg(long, conflicts_with = "choice")]
        remove: bool,
    },

    /// Show last backup time per server
    Status,

    /// Import servers from an old shell-style config file
    ImportLegacy {
        /// Path of the old config file
        file: PathBuf,
    },
}

fn init_logging(verbose: bool, log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();

    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Get state directory
    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => ProjectDirs::from("dev", "remote-backup", "remote-backup")
            .context("Failed to determine project directory")?
            .data_dir()
            .to_path_buf(),
    };

    let backup_root = match cli.backup_dir {
        Some(dir) => dir,
        None => BaseDirs::new()
            .context("Failed to determine home directory")?
            .home_dir()
            .join("backups"),
    };

    init_logging(cli.verbose, &state_dir.join("backup.log"))?;

    let ctx = AppContext {
        store: ConfigStore::new(state_dir.join("servers.json")),
        backup_root,
        retention: retention_days(cli.retention_days),
        cron_log: state_dir.join("cron.log"),
        exe: std::env::current_exe().context("Failed to locate own executable")?,
    };

    if cli.all {
        return match cli::backup::execute_all(&ctx) {
            Ok(_) => Ok(ExitCode::SUCCESS),
            Err(e) if matches!(e.downcast_ref::<BackupError>(), Some(BackupError::NoServers)) => {
                tracing::error!("No servers configured, nothing to back up");
                Ok(ExitCode::from(1))
            }
            Err(e) => Err(e),
        };
    }

    let crontab = Crontab;

    // Execute command
    match cli.command {
        None => {
            let mut prompter = Prompter::stdio();
            cli::menu::run(&ctx, &crontab, &mut prompter)?;
        }
        Some(Commands::Add {
            name,
            host,
            port,
            user,
            key,
            app_path,
            db_container,
            chat_id,
        }) => {
            let options = AddOptions {
                name,
                host,
                port,
                user,
                key,
                app_path,
                db_container,
                chat_id,
            };
            let mut prompter = Prompter::stdio();
            let record = cli::add::complete_record(options, &mut prompter)?;
            cli::add::execute(record, &ctx.store)?;
        }
        Some(Commands::List) => {
            cli::list::execute(&ctx.store)?;
        }
        Some(Commands::Delete { name, yes }) => {
            let mut prompter = Prompter::stdio();
            cli::delete::execute(&name, yes, &ctx.store, &mut prompter)?;
        }
        Some(Commands::Backup { name }) => {
            cli::backup::execute(&name, &ctx)?;
        }
        Some(Commands::Schedule { choice, remove }) => match choice {
            Some(choice) => cli::schedule::execute(&choice, remove, &ctx, &crontab)?,
            None if remove => cli::schedule::execute("", true, &ctx, &crontab)?,
            None => {
                let mut prompter = Prompter::stdio();
                cli::schedule::prompt(&ctx, &crontab, &mut prompter)?;
            }
        },
        Some(Commands::Status) => {
            cli::status::execute(&ctx, &crontab)?;
        }
        Some(Commands::ImportLegacy { file }) => {
            cli::import::execute(&file, &ctx.store)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
