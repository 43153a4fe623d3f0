use super::prompt::Prompter;
use crate::{
    server::{Auth, ServerRecord, ServerRegistry, DEFAULT_SSH_PORT, DEFAULT_SSH_USER},
    state::ConfigStore,
};
use anyhow::Result;
use std::io::{BufRead, Write};

/// Values given on the command line. Secrets left out are prompted for.
#[derive(Debug, Default)]
pub struct AddOptions {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key: Option<String>,
    pub app_path: String,
    pub db_container: String,
    pub chat_id: String,
}

pub fn execute(record: ServerRecord, store: &ConfigStore) -> Result<()> {
    tracing::info!("Adding server: {}", record.name);

    let registry = ServerRegistry::new(store);
    let name = record.name.clone();
    let host = record.host.clone();
    let auth = record.auth.describe();
    registry.add(record)?;

    println!("✓ Added server '{}'", name);
    println!("  Host: {}", host);
    println!("  Auth: {}", auth);

    Ok(())
}

/// Fill in the secrets `options` cannot carry.
pub fn complete_record<R: BufRead, W: Write>(
    options: AddOptions,
    prompter: &mut Prompter<R, W>,
) -> Result<ServerRecord> {
    let auth = match options.key {
        Some(key) => Auth::from_inputs(None, Some(&key)),
        None => Auth::from_inputs(Some(&prompter.ask_secret("SSH password")?), None),
    };

    let mut record = ServerRecord::new(options.name, options.host);
    record.port = options.port;
    record.user = options.user;
    record.auth = auth;
    record.app_path = options.app_path;
    record.db_container = options.db_container;
    record.db_root_password = prompter.ask_secret("Database root password")?;
    record.bot_token = prompter.ask_secret("Telegram bot token")?;
    record.chat_id = options.chat_id;
    Ok(record)
}

/// Ask for every field.
pub fn prompt_record<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<ServerRecord> {
    let name = prompter.ask("Server name")?;
    if name.is_empty() {
        anyhow::bail!("Server name cannot be empty");
    }
    let host = prompter.ask("Host (IP or domain)")?;

    let port_str = prompter.ask_default("SSH port", &DEFAULT_SSH_PORT.to_string())?;
    let port: u16 = port_str
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid SSH port '{}'", port_str))?;
    let user = prompter.ask_default("SSH user", DEFAULT_SSH_USER)?;

    let key = prompter.ask("SSH private key path (leave blank to use a password)")?;
    let auth = if key.is_empty() {
        let password = prompter.ask_secret("SSH password")?;
        Auth::from_inputs(Some(&password), None)
    } else {
        Auth::from_inputs(None, Some(&key))
    };
    if auth == Auth::None {
        tracing::warn!(server = %name, "No SSH key or password given");
    }

    let mut record = ServerRecord::new(name, host);
    record.port = port;
    record.user = user;
    record.auth = auth;
    record.app_path = prompter.ask("Application directory on the server")?;
    record.db_container = prompter.ask("Database container name")?;
    record.db_root_password = prompter.ask_secret("Database root password")?;
    record.bot_token = prompter.ask_secret("Telegram bot token")?;
    record.chat_id = prompter.ask("Telegram chat id")?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_prompt_record_with_key() {
        let input = "edge1\n198.51.100.7\n\n\n/home/u/.ssh/id_ed25519\n/srv/app\nmysql\nrootpw\n123:abc\n42\n";
        let mut prompter = Prompter::new(input.as_bytes(), Vec::new());

        let record = prompt_record(&mut prompter).unwrap();

        assert_eq!(record.name, "edge1");
        assert_eq!(record.host, "198.51.100.7");
        assert_eq!(record.port, 22);
        assert_eq!(record.user, "root");
        assert_eq!(record.key_path(), Some(Path::new("/home/u/.ssh/id_ed25519")));
        assert_eq!(record.password(), "");
        assert_eq!(record.app_path, "/srv/app");
        assert_eq!(record.db_container, "mysql");
        assert_eq!(record.db_root_password, "rootpw");
        assert_eq!(record.bot_token, "123:abc");
        assert_eq!(record.chat_id, "42");
    }

    #[test]
    fn test_prompt_record_with_password() {
        let input = "web\n203.0.113.5\n2222\ndeploy\n\nhunter2\n/var/www\ndb\npw\ntok\n1\n";
        let mut prompter = Prompter::new(input.as_bytes(), Vec::new());

        let record = prompt_record(&mut prompter).unwrap();

        assert_eq!(record.port, 2222);
        assert_eq!(record.user, "deploy");
        assert_eq!(record.password(), "hunter2");
        assert!(record.key_path().is_none());
    }

    #[test]
    fn test_prompt_record_bad_port() {
        let input = "web\n203.0.113.5\nssh\n";
        let mut prompter = Prompter::new(input.as_bytes(), Vec::new());

        assert!(prompt_record(&mut prompter).is_err());
    }

    #[test]
    fn test_complete_record_prompts_for_secrets() {
        let options = AddOptions {
            name: "web".into(),
            host: "203.0.113.5".into(),
            port: 22,
            user: "root".into(),
            key: None,
            app_path: "/srv/app".into(),
            db_container: "db".into(),
            chat_id: "7".into(),
        };
        let mut prompter = Prompter::new("sshpw\ndbpw\ntoken\n".as_bytes(), Vec::new());

        let record = complete_record(options, &mut prompter).unwrap();

        assert_eq!(record.password(), "sshpw");
        assert_eq!(record.db_root_password, "dbpw");
        assert_eq!(record.bot_token, "token");
    }
}
