use super::{config::validate_name, ServerRecord};
use crate::{state::ConfigStore, BackupError, Result};

/// What a "pick a server" prompt resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Server(String),
    Back,
}

/// Named server records on top of the config store.
pub struct ServerRegistry<'a> {
    store: &'a ConfigStore,
}

impl<'a> ServerRegistry<'a> {
    pub fn new(store: &'a ConfigStore) -> Self {
        Self { store }
    }

    pub fn add(&self, record: ServerRecord) -> Result<()> {
        validate_name(&record.name)?;

        let name = record.name.clone();
        self.store.update(|state| {
            if state.contains(&record.name) {
                return Err(BackupError::DuplicateServer(record.name.clone()));
            }
            state.servers.push(record);
            Ok(())
        })?;

        tracing::info!(server = %name, "Server added");
        Ok(())
    }

    /// Server names in ascending order. This order is also the index space
    /// used by [`ServerRegistry::resolve_index`].
    pub fn list(&self) -> Result<Vec<String>> {
        let state = self.store.load()?;
        let mut names: Vec<String> = state.servers.into_iter().map(|s| s.name).collect();
        names.sort();
        Ok(names)
    }

    pub fn get(&self, name: &str) -> Result<ServerRecord> {
        self.store
            .load()?
            .server(name)
            .cloned()
            .ok_or_else(|| BackupError::UnknownServer(name.to_string()))
    }

    /// Map a 1-based index (or `b`/`back`) against the current listing.
    pub fn resolve_index(&self, input: &str) -> Result<Selection> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("b") || input.eq_ignore_ascii_case("back") {
            return Ok(Selection::Back);
        }

        let names = self.list()?;
        input
            .parse::<usize>()
            .ok()
            .filter(|&i| i >= 1 && i <= names.len())
            .map(|i| Selection::Server(names[i - 1].clone()))
            .ok_or_else(|| BackupError::InvalidIndex(input.to_string()))
    }

    /// Remove a server and its last-backup timestamp.
    pub fn delete(&self, name: &str) -> Result<()> {
        self.store.update(|state| {
            let before = state.servers.len();
            state.servers.retain(|s| s.name != name);
            if state.servers.len() == before {
                return Err(BackupError::UnknownServer(name.to_string()));
            }
            state.last_backup.remove(name);
            Ok(())
        })?;

        tracing::info!(server = %name, "Server deleted");
        Ok(())
    }
}
