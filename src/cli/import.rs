use crate::state::{legacy, ConfigStore};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Merge servers from an old shell-style config. Existing names win.
pub fn execute(file: &Path, store: &ConfigStore) -> Result<()> {
    tracing::info!("Importing legacy config: {}", file.display());

    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let imported = legacy::parse(&content);

    if imported.servers.is_empty() {
        println!("No servers found in {}", file.display());
        return Ok(());
    }

    let (added, skipped) = store.update(|state| {
        let mut added = vec![];
        let mut skipped = vec![];
        for record in imported.servers {
            if state.contains(&record.name) {
                tracing::warn!(server = %record.name, "Server already exists, skipping");
                skipped.push(record.name);
                continue;
            }
            if let Some(ts) = imported.last_backup.get(&record.name) {
                state.last_backup.insert(record.name.clone(), *ts);
            }
            added.push(record.name.clone());
            state.servers.push(record);
        }
        Ok((added, skipped))
    })?;

    println!("✓ Imported {} server(s)", added.len());
    for name in &added {
        println!("  + {}", name);
    }
    for name in &skipped {
        println!("  - {} (already exists)", name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ServerRecord, ServerRegistry};
    use tempfile::TempDir;

    #[test]
    fn test_import_skips_existing() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("servers.json"));
        ServerRegistry::new(&store)
            .add(ServerRecord::new("web1", "10.0.0.1"))
            .unwrap();

        let legacy_file = temp.path().join("backup.conf");
        fs::write(
            &legacy_file,
            "SERVERS[web1]=\"203.0.113.5|22|root|pw||/app|db|x|t|1\"\n\
             SERVERS[web2]=\"203.0.113.6|22|root|pw||/app|db|x|t|1\"\n\
             LAST_BACKUP_web2=\"20260101_010203\"\n",
        )
        .unwrap();

        execute(&legacy_file, &store).unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.servers.len(), 2);
        assert_eq!(state.server("web1").unwrap().host, "10.0.0.1");
        assert_eq!(state.server("web2").unwrap().host, "203.0.113.6");
        assert!(state.last_backup.contains_key("web2"));
    }
}
