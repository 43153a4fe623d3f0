use super::prompt::Prompter;
use crate::{
    server::{Selection, ServerRegistry},
    state::ConfigStore,
};
use anyhow::Result;
use std::io::{BufRead, Write};

pub fn execute<R: BufRead, W: Write>(
    name: &str,
    yes: bool,
    store: &ConfigStore,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let registry = ServerRegistry::new(store);

    // Fail on unknown names before asking anything
    registry.get(name)?;

    if !yes && !prompter.confirm(&format!("Delete server '{}'?", name))? {
        prompter.say("Cancelled.")?;
        return Ok(());
    }

    registry.delete(name)?;
    prompter.say(format!("✓ Deleted server '{}'", name))?;
    Ok(())
}

/// Numbered pick-and-delete used by the "Manage servers" menu entry.
pub fn manage<R: BufRead, W: Write>(store: &ConfigStore, prompter: &mut Prompter<R, W>) -> Result<()> {
    let registry = ServerRegistry::new(store);
    let names = registry.list()?;

    if names.is_empty() {
        prompter.say("No servers configured.")?;
        return Ok(());
    }

    prompter.say("Configured servers:")?;
    for (i, name) in names.iter().enumerate() {
        prompter.say(format!("  {}) {}", i + 1, name))?;
    }

    let input = prompter.ask("Server to delete (number, or 'b' to go back)")?;
    match registry.resolve_index(&input)? {
        Selection::Back => Ok(()),
        Selection::Server(name) => execute(&name, false, store, prompter),
    }
}
