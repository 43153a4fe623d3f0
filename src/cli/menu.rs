use super::{add, delete, prompt::Prompter, schedule, status, AppContext};
use crate::{schedule::JobTable, BackupError};
use anyhow::Result;
use std::io::{BufRead, Write};

const MENU: &str = "
=== Remote Backup ===
  1) Add server
  2) Manage servers
  3) Setup schedule
  4) View status
  5) Exit";

/// Interactive loop. Errors are logged and the menu comes back; only "Exit"
/// or closed input ends it.
pub fn run<R: BufRead, W: Write>(
    ctx: &AppContext,
    table: &dyn JobTable,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    loop {
        prompter.say(MENU)?;

        let choice = match prompter.ask("Select an option") {
            Ok(choice) => choice,
            Err(_) => return Ok(()),
        };

        let result = match choice.as_str() {
            "1" => add::prompt_record(prompter).and_then(|record| add::execute(record, &ctx.store)),
            "2" => delete::manage(&ctx.store, prompter),
            "3" => schedule::prompt(ctx, table, prompter),
            "4" => status::execute(ctx, table),
            "5" | "q" | "exit" => return Ok(()),
            other => Err(BackupError::InvalidChoice(other.to_string()).into()),
        };

        if let Err(e) = result {
            tracing::error!("{:#}", e);
        }
    }
}
