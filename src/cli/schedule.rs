use super::{prompt::Prompter, AppContext};
use crate::schedule::{self, JobTable, ScheduleInterval};
use anyhow::Result;
use std::io::{BufRead, Write};

/// Install (or with `remove`, uninstall) the recurring `--all` run.
pub fn execute(
    choice: &str,
    remove: bool,
    ctx: &AppContext,
    table: &dyn JobTable,
) -> Result<()> {
    if remove {
        if schedule::remove(table, &ctx.exe)? {
            println!("✓ Backup schedule removed");
        } else {
            println!("No backup schedule installed.");
        }
        return Ok(());
    }

    let interval = ScheduleInterval::from_choice(choice)?;
    let line = schedule::install(table, &ctx.exe, &ctx.cron_log, interval)?;

    println!("✓ Backups scheduled: {}", interval.label());
    println!("  {}", line);
    Ok(())
}

/// Interactive variant: show the intervals, read a choice.
pub fn prompt<R: BufRead, W: Write>(
    ctx: &AppContext,
    table: &dyn JobTable,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    prompter.say("Backup interval:")?;
    for (i, interval) in ScheduleInterval::ALL.iter().enumerate() {
        prompter.say(format!("  {}) {}", i + 1, interval.label()))?;
    }

    let choice = prompter.ask("Choice")?;
    execute(&choice, false, ctx, table)
}
