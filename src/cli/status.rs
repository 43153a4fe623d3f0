use super::AppContext;
use crate::{
    schedule::{self, JobTable},
    state::ConfigState,
};
use anyhow::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

pub const NO_BACKUP_YET: &str = "no backup yet";

pub fn execute(ctx: &AppContext, table: &dyn JobTable) -> Result<()> {
    let state = ctx.store.load()?;
    println!("{}", render(&state));

    match schedule::current(table, &ctx.exe) {
        Ok(Some(line)) => println!("\nSchedule: {}", line),
        Ok(None) => println!("\nSchedule: not installed"),
        Err(e) => {
            tracing::debug!(error = %e, "Could not read crontab");
            println!("\nSchedule: unknown ({})", e);
        }
    }

    Ok(())
}

/// One row per server with its last backup time.
pub fn render(state: &ConfigState) -> String {
    if state.servers.is_empty() {
        return "No servers configured.".to_string();
    }

    let mut servers: Vec<_> = state.servers.iter().collect();
    servers.sort_by(|a, b| a.name.cmp(&b.name));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["NAME", "HOST", "LAST BACKUP"]);

    for server in servers {
        let last = state
            .last_backup
            .get(&server.name)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| NO_BACKUP_YET.to_string());
        table.add_row(vec![server.name.clone(), server.host.clone(), last]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerRecord;
    use chrono::{Local, TimeZone};

    #[test]
    fn test_render_status() {
        let mut state = ConfigState::default();
        state.servers.push(ServerRecord::new("alpha", "198.51.100.7"));
        state.servers.push(ServerRecord::new("beta", "198.51.100.8"));
        state.last_backup.insert(
            "alpha".to_string(),
            Local.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap(),
        );

        let out = render(&state);
        assert!(out.contains("2026-03-14 15:09:26"));
        assert!(out.contains(NO_BACKUP_YET));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&ConfigState::default()), "No servers configured.");
    }
}
