use crate::state::{ConfigState, ConfigStore};
use anyhow::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

pub fn execute(store: &ConfigStore) -> Result<()> {
    let state = store.load()?;
    println!("{}", render(&state));
    Ok(())
}

/// Numbered table of servers, in registry order. Secrets are never shown.
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
        .set_header(vec!["#", "NAME", "HOST", "USER", "PORT", "AUTH", "APP PATH", "CONTAINER"]);

    for (i, server) in servers.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            server.name.clone(),
            server.host.clone(),
            server.user.clone(),
            server.port.to_string(),
            server.auth.describe().to_string(),
            server.app_path.clone(),
            server.db_container.clone(),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{Auth, ServerRecord};

    #[test]
    fn test_render_hides_secrets() {
        let mut state = ConfigState::default();
        let mut record = ServerRecord::new("web", "203.0.113.5");
        record.auth = Auth::Password {
            password: "hunter2".into(),
        };
        record.db_root_password = "rootpw".into();
        record.bot_token = "123:abc".into();
        state.servers.push(record);

        let out = render(&state);
        assert!(out.contains("web"));
        assert!(out.contains("password"));
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("rootpw"));
        assert!(!out.contains("123:abc"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&ConfigState::default()), "No servers configured.");
    }
}
