//! Reader for the flat shell-variable config written by the old backup script.
//!
//! Two line shapes are recognised:
//!
//! ```text
//! SERVERS[web1]="203.0.113.5|22|root|password||/var/www/app|mysql|rootpw|123:abc|-1001"
//! LAST_BACKUP_web1="20260314_150926"
//! ```
//!
//! Blank lines, `#` comments and anything else are skipped.

use super::ConfigState;
use crate::server::{validate_name, Auth, ServerRecord, DEFAULT_SSH_PORT, DEFAULT_SSH_USER};
use chrono::{Local, NaiveDateTime, TimeZone};

const SERVERS_PREFIX: &str = "SERVERS[";
const LAST_BACKUP_PREFIX: &str = "LAST_BACKUP_";
const RECORD_FIELDS: usize = 10;
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn parse(content: &str) -> ConfigState {
    let mut state = ConfigState::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix(SERVERS_PREFIX) {
            let Some((name, value)) = rest.split_once("]=") else {
                continue;
            };
            if let Err(e) = validate_name(name) {
                tracing::warn!(server = %name, error = %e, "Skipping legacy record");
                continue;
            }
            match parse_record(name, unquote(value)) {
                Some(record) => {
                    // Later assignments override earlier ones, as in the shell
                    state.servers.retain(|s| s.name != record.name);
                    state.servers.push(record);
                }
                None => tracing::debug!(server = %name, "Skipping malformed legacy record"),
            }
        } else if let Some(rest) = line.strip_prefix(LAST_BACKUP_PREFIX) {
            let Some((name, value)) = rest.split_once('=') else {
                continue;
            };
            if validate_name(name).is_err() {
                continue;
            }
            let parsed = NaiveDateTime::parse_from_str(unquote(value), TIMESTAMP_FORMAT)
                .ok()
                .and_then(|naive| Local.from_local_datetime(&naive).earliest());
            if let Some(timestamp) = parsed {
                state.last_backup.insert(name.to_string(), timestamp);
            }
        }
    }

    state
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn parse_record(name: &str, value: &str) -> Option<ServerRecord> {
    let fields: Vec<&str> = value.split('|').collect();
    if fields.len() != RECORD_FIELDS {
        return None;
    }

    let port = match fields[1].trim() {
        "" => DEFAULT_SSH_PORT,
        p => p.parse().ok()?,
    };
    let user = match fields[2].trim() {
        "" => DEFAULT_SSH_USER.to_string(),
        u => u.to_string(),
    };

    Some(ServerRecord {
        name: name.to_string(),
        host: fields[0].to_string(),
        port,
        user,
        auth: Auth::from_inputs(Some(fields[3]), Some(fields[4])),
        app_path: fields[5].to_string(),
        db_container: fields[6].to_string(),
        db_root_password: fields[7].to_string(),
        bot_token: fields[8].to_string(),
        chat_id: fields[9].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const SAMPLE: &str = r#"
# Backup configuration
declare -A SERVERS
SERVERS[web1]="203.0.113.5|2222|deploy|s3cret||/var/www/app|mysql|rootpw|123:abc|-1001"
SERVERS[edge1]="198.51.100.7|||||/srv/site|db|pw|456:def|42"
LAST_BACKUP_web1="20260314_150926"
some garbage line
"#;

    #[test]
    fn test_parse_records_and_timestamps() {
        let state = parse(SAMPLE);
        assert_eq!(state.servers.len(), 2);

        let web = state.server("web1").unwrap();
        assert_eq!(web.host, "203.0.113.5");
        assert_eq!(web.port, 2222);
        assert_eq!(web.user, "deploy");
        assert_eq!(web.password(), "s3cret");
        assert_eq!(web.app_path, "/var/www/app");
        assert_eq!(web.chat_id, "-1001");

        let ts = state.last_backup.get("web1").unwrap();
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (15, 9, 26));
        assert!(!state.last_backup.contains_key("edge1"));
    }

    #[test]
    fn test_empty_fields_fall_back_to_defaults() {
        let state = parse(SAMPLE);
        let edge = state.server("edge1").unwrap();
        assert_eq!(edge.port, 22);
        assert_eq!(edge.user, "root");
        assert_eq!(edge.auth, Auth::None);
    }

    #[test]
    fn test_record_with_embedded_pipe_is_dropped() {
        let state = parse(r#"SERVERS[bad]="h|22|root|pa|ss||/a|c|p|t|1""#);
        assert!(state.servers.is_empty());
    }

    #[test]
    fn test_single_quotes_and_bad_timestamp() {
        let state = parse(
            "SERVERS[a]='h|22|root||/k|/app|c|p|t|1'\nLAST_BACKUP_a=\"yesterday\"\n",
        );
        assert_eq!(state.server("a").unwrap().key_path().unwrap().to_str(), Some("/k"));
        assert!(state.last_backup.is_empty());
    }

    #[test]
    fn test_names_that_leave_the_backup_root_are_skipped() {
        let state = parse(concat!(
            "SERVERS[../../escape]=\"h|22|root|||/app|c|p|t|1\"\n",
            "SERVERS[a/b]=\"h|22|root|||/app|c|p|t|1\"\n",
            "SERVERS[..]=\"h|22|root|||/app|c|p|t|1\"\n",
            "SERVERS[ok]=\"h|22|root|||/app|c|p|t|1\"\n",
            "LAST_BACKUP_../x=\"20260314_150926\"\n",
        ));
        let names: Vec<&str> = state.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ok"]);
        assert!(state.last_backup.is_empty());
    }
}
