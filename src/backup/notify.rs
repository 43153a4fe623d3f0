use crate::{server::ServerRecord, BackupError, Result};
use reqwest::blocking::{multipart::Form, Client};
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot API refuses documents above 50 MB
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Delivers a finished archive somewhere the operator will see it.
pub trait Notifier {
    fn send_document(&self, server: &ServerRecord, document: &Path, caption: &str) -> Result<()>;
}

pub struct TelegramNotifier {
    client: Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new() -> Result<Self> {
        Self::with_api_base(TELEGRAM_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, bot_token: &str) -> String {
        format!("{}/bot{}/sendDocument", self.api_base, bot_token)
    }
}

impl Notifier for TelegramNotifier {
    fn send_document(&self, server: &ServerRecord, document: &Path, caption: &str) -> Result<()> {
        if server.bot_token.is_empty() || server.chat_id.is_empty() {
            return Err(BackupError::NotifyFailed(
                "bot token or chat id not configured".into(),
            ));
        }

        let size = std::fs::metadata(document)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(BackupError::NotifyFailed(format!(
                "archive is {} bytes, over the {} byte upload limit",
                size, MAX_UPLOAD_BYTES
            )));
        }

        let form = Form::new()
            .text("chat_id", server.chat_id.clone())
            .text("caption", caption.to_string())
            .file("document", document)?;

        // The URL carries the bot token, keep it out of errors
        let response = self
            .client
            .post(self.endpoint(&server.bot_token))
            .multipart(form)
            .send()
            .map_err(|e| BackupError::NotifyFailed(e.without_url().to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(BackupError::NotifyFailed(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        tracing::debug!(server = %server.name, "Document uploaded");
        Ok(())
    }
}
