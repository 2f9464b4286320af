//! Telegram Bot API client for posting per-country report messages.

use crate::config::TelegramConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use wreq::Client;

/// Minimal Bot API client: send a message, edit an existing one.
///
/// The monitor only ever posts new messages; `edit` exists because message
/// ids are persisted for it, but it is deliberately not wired into the
/// monitor loop.
pub struct TelegramClient {
    client: Client,
    token: String,
    chat_id: String,
    topic_id: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<MessagePayload>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    message_id: i64,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        Self::with_base_url(config, "https://api.telegram.org".to_string())
    }

    /// Custom API base URL hook for tests.
    pub fn with_base_url(config: &TelegramConfig, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            client,
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
            topic_id: config.topic_id.clone(),
            base_url,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call(&self, method: &str, mut params: Vec<(&'static str, String)>) -> Result<ApiResponse> {
        if let Some(topic_id) = &self.topic_id {
            params.push(("message_thread_id", topic_id.clone()));
        }

        let response = self
            .client
            .post(self.method_url(method))
            .form(&params)
            .send()
            .await
            .with_context(|| format!("Telegram {} request failed", method))?;

        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .with_context(|| format!("Malformed Telegram {} response (HTTP {})", method, status))?;

        if !body.ok {
            bail!(
                "Telegram {} rejected: {}",
                method,
                body.description.as_deref().unwrap_or("no description")
            );
        }

        Ok(body)
    }

    /// Posts a new message and returns its id.
    pub async fn send(&self, text: &str) -> Result<i64> {
        debug!("Sending Telegram message ({} chars)", text.chars().count());

        let params = vec![
            ("chat_id", self.chat_id.clone()),
            ("text", text.to_string()),
            ("parse_mode", "HTML".to_string()),
        ];

        let body = self.call("sendMessage", params).await?;
        body.result
            .map(|payload| payload.message_id)
            .context("Telegram response carried no message id")
    }

    /// Edits an existing message in place.
    pub async fn edit(&self, message_id: i64, text: &str) -> Result<bool> {
        debug!("Editing Telegram message {}", message_id);

        let params = vec![
            ("chat_id", self.chat_id.clone()),
            ("message_id", message_id.to_string()),
            ("text", text.to_string()),
            ("parse_mode", "HTML".to_string()),
        ];

        Ok(self.call("editMessageText", params).await?.ok)
    }
}

/// Wraps a rendered country table into the report message body.
pub fn format_message(country_name: &str, table: &str, update_time: &str) -> String {
    format!(
        "📱 <b>App Store Monitor</b>\n🌍 <b>{}</b>\n⏰ <b>{}</b>\n\n<pre>{}</pre>\n\n#AppStore #ASO #Monitor",
        country_name, update_time, table
    )
}
