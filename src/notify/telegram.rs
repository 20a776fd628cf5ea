//! Telegram bot notifications.

use super::{render, NotifySink};
use crate::config::{resolve_env, Config};
use crate::error::{DdnsError, Result};
use crate::http;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

const DEFAULT_TEMPLATE: &str =
    "_Your IP address is changed to_\n\n*{{current_ip}}*\n\nDomain *{{domain}}* is updated";

/// Sends a Markdown message through a bot.
pub struct TelegramSink {
    client: reqwest::Client,
    bot_api_key: String,
    chat_id: String,
    template: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: String,
}

impl TelegramSink {
    pub fn from_config(config: &Config) -> Result<Self> {
        let telegram = &config.notify.telegram;
        Ok(Self {
            client: http::build_client(config, telegram.use_proxy)?,
            bot_api_key: resolve_env(&telegram.bot_api_key),
            chat_id: telegram.chat_id.clone(),
            template: telegram
                .msg_template
                .clone()
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point at a different API server (for testing).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl NotifySink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, domain: &str, ip: &str) -> Result<()> {
        let text = render(&self.template, domain, ip, false)?;
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_api_key);

        let response: ApiResponse = self
            .client
            .get(&url)
            .query(&[
                ("chat_id", self.chat_id.as_str()),
                ("parse_mode", "Markdown"),
                ("text", text.as_str()),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| DdnsError::notify("telegram", format!("failed to parse response: {}", e)))?;

        if !response.ok {
            return Err(DdnsError::notify("telegram", response.description));
        }
        Ok(())
    }
}
