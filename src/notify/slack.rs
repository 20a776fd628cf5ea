//! Slack notifications via `chat.postMessage`.

use super::{render, NotifySink};
use crate::config::{resolve_env, Config};
use crate::error::{DdnsError, Result};
use crate::http;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://slack.com";

const DEFAULT_TEMPLATE: &str =
    "_Your IP address is changed to_\n\n*{{current_ip}}*\n\nDomain *{{domain}}* is updated";

pub struct SlackSink {
    client: reqwest::Client,
    token: String,
    channel: String,
    template: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: String,
}

impl SlackSink {
    pub fn from_config(config: &Config) -> Result<Self> {
        let slack = &config.notify.slack;
        Ok(Self {
            client: http::build_client(config, slack.use_proxy)?,
            token: resolve_env(&slack.bot_api_token),
            channel: slack.channel.clone(),
            template: slack
                .msg_template
                .clone()
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl NotifySink for SlackSink {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, domain: &str, ip: &str) -> Result<()> {
        let text = render(&self.template, domain, ip, false)?;

        let response: ApiResponse = self
            .client
            .post(format!("{}/api/chat.postMessage", self.base_url))
            .form(&[
                ("token", self.token.as_str()),
                ("channel", self.channel.as_str()),
                ("text", text.as_str()),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| DdnsError::notify("slack", format!("failed to parse response: {}", e)))?;

        if !response.ok {
            return Err(DdnsError::notify("slack", response.error));
        }
        Ok(())
    }
}
