//! No-IP provider (dyndns2 protocol).

use super::{check_dyndns_reply, DnsProvider, Record, RecordLookup};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://dynupdate.no-ip.com";

/// No-IP provider.
pub struct NoIpProvider {
    client: reqwest::Client,
    username: String,
    password: String,
    record_type: &'static str,
    base_url: String,
}

impl NoIpProvider {
    /// Create a new No-IP provider.
    pub fn new(
        client: reqwest::Client,
        username: String,
        password: String,
        record_type: &'static str,
    ) -> Self {
        Self::with_base_url(
            client,
            username,
            password,
            record_type,
            DEFAULT_BASE_URL.to_string(),
        )
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        client: reqwest::Client,
        username: String,
        password: String,
        record_type: &'static str,
        base_url: String,
    ) -> Self {
        Self {
            client,
            username,
            password,
            record_type,
            base_url,
        }
    }
}

#[async_trait]
impl DnsProvider for NoIpProvider {
    fn name(&self) -> &'static str {
        "noip"
    }

    fn lookup(&self) -> RecordLookup {
        RecordLookup::Resolve
    }

    async fn list_records(&self, _zone: &str) -> Result<Vec<Record>> {
        Err(DdnsError::Unsupported {
            provider: self.name().to_string(),
            operation: "listing records",
        })
    }

    async fn update_record(&self, record: &Record, ip: &str) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/nic/update", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("hostname", record.name.as_str()), ("myip", ip)])
            .send()
            .await?;
        let text = response.text().await?;

        check_dyndns_reply(self.name(), &text)?;
        tracing::info!(
            "No-IP {} record {} updated: {}",
            self.record_type,
            record.name,
            text.trim()
        );
        Ok(())
    }
}
