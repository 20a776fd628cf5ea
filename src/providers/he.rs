//! Hurricane Electric dynamic DNS provider.

use super::{check_dyndns_reply, DnsProvider, Record, RecordLookup};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://dyn.dns.he.net";

/// Hurricane Electric provider. Records are addressed by hostname.
pub struct HeProvider {
    client: reqwest::Client,
    password: String,
    record_type: &'static str,
    base_url: String,
}

impl HeProvider {
    /// Create a new HE provider.
    pub fn new(client: reqwest::Client, password: String, record_type: &'static str) -> Self {
        Self::with_base_url(client, password, record_type, DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        client: reqwest::Client,
        password: String,
        record_type: &'static str,
        base_url: String,
    ) -> Self {
        Self {
            client,
            password,
            record_type,
            base_url,
        }
    }
}

#[async_trait]
impl DnsProvider for HeProvider {
    fn name(&self) -> &'static str {
        "he"
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
        let form = [
            ("hostname", record.name.as_str()),
            ("password", self.password.as_str()),
            ("myip", ip),
        ];

        let response = self
            .client
            .post(format!("{}/nic/update", self.base_url))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(DdnsError::provider(
                self.name(),
                format!("HTTP {}: {}", status, text.trim()),
            ));
        }

        check_dyndns_reply(self.name(), &text)?;
        tracing::info!(
            "Update {} record {} succeeded: {}",
            self.record_type,
            record.name,
            text.trim()
        );
        Ok(())
    }
}
