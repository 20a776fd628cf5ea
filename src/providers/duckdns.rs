//! DuckDNS provider.

use super::{DnsProvider, Record, RecordLookup};
use crate::config::IpType;
use crate::error::{DdnsError, Result};
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://www.duckdns.org";

/// DuckDNS provider.
pub struct DuckDnsProvider {
    client: reqwest::Client,
    token: String,
    ip_type: IpType,
    base_url: String,
}

impl DuckDnsProvider {
    /// Create a new DuckDNS provider.
    pub fn new(client: reqwest::Client, token: String, ip_type: IpType) -> Self {
        Self::with_base_url(client, token, ip_type, DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        client: reqwest::Client,
        token: String,
        ip_type: IpType,
        base_url: String,
    ) -> Self {
        Self {
            client,
            token,
            ip_type,
            base_url,
        }
    }
}

/// DuckDNS wants the bare subdomain, not "name.duckdns.org".
fn duck_name(fqdn: &str) -> &str {
    fqdn.strip_suffix(".duckdns.org").unwrap_or(fqdn)
}

#[async_trait]
impl DnsProvider for DuckDnsProvider {
    fn name(&self) -> &'static str {
        "duckdns"
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
        let ip_param = match self.ip_type {
            IpType::V4 => "ip",
            IpType::V6 => "ipv6",
        };

        let response = self
            .client
            .get(format!("{}/update", self.base_url))
            .query(&[
                ("domains", duck_name(&record.name)),
                ("token", self.token.as_str()),
                (ip_param, ip),
            ])
            .send()
            .await?;
        let text = response.text().await?;

        if text.trim() == "OK" {
            tracing::info!("DuckDNS record {} set to {}", record.name, ip);
            Ok(())
        } else {
            Err(DdnsError::provider(
                self.name(),
                format!("DuckDNS returned: {}", text.trim()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duck_name() {
        assert_eq!(duck_name("myhost.duckdns.org"), "myhost");
        assert_eq!(duck_name("myhost"), "myhost");
    }
}
