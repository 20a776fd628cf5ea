//! DNS provider implementations.

mod alidns;
mod cloudflare;
mod dnspod;
mod duckdns;
mod he;
mod noip;

#[cfg(test)]
mod tests;

pub use alidns::AliDnsProvider;
pub use cloudflare::{Auth as CloudflareAuth, CloudflareProvider};
pub use dnspod::DnsPodProvider;
pub use duckdns::DuckDnsProvider;
pub use he::HeProvider;
pub use noip::NoIpProvider;

use crate::config::{resolve_env, Config, ProviderConfig};
use crate::error::{DdnsError, Result};
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the currently published value of a record is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLookup {
    /// The provider lists records with their values.
    Listing,
    /// Resolve the hostname; the record id still comes from the listing.
    ResolveThenList,
    /// Resolve the hostname; updates are addressed by hostname alone.
    Resolve,
}

/// A DNS record as stored by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Provider-side record identifier.
    pub id: String,
    /// Fully qualified name.
    pub name: String,
    /// Published address.
    pub value: String,
    /// "A" or "AAAA".
    pub record_type: String,
    /// Zone the record belongs to.
    pub zone: String,
    /// Provider-side zone identifier, when the API has one.
    pub zone_id: Option<String>,
}

impl Record {
    /// Record addressed by hostname only, for providers without a listing API.
    pub fn by_hostname(zone: &str, fqdn: &str, value: &str, record_type: &str) -> Self {
        Self {
            id: fqdn.to_string(),
            name: fqdn.to_string(),
            value: value.to_string(),
            record_type: record_type.to_string(),
            zone: zone.to_string(),
            zone_id: None,
        }
    }

    /// Label relative to the zone, `@` for the apex.
    pub fn label(&self) -> &str {
        if self.name.eq_ignore_ascii_case(&self.zone) {
            return "@";
        }
        self.name
            .strip_suffix(&self.zone)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(&self.name)
    }
}

/// Trait for DNS providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// How the published value is obtained for this provider.
    fn lookup(&self) -> RecordLookup;

    /// List the address records of a zone.
    async fn list_records(&self, zone: &str) -> Result<Vec<Record>>;

    /// Find the record for `fqdn`. Defaults to scanning the zone listing.
    async fn find_record(&self, zone: &str, fqdn: &str) -> Result<Option<Record>> {
        let records = self.list_records(zone).await?;
        Ok(records
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(fqdn)))
    }

    /// Point a record at a new IP.
    async fn update_record(&self, record: &Record, ip: &str) -> Result<()>;
}

/// Create the configured provider.
pub fn create_provider(config: &Config) -> Result<Arc<dyn DnsProvider>> {
    let client = http::build_client(config, config.proxy.use_for_provider)?;
    let record_type = config.ip_type.record_type();

    let provider: Arc<dyn DnsProvider> = match &config.provider {
        ProviderConfig::Cloudflare {
            api_token,
            email,
            api_key,
        } => {
            let auth = if api_token.is_empty() {
                cloudflare::Auth::Key {
                    email: resolve_env(email),
                    key: resolve_env(api_key),
                }
            } else {
                cloudflare::Auth::Token(resolve_env(api_token))
            };
            Arc::new(CloudflareProvider::new(client, auth, record_type))
        }
        ProviderConfig::AliDns {
            access_key_id,
            access_key_secret,
        } => Arc::new(AliDnsProvider::new(
            client,
            resolve_env(access_key_id),
            resolve_env(access_key_secret),
            record_type,
        )),
        ProviderConfig::DnsPod { login_token } => Arc::new(DnsPodProvider::new(
            client,
            resolve_env(login_token),
            record_type,
        )),
        ProviderConfig::He { password } => {
            Arc::new(HeProvider::new(client, resolve_env(password), record_type))
        }
        ProviderConfig::DuckDns { token } => {
            Arc::new(DuckDnsProvider::new(client, resolve_env(token), config.ip_type))
        }
        ProviderConfig::NoIp { username, password } => Arc::new(NoIpProvider::new(
            client,
            resolve_env(username),
            resolve_env(password),
            record_type,
        )),
    };

    tracing::info!("Using DNS provider {}", provider.name());
    Ok(provider)
}

/// Check a dyndns2-style reply ("good <ip>", "nochg <ip>", or an error code).
pub(crate) fn check_dyndns_reply(provider: &str, body: &str) -> Result<()> {
    let reply = body.trim();
    if reply.starts_with("good") || reply.starts_with("nochg") {
        Ok(())
    } else if reply.is_empty() {
        Err(DdnsError::provider(provider, "empty response"))
    } else {
        Err(DdnsError::provider(provider, reply))
    }
}
