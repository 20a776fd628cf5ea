//! Alibaba Cloud DNS provider.
//!
//! The RPC-style API takes every parameter in the query string. Requests are
//! signed with HMAC-SHA1 over the sorted, RFC 3986 encoded parameter list,
//! keyed with the access key secret followed by `&`.

use super::{DnsProvider, Record, RecordLookup};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha1::Sha1;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_BASE_URL: &str = "https://alidns.aliyuncs.com";

const API_VERSION: &str = "2015-01-09";

/// Everything but the RFC 3986 unreserved set.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(super) fn encode(value: &str) -> String {
    utf8_percent_encode(value, RFC3986).to_string()
}

/// Base64 HMAC-SHA1 of `GET&%2F&<encoded canonical query>`.
pub(super) fn sign(secret: &str, canonical: &str) -> Result<String> {
    let string_to_sign = format!("GET&{}&{}", encode("/"), encode(canonical));

    let mut mac = Hmac::<Sha1>::new_from_slice(format!("{}&", secret).as_bytes())
        .map_err(|e| DdnsError::provider("alidns", e.to_string()))?;
    mac.update(string_to_sign.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// AliDNS provider.
pub struct AliDnsProvider {
    client: reqwest::Client,
    access_key_id: String,
    access_key_secret: String,
    record_type: &'static str,
    base_url: String,
    nonce: AtomicU64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordsResponse {
    #[serde(default)]
    domain_records: RecordSet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordSet {
    #[serde(default)]
    record: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordEntry {
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    value: String,
    #[serde(rename = "Type")]
    record_type: String,
    domain_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl RecordEntry {
    fn into_record(self) -> Record {
        let name = if self.rr == "@" {
            self.domain_name.clone()
        } else {
            format!("{}.{}", self.rr, self.domain_name)
        };
        Record {
            id: self.record_id,
            name,
            value: self.value,
            record_type: self.record_type,
            zone: self.domain_name,
            zone_id: None,
        }
    }
}

impl AliDnsProvider {
    /// Create a new AliDNS provider.
    pub fn new(
        client: reqwest::Client,
        access_key_id: String,
        access_key_secret: String,
        record_type: &'static str,
    ) -> Self {
        Self::with_base_url(
            client,
            access_key_id,
            access_key_secret,
            record_type,
            DEFAULT_BASE_URL.to_string(),
        )
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        client: reqwest::Client,
        access_key_id: String,
        access_key_secret: String,
        record_type: &'static str,
        base_url: String,
    ) -> Self {
        Self {
            client,
            access_key_id,
            access_key_secret,
            record_type,
            base_url: base_url.trim_end_matches('/').to_string(),
            nonce: AtomicU64::new(0),
        }
    }

    /// Build the signed query string for an action.
    fn signed_query(
        &self,
        action: &str,
        params: &[(&str, &str)],
        timestamp: &str,
        nonce: &str,
    ) -> Result<String> {
        let common = [
            ("Action", action),
            ("Format", "JSON"),
            ("Version", API_VERSION),
            ("AccessKeyId", self.access_key_id.as_str()),
            ("SignatureMethod", "HMAC-SHA1"),
            ("SignatureVersion", "1.0"),
            ("SignatureNonce", nonce),
            ("Timestamp", timestamp),
        ];

        let sorted: BTreeMap<String, String> = common
            .iter()
            .chain(params.iter())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();

        let canonical = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let signature = sign(&self.access_key_secret, &canonical)?;
        Ok(format!("{}&Signature={}", canonical, encode(&signature)))
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, params: &[(&str, &str)]) -> Result<T> {
        let now = Utc::now();
        let nonce = format!(
            "{}{:04}",
            now.timestamp_nanos_opt().unwrap_or_default(),
            self.nonce.fetch_add(1, Ordering::Relaxed) % 10_000
        );
        let timestamp = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let query = self.signed_query(action, params, &timestamp, &nonce)?;

        let response = self
            .client
            .get(format!("{}/?{}", self.base_url, query))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|_| format!("HTTP {}", status));
            return Err(DdnsError::provider(
                "alidns",
                format!("{} failed with {}", action, reason),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            DdnsError::provider("alidns", format!("{}: failed to parse response: {}", action, e))
        })
    }
}

#[async_trait]
impl DnsProvider for AliDnsProvider {
    fn name(&self) -> &'static str {
        "alidns"
    }

    fn lookup(&self) -> RecordLookup {
        RecordLookup::ResolveThenList
    }

    async fn list_records(&self, zone: &str) -> Result<Vec<Record>> {
        let response: RecordsResponse = self
            .call(
                "DescribeDomainRecords",
                &[
                    ("DomainName", zone),
                    ("TypeKeyWord", self.record_type),
                    ("PageSize", "500"),
                ],
            )
            .await?;

        Ok(response
            .domain_records
            .record
            .into_iter()
            .filter(|r| r.record_type == self.record_type)
            .map(RecordEntry::into_record)
            .collect())
    }

    async fn find_record(&self, _zone: &str, fqdn: &str) -> Result<Option<Record>> {
        let response: RecordsResponse = self
            .call(
                "DescribeSubDomainRecords",
                &[("SubDomain", fqdn), ("Type", self.record_type)],
            )
            .await?;

        Ok(response
            .domain_records
            .record
            .into_iter()
            .next()
            .map(RecordEntry::into_record))
    }

    async fn update_record(&self, record: &Record, ip: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "UpdateDomainRecord",
                &[
                    ("RecordId", record.id.as_str()),
                    ("RR", record.label()),
                    ("Type", record.record_type.as_str()),
                    ("Value", ip),
                ],
            )
            .await?;

        tracing::info!("New IP {} set for {}", ip, record.name);
        Ok(())
    }
}
