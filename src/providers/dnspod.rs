//! DNSPod provider.

use super::{DnsProvider, Record, RecordLookup};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://dnsapi.cn";

/// Record line applied to modified records.
const DEFAULT_LINE: &str = "默认";

/// DNSPod provider.
pub struct DnsPodProvider {
    client: reqwest::Client,
    login_token: String,
    record_type: &'static str,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct DomainList {
    status: Status,
    #[serde(default)]
    domains: Vec<DomainEntry>,
}

#[derive(Debug, Deserialize)]
struct DomainEntry {
    id: Value,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RecordList {
    status: Status,
    #[serde(default)]
    records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
struct RecordEntry {
    id: Value,
    name: String,
    value: String,
    #[serde(rename = "type")]
    record_type: String,
}

#[derive(Debug, Deserialize)]
struct ModifyResponse {
    status: Status,
}

/// DNSPod returns ids as numbers in some endpoints and strings in others.
fn id_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Status {
    fn check(&self, action: &str) -> Result<()> {
        if self.code == "1" {
            Ok(())
        } else {
            Err(DdnsError::provider(
                "dnspod",
                format!("{} failed with code {}: {}", action, self.code, self.message),
            ))
        }
    }
}

impl DnsPodProvider {
    /// Create a new DNSPod provider.
    pub fn new(client: reqwest::Client, login_token: String, record_type: &'static str) -> Self {
        Self::with_base_url(client, login_token, record_type, DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        client: reqwest::Client,
        login_token: String,
        record_type: &'static str,
        base_url: String,
    ) -> Self {
        Self {
            client,
            login_token,
            record_type,
            base_url,
        }
    }

    /// Post a form to an API action; common parameters are added here.
    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut form: Vec<(&str, &str)> = vec![
            ("login_token", self.login_token.as_str()),
            ("format", "json"),
            ("lang", "en"),
            ("error_on_empty", "no"),
        ];
        form.extend_from_slice(params);

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, action))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DdnsError::provider(
                "dnspod",
                format!("{} returned HTTP {}", action, response.status()),
            ));
        }

        Ok(response.json().await?)
    }

    async fn get_domain_id(&self, zone: &str) -> Result<String> {
        let list: DomainList = self
            .post(
                "Domain.List",
                &[("type", "all"), ("offset", "0"), ("length", "3000")],
            )
            .await?;
        list.status.check("Domain.List")?;

        list.domains
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(zone))
            .and_then(|d| id_string(&d.id))
            .ok_or_else(|| DdnsError::provider("dnspod", format!("Domain {} not found", zone)))
    }
}

#[async_trait]
impl DnsProvider for DnsPodProvider {
    fn name(&self) -> &'static str {
        "dnspod"
    }

    fn lookup(&self) -> RecordLookup {
        RecordLookup::ResolveThenList
    }

    async fn list_records(&self, zone: &str) -> Result<Vec<Record>> {
        let domain_id = self.get_domain_id(zone).await?;

        let list: RecordList = self
            .post(
                "Record.List",
                &[
                    ("domain_id", domain_id.as_str()),
                    ("record_type", self.record_type),
                    ("offset", "0"),
                    ("length", "3000"),
                ],
            )
            .await?;
        list.status.check("Record.List")?;

        let records = list
            .records
            .into_iter()
            .filter_map(|r| {
                let id = id_string(&r.id)?;
                let name = if r.name == "@" {
                    zone.to_string()
                } else {
                    format!("{}.{}", r.name, zone)
                };
                Some(Record {
                    id,
                    name,
                    value: r.value,
                    record_type: r.record_type,
                    zone: zone.to_string(),
                    zone_id: Some(domain_id.clone()),
                })
            })
            .collect();

        Ok(records)
    }

    async fn update_record(&self, record: &Record, ip: &str) -> Result<()> {
        let domain_id = match &record.zone_id {
            Some(id) => id.clone(),
            None => self.get_domain_id(&record.zone).await?,
        };

        let response: ModifyResponse = self
            .post(
                "Record.Modify",
                &[
                    ("domain_id", domain_id.as_str()),
                    ("record_id", record.id.as_str()),
                    ("sub_domain", record.label()),
                    ("record_type", record.record_type.as_str()),
                    ("record_line", DEFAULT_LINE),
                    ("value", ip),
                ],
            )
            .await?;
        response.status.check("Record.Modify")?;

        tracing::info!("New IP {} set for {}", ip, record.name);
        Ok(())
    }
}
