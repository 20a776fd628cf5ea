//! Cloudflare DNS provider.

use super::{DnsProvider, Record, RecordLookup};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com";

/// Cloudflare credentials.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Scoped API token.
    Token(String),
    /// Account e-mail and global API key.
    Key { email: String, key: String },
}

/// Cloudflare DNS provider.
pub struct CloudflareProvider {
    client: reqwest::Client,
    auth: Auth,
    record_type: &'static str,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CloudflareError>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    name: String,
    content: String,
    #[serde(rename = "type")]
    record_type: String,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
}

impl<T> CloudflareResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.success {
            let msg = self
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(DdnsError::provider("cloudflare", msg));
        }

        self.result
            .ok_or_else(|| DdnsError::provider("cloudflare", "Response has no result"))
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider.
    pub fn new(client: reqwest::Client, auth: Auth, record_type: &'static str) -> Self {
        Self::with_base_url(client, auth, record_type, DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        client: reqwest::Client,
        auth: Auth,
        record_type: &'static str,
        base_url: String,
    ) -> Self {
        Self {
            client,
            auth,
            record_type,
            base_url,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/client/v4{}", self.base_url, path);
        let builder = self.client.request(method, url);

        match &self.auth {
            Auth::Token(token) => builder.header("Authorization", format!("Bearer {}", token)),
            Auth::Key { email, key } => builder
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }

    /// Find the zone ID for a zone name.
    async fn get_zone_id(&self, zone: &str) -> Result<String> {
        let response: CloudflareResponse<Vec<Zone>> = self
            .request(reqwest::Method::GET, "/zones")
            .query(&[("name", zone)])
            .send()
            .await?
            .json()
            .await?;

        response
            .into_result()?
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(zone))
            .map(|z| z.id)
            .ok_or_else(|| DdnsError::provider("cloudflare", format!("Zone {} not found", zone)))
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    fn name(&self) -> &'static str {
        "cloudflare"
    }

    fn lookup(&self) -> RecordLookup {
        RecordLookup::Listing
    }

    async fn list_records(&self, zone: &str) -> Result<Vec<Record>> {
        let zone_id = self.get_zone_id(zone).await?;

        tracing::debug!("Querying {} records of zone {}", self.record_type, zone);
        let response: CloudflareResponse<Vec<DnsRecord>> = self
            .request(
                reqwest::Method::GET,
                &format!("/zones/{}/dns_records", zone_id),
            )
            .query(&[("type", self.record_type), ("page", "1"), ("per_page", "500")])
            .send()
            .await?
            .json()
            .await?;

        let records = response
            .into_result()?
            .into_iter()
            .map(|r| Record {
                id: r.id,
                name: r.name,
                value: r.content,
                record_type: r.record_type,
                zone: zone.to_string(),
                zone_id: Some(zone_id.clone()),
            })
            .collect();

        Ok(records)
    }

    async fn update_record(&self, record: &Record, ip: &str) -> Result<()> {
        let zone_id = match &record.zone_id {
            Some(id) => id.clone(),
            None => self.get_zone_id(&record.zone).await?,
        };

        let request = UpdateRequest {
            record_type: &record.record_type,
            name: &record.name,
            content: ip,
        };

        let response: CloudflareResponse<DnsRecord> = self
            .request(
                reqwest::Method::PATCH,
                &format!("/zones/{}/dns_records/{}", zone_id, record.id),
            )
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        let updated = response.into_result()?;
        tracing::info!("Record updated: {} - {}", updated.name, updated.content);
        Ok(())
    }
}
