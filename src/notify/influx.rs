//! InfluxDB v2 sink: one point per address change.

use super::NotifySink;
use crate::config::{resolve_env, Config};
use crate::error::{DdnsError, Result};
use crate::http;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub struct InfluxSink {
    client: reqwest::Client,
    url: String,
    org: String,
    bucket: String,
    token: String,
    measurement: String,
}

/// Escape a tag value for line protocol.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Format one line-protocol point.
fn point(measurement: &str, domain: &str, ip: &str, at: DateTime<Utc>) -> String {
    format!(
        "{},domain={} ip=\"{}\" {}",
        escape_tag(measurement),
        escape_tag(domain),
        ip.replace('"', "\\\""),
        at.timestamp_nanos_opt().unwrap_or_default()
    )
}

impl InfluxSink {
    pub fn from_config(config: &Config) -> Result<Self> {
        let influx = &config.notify.influx;
        Ok(Self {
            client: http::build_client(config, false)?,
            url: influx.url.trim_end_matches('/').to_string(),
            org: influx.org.clone(),
            bucket: influx.bucket.clone(),
            token: resolve_env(&influx.token),
            measurement: influx.measurement.clone(),
        })
    }
}

#[async_trait]
impl NotifySink for InfluxSink {
    fn name(&self) -> &'static str {
        "influx"
    }

    async fn send(&self, domain: &str, ip: &str) -> Result<()> {
        let body = point(&self.measurement, domain, ip, Utc::now());
        tracing::debug!("Writing point to {}: {}", self.bucket, body);

        let mut request = self
            .client
            .post(format!("{}/api/v2/write", self.url))
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .body(body);
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Token {}", self.token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DdnsError::notify(
                "influx",
                format!("HTTP {}: {}", status, text.trim()),
            ));
        }
        Ok(())
    }
}
