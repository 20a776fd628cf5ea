//! Current IP detection.

use crate::config::{Config, IpType};
use crate::error::{DdnsError, Result};
use crate::http;
use async_trait::async_trait;
use std::net::IpAddr;

/// Source of the address currently assigned to this host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current IP as text.
    async fn current_ip(&self) -> Result<String>;
}

/// IP detector with multiple fallback services and an optional interface.
pub struct IpDetector {
    client: reqwest::Client,
    services: Vec<String>,
    interface: Option<String>,
    ip_type: IpType,
}

impl IpDetector {
    /// Create a detector from the configured services, interface and family.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config, false)?,
            services: config.services().to_vec(),
            interface: config.ip_interface.clone(),
            ip_type: config.ip_type,
        })
    }

    /// Create a new IP detector with custom services.
    pub fn with_services(services: Vec<String>, ip_type: IpType) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(http::REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            services,
            interface: None,
            ip_type,
        }
    }

    /// Also read addresses from a local interface when every service fails.
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Ask the echo services in order.
    async fn detect_online(&self) -> Result<String> {
        for service in &self.services {
            match self.try_service(service).await {
                Ok(ip) => {
                    tracing::debug!("Detected {} from {}", ip, service);
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::warn!("Service {} failed: {}", service, e);
                }
            }
        }

        Err(DdnsError::IpDetection(
            "All IP detection services failed".to_string(),
        ))
    }

    /// Try a single IP detection service.
    async fn try_service(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::IpDetection(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let text = response.text().await?;
        let ip_str = text.trim();

        let ip: IpAddr = ip_str
            .parse()
            .map_err(|_| DdnsError::IpDetection(format!("Invalid IP response: {}", ip_str)))?;

        if !matches_family(&ip, self.ip_type) {
            return Err(DdnsError::IpDetection(format!(
                "{} returned {} which is not {:?}",
                url, ip, self.ip_type
            )));
        }

        Ok(ip_str.to_string())
    }

    fn detect_interface(&self, name: &str) -> Result<String> {
        let addrs = if_addrs::get_if_addrs().map_err(|e| {
            DdnsError::IpDetection(format!("Can't list network interfaces: {}", e))
        })?;

        addrs
            .iter()
            .filter(|iface| iface.name == name)
            .map(|iface| iface.ip())
            .find(|ip| matches_family(ip, self.ip_type) && is_usable(ip))
            .map(|ip| ip.to_string())
            .ok_or_else(|| {
                DdnsError::IpDetection(format!("Can't get a valid address from {}", name))
            })
    }
}

#[async_trait]
impl IpSource for IpDetector {
    async fn current_ip(&self) -> Result<String> {
        let mut last_error = None;

        if !self.services.is_empty() {
            match self.detect_online().await {
                Ok(ip) => return Ok(ip),
                Err(e) => {
                    tracing::warn!("Online detection failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if let Some(name) = &self.interface {
            match self.detect_interface(name) {
                Ok(ip) => {
                    tracing::debug!("Detected {} on interface {}", ip, name);
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::warn!("Interface detection failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DdnsError::IpDetection("No IP detection method configured".to_string())
        }))
    }
}

fn matches_family(ip: &IpAddr, ip_type: IpType) -> bool {
    match ip_type {
        IpType::V4 => ip.is_ipv4(),
        IpType::V6 => ip.is_ipv6(),
    }
}

/// Whether an interface address can be published.
fn is_usable(ip: &IpAddr) -> bool {
    if ip.is_unspecified() || ip.is_loopback() || ip.is_multicast() {
        return false;
    }
    match ip {
        IpAddr::V4(v4) => !v4.is_link_local() && !v4.is_broadcast(),
        // fe80::/10
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) != 0xfe80,
    }
}
