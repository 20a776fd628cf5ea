//! Lookup of the addresses currently published for a hostname.

use crate::config::{Config, IpType};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DNS_PORT: u16 = 53;

/// Resolves a hostname to its published address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `hostname` to the first address of the configured family.
    async fn resolve(&self, hostname: &str) -> Result<String>;
}

/// Resolver backed by hickory, querying a fixed nameserver or the system ones.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
    ip_type: IpType,
}

impl DnsResolver {
    /// Build from the `resolver` and `ip_type` settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver = match &config.resolver {
            Some(addr) => {
                let server = parse_nameserver(addr)?;
                let group = NameServerConfigGroup::from_ips_clear(&[server.ip()], server.port(), true);
                TokioAsyncResolver::tokio(ResolverConfig::from_parts(None, vec![], group), options())
            }
            None => match hickory_resolver::system_conf::read_system_conf() {
                Ok((system, _)) => TokioAsyncResolver::tokio(system, options()),
                Err(e) => {
                    tracing::warn!("Can't read system resolver config ({}), using defaults", e);
                    TokioAsyncResolver::tokio(ResolverConfig::default(), options())
                }
            },
        };

        Ok(Self {
            resolver,
            ip_type: config.ip_type,
        })
    }
}

/// Published values must be re-read every iteration, so nothing is cached.
fn options() -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.cache_size = 0;
    opts.attempts = 5;
    opts.timeout = Duration::from_secs(5);
    opts
}

/// Parse `ip` or `ip:port`, defaulting to port 53.
pub fn parse_nameserver(addr: &str) -> Result<SocketAddr> {
    let addr = addr.trim();
    if let Ok(socket) = addr.parse::<SocketAddr>() {
        return Ok(socket);
    }
    addr.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| DdnsError::Config(format!("Invalid resolver address: {}", addr)))
}

#[async_trait]
impl HostResolver for DnsResolver {
    async fn resolve(&self, hostname: &str) -> Result<String> {
        let fqdn = if hostname.ends_with('.') {
            hostname.to_string()
        } else {
            format!("{}.", hostname)
        };

        let err = |message: String| DdnsError::Resolve {
            hostname: hostname.to_string(),
            message,
        };

        let ip = match self.ip_type {
            IpType::V4 => self
                .resolver
                .ipv4_lookup(fqdn)
                .await
                .map_err(|e| err(e.to_string()))?
                .iter()
                .next()
                .map(|a| IpAddr::V4(a.0)),
            IpType::V6 => self
                .resolver
                .ipv6_lookup(fqdn)
                .await
                .map_err(|e| err(e.to_string()))?
                .iter()
                .next()
                .map(|aaaa| IpAddr::V6(aaaa.0)),
        };

        let ip = ip.ok_or_else(|| err("no address records".to_string()))?;
        tracing::debug!("{} resolves to {}", hostname, ip);
        Ok(ip.to_string())
    }
}
