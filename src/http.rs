//! Shared HTTP client construction.

use crate::config::Config;
use crate::error::{DdnsError, Result};
use std::time::Duration;

/// Per-request timeout for every outbound call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("dnskeeper/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client, routed through the SOCKS5 proxy when asked to.
pub fn build_client(config: &Config, use_proxy: bool) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT);

    if use_proxy {
        if let Some(addr) = &config.proxy.socks5 {
            tracing::debug!("Using socks5 proxy {}", addr);
            let proxy = reqwest::Proxy::all(format!("socks5://{}", addr))
                .map_err(|e| DdnsError::Config(format!("Invalid proxy {}: {}", addr, e)))?;
            builder = builder.proxy(proxy);
        }
    }

    Ok(builder.build()?)
}
