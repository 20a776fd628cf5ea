//! Configuration management for dnskeeper.

use crate::error::{DdnsError, Result};
use crate::notify;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Check interval in seconds (default: 300 = 5 minutes).
    #[serde(default = "default_interval")]
    pub check_interval_secs: u64,

    /// Address family to keep published.
    #[serde(default)]
    pub ip_type: IpType,

    /// IPv4 echo services, tried in order.
    #[serde(default = "default_ip_services")]
    pub ip_services: Vec<String>,

    /// IPv6 echo services, tried in order.
    #[serde(default = "default_ipv6_services")]
    pub ipv6_services: Vec<String>,

    /// Network interface to read the address from when the echo services fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_interface: Option<String>,

    /// Nameserver used to look up published records (`ip` or `ip:port`).
    /// The system configuration is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,

    /// Number of domain loop failures tolerated before the process exits.
    #[serde(default = "default_max_failures")]
    pub max_failures: usize,

    /// How the current and published addresses are compared.
    #[serde(default)]
    pub ip_comparison: IpComparison,

    /// Passes a resolver may keep serving the old value after an update
    /// before the record is pushed again.
    #[serde(default = "default_propagation_passes")]
    pub propagation_passes: u32,

    /// DNS provider and its credentials.
    pub provider: ProviderConfig,

    /// SOCKS5 proxy settings.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Domains to keep updated.
    #[serde(default)]
    pub domains: Vec<Domain>,

    /// Change notifications.
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_interval() -> u64 {
    300
}

fn default_max_failures() -> usize {
    5
}

fn default_propagation_passes() -> u32 {
    3
}

fn default_ip_services() -> Vec<String> {
    vec![
        "https://api.ipify.org".to_string(),
        "https://icanhazip.com".to_string(),
        "https://ifconfig.me/ip".to_string(),
        "https://ipecho.net/plain".to_string(),
    ]
}

fn default_ipv6_services() -> Vec<String> {
    vec![
        "https://api6.ipify.org".to_string(),
        "https://v6.ident.me".to_string(),
        "https://ipv6.icanhazip.com".to_string(),
    ]
}

/// Address family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpType {
    #[default]
    #[serde(rename = "IPv4", alias = "ipv4", alias = "IPV4")]
    V4,
    #[serde(rename = "IPv6", alias = "ipv6", alias = "IPV6")]
    V6,
}

impl IpType {
    /// DNS record type holding addresses of this family.
    pub fn record_type(&self) -> &'static str {
        match self {
            IpType::V4 => "A",
            IpType::V6 => "AAAA",
        }
    }
}

/// Address comparison policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpComparison {
    /// Exact string equality after trimming trailing whitespace.
    #[default]
    Literal,
    /// Parsed address equality, so `2001:db8::1` equals `2001:0db8:0:0:0:0:0:1`.
    Canonical,
}

impl IpComparison {
    /// Whether two address strings denote the same published value.
    pub fn same(&self, current: &str, published: &str) -> bool {
        let current = current.trim_end();
        let published = published.trim_end();

        if let IpComparison::Canonical = self {
            if let (Ok(a), Ok(b)) = (
                current.parse::<std::net::IpAddr>(),
                published.parse::<std::net::IpAddr>(),
            ) {
                return a == b;
            }
        }

        current == published
    }
}

/// A DNS zone and the labels kept in sync inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Zone name, e.g. "example.com".
    pub domain_name: String,
    /// Labels to update, `@` for the zone apex.
    pub sub_domains: Vec<String>,
}

impl Domain {
    /// Fully qualified hostname of a label in this zone.
    pub fn fqdn(&self, label: &str) -> String {
        if label == "@" {
            self.domain_name.clone()
        } else {
            format!("{}.{}", label, self.domain_name)
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderConfig {
    #[serde(rename = "cloudflare")]
    Cloudflare {
        /// API token (or environment variable name if prefixed with $).
        #[serde(default)]
        api_token: String,
        /// Account e-mail, used with `api_key` instead of a token.
        #[serde(default)]
        email: String,
        /// Global API key.
        #[serde(default)]
        api_key: String,
    },

    #[serde(rename = "alidns")]
    AliDns {
        /// Access key id.
        access_key_id: String,
        /// Access key secret.
        access_key_secret: String,
    },

    #[serde(rename = "dnspod")]
    DnsPod {
        /// Login token in the form "id,token".
        login_token: String,
    },

    #[serde(rename = "he")]
    He {
        /// Dynamic DNS key.
        password: String,
    },

    #[serde(rename = "duckdns")]
    DuckDns {
        /// DuckDNS token.
        token: String,
    },

    #[serde(rename = "noip")]
    NoIp { username: String, password: String },
}

impl ProviderConfig {
    /// Get the provider name.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::AliDns { .. } => "alidns",
            ProviderConfig::DnsPod { .. } => "dnspod",
            ProviderConfig::He { .. } => "he",
            ProviderConfig::DuckDns { .. } => "duckdns",
            ProviderConfig::NoIp { .. } => "noip",
        }
    }

    fn validate(&self) -> Result<()> {
        let missing = |field: &str| {
            Err(DdnsError::Config(format!(
                "{}: {} cannot be empty",
                self.name(),
                field
            )))
        };

        match self {
            ProviderConfig::Cloudflare {
                api_token,
                email,
                api_key,
            } => {
                if api_token.is_empty() {
                    if email.is_empty() {
                        return missing("email");
                    }
                    if api_key.is_empty() {
                        return missing("api_key");
                    }
                }
            }
            ProviderConfig::AliDns {
                access_key_id,
                access_key_secret,
            } => {
                if access_key_id.is_empty() {
                    return missing("access_key_id");
                }
                if access_key_secret.is_empty() {
                    return missing("access_key_secret");
                }
            }
            ProviderConfig::DnsPod { login_token } => {
                if login_token.is_empty() {
                    return missing("login_token");
                }
            }
            ProviderConfig::He { password } => {
                if password.is_empty() {
                    return missing("password");
                }
            }
            ProviderConfig::DuckDns { token } => {
                if token.is_empty() {
                    return missing("token");
                }
            }
            ProviderConfig::NoIp { username, password } => {
                if username.is_empty() {
                    return missing("username");
                }
                if password.is_empty() {
                    return missing("password");
                }
            }
        }
        Ok(())
    }
}

/// SOCKS5 proxy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy address, e.g. "127.0.0.1:1080".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socks5: Option<String>,
    /// Route provider API calls through the proxy.
    pub use_for_provider: bool,
}

/// Notification sinks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub telegram: TelegramConfig,
    pub slack: SlackConfig,
    pub mail: MailConfig,
    pub influx: InfluxConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_api_key: String,
    pub chat_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_template: Option<String>,
    pub use_proxy: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub enabled: bool,
    pub bot_api_token: String,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_template: Option<String>,
    pub use_proxy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub send_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_template: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            send_to: String::new(),
            msg_template: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    pub enabled: bool,
    /// Server base URL, e.g. "http://localhost:8086".
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
    pub measurement: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            org: String::new(),
            bucket: String::new(),
            token: String::new(),
            measurement: "ddns".to_string(),
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DdnsError::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("dnskeeper").join("config.toml"))
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DdnsError::Config(format!(
                "Config file {} not found",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Polling interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Echo services for the configured address family.
    pub fn services(&self) -> &[String] {
        match self.ip_type {
            IpType::V4 => &self.ip_services,
            IpType::V6 => &self.ipv6_services,
        }
    }

    /// Check the settings before any loop starts.
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(DdnsError::Config("No domains configured".to_string()));
        }

        for domain in &self.domains {
            if domain.domain_name.trim().is_empty() {
                return Err(DdnsError::Config("Domain name cannot be empty".to_string()));
            }
            if domain.sub_domains.is_empty() {
                return Err(DdnsError::Config(format!(
                    "Domain {} has no sub_domains",
                    domain.domain_name
                )));
            }
            if domain.sub_domains.iter().any(|s| s.trim().is_empty()) {
                return Err(DdnsError::Config(format!(
                    "Domain {} has an empty sub_domain (use \"@\" for the apex)",
                    domain.domain_name
                )));
            }
        }

        if self.check_interval_secs == 0 {
            return Err(DdnsError::Config(
                "check_interval_secs must be positive".to_string(),
            ));
        }

        if self.max_failures == 0 {
            return Err(DdnsError::Config("max_failures must be positive".to_string()));
        }

        self.provider.validate()?;

        if self.services().is_empty() && self.ip_interface.is_none() {
            return Err(DdnsError::Config(
                "Configure echo services or ip_interface to detect the current IP".to_string(),
            ));
        }

        if self.proxy.use_for_provider && self.proxy.socks5.is_none() {
            return Err(DdnsError::Config(
                "proxy.use_for_provider is set but proxy.socks5 is empty".to_string(),
            ));
        }

        self.validate_notify()
    }

    fn validate_notify(&self) -> Result<()> {
        let telegram = &self.notify.telegram;
        if telegram.enabled {
            if telegram.bot_api_key.is_empty() {
                return Err(DdnsError::Config(
                    "telegram: bot_api_key cannot be empty".to_string(),
                ));
            }
            if telegram.chat_id.is_empty() {
                return Err(DdnsError::Config("telegram: chat_id cannot be empty".to_string()));
            }
            if let Some(template) = &telegram.msg_template {
                notify::check_template(template)?;
            }
        }

        let slack = &self.notify.slack;
        if slack.enabled {
            if slack.bot_api_token.is_empty() {
                return Err(DdnsError::Config(
                    "slack: bot_api_token cannot be empty".to_string(),
                ));
            }
            if slack.channel.is_empty() {
                return Err(DdnsError::Config("slack: channel cannot be empty".to_string()));
            }
            if let Some(template) = &slack.msg_template {
                notify::check_template(template)?;
            }
        }

        let mail = &self.notify.mail;
        if mail.enabled {
            if mail.smtp_server.is_empty() || mail.send_to.is_empty() {
                return Err(DdnsError::Config(
                    "mail: smtp_server and send_to are required".to_string(),
                ));
            }
            if let Some(template) = &mail.msg_template {
                notify::check_template(template)?;
            }
        }

        let influx = &self.notify.influx;
        if influx.enabled && (influx.url.is_empty() || influx.bucket.is_empty()) {
            return Err(DdnsError::Config(
                "influx: url and bucket are required".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate example configuration.
    pub fn example() -> Self {
        Self {
            check_interval_secs: 300,
            ip_type: IpType::V4,
            ip_services: default_ip_services(),
            ipv6_services: default_ipv6_services(),
            ip_interface: None,
            resolver: Some("8.8.8.8".to_string()),
            max_failures: default_max_failures(),
            ip_comparison: IpComparison::Literal,
            propagation_passes: default_propagation_passes(),
            provider: ProviderConfig::Cloudflare {
                api_token: "$CF_API_TOKEN".to_string(),
                email: String::new(),
                api_key: String::new(),
            },
            proxy: ProxyConfig::default(),
            domains: vec![Domain {
                domain_name: "example.com".to_string(),
                sub_domains: vec!["www".to_string(), "home".to_string()],
            }],
            notify: NotifyConfig::default(),
        }
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Resolve environment variable references (values starting with $).
pub fn resolve_env(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| {
            tracing::warn!("Environment variable {} not set", var_name);
            value.to_string()
        })
    } else {
        value.to_string()
    }
}
