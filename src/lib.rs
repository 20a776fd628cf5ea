//! # dnskeeper
//!
//! A dynamic DNS updater. Every configured domain gets its own update loop that
//! detects the current IP, compares it with the value published for each
//! subdomain and pushes an update through the configured provider when they
//! differ. A supervisor restarts loops that crash, up to a global budget.
//!
//! ## Features
//!
//! - DNS providers: Cloudflare, AliDNS, DNSPod, Hurricane Electric, DuckDNS, No-IP
//! - IP detection through echo services or a local interface, IPv4 or IPv6
//! - Notifications on change: Telegram, Slack, e-mail, InfluxDB
//! - Optional SOCKS5 proxy
//!
//! ## Usage
//!
//! ```bash
//! # Run the update loops
//! dnskeeper run
//!
//! # One pass over every domain
//! dnskeeper update
//!
//! # Show current and published IPs
//! dnskeeper status
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod http;
pub mod notify;
pub mod providers;
pub mod resolver;
pub mod supervisor;
pub mod updater;

pub use config::Config;
pub use detector::IpDetector;
pub use error::{DdnsError, Result};
pub use supervisor::Supervisor;
pub use updater::{CheckReport, DomainUpdater, Outcome, Services};
