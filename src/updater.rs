//! Per-domain update loop.
//!
//! A [`DomainUpdater`] owns one configured [`Domain`] and keeps every listed
//! subdomain pointed at the current IP:
//!
//! ```text
//!  sleep (skipped on the first pass)
//!    │
//!    ▼
//!  current IP ──fail──▶ log, next pass
//!    │
//!    ▼
//!  for each subdomain, in order:
//!    published IP ──fail──▶ log, next subdomain
//!    same?        ──yes───▶ skip
//!    update       ──fail──▶ log, retried next pass
//!    notify
//! ```
//!
//! Errors never leave an iteration. Panics end the task and are reported to
//! the [`Supervisor`](crate::supervisor::Supervisor), which starts a fresh
//! updater for the same domain.

use crate::config::{Config, Domain};
use crate::detector::{IpDetector, IpSource};
use crate::error::Result;
use crate::notify::{Notifier, Notify};
use crate::providers::{create_provider, DnsProvider, Record, RecordLookup};
use crate::resolver::{DnsResolver, HostResolver};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Collaborators shared by every loop.
#[derive(Clone)]
pub struct Services {
    pub ip_source: Arc<dyn IpSource>,
    pub resolver: Arc<dyn HostResolver>,
    pub provider: Arc<dyn DnsProvider>,
    pub notifier: Arc<dyn Notify>,
}

impl Services {
    /// Build the production collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            ip_source: Arc::new(IpDetector::from_config(config)?),
            resolver: Arc::new(DnsResolver::from_config(config)?),
            provider: create_provider(config)?,
            notifier: Arc::new(Notifier::from_config(config)?),
        })
    }
}

/// What happened to one subdomain during an iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Published value already matches.
    Unchanged,
    /// Record was pointed at the current IP.
    Updated { previous: String },
    /// We already published the current IP; the resolver still serves the old one.
    /// Lasts at most `propagation_passes` passes, then the record is pushed again.
    PendingPropagation,
    /// The provider has no record for this name.
    NotConfigured,
    /// The published value could not be read.
    LookupFailed(String),
    /// The provider rejected the update.
    UpdateFailed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Unchanged => write!(f, "unchanged"),
            Outcome::Updated { previous } => write!(f, "updated (was {})", previous),
            Outcome::PendingPropagation => write!(f, "already published, waiting for propagation"),
            Outcome::NotConfigured => write!(f, "not configured at provider"),
            Outcome::LookupFailed(e) => write!(f, "lookup failed: {}", e),
            Outcome::UpdateFailed(e) => write!(f, "update failed: {}", e),
        }
    }
}

/// Result of one pass over a domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Current IP, `None` when detection failed and the pass was skipped.
    pub current_ip: Option<String>,
    /// `(fqdn, outcome)` in configured order.
    pub subdomains: Vec<(String, Outcome)>,
}

impl CheckReport {
    /// Number of records updated in this pass.
    pub fn updated(&self) -> usize {
        self.subdomains
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Updated { .. }))
            .count()
    }
}

type Listing = Option<std::result::Result<Vec<Record>, String>>;

/// Last IP published (or confirmed) for a subdomain.
#[derive(Debug)]
struct Published {
    ip: String,
    /// Passes since then on which the resolver still served another value.
    stale_passes: u32,
}

/// Keeps one domain's records in sync with the current IP.
pub struct DomainUpdater {
    domain: Arc<Domain>,
    config: Arc<Config>,
    services: Services,
    /// Keyed by subdomain label.
    last_ip: HashMap<String, Published>,
    looping: bool,
}

impl DomainUpdater {
    pub fn new(domain: Arc<Domain>, config: Arc<Config>, services: Services) -> Self {
        Self {
            domain,
            config,
            services,
            last_ip: HashMap::new(),
            looping: false,
        }
    }

    /// Poll forever. Only a panic ends this future.
    pub async fn run(mut self) -> Infallible {
        info!(
            "Starting update loop for {} ({} subdomains)",
            self.domain.domain_name,
            self.domain.sub_domains.len()
        );

        loop {
            if self.looping {
                info!(
                    "Going to sleep, will start next checking of {} in {} seconds",
                    self.domain.domain_name, self.config.check_interval_secs
                );
                tokio::time::sleep(self.config.interval()).await;
            }
            self.looping = true;

            let report = self.check_once().await;
            debug!("Pass over {} finished: {:?}", self.domain.domain_name, report);
        }
    }

    /// Run a single iteration without sleeping.
    pub async fn check_once(&mut self) -> CheckReport {
        let mut report = CheckReport::default();

        let current_ip = match self.services.ip_source.current_ip().await {
            Ok(ip) => ip.trim_end().to_string(),
            Err(e) => {
                warn!("Error in getting current IP for {}: {}", self.domain.domain_name, e);
                return report;
            }
        };
        info!("Current IP is {}", current_ip);
        report.current_ip = Some(current_ip.clone());

        let domain = Arc::clone(&self.domain);
        let mut listing: Listing = None;

        for label in &domain.sub_domains {
            let fqdn = domain.fqdn(label);
            let outcome = self
                .sync_subdomain(label, &fqdn, &current_ip, &mut listing)
                .await;
            report.subdomains.push((fqdn, outcome));
        }

        report
    }

    async fn sync_subdomain(
        &mut self,
        label: &str,
        fqdn: &str,
        current_ip: &str,
        listing: &mut Listing,
    ) -> Outcome {
        let comparison = self.config.ip_comparison;
        let lookup = self.services.provider.lookup();

        if lookup == RecordLookup::Listing {
            let record = match self.listed_record(fqdn, listing).await {
                Ok(Some(record)) => record,
                Ok(None) => return self.not_configured(fqdn),
                Err(e) => {
                    warn!("Failed to read records for {}: {}", fqdn, e);
                    return Outcome::LookupFailed(e);
                }
            };

            if comparison.same(current_ip, &record.value) {
                return self.unchanged(label, fqdn, current_ip);
            }

            info!(
                "IP mismatch for {}: current {} vs published {}",
                fqdn, current_ip, record.value
            );
            return self.push_update(label, fqdn, record, current_ip).await;
        }

        let published = match self.services.resolver.resolve(fqdn).await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("{}", e);
                return Outcome::LookupFailed(e.to_string());
            }
        };

        if comparison.same(current_ip, &published) {
            return self.unchanged(label, fqdn, current_ip);
        }

        let stale_passes = match self.last_ip.get_mut(label) {
            Some(last) if comparison.same(current_ip, &last.ip) => {
                last.stale_passes += 1;
                Some(last.stale_passes)
            }
            _ => None,
        };
        if let Some(stale_passes) = stale_passes {
            if stale_passes <= self.config.propagation_passes {
                debug!(
                    "{} still resolves to {}, {} was already published",
                    fqdn, published, current_ip
                );
                return Outcome::PendingPropagation;
            }
            warn!(
                "{} still resolves to {} after {} passes, publishing {} again",
                fqdn, published, self.config.propagation_passes, current_ip
            );
            self.last_ip.remove(label);
        }

        let record = if lookup == RecordLookup::ResolveThenList {
            let found = self
                .services
                .provider
                .find_record(&self.domain.domain_name, fqdn)
                .await;
            let record = match found {
                Ok(Some(record)) => record,
                Ok(None) => return self.not_configured(fqdn),
                Err(e) => {
                    warn!("Failed to read records for {}: {}", fqdn, e);
                    return Outcome::LookupFailed(e.to_string());
                }
            };
            if comparison.same(current_ip, &record.value) {
                return self.unchanged(label, fqdn, current_ip);
            }
            record
        } else {
            Record::by_hostname(
                &self.domain.domain_name,
                fqdn,
                &published,
                self.config.ip_type.record_type(),
            )
        };

        self.push_update(label, fqdn, record, current_ip).await
    }

    /// Find `fqdn` in the zone listing, fetching it at most once per pass.
    async fn listed_record(
        &self,
        fqdn: &str,
        listing: &mut Listing,
    ) -> std::result::Result<Option<Record>, String> {
        if listing.is_none() {
            let result = self
                .services
                .provider
                .list_records(&self.domain.domain_name)
                .await
                .map_err(|e| e.to_string());
            *listing = Some(result);
        }
        let Some(fetched) = listing.as_ref() else {
            return Ok(None);
        };

        match fetched {
            Ok(records) => Ok(records
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(fqdn))
                .cloned()),
            Err(e) => Err(e.clone()),
        }
    }

    fn unchanged(&mut self, label: &str, fqdn: &str, current_ip: &str) -> Outcome {
        info!("{} already points at {}, skip update", fqdn, current_ip);
        self.remember(label, current_ip);
        Outcome::Unchanged
    }

    fn remember(&mut self, label: &str, ip: &str) {
        self.last_ip.insert(
            label.to_string(),
            Published {
                ip: ip.to_string(),
                stale_passes: 0,
            },
        );
    }

    fn not_configured(&self, fqdn: &str) -> Outcome {
        warn!(
            "Domain or subdomain not configured yet at {}: {}",
            self.services.provider.name(),
            fqdn
        );
        Outcome::NotConfigured
    }

    async fn push_update(
        &mut self,
        label: &str,
        fqdn: &str,
        record: Record,
        current_ip: &str,
    ) -> Outcome {
        info!("{} Start to update record IP...", fqdn);

        match self
            .services
            .provider
            .update_record(&record, current_ip)
            .await
        {
            Ok(()) => {
                info!("{} updated: {} -> {}", fqdn, record.value, current_ip);
                self.remember(label, current_ip);
                self.services.notifier.notify(fqdn, current_ip).await;
                Outcome::Updated {
                    previous: record.value,
                }
            }
            Err(e) => {
                error!("Failed to update {}: {}", fqdn, e);
                Outcome::UpdateFailed(e.to_string())
            }
        }
    }
}
