//! Runs one update loop per domain and restarts loops that die.
//!
//! Every loop runs in its own task. A second task awaits it and turns a panic
//! into a [`LoopFailure`] on a shared channel. The supervisor is the only
//! reader of that channel and the only owner of the failure counter, which is
//! global and never reset: once `max_failures` loops have died, across any mix
//! of domains, [`Supervisor::run`] returns [`DdnsError::CrashBudgetExhausted`].

use crate::config::{Config, Domain};
use crate::error::{DdnsError, Result};
use crate::updater::{DomainUpdater, Services};
use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Sent by a loop's boundary when the loop ends.
#[derive(Debug)]
pub struct LoopFailure {
    pub domain: Arc<Domain>,
    pub reason: String,
}

pub struct Supervisor {
    config: Arc<Config>,
    services: Services,
}

impl Supervisor {
    pub fn new(config: Arc<Config>, services: Services) -> Self {
        Self { config, services }
    }

    /// Start every loop and restart failed ones until the crash budget runs out.
    pub async fn run(self) -> Result<Infallible> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        for domain in &self.config.domains {
            self.spawn_loop(Arc::new(domain.clone()), tx.clone());
        }

        let mut failures = 0usize;
        loop {
            let Some(failure) = rx.recv().await else {
                // We hold a sender, so this only happens if the runtime is going away.
                return Err(DdnsError::Supervisor("failure channel closed".to_string()));
            };

            failures += 1;
            error!(
                "Update loop for {} failed ({}/{}): {}",
                failure.domain.domain_name, failures, self.config.max_failures, failure.reason
            );

            if failures >= self.config.max_failures {
                error!("Too many failures, giving up");
                return Err(DdnsError::CrashBudgetExhausted { failures });
            }

            info!("Restarting update loop for {}", failure.domain.domain_name);
            self.spawn_loop(failure.domain, tx.clone());
        }
    }

    /// Run until `shutdown` resolves. A shutdown signal that can't be
    /// installed is logged and the loops keep running.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        let shutdown = async move {
            if let Err(e) = shutdown.await {
                error!("Can't listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = self.run() => match result {
                Ok(never) => match never {},
                Err(e) => Err(e),
            },
            () = shutdown => {
                info!("Interrupted, shutting down");
                Ok(())
            }
        }
    }

    fn spawn_loop(&self, domain: Arc<Domain>, failures: mpsc::UnboundedSender<LoopFailure>) {
        let updater = DomainUpdater::new(
            Arc::clone(&domain),
            Arc::clone(&self.config),
            self.services.clone(),
        );
        let task = tokio::spawn(updater.run());

        tokio::spawn(async move {
            let reason = match task.await {
                Ok(never) => match never {},
                Err(e) if e.is_panic() => panic_message(e.into_panic()),
                Err(e) => e.to_string(),
            };
            // Receiver is gone only when the supervisor has already returned.
            let _ = failures.send(LoopFailure { domain, reason });
        });
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
