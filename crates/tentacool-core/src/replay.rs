//! Startup replay of declared state
//!
//! Runs once, before the API starts serving, and reasserts every stored
//! declaration against the live system. Replay never writes to the store and
//! never stops early: a record that fails is logged and counted, and the next
//! one is tried.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::reconciler::{Adapters, bounded};
use crate::records::{Domain, DomainRecord, StoredRecord};
use crate::traits::{ConfigStore, SystemAdapter};

/// Counters for one domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DomainReplay {
    /// Records found in the store
    pub attempted: usize,
    /// Records that could not be decoded or applied
    pub failed: usize,
}

/// Outcome of a replay run, per domain in replay order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub domains: Vec<(Domain, DomainReplay)>,
}

impl ReplayReport {
    /// Counters of one domain
    pub fn domain(&self, domain: Domain) -> DomainReplay {
        self.domains
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, counts)| *counts)
            .unwrap_or_default()
    }

    /// Records attempted across all domains
    pub fn attempted(&self) -> usize {
        self.domains.iter().map(|(_, c)| c.attempted).sum()
    }

    /// Records failed across all domains
    pub fn failed(&self) -> usize {
        self.domains.iter().map(|(_, c)| c.failed).sum()
    }

    /// Whether every record was applied
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}

/// Reasserts stored declarations at startup
pub struct StartupReplayer {
    store: Arc<dyn ConfigStore>,
    adapters: Adapters,
    timeout: Duration,
}

impl StartupReplayer {
    /// Create a replayer over `store`
    ///
    /// `timeout` bounds every adapter call, as for reconcilers.
    pub fn new(store: Arc<dyn ConfigStore>, adapters: Adapters, timeout: Duration) -> Self {
        Self {
            store,
            adapters,
            timeout,
        }
    }

    /// Apply every stored record, domain by domain
    ///
    /// Order is DHCP, addresses, DNS, gateway; within a domain, store order.
    ///
    /// # Errors
    ///
    /// Only a failure to list a bucket is an error. Per-record failures are
    /// reported in the [`ReplayReport`].
    pub async fn replay(&self) -> Result<ReplayReport> {
        info!("Replaying declared state");

        let mut report = ReplayReport::default();
        for domain in Domain::REPLAY_ORDER {
            let counts = match domain {
                Domain::Dhcp => self.replay_domain(&self.adapters.dhcp).await?,
                Domain::Address => self.replay_domain(&self.adapters.address).await?,
                Domain::Dns => self.replay_domain(&self.adapters.dns).await?,
                Domain::Gateway => self.replay_domain(&self.adapters.gateway).await?,
            };
            report.domains.push((domain, counts));
        }

        if report.is_clean() {
            info!("Replay complete: {} records applied", report.attempted());
        } else {
            warn!(
                "Replay complete: {} of {} records failed",
                report.failed(),
                report.attempted()
            );
        }

        Ok(report)
    }

    async fn replay_domain<R: DomainRecord>(
        &self,
        adapter: &Arc<dyn SystemAdapter<R>>,
    ) -> Result<DomainReplay> {
        let entries = self.store.list(R::DOMAIN).await?;
        let mut counts = DomainReplay::default();

        for (key, value) in entries {
            counts.attempted += 1;

            let record = match StoredRecord::<R>::decode(value) {
                Ok(record) => record.keyed(&key),
                Err(e) => {
                    error!("Cannot replay {} '{}': {}", R::DOMAIN, key, e);
                    counts.failed += 1;
                    continue;
                }
            };

            let applied = bounded(
                adapter.adapter_name(),
                "apply",
                self.timeout,
                adapter.apply(&record),
            )
            .await;

            match applied {
                Ok(()) => debug!("Replayed {} '{}'", R::DOMAIN, key),
                Err(e) => {
                    error!("Failed to replay {} '{}': {}", R::DOMAIN, key, e);
                    counts.failed += 1;
                }
            }
        }

        Ok(counts)
    }
}
