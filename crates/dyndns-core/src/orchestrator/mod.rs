//! Runs one [`DomainWorker`] per managed domain
//!
//! Workers are independent tokio tasks. The orchestrator keeps the
//! `JoinHandle` of every worker and joins them all; a worker that fails or
//! panics is reported in the [`RunSummary`] and never affects the others.
//!
//! In single-run mode [`Orchestrator::run`] returns once every worker has
//! finished its pass. In daemon mode workers only finish on shutdown, so
//! `run` blocks until the shutdown token is cancelled.

use crate::config::{DomainConfig, RunMode};
use crate::engine::{DomainWorker, WorkerEvent, WorkerExit};
use crate::error::Error;
use crate::resolver::IpResolver;
use crate::traits::DnsProvider;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A domain configuration paired with the provider that serves it
pub struct ManagedDomain {
    /// Domain settings
    pub config: DomainConfig,
    /// Provider client for this domain
    pub provider: Box<dyn DnsProvider>,
}

impl ManagedDomain {
    /// Pair `config` with `provider`
    pub fn new(config: DomainConfig, provider: Box<dyn DnsProvider>) -> Self {
        Self { config, provider }
    }
}

/// Final state of one worker
#[derive(Debug)]
pub struct DomainOutcome {
    /// Domain the worker managed
    pub domain: String,
    /// How the worker ended
    pub exit: WorkerExit,
}

/// Outcomes of every worker, in configuration order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<DomainOutcome>,
}

impl RunSummary {
    /// Whether every worker finished a full pass without failures
    pub fn all_clean(&self) -> bool {
        self.outcomes.iter().all(|o| o.exit.is_clean())
    }

    /// Outcomes that were not clean
    pub fn failures(&self) -> impl Iterator<Item = &DomainOutcome> {
        self.outcomes.iter().filter(|o| !o.exit.is_clean())
    }
}

/// Launches and joins the domain workers
pub struct Orchestrator {
    resolver: Arc<IpResolver>,
    mode: RunMode,
    shutdown: CancellationToken,
    event_tx: Option<mpsc::Sender<WorkerEvent>>,
}

impl Orchestrator {
    /// Create an orchestrator sharing `resolver` across all workers
    pub fn new(resolver: Arc<IpResolver>, mode: RunMode) -> Self {
        Self {
            resolver,
            mode,
            shutdown: CancellationToken::new(),
            event_tx: None,
        }
    }

    /// Propagate cancellation of `token` to every worker
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Forward every worker's events to `tx`
    pub fn with_events(mut self, tx: mpsc::Sender<WorkerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Run mode handed to every worker
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Spawn one worker per domain and wait for all of them
    pub async fn run(&self, domains: Vec<ManagedDomain>) -> RunSummary {
        info!(domains = domains.len(), mode = ?self.mode, "Starting domain workers");

        let handles: Vec<_> = domains
            .into_iter()
            .map(|managed| {
                let domain = managed.config.domain.clone();
                let mut worker = DomainWorker::new(
                    managed.config,
                    managed.provider,
                    Arc::clone(&self.resolver),
                    self.mode,
                )
                .with_shutdown(self.shutdown.child_token());
                if let Some(tx) = &self.event_tx {
                    worker = worker.with_events(tx.clone());
                }
                (domain, tokio::spawn(worker.run()))
            })
            .collect();

        let mut summary = RunSummary::default();
        for (domain, handle) in handles {
            let exit = match handle.await {
                Ok(exit) => exit,
                Err(e) => {
                    error!(domain = %domain, error = %e, "Domain worker task failed");
                    WorkerExit::Aborted(Error::Worker {
                        domain: domain.clone(),
                        message: e.to_string(),
                    })
                }
            };
            summary.outcomes.push(DomainOutcome { domain, exit });
        }

        info!(
            finished = summary.outcomes.len(),
            clean = summary.all_clean(),
            "All domain workers finished"
        );
        summary
    }
}
