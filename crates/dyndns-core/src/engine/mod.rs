//! Per-domain reconciliation worker
//!
//! A [`DomainWorker`] owns one [`DomainConfig`] and its provider, and keeps
//! the domain's managed "A" records pointed at the current external IP.
//!
//! ## State Machine
//!
//! ```text
//!            ┌─────────────┐
//!   start ──▶│  Resolving  │◀──────────────────────────┐
//!            └─────────────┘                           │
//!                   │ ip                               │ interval elapsed
//!                   ▼                                  │
//!            ┌─────────────┐                    ┌─────────────┐
//!            │   Listing   │── error (daemon) ─▶│  Sleeping   │
//!            └─────────────┘                    └─────────────┘
//!                   │ records                          ▲
//!                   ▼                                  │
//!            ┌─────────────┐        daemon             │
//!            │ Reconciling │───────────────────────────┘
//!            └─────────────┘
//!                   │ single-run
//!                   ▼
//!            ┌─────────────┐
//!            │    Done     │
//!            └─────────────┘
//! ```
//!
//! Resolving and Listing failures end the cycle. In daemon mode the worker
//! sleeps its interval and tries again; in single-run mode it stops.
//! Failures while replacing a record are local to that record: they are
//! logged and counted, and the pass moves on to the next record.
//!
//! ## Shutdown
//!
//! Cancelling the worker's token interrupts the interval sleep and any
//! in-flight resolve or list call. A record replacement that has already
//! issued its delete is allowed to finish its create; no further
//! replacements are started.

use crate::config::{DomainConfig, RunMode};
use crate::error::Error;
use crate::matcher::is_managed;
use crate::resolver::IpResolver;
use crate::traits::{DnsProvider, DnsRecord};
use crate::updater::UpdatePlan;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events emitted by a [`DomainWorker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A reconciliation pass started
    PassStarted { domain: String },

    /// The external IP was resolved for this pass
    IpResolved { domain: String, ip: String },

    /// A stale record was replaced
    RecordUpdated {
        domain: String,
        name: String,
        previous: String,
        current: String,
    },

    /// A managed record already had the right content
    RecordUnchanged { domain: String, name: String },

    /// Replacing a record failed
    RecordUpdateFailed {
        domain: String,
        name: String,
        record_id: String,
        error: String,
    },

    /// Resolving or listing failed; the pass was abandoned
    CycleFailed { domain: String, error: String },

    /// A pass went through reconciliation
    PassCompleted { domain: String, report: PassReport },

    /// The worker stopped
    Stopped { domain: String, reason: String },
}

/// Counters for one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Managed "A" records seen
    pub matched: usize,
    /// Records replaced with the current IP
    pub updated: usize,
    /// Records that already pointed at the current IP
    pub unchanged: usize,
    /// Records whose replacement failed
    pub failed: usize,
}

/// How a worker ended
#[derive(Debug)]
pub enum WorkerExit {
    /// Single-run pass went through reconciliation
    Completed(PassReport),
    /// Single-run pass could not resolve or list
    Aborted(Error),
    /// Shutdown was requested
    Cancelled,
}

impl WorkerExit {
    /// Whether the worker finished a full pass without any failure
    pub fn is_clean(&self) -> bool {
        matches!(self, WorkerExit::Completed(report) if report.failed == 0)
    }
}

/// Worker states, see the module documentation
#[derive(Debug)]
enum WorkerState {
    Resolving,
    Listing { ip: String },
    Reconciling { ip: String, records: Vec<DnsRecord> },
    Sleeping,
    Done(WorkerExit),
}

/// Reconciliation loop for one managed domain
///
/// ## Lifecycle
///
/// 1. Create with [`DomainWorker::new()`]
/// 2. Optionally attach a shutdown token and an event channel
/// 3. Drive with [`DomainWorker::run()`], which consumes the worker
pub struct DomainWorker {
    /// Domain settings (immutable for the worker's life)
    config: DomainConfig,

    /// Remote record operations for this domain
    provider: Box<dyn DnsProvider>,

    /// Shared external IP resolver
    resolver: Arc<IpResolver>,

    /// Single pass or forever
    mode: RunMode,

    /// Shutdown signal
    shutdown: CancellationToken,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<WorkerEvent>>,
}

impl DomainWorker {
    /// Create a worker for `config`
    pub fn new(
        config: DomainConfig,
        provider: Box<dyn DnsProvider>,
        resolver: Arc<IpResolver>,
        mode: RunMode,
    ) -> Self {
        Self {
            config,
            provider,
            resolver,
            mode,
            shutdown: CancellationToken::new(),
            event_tx: None,
        }
    }

    /// Stop the worker when `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Emit [`WorkerEvent`]s on `tx`
    ///
    /// Events are sent with `try_send`; when the channel is full the event
    /// is dropped with a warning rather than stalling the worker.
    pub fn with_events(mut self, tx: mpsc::Sender<WorkerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// The managed domain
    pub fn domain(&self) -> &str {
        &self.config.domain
    }

    /// Run until single-run completion, abort, or shutdown
    pub async fn run(self) -> WorkerExit {
        info!(
            domain = %self.config.domain,
            provider = self.provider.provider_name(),
            hostnames = ?self.config.hostnames,
            mode = ?self.mode,
            "Starting domain worker"
        );
        if self.config.is_noop() {
            warn!(domain = %self.config.domain, "No hostnames configured, worker will not update any record");
        }

        let mut state = WorkerState::Resolving;
        loop {
            state = match state {
                WorkerState::Done(exit) => {
                    let reason = match &exit {
                        WorkerExit::Completed(_) => "Single-run pass complete".to_string(),
                        WorkerExit::Aborted(e) => format!("Giving up: {}", e),
                        WorkerExit::Cancelled => "Shutdown signal".to_string(),
                    };
                    info!(domain = %self.config.domain, reason = %reason, "Domain worker stopped");
                    self.emit_event(WorkerEvent::Stopped {
                        domain: self.config.domain.clone(),
                        reason,
                    });
                    return exit;
                }
                other => self.step(other).await,
            };
        }
    }

    /// Advance the state machine by one transition
    async fn step(&self, state: WorkerState) -> WorkerState {
        let domain = &self.config.domain;

        match state {
            WorkerState::Resolving => {
                self.emit_event(WorkerEvent::PassStarted {
                    domain: domain.clone(),
                });
                match self.until_shutdown(self.resolver.resolve()).await {
                    None => WorkerState::Done(WorkerExit::Cancelled),
                    Some(Ok(ip)) => {
                        debug!(domain = %domain, ip = %ip, "External IP resolved");
                        self.emit_event(WorkerEvent::IpResolved {
                            domain: domain.clone(),
                            ip: ip.clone(),
                        });
                        WorkerState::Listing { ip }
                    }
                    Some(Err(e)) => self.cycle_failed(e),
                }
            }

            WorkerState::Listing { ip } => {
                match self.until_shutdown(self.provider.list_records(domain)).await {
                    None => WorkerState::Done(WorkerExit::Cancelled),
                    Some(Ok(records)) => {
                        debug!(domain = %domain, count = records.len(), "Listed remote records");
                        WorkerState::Reconciling { ip, records }
                    }
                    Some(Err(e)) => self.cycle_failed(Error::list_failed(domain.as_str(), e)),
                }
            }

            WorkerState::Reconciling { ip, records } => {
                let report = self.reconcile(&ip, records).await;
                info!(
                    domain = %domain,
                    matched = report.matched,
                    updated = report.updated,
                    unchanged = report.unchanged,
                    failed = report.failed,
                    "Update complete"
                );
                self.emit_event(WorkerEvent::PassCompleted {
                    domain: domain.clone(),
                    report,
                });

                match self.mode {
                    RunMode::SingleRun => WorkerState::Done(WorkerExit::Completed(report)),
                    RunMode::Daemon => {
                        info!(
                            domain = %domain,
                            "Will update again in {} seconds",
                            self.config.interval_secs
                        );
                        WorkerState::Sleeping
                    }
                }
            }

            WorkerState::Sleeping => {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => WorkerState::Done(WorkerExit::Cancelled),
                    _ = tokio::time::sleep(self.config.interval()) => WorkerState::Resolving,
                }
            }

            done @ WorkerState::Done(_) => done,
        }
    }

    /// Compare managed records against `ip` and replace the stale ones
    async fn reconcile(&self, ip: &str, records: Vec<DnsRecord>) -> PassReport {
        let domain = &self.config.domain;
        let mut report = PassReport::default();
        let mut plans = Vec::new();

        for record in records {
            if !is_managed(&self.config, &record) {
                continue;
            }

            report.matched += 1;
            debug!(domain = %domain, name = %record.name, "Running update check");

            if record.content == ip {
                report.unchanged += 1;
                self.emit_event(WorkerEvent::RecordUnchanged {
                    domain: domain.clone(),
                    name: record.name,
                });
            } else {
                plans.push(UpdatePlan::new(record, ip));
            }
        }

        for plan in plans {
            if self.shutdown.is_cancelled() {
                warn!(
                    domain = %domain,
                    name = %plan.current.name,
                    "Shutdown requested, leaving record for the next run"
                );
                continue;
            }

            match plan.apply(self.provider.as_ref(), domain).await {
                Ok(()) => {
                    report.updated += 1;
                    info!(
                        domain = %domain,
                        record_id = %plan.current.id,
                        name = %plan.current.name,
                        "Updated record with IP: {}",
                        plan.content
                    );
                    self.emit_event(WorkerEvent::RecordUpdated {
                        domain: domain.clone(),
                        name: plan.current.name.clone(),
                        previous: plan.current.content.clone(),
                        current: plan.content.clone(),
                    });
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        domain = %domain,
                        record_id = %plan.current.id,
                        name = %plan.current.name,
                        error = %e,
                        "Failed to update record with IP: {}",
                        plan.content
                    );
                    self.emit_event(WorkerEvent::RecordUpdateFailed {
                        domain: domain.clone(),
                        name: plan.current.name.clone(),
                        record_id: plan.current.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Apply the cycle failure policy for the current run mode
    fn cycle_failed(&self, err: Error) -> WorkerState {
        let domain = &self.config.domain;
        error!(domain = %domain, error = %err, "Reconciliation cycle failed");
        self.emit_event(WorkerEvent::CycleFailed {
            domain: domain.clone(),
            error: err.to_string(),
        });

        match self.mode {
            RunMode::Daemon => {
                info!(
                    domain = %domain,
                    "Will retry in {} seconds",
                    self.config.interval_secs
                );
                WorkerState::Sleeping
            }
            RunMode::SingleRun => WorkerState::Done(WorkerExit::Aborted(err)),
        }
    }

    /// Run `fut` unless shutdown is requested first
    async fn until_shutdown<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Emit a worker event
    fn emit_event(&self, event: WorkerEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing the channel capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped");
            }
        }
    }
}
