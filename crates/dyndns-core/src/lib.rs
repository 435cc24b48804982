// # dyndns-core
//
// Reconciliation core for the polling dynamic DNS daemon.
//
// ## Architecture Overview
//
// This library keeps DNS "A" records of managed hostnames pointed at the
// machine's current public IP:
// - **IpResolver**: Resolves the external IP through an ordered list of mirrors
// - **matcher**: Decides which remote records a domain manages
// - **updater**: Replaces a stale record (delete, then create)
// - **DomainWorker**: Per-domain resolve → list → reconcile → sleep loop
// - **Orchestrator**: Runs one worker per domain and joins them all
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Provider wire protocols and HTTP live in their own crates
// 2. **No Local State**: Every cycle is computed fresh from the provider and the mirrors
// 3. **Failure Isolation**: Record failures stay local, domain failures never cross workers
// 4. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod updater;

// Re-export core types for convenience
pub use config::{Credentials, DomainConfig, DyndnsConfig, Environment, RunMode};
pub use engine::{DomainWorker, PassReport, WorkerEvent, WorkerExit};
pub use error::{Error, Result};
pub use orchestrator::{DomainOutcome, ManagedDomain, Orchestrator, RunSummary};
pub use registry::ProviderRegistry;
pub use resolver::IpResolver;
pub use traits::{DnsProvider, DnsRecord, MirrorFetcher, NewRecord};
