// # DNS Provider Trait
//
// Defines the interface the reconciliation core needs from a remote DNS
// provider: list, create and delete. There is no "update content" call;
// a stale record is replaced by deleting it and creating a new one.
//
// ## Implementations
//
// - Name.com: `dyndns-provider-namecom` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for record in provider.list_records("example.com").await? {
//         println!("{} {} {}", record.name, record.record_type, record.content);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Record type of IPv4 address records, the only type the core rewrites
pub const A_RECORD: &str = "A";

/// A DNS resource record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned identifier
    ///
    /// Never generated locally. Once the record is deleted the id is dead
    /// and must not be used again.
    pub id: String,
    /// Fully-qualified name as returned by the list call (e.g. "mail.example.com")
    pub name: String,
    /// Record type ("A", "AAAA", "CNAME", ...)
    pub record_type: String,
    /// Record content; an IP literal for "A" records
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Creation timestamp, in whatever format the provider reports
    pub created_at: Option<String>,
}

impl DnsRecord {
    /// Whether this is an IPv4 address record
    pub fn is_a_record(&self) -> bool {
        self.record_type == A_RECORD
    }
}

/// Payload of a create call
///
/// Unlike [`DnsRecord::name`], `hostname` is relative to the domain
/// (empty for the apex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Relative hostname ("" for the apex)
    pub hostname: String,
    /// Record type
    pub record_type: String,
    /// Record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

/// Trait for DNS provider implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// Providers are isolated, stateless, single-shot API clients.
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses, including semantic result codes
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (the domain worker re-polls on its interval)
/// - ❌ Decide which records are stale (owned by the matcher and worker)
/// - ❌ Cache records between calls
/// - ❌ Spawn tasks
///
/// A provider reports a non-success result code from its API as an error,
/// exactly like a transport failure.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record of `domain`
    ///
    /// Names in the returned records are fully-qualified.
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create a record in `domain`
    ///
    /// `record.hostname` is relative to `domain`.
    async fn create_record(&self, domain: &str, record: &NewRecord) -> Result<(), crate::Error>;

    /// Delete the record identified by `record_id` from `domain`
    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider for one managed domain
    fn create(
        &self,
        config: &crate::config::DomainConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
