//! Replacing a stale record: delete, then create
//!
//! The provider has no "update content" call, so a record is rewritten in
//! two steps. This is not atomic:
//!
//! - If the delete fails, nothing else happens and the stale record stays.
//! - If the delete succeeds and the create fails, the hostname has **no**
//!   record until a later cycle lists the domain again. The next pass will
//!   not see the old record either, so the gap only closes once a create
//!   succeeds. This is logged at `error` level every time it happens.

use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsRecord, NewRecord};
use tracing::{error, info};

/// A fetched record paired with the content it should have
///
/// Exists only inside one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// The record as listed by the provider
    pub current: DnsRecord,
    /// Desired content (the resolved IP)
    pub content: String,
}

impl UpdatePlan {
    /// Plan to point `current` at `content`
    pub fn new(current: DnsRecord, content: impl Into<String>) -> Self {
        Self {
            current,
            content: content.into(),
        }
    }

    /// The replacement record: same name, type and TTL, new content
    pub fn desired(&self) -> DnsRecord {
        DnsRecord {
            content: self.content.clone(),
            ..self.current.clone()
        }
    }

    /// Carry out the plan against `provider`
    pub async fn apply(&self, provider: &dyn DnsProvider, domain: &str) -> Result<()> {
        replace_record(provider, domain, &self.current.id, &self.desired()).await
    }
}

/// Convert a fully-qualified name into the hostname the create call expects
///
/// `"example.com"` becomes `""` and `"mail.example.com"` becomes `"mail"`
/// for domain `"example.com"`. Names outside the domain are returned as-is.
pub fn relative_hostname(name: &str, domain: &str) -> String {
    if name == domain {
        return String::new();
    }

    name.strip_suffix(domain)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .unwrap_or(name)
        .to_string()
}

/// Retire `record_id` and create `desired` in its place
///
/// # Errors
///
/// - [`Error::DeleteFailed`]: the delete call failed; create was not attempted.
/// - [`Error::CreateFailed`]: the old record is gone but the new one could
///   not be created.
pub async fn replace_record(
    provider: &dyn DnsProvider,
    domain: &str,
    record_id: &str,
    desired: &DnsRecord,
) -> Result<()> {
    info!(
        domain = %domain,
        record_id = %record_id,
        name = %desired.name,
        "Deleting DNS record"
    );
    provider
        .delete_record(domain, record_id)
        .await
        .map_err(|e| Error::delete_failed(domain, record_id, e))?;

    let replacement = NewRecord {
        hostname: relative_hostname(&desired.name, domain),
        record_type: desired.record_type.clone(),
        content: desired.content.clone(),
        ttl: desired.ttl,
    };

    info!(
        domain = %domain,
        hostname = %replacement.hostname,
        content = %replacement.content,
        "Creating DNS record"
    );
    if let Err(e) = provider.create_record(domain, &replacement).await {
        error!(
            domain = %domain,
            hostname = %replacement.hostname,
            deleted_record_id = %record_id,
            error = %e,
            "Record deleted but replacement not created; hostname has no record until the next cycle"
        );
        return Err(Error::create_failed(domain, replacement.hostname, e));
    }

    Ok(())
}
