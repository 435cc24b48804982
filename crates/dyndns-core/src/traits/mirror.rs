// # Mirror Fetcher Trait
//
// A mirror is one of several equivalent endpoints that report the caller's
// public IP as a plain-text body. The fetcher performs a single request
// against one mirror; failover across mirrors is done by `IpResolver`.
//
// ## Implementations
//
// - HTTP via reqwest: `dyndns-ip-http` crate

use async_trait::async_trait;

/// Trait for fetching the raw body of one IP mirror
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ One network request per call
///
/// ## Forbidden Capabilities
/// - ❌ Retry or try other mirrors (owned by `IpResolver`)
/// - ❌ Cache the result (every cycle resolves fresh)
///
/// Implementations should return an error for transport failures,
/// non-success statuses and empty bodies.
#[async_trait]
pub trait MirrorFetcher: Send + Sync {
    /// Fetch the body returned by `url`
    async fn fetch_mirror(&self, url: &str) -> Result<String, crate::Error>;
}
