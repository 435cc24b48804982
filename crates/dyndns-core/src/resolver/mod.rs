//! External IP resolution with mirror failover
//!
//! The resolver asks each configured mirror in order and returns the first
//! usable answer. Mirrors after the first success are never contacted.
//! There is no retry inside one call: a cycle that cannot resolve its IP
//! fails, and the domain worker decides what happens next.

use crate::error::{Error, Result};
use crate::traits::MirrorFetcher;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves the machine's public IP through an ordered list of mirrors
pub struct IpResolver {
    /// Mirror URLs, in priority order (never empty)
    mirrors: Vec<String>,

    /// Transport used for each attempt
    fetcher: Arc<dyn MirrorFetcher>,
}

impl IpResolver {
    /// Create a resolver over `mirrors`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `mirrors` is empty.
    pub fn new(mirrors: Vec<String>, fetcher: Arc<dyn MirrorFetcher>) -> Result<Self> {
        if mirrors.is_empty() {
            return Err(Error::config("At least one IP mirror is required"));
        }

        Ok(Self { mirrors, fetcher })
    }

    /// Mirror URLs in the order they are tried
    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    /// Resolve the current external IP
    ///
    /// Returns the trimmed body of the first mirror that answers with a
    /// non-empty body, or [`Error::ResolutionFailed`] when all of them fail.
    pub async fn resolve(&self) -> Result<String> {
        for url in &self.mirrors {
            match self.fetcher.fetch_mirror(url).await {
                Ok(body) => {
                    let ip = body.trim();
                    if ip.is_empty() {
                        warn!(mirror = %url, "Mirror returned an empty body");
                        continue;
                    }
                    debug!(mirror = %url, ip = %ip, "Resolved external IP");
                    return Ok(ip.to_string());
                }
                Err(e) => {
                    warn!(mirror = %url, error = %e, "Mirror failed, trying next");
                }
            }
        }

        Err(Error::ResolutionFailed {
            attempted: self.mirrors.len(),
        })
    }
}

impl std::fmt::Debug for IpResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpResolver")
            .field("mirrors", &self.mirrors)
            .finish_non_exhaustive()
    }
}
