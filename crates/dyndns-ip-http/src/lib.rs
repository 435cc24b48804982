// # HTTP Mirror Fetcher
//
// This crate provides the HTTP transport behind `dyndns_core::IpResolver`.
//
// ## Architecture
//
// A mirror is any URL whose response body is the caller's public IP as
// plain text (e.g. "203.0.113.7\n"). The fetcher performs one GET per call
// and hands the raw body back; trimming and failover across mirrors are
// owned by the resolver.
//
// ## Failure Semantics
//
// Transport errors, timeouts, non-2xx statuses, unreadable bodies and
// empty bodies are all reported as `Error::Http`, which the resolver
// treats as "try the next mirror".

use dyndns_core::traits::MirrorFetcher;
use dyndns_core::{Error, Result};
use std::time::Duration;

/// Mirrors used when neither the configuration nor the environment names any
pub const DEFAULT_MIRRORS: &[&str] = &[
    "http://myexternalip.com/raw",
    "https://api.ipify.org",  // returns plain text IP
    "https://icanhazip.com",  // No rate limit documented
    "https://ifconfig.me/ip", // No rate limit documented
];

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`MirrorFetcher`] over a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpMirrorFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpMirrorFetcher {
    /// Create a fetcher with [`DEFAULT_TIMEOUT`]
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// [`DEFAULT_MIRRORS`] as owned strings
pub fn default_mirrors() -> Vec<String> {
    DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect()
}

#[async_trait::async_trait]
impl MirrorFetcher for HttpMirrorFetcher {
    async fn fetch_mirror(&self, url: &str) -> Result<String> {
        tracing::debug!(mirror = %url, "Querying IP mirror");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!("{} answered with status {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response from {}: {}", url, e)))?;

        if body.trim().is_empty() {
            return Err(Error::http(format!("{} returned an empty body", url)));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyndns_core::IpResolver;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/raw"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.7\n"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpMirrorFetcher::new().unwrap();
        let body = fetcher
            .fetch_mirror(&format!("{}/raw", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, "203.0.113.7\n");
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("203.0.113.7"))
            .mount(&server)
            .await;

        let fetcher = HttpMirrorFetcher::new().unwrap();
        let err = fetcher.fetch_mirror(&server.uri()).await.unwrap_err();

        assert!(matches!(err, Error::Http(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn blank_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
            .mount(&server)
            .await;

        let fetcher = HttpMirrorFetcher::new().unwrap();
        assert!(fetcher.fetch_mirror(&server.uri()).await.is_err());
    }

    #[tokio::test]
    async fn slow_mirror_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("203.0.113.7")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpMirrorFetcher::with_timeout(Duration::from_millis(200)).unwrap();
        assert!(fetcher.fetch_mirror(&server.uri()).await.is_err());
    }

    #[tokio::test]
    async fn resolver_fails_over_to_next_mirror() {
        let broken = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&broken)
            .await;

        let healthy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("198.51.100.4\n"))
            .expect(1)
            .mount(&healthy)
            .await;

        let resolver = IpResolver::new(
            vec![broken.uri(), healthy.uri()],
            Arc::new(HttpMirrorFetcher::new().unwrap()),
        )
        .unwrap();

        assert_eq!(resolver.resolve().await.unwrap(), "198.51.100.4");
    }

    #[test]
    fn default_mirrors_start_with_myexternalip() {
        let mirrors = default_mirrors();
        assert_eq!(mirrors[0], "http://myexternalip.com/raw");
        assert!(mirrors.iter().all(|m| m.starts_with("http")));
    }
}
