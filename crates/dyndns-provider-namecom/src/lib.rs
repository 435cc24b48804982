// # Name.com DNS Provider
//
// This crate provides a Name.com DNS provider implementation for the dyndns system.
//
// ## Implementation Status
//
// - ✅ One HTTP request per trait call
// - ✅ Full error propagation to the worker (the worker owns re-polling)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Semantic result codes checked on every response, not just HTTP status
// - ✅ Production and development endpoints
// - ❌ NO retry logic (the domain worker simply tries again next interval)
// - ❌ NO caching (every pass lists fresh)
// - ❌ NO background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Factory MUST fail fast if credentials are empty
//
// ## API Reference (Name.com API v1)
//
// Every request carries `api-username` and `api-token` headers. Every
// response carries a `result` object; `code == 100` means success, anything
// else is a failure described by `message`.
//
// - List:   GET  `api/dns/list/{domain}`
// - Create: POST `api/dns/create/{domain}` `{hostname, type, content, ttl}`
// - Delete: POST `api/dns/delete/{domain}` `{record_id}`

use async_trait::async_trait;
use dyndns_core::config::{DomainConfig, Environment};
use dyndns_core::traits::{A_RECORD, DnsProvider, DnsProviderFactory, DnsRecord, NewRecord};
use dyndns_core::{Error, ProviderRegistry, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Production API base URL
pub const PRODUCTION_URL: &str = "https://api.name.com/";

/// Development (sandbox) API base URL
pub const DEVELOPMENT_URL: &str = "https://api.dev.name.com/";

/// Result code Name.com uses for success
const SUCCESS_CODE: i64 = 100;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "namecom";

/// Base URL for `environment`
pub fn base_url_for(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => PRODUCTION_URL,
        Environment::Development => DEVELOPMENT_URL,
    }
}

/// `result` object present in every response
#[derive(Debug, Deserialize)]
struct ResultStatus {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    result: ResultStatus,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    result: ResultStatus,
    #[serde(default)]
    records: Vec<WireRecord>,
}

/// TTLs arrive as strings; accept bare numbers too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTtl {
    Text(String),
    Number(u32),
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    record_id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    ttl: WireTtl,
    #[serde(default)]
    create_date: Option<String>,
}

impl WireRecord {
    fn into_record(self) -> Result<DnsRecord> {
        let ttl = match self.ttl {
            WireTtl::Number(ttl) => ttl,
            WireTtl::Text(raw) => raw.trim().parse().map_err(|_| {
                Error::provider(
                    PROVIDER,
                    format!("Invalid TTL '{}' on record {}", raw, self.record_id),
                )
            })?,
        };

        Ok(DnsRecord {
            id: self.record_id,
            name: self.name,
            record_type: self.record_type,
            content: self.content,
            ttl,
            created_at: self.create_date,
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    hostname: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    content: &'a str,
    ttl: String,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    record_id: &'a str,
}

/// Name.com DNS provider
///
/// Stateless apart from the HTTP client; one instance serves one account.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct NameComProvider {
    /// Account name
    username: String,

    /// API token
    /// ⚠️ NEVER log this value
    token: String,

    /// API base URL, always ending in '/'
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for NameComProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameComProvider")
            .field("username", &self.username)
            .field("token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl NameComProvider {
    /// Create a provider for `environment`
    ///
    /// # Errors
    ///
    /// A configuration error if either credential is empty.
    pub fn new(
        username: impl Into<String>,
        token: impl Into<String>,
        environment: Environment,
    ) -> Result<Self> {
        Self::with_base_url(username, token, base_url_for(environment))
    }

    /// Create a provider against an explicit base URL
    pub fn with_base_url(
        username: impl Into<String>,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let username = username.into();
        let token = token.into();
        if username.is_empty() || token.is_empty() {
            return Err(Error::config("Name.com username and token are required"));
        }

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            username,
            token,
            base_url,
            client,
        })
    }

    /// API base URL in use
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, action: &str, domain: &str) -> String {
        format!("{}api/dns/{}/{}", self.base_url, action, domain)
    }

    /// Send `request` with auth headers and decode the JSON envelope
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .header("api-username", &self.username)
            .header("api-token", &self.token)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to read response: {}", e)))?;

        match serde_json::from_str(&body) {
            Ok(envelope) => Ok(envelope),
            // The API normally answers with a result envelope even on errors;
            // fall back to the HTTP status when it does not.
            Err(_) if !status.is_success() => Err(status_error(status)),
            Err(e) => Err(Error::provider(
                PROVIDER,
                format!("Failed to parse response: {}", e),
            )),
        }
    }
}

fn status_error(status: reqwest::StatusCode) -> Error {
    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: invalid username/token or insufficient permissions. Status: {}",
            status
        ),
        404 => format!("Endpoint or domain not found. Status: {}", status),
        429 => format!("Rate limit exceeded. Status: {}", status),
        500..=599 => format!("Name.com server error (transient): {}", status),
        _ => format!("Unexpected status: {}", status),
    };
    Error::provider(PROVIDER, message)
}

fn check(result: &ResultStatus) -> Result<()> {
    if result.code == SUCCESS_CODE {
        return Ok(());
    }
    let message = if result.message.is_empty() {
        format!("API returned code {}", result.code)
    } else {
        result.message.clone()
    };
    Err(Error::provider(PROVIDER, message))
}

#[async_trait]
impl DnsProvider for NameComProvider {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        tracing::debug!(domain = %domain, "Listing Name.com DNS records");

        let envelope: ListEnvelope = self
            .send(self.client.get(self.endpoint("list", domain)))
            .await?;
        check(&envelope.result)?;

        let mut records = Vec::with_capacity(envelope.records.len());
        for wire in envelope.records {
            let is_a = wire.record_type == A_RECORD;
            let (record_id, name) = (wire.record_id.clone(), wire.name.clone());
            match wire.into_record() {
                Ok(record) => records.push(record),
                // Only "A" records are ever rewritten; the rest can be skipped
                Err(e) if !is_a => {
                    tracing::warn!(
                        domain = %domain,
                        record_id = %record_id,
                        name = %name,
                        error = %e,
                        "Skipping record with unreadable TTL"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    async fn create_record(&self, domain: &str, record: &NewRecord) -> Result<()> {
        tracing::debug!(
            domain = %domain,
            hostname = %record.hostname,
            record_type = %record.record_type,
            "Creating Name.com DNS record"
        );

        let body = CreateBody {
            hostname: &record.hostname,
            record_type: &record.record_type,
            content: &record.content,
            ttl: record.ttl.to_string(),
        };
        let envelope: StatusEnvelope = self
            .send(self.client.post(self.endpoint("create", domain)).json(&body))
            .await?;
        check(&envelope.result)
    }

    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<()> {
        tracing::debug!(domain = %domain, record_id = %record_id, "Deleting Name.com DNS record");

        let body = DeleteBody { record_id };
        let envelope: StatusEnvelope = self
            .send(self.client.post(self.endpoint("delete", domain)).json(&body))
            .await?;
        check(&envelope.result)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Name.com providers
pub struct NameComFactory;

impl DnsProviderFactory for NameComFactory {
    fn create(&self, config: &DomainConfig) -> Result<Box<dyn DnsProvider>> {
        if config.environment == Environment::Development {
            tracing::warn!(domain = %config.domain, "Using the Name.com development API");
        }

        let provider = NameComProvider::new(
            config.credentials.username.clone(),
            config.credentials.token.clone(),
            config.environment,
        )?;
        Ok(Box::new(provider))
    }
}

/// Register the Name.com provider with a registry
///
/// # Example
///
/// ```rust
/// use dyndns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dyndns_provider_namecom::register(&registry);
/// assert!(registry.has_provider("namecom"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(NameComFactory));
}
