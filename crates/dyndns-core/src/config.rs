//! Configuration types for the dyndns system
//!
//! The persisted configuration is a JSON document holding one entry per
//! managed domain, plus an optional list of IP mirrors:
//!
//! ```json
//! {
//!   "mirrors": ["https://api.ipify.org"],
//!   "configs": [
//!     {
//!       "domain": "example.com",
//!       "hostnames": ["", "mail"],
//!       "interval": 300,
//!       "username": "account",
//!       "token": "secret",
//!       "environment": "production"
//!     }
//!   ]
//! }
//! ```
//!
//! Entries may select the endpoint with `"dev": true` instead of
//! `"environment"`; files that only use `dev` keep loading unchanged.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Top-level persisted configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DyndnsConfig {
    /// IP mirror URLs, tried in order (empty = caller's defaults)
    #[serde(default)]
    pub mirrors: Vec<String>,

    /// One entry per managed domain
    #[serde(default, alias = "Configs")]
    pub configs: Vec<DomainConfig>,
}

impl DyndnsConfig {
    /// Load a configuration file from disk
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::Json`] if it does
    /// not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse a configuration document
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validate every domain entry and the mirror list
    pub fn validate(&self) -> Result<()> {
        if self.configs.is_empty() {
            return Err(Error::config("No domains configured"));
        }

        for mirror in &self.mirrors {
            if !mirror.starts_with("https://") && !mirror.starts_with("http://") {
                return Err(Error::config(format!(
                    "Mirror URL must use HTTP or HTTPS scheme. Got: {}",
                    mirror
                )));
            }
        }

        for config in &self.configs {
            config.validate()?;
        }

        Ok(())
    }
}

/// Settings for one managed domain
///
/// Constructed once at startup and never mutated while its worker runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DomainConfigEntry")]
pub struct DomainConfig {
    /// Domain name (e.g. "example.com")
    pub domain: String,

    /// Managed hostname labels; `""` stands for the domain apex
    #[serde(default)]
    pub hostnames: Vec<String>,

    /// Polling interval in seconds (daemon mode)
    #[serde(rename = "interval", default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Provider credentials
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Which provider endpoint to talk to
    #[serde(default)]
    pub environment: Environment,

    /// Provider type name, resolved through the registry
    #[serde(default = "default_provider")]
    pub provider: String,
}

impl DomainConfig {
    /// Create a domain configuration with default interval and environment
    pub fn new(domain: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            domain: domain.into(),
            hostnames: Vec::new(),
            interval_secs: default_interval_secs(),
            credentials,
            environment: Environment::default(),
            provider: default_provider(),
        }
    }

    /// Set the managed hostname labels
    pub fn with_hostnames<I, S>(mut self, hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hostnames = hostnames.into_iter().map(Into::into).collect();
        self
    }

    /// Set the polling interval
    pub fn with_interval_secs(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    /// Set the environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Polling interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Whether this entry manages no records at all
    pub fn is_noop(&self) -> bool {
        self.hostnames.is_empty()
    }

    /// Validate the domain configuration
    pub fn validate(&self) -> Result<()> {
        validate_domain_name(&self.domain)?;

        for hostname in &self.hostnames {
            // Empty label is the apex and always valid
            if hostname.is_empty() {
                continue;
            }
            validate_hostname(hostname)?;
        }

        if self.interval_secs == 0 {
            return Err(Error::config(format!(
                "Interval for {} must be at least 1 second",
                self.domain
            )));
        }

        if self.credentials.username.is_empty() || self.credentials.token.is_empty() {
            return Err(Error::config(format!(
                "Credentials for {} are incomplete (username and token are required)",
                self.domain
            )));
        }

        if self.provider.is_empty() {
            return Err(Error::config(format!(
                "Provider type for {} cannot be empty",
                self.domain
            )));
        }

        Ok(())
    }
}

/// On-disk shape of a [`DomainConfig`]
///
/// Accepts both the `environment` selector and the older `dev` flag.
#[derive(Deserialize)]
struct DomainConfigEntry {
    domain: String,
    #[serde(default)]
    hostnames: Vec<String>,
    #[serde(default = "default_interval_secs")]
    interval: u64,
    #[serde(flatten)]
    credentials: Credentials,
    #[serde(default)]
    environment: Option<Environment>,
    #[serde(default)]
    dev: Option<bool>,
    #[serde(default = "default_provider")]
    provider: String,
}

impl TryFrom<DomainConfigEntry> for DomainConfig {
    type Error = String;

    fn try_from(entry: DomainConfigEntry) -> std::result::Result<Self, Self::Error> {
        let environment = match (entry.environment, entry.dev) {
            (Some(environment), Some(dev)) if environment != Environment::from_dev_flag(dev) => {
                return Err(format!(
                    "{}: \"environment\": \"{}\" contradicts \"dev\": {}",
                    entry.domain, environment, dev
                ));
            }
            (Some(environment), _) => environment,
            (None, Some(dev)) => Environment::from_dev_flag(dev),
            (None, None) => Environment::default(),
        };

        Ok(Self {
            domain: entry.domain,
            hostnames: entry.hostnames,
            interval_secs: entry.interval,
            credentials: entry.credentials,
            environment,
            provider: entry.provider,
        })
    }
}

/// Provider account credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    #[serde(default)]
    pub username: String,

    /// API token
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub token: String,
}

impl Credentials {
    /// Create credentials from a username and token
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Provider endpoint selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Live provider API
    #[default]
    Production,
    /// Provider sandbox API
    Development,
}

impl Environment {
    /// Select the environment from a "dev" flag
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Environment::Development
        } else {
            Environment::Production
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => f.write_str("production"),
            Environment::Development => f.write_str("development"),
        }
    }
}

/// How long each domain worker runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One reconciliation pass per domain, then exit
    SingleRun,
    /// Reconcile forever, sleeping each domain's interval between passes
    Daemon,
}

impl RunMode {
    /// Select the mode from a "daemon" flag
    pub fn from_daemon_flag(daemon: bool) -> Self {
        if daemon { RunMode::Daemon } else { RunMode::SingleRun }
    }
}

/// Keep only the entries targeting `environment`
///
/// Returns a new vector; the input is left untouched.
pub fn filter_by_environment(
    configs: &[DomainConfig],
    environment: Environment,
) -> Vec<DomainConfig> {
    configs
        .iter()
        .filter(|c| c.environment == environment)
        .cloned()
        .collect()
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// It's not comprehensive but catches common errors.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        validate_label(label, domain)?;
    }

    Ok(())
}

/// Validate a managed hostname (relative to its domain)
///
/// Looser than [`validate_domain_name`]: the leftmost label may be the
/// wildcard `*`, and labels may contain underscores.
fn validate_hostname(hostname: &str) -> Result<()> {
    for (i, label) in hostname.split('.').enumerate() {
        if label == "*" {
            if i == 0 {
                continue;
            }
            return Err(Error::config(format!(
                "Wildcard must be the leftmost label. Hostname: '{}'",
                hostname
            )));
        }
        check_label(label, hostname, |c| c.is_ascii_alphanumeric() || c == '-' || c == '_')?;
    }
    Ok(())
}

fn validate_label(label: &str, name: &str) -> Result<()> {
    check_label(label, name, |c| c.is_ascii_alphanumeric() || c == '-')
}

fn check_label(label: &str, name: &str, allowed: impl Fn(char) -> bool) -> Result<()> {
    if label.is_empty() {
        return Err(Error::config(format!("Name has empty label: '{}'", name)));
    }

    if label.len() > 63 {
        return Err(Error::config(format!(
            "Label too long: {} chars (max 63). Label: '{}'",
            label.len(),
            label
        )));
    }

    if !label.chars().all(allowed) {
        return Err(Error::config(format!(
            "Label contains invalid characters. Label: '{}'",
            label
        )));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(Error::config(format!(
            "Label cannot start or end with hyphen. Label: '{}'",
            label
        )));
    }

    Ok(())
}

fn default_interval_secs() -> u64 {
    300
}

fn default_provider() -> String {
    "namecom".to_string()
}
