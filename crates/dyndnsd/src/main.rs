// # dyndnsd - Dynamic DNS Daemon
//
// Thin integration layer: all reconciliation logic lives in dyndns-core.
//
// The dyndnsd daemon is responsible for:
// 1. Reading settings from environment variables
// 2. Installing the log sink (stdout or an append-only file)
// 3. Loading and validating the JSON domain configuration
// 4. Registering providers and building one provider client per domain
// 5. Running the orchestrator until the pass completes or a signal arrives
//
// ## Configuration
//
// Daemon settings come from environment variables:
//
// - `DYNDNS_CONFIG`: Path to the JSON configuration (default `./config.json`)
// - `DYNDNS_DAEMON`: Poll forever instead of running a single pass (default false)
// - `DYNDNS_DEV`: Use the development entries and API (default false)
// - `DYNDNS_LOG_FILE`: Append logs to this file instead of stdout
// - `DYNDNS_LOG_LEVEL`: trace, debug, info, warn or error (default info)
// - `DYNDNS_MIRRORS`: Comma-separated IP mirrors, overriding the configuration
// - `DYNDNS_HTTP_TIMEOUT_SECS`: Per-request timeout for IP mirrors (default 10)
//
// Managed domains come from the JSON file:
//
// ```json
// {
//   "mirrors": ["http://myexternalip.com/raw"],
//   "configs": [
//     {
//       "domain": "example.com",
//       "hostnames": ["", "mail"],
//       "interval": 300,
//       "username": "alice",
//       "token": "...",
//       "environment": "production"
//     }
//   ]
// }
// ```
//
// ## Example
//
// ```bash
// export DYNDNS_CONFIG=/etc/dyndns/config.json
// export DYNDNS_DAEMON=true
// export DYNDNS_LOG_FILE=/var/log/dyndns.log
//
// dyndnsd
// ```

use anyhow::{Context, Result};
use dyndns_core::config::{DyndnsConfig, Environment, RunMode, filter_by_environment};
use dyndns_core::{IpResolver, ManagedDomain, Orchestrator, ProviderRegistry, RunSummary};
use dyndns_ip_http::HttpMirrorFetcher;
use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (a domain aborted or a record failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DyndnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DyndnsExitCode> for ExitCode {
    fn from(code: DyndnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings
#[derive(Debug)]
struct Settings {
    config_path: PathBuf,
    daemon: bool,
    dev: bool,
    log_file: Option<PathBuf>,
    log_level: String,
    mirrors: Option<Vec<String>>,
    http_timeout_secs: u64,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            config_path: env::var("DYNDNS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./config.json")),
            daemon: env_flag("DYNDNS_DAEMON")?,
            dev: env_flag("DYNDNS_DEV")?,
            log_file: env::var("DYNDNS_LOG_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            log_level: env::var("DYNDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            mirrors: env::var("DYNDNS_MIRRORS").ok().map(|s| split_list(&s)),
            http_timeout_secs: match env::var("DYNDNS_HTTP_TIMEOUT_SECS") {
                Ok(raw) => raw.trim().parse().with_context(|| {
                    format!("DYNDNS_HTTP_TIMEOUT_SECS must be a number of seconds. Got: {}", raw)
                })?,
                Err(_) => dyndns_ip_http::DEFAULT_TIMEOUT.as_secs(),
            },
        })
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        if self.config_path.as_os_str().is_empty() {
            anyhow::bail!("DYNDNS_CONFIG cannot be empty");
        }

        log_level(&self.log_level)?;

        if !(1..=300).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "DYNDNS_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        if let Some(ref mirrors) = self.mirrors {
            if mirrors.is_empty() {
                anyhow::bail!(
                    "DYNDNS_MIRRORS is set but lists no mirror. \
                    Unset it to use the configured or default mirrors."
                );
            }
            for mirror in mirrors {
                if !mirror.starts_with("https://") && !mirror.starts_with("http://") {
                    anyhow::bail!("DYNDNS_MIRRORS entries must use HTTP or HTTPS. Got: {}", mirror);
                }
            }
        }

        if let Some(ref path) = self.log_file
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "DYNDNS_LOG_FILE parent directory does not exist: {}. \
                Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        Ok(())
    }

    fn run_mode(&self) -> RunMode {
        RunMode::from_daemon_flag(self.daemon)
    }

    fn environment(&self) -> Environment {
        Environment::from_dev_flag(self.dev)
    }
}

/// Read a boolean environment variable; unset means false
fn env_flag(name: &str) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => parse_flag(&raw).with_context(|| name.to_string()),
        Err(_) => Ok(false),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("'{}' is not a boolean (use true or false)", other),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn log_level(raw: &str) -> Result<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DYNDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

/// Install the global subscriber, writing to stdout or appending to `log_file`
fn init_logging(level: Level, log_file: Option<&Path>) -> Result<()> {
    match log_file {
        None => {
            let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Mirrors in order of precedence: environment, configuration, built-in list
fn select_mirrors(from_env: Option<&[String]>, from_config: &[String]) -> Vec<String> {
    match from_env {
        Some(mirrors) if !mirrors.is_empty() => mirrors.to_vec(),
        _ if !from_config.is_empty() => from_config.to_vec(),
        _ => dyndns_ip_http::default_mirrors(),
    }
}

/// Map the outcome of a run to the process exit code
fn exit_code_for(mode: RunMode, summary: &RunSummary, skipped: usize) -> DyndnsExitCode {
    let failed = match mode {
        RunMode::SingleRun => summary.failures().count(),
        // Daemon workers only end by cancellation; anything else is a crash
        RunMode::Daemon => summary
            .outcomes
            .iter()
            .filter(|o| matches!(o.exit, dyndns_core::WorkerExit::Aborted(_)))
            .count(),
    };

    if failed + skipped == 0 {
        DyndnsExitCode::CleanShutdown
    } else {
        DyndnsExitCode::RuntimeError
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DyndnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = settings.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DyndnsExitCode::ConfigError.into();
    }

    let level = log_level(&settings.log_level).unwrap_or(Level::INFO);
    if let Err(e) = init_logging(level, settings.log_file.as_deref()) {
        eprintln!("Failed to set up logging: {:#}", e);
        return DyndnsExitCode::ConfigError.into();
    }

    info!("Starting dyndnsd");

    let config = match DyndnsConfig::load(&settings.config_path).and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %settings.config_path.display(), "Error loading config: {}", e);
            return DyndnsExitCode::ConfigError.into();
        }
    };

    let environment = settings.environment();
    let domains = filter_by_environment(&config.configs, environment);
    info!(
        environment = %environment,
        "Successfully loaded {} config(s)",
        domains.len()
    );
    if domains.is_empty() {
        warn!(environment = %environment, "No configuration targets this environment, nothing to do");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DyndnsExitCode::RuntimeError.into();
        }
    };

    let mode = settings.run_mode();
    let mirrors = select_mirrors(settings.mirrors.as_deref(), &config.mirrors);

    rt.block_on(async {
        match run_daemon(&settings, mode, mirrors, domains).await {
            Ok((summary, skipped)) => exit_code_for(mode, &summary, skipped),
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DyndnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the workers and run them
///
/// Returns the run summary and the number of domains that could not be
/// started.
async fn run_daemon(
    settings: &Settings,
    mode: RunMode,
    mirrors: Vec<String>,
    domains: Vec<dyndns_core::DomainConfig>,
) -> Result<(RunSummary, usize)> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "namecom")]
    {
        info!("Registering Name.com provider");
        dyndns_provider_namecom::register(&registry);
    }

    if registry.list_providers().is_empty() {
        warn!("No DNS provider compiled in; every domain will be skipped");
    }

    let fetcher = HttpMirrorFetcher::with_timeout(Duration::from_secs(settings.http_timeout_secs))?;
    info!(mirrors = ?mirrors, "Using IP mirrors");
    let resolver = Arc::new(IpResolver::new(mirrors, Arc::new(fetcher))?);

    let mut managed = Vec::with_capacity(domains.len());
    let mut skipped = 0;
    for config in domains {
        match registry.create_provider(&config) {
            Ok(provider) => managed.push(ManagedDomain::new(config, provider)),
            Err(e) => {
                error!(domain = %config.domain, error = %e, "Failed to create provider, skipping domain");
                skipped += 1;
            }
        }
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                info!("Received shutdown signal: {}", signal);
                signal_token.cancel();
            }
            Err(e) => error!("Shutdown handler error: {:#}", e),
        }
    });

    let orchestrator = Orchestrator::new(resolver, mode).with_shutdown(shutdown);
    let summary = orchestrator.run(managed).await;
    signal_task.abort();

    if mode == RunMode::SingleRun {
        for failure in summary.failures() {
            warn!(domain = %failure.domain, exit = ?failure.exit, "Domain did not finish cleanly");
        }
    }
    info!("Shutting down dyndnsd");

    Ok((summary, skipped))
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
