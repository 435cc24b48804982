//! Decides which remote records a domain configuration manages.

use crate::config::DomainConfig;
use crate::traits::DnsRecord;

/// Whether a fully-qualified record name belongs to `config`
///
/// The empty hostname label stands for the domain itself; any other label
/// matches `label.domain`.
pub fn name_matches(config: &DomainConfig, name: &str) -> bool {
    let label = name
        .strip_suffix(config.domain.as_str())
        .map(|prefix| prefix.strip_suffix('.'));

    config.hostnames.iter().any(|hostname| match label {
        // name == domain
        Some(None) if name.len() == config.domain.len() => hostname.is_empty(),
        Some(Some(prefix)) => !hostname.is_empty() && prefix == hostname,
        _ => false,
    })
}

/// Whether `record` is one the worker should keep pointed at the current IP
///
/// Only "A" records qualify; every other type is ignored whatever its name.
pub fn is_managed(config: &DomainConfig, record: &DnsRecord) -> bool {
    record.is_a_record() && name_matches(config, &record.name)
}
