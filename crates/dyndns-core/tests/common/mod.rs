//! Test doubles and common utilities for the reconciliation contract tests
//!
//! The fakes record every call so tests can assert on exact call counts
//! and ordering, and on the simulated time at which calls happened.

#![allow(dead_code)]

use dyndns_core::error::{Error, Result};
use dyndns_core::traits::{DnsProvider, DnsRecord, MirrorFetcher, NewRecord};
use dyndns_core::{Credentials, DomainConfig, IpResolver};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// One call observed by [`FakeProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    List(String),
    Delete { domain: String, record_id: String },
    Create { domain: String, record: NewRecord },
}

#[derive(Default)]
struct FakeProviderState {
    records: Mutex<Vec<DnsRecord>>,
    calls: Mutex<Vec<ProviderCall>>,
    list_instants: Mutex<Vec<Instant>>,
    fail_list: Mutex<bool>,
    fail_delete_ids: Mutex<HashSet<String>>,
    fail_create: Mutex<bool>,
}

/// A provider backed by an in-memory record list
///
/// Clones share state, so a test can keep one handle while the worker
/// owns another.
#[derive(Clone, Default)]
pub struct FakeProvider {
    state: Arc<FakeProviderState>,
}

impl FakeProvider {
    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        let provider = Self::default();
        *provider.state.records.lock().unwrap() = records;
        provider
    }

    pub fn fail_list(&self, fail: bool) {
        *self.state.fail_list.lock().unwrap() = fail;
    }

    pub fn fail_delete_of(&self, record_id: &str) {
        self.state
            .fail_delete_ids
            .lock()
            .unwrap()
            .insert(record_id.to_string());
    }

    pub fn fail_create(&self, fail: bool) {
        *self.state.fail_create.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn list_count(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::List(_)))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::Delete { .. }))
    }

    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::Create { .. }))
    }

    /// Simulated instants at which list_records was called
    pub fn list_instants(&self) -> Vec<Instant> {
        self.state.list_instants.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.state.records.lock().unwrap().clone()
    }

    pub fn boxed(&self) -> Box<dyn DnsProvider> {
        Box::new(self.clone())
    }

    fn count(&self, pred: impl Fn(&ProviderCall) -> bool) -> usize {
        self.state.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

#[async_trait::async_trait]
impl DnsProvider for FakeProvider {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        self.state
            .calls
            .lock()
            .unwrap()
            .push(ProviderCall::List(domain.to_string()));
        self.state.list_instants.lock().unwrap().push(Instant::now());

        if *self.state.fail_list.lock().unwrap() {
            return Err(Error::provider("fake", "list refused"));
        }
        Ok(self.records())
    }

    async fn create_record(&self, domain: &str, record: &NewRecord) -> Result<()> {
        self.state.calls.lock().unwrap().push(ProviderCall::Create {
            domain: domain.to_string(),
            record: record.clone(),
        });

        if *self.state.fail_create.lock().unwrap() {
            return Err(Error::provider("fake", "create refused"));
        }

        let mut records = self.state.records.lock().unwrap();
        let id = format!("new-{}", records.len() + 1);
        let name = if record.hostname.is_empty() {
            domain.to_string()
        } else {
            format!("{}.{}", record.hostname, domain)
        };
        records.push(DnsRecord {
            id,
            name,
            record_type: record.record_type.clone(),
            content: record.content.clone(),
            ttl: record.ttl,
            created_at: None,
        });
        Ok(())
    }

    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<()> {
        self.state.calls.lock().unwrap().push(ProviderCall::Delete {
            domain: domain.to_string(),
            record_id: record_id.to_string(),
        });

        if self.state.fail_delete_ids.lock().unwrap().contains(record_id) {
            return Err(Error::provider("fake", format!("cannot delete {}", record_id)));
        }

        let mut records = self.state.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(Error::provider("fake", format!("no record {}", record_id)));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// A mirror fetcher that always answers the same way
pub struct FixedMirror {
    answer: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl FixedMirror {
    pub fn answering(ip: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Some(ip.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_answer(&self, ip: Option<&str>) {
        *self.answer.lock().unwrap() = ip.map(str::to_string);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MirrorFetcher for FixedMirror {
    async fn fetch_mirror(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::http(format!("{} unreachable", url)))
    }
}

/// Resolver with a single mirror served by `mirror`
pub fn resolver(mirror: Arc<FixedMirror>) -> Arc<IpResolver> {
    Arc::new(IpResolver::new(vec!["http://mirror.test/raw".to_string()], mirror).unwrap())
}

/// An "A" record
pub fn a_record(id: &str, name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: id.to_string(),
        name: name.to_string(),
        record_type: "A".to_string(),
        content: content.to_string(),
        ttl: 300,
        created_at: Some("2024-01-01 00:00:00".to_string()),
    }
}

/// A record of an arbitrary type
pub fn record_of_type(id: &str, name: &str, record_type: &str, content: &str) -> DnsRecord {
    DnsRecord {
        record_type: record_type.to_string(),
        ..a_record(id, name, content)
    }
}

/// Domain configuration for tests
pub fn domain_config(domain: &str, hostnames: &[&str], interval_secs: u64) -> DomainConfig {
    DomainConfig::new(domain, Credentials::new("test-user", "test-token"))
        .with_hostnames(hostnames.iter().copied())
        .with_interval_secs(interval_secs)
}
