//! Core traits for the dyndns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: List, create and delete records via provider APIs
//! - [`MirrorFetcher`]: Fetch the public IP reported by one mirror

pub mod dns_provider;
pub mod mirror;

pub use dns_provider::{A_RECORD, DnsProvider, DnsProviderFactory, DnsRecord, NewRecord};
pub use mirror::MirrorFetcher;
