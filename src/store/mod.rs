//! Persistence for the lookup tables the validators consult
//!
//! Blacklists and banned addresses are read-mostly: validators only query
//! them, and changes come from the admin commands. The comment log records
//! earlier dispositions so repeat offenders can be scored by history.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

pub use common::AddressPattern;

/// A named, weighted set of spam-indicative phrases
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blacklist {
    pub id: i64,
    pub name: String,
    /// Multiplier applied to similarity scores from this list
    pub weight: f64,
    pub phrases: Vec<String>,
}

#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Create a blacklist if it does not exist and return its id
    async fn add_blacklist(&self, name: &str, weight: f64) -> Result<i64, StoreError>;

    /// Delete a blacklist and its phrases
    async fn remove_blacklist(&self, name: &str) -> Result<(), StoreError>;

    async fn set_blacklist_weight(&self, name: &str, weight: f64) -> Result<(), StoreError>;

    /// Add a phrase to an existing blacklist. Duplicates are ignored.
    async fn add_phrase(&self, blacklist: &str, phrase: &str) -> Result<(), StoreError>;

    async fn remove_phrase(&self, blacklist: &str, phrase: &str) -> Result<(), StoreError>;

    /// All blacklists with their phrases, ordered by name
    async fn list_blacklists(&self) -> Result<Vec<Blacklist>, StoreError>;

    /// Ban an address or CIDR range. Returns `true` if it was not banned before.
    async fn ban_ip(&self, address: &str) -> Result<bool, StoreError>;

    async fn unban_ip(&self, address: &str) -> Result<(), StoreError>;

    /// Banned entries ordered by address
    async fn list_banned_ips(&self) -> Result<Vec<String>, StoreError>;

    /// Log the disposition of an accepted or held comment
    async fn record_comment(&self, ip_address: &str, is_public: bool) -> Result<(), StoreError>;

    /// Number of non-public comments logged for `ip_address`
    async fn count_held(&self, ip_address: &str) -> Result<u64, StoreError>;

    /// Every phrase across all blacklists, without duplicates
    async fn all_phrases(&self) -> Result<Vec<String>, StoreError> {
        let mut seen = HashSet::new();
        let mut phrases = Vec::new();
        for list in self.list_blacklists().await? {
            for phrase in list.phrases {
                if seen.insert(phrase.clone()) {
                    phrases.push(phrase);
                }
            }
        }
        Ok(phrases)
    }

    /// Check `ip` against every banned address and range
    async fn is_banned(&self, ip: IpAddr) -> Result<bool, StoreError> {
        let banned = self.list_banned_ips().await?;
        Ok(banned.iter().any(|entry| match entry.parse::<AddressPattern>() {
            Ok(pattern) => pattern.contains(ip),
            Err(_) => {
                tracing::debug!(entry = %entry, "Skipping unparseable banned address");
                false
            }
        }))
    }
}

pub type DynStore = Arc<dyn ModerationStore>;

pub mod common;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod seed;
pub mod sqlite;

/// Create a store backend from a connection URI.
pub async fn open(uri: &str) -> Result<DynStore, StoreError> {
    if uri.starts_with("sqlite:") {
        Ok(Arc::new(sqlite::SqliteStore::new(uri).await?))
    } else if uri.starts_with("postgres:") {
        #[cfg(feature = "postgres")]
        {
            Ok(Arc::new(postgres::PostgresStore::new(uri).await?))
        }
        #[cfg(not(feature = "postgres"))]
        {
            Err(StoreError::UnknownBackend(
                "postgres backend not enabled".into(),
            ))
        }
    } else {
        Err(StoreError::UnknownBackend(uri.to_string()))
    }
}

/// Result of banning a batch of addresses
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BanReport {
    pub newly_banned: usize,
    pub already_banned: usize,
}

impl std::fmt::Display for BanReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let new = self.newly_banned;
        write!(
            f,
            "Banned {new} new IP address{}.",
            if new == 1 { "" } else { "es" }
        )?;
        match self.already_banned {
            0 => Ok(()),
            1 => write!(f, " 1 was already banned."),
            n => write!(f, " {n} were already banned."),
        }
    }
}

/// Ban every address in `addresses`, counting each distinct address once.
///
/// Addresses are validated before anything is written.
pub async fn ban_addresses<S>(store: &S, addresses: &[String]) -> Result<BanReport, StoreError>
where
    S: ModerationStore + ?Sized,
{
    for address in addresses {
        address.parse::<AddressPattern>()?;
    }
    let mut seen = HashSet::new();
    let mut report = BanReport::default();
    for address in addresses {
        let address = address.trim();
        if !seen.insert(address) {
            continue;
        }
        if store.ban_ip(address).await? {
            report.newly_banned += 1;
        } else {
            report.already_banned += 1;
        }
    }
    tracing::info!(
        new = report.newly_banned,
        existing = report.already_banned,
        "Banned addresses"
    );
    Ok(report)
}
