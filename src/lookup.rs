// 🔎 Item Lookup - "retrieve one item by identifier"
//
// Two interchangeable strategies behind one trait:
// - RemoteLookup: GET /api/pokemon/{id}, body is the item
// - LocalScan:    GET /pokemons.json, first record whose key stringifies to id
//
// Which one runs is a configuration choice (`LookupStrategy`).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CatalogResult;
use crate::model::{find_by_identifier, CatalogRecord, DisplayRecord};
use crate::source::{fetch_catalog, lookup_path, HttpFetch};

#[async_trait]
pub trait ItemLookup: Send + Sync {
    /// Ok(None) means the source answered but has no such item
    async fn lookup(&self, identifier: &str) -> CatalogResult<Option<DisplayRecord>>;

    fn strategy(&self) -> LookupStrategy;
}

// ============================================================================
// STRATEGY SELECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupStrategy {
    /// Scan the static catalog resource
    #[default]
    Local,

    /// Ask the single-item API endpoint
    Remote,
}

impl LookupStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStrategy::Local => "local",
            LookupStrategy::Remote => "remote",
        }
    }

    pub fn build(self, fetch: Arc<dyn HttpFetch>) -> Arc<dyn ItemLookup> {
        match self {
            LookupStrategy::Local => Arc::new(LocalScan::new(fetch)),
            LookupStrategy::Remote => Arc::new(RemoteLookup::new(fetch)),
        }
    }
}

impl fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REMOTE LOOKUP
// ============================================================================

pub struct RemoteLookup {
    fetch: Arc<dyn HttpFetch>,
}

impl RemoteLookup {
    pub fn new(fetch: Arc<dyn HttpFetch>) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl ItemLookup for RemoteLookup {
    async fn lookup(&self, identifier: &str) -> CatalogResult<Option<DisplayRecord>> {
        let resp = self.fetch.get(&lookup_path(identifier)).await?;
        if !resp.is_ok() {
            warn!(
                identifier,
                status = resp.status,
                status_text = %resp.status_text,
                "Failed to fetch Pokémon"
            );
        }
        let record: CatalogRecord = resp.json()?;
        Ok(Some(DisplayRecord::from(record)))
    }

    fn strategy(&self) -> LookupStrategy {
        LookupStrategy::Remote
    }
}

// ============================================================================
// LOCAL SCAN
// ============================================================================

pub struct LocalScan {
    fetch: Arc<dyn HttpFetch>,
}

impl LocalScan {
    pub fn new(fetch: Arc<dyn HttpFetch>) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl ItemLookup for LocalScan {
    async fn lookup(&self, identifier: &str) -> CatalogResult<Option<DisplayRecord>> {
        let records = fetch_catalog(self.fetch.as_ref()).await?;
        let total = records.len();

        let found = find_by_identifier(records, identifier);
        if found.is_none() {
            info!(identifier, total, "Pokémon not found in catalog");
        }
        Ok(found)
    }

    fn strategy(&self) -> LookupStrategy {
        LookupStrategy::Local
    }
}

// ============================================================================
// TESTS
// ============================================================================
