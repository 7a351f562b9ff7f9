// 🌐 HTTP source - one GET abstraction shared by the loader and the lookups
//
// Everything that talks to the network goes through `HttpFetch`, so tests can
// swap in a fetcher whose responses are released on demand.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::model::CatalogRecord;

/// Static catalog resource
pub const CATALOG_PATH: &str = "/pokemons.json";

/// Single-item lookup endpoint (rewritten to the upstream API)
pub const LOOKUP_PATH: &str = "/api/pokemon";

/// Path of the single-item endpoint for one identifier
pub fn lookup_path(identifier: &str) -> String {
    format!("{}/{}", LOOKUP_PATH, urlencoding::encode(identifier))
}

// ============================================================================
// RESPONSE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        FetchResponse {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Transport-level success (2xx)
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status check first, then decode. Payload shape is never validated
    /// beyond what the target type requires.
    pub fn json<T: DeserializeOwned>(&self) -> CatalogResult<T> {
        if !self.is_ok() {
            return Err(CatalogError::status(self.status, self.status_text.clone()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

// ============================================================================
// FETCH TRAIT
// ============================================================================

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET `path` relative to the configured origin
    async fn get(&self, path: &str) -> CatalogResult<FetchResponse>;
}

/// reqwest-backed fetcher rooted at one origin
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestFetcher {
    pub fn new(base_url: Url) -> CatalogResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, base_url })
    }

    pub fn parse(base_url: &str) -> CatalogResult<Self> {
        let url = Url::parse(base_url).map_err(|source| CatalogError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Self::new(url)
    }

    fn resolve(&self, path: &str) -> CatalogResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| CatalogError::InvalidUrl {
                url: path.to_string(),
                source,
            })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, path: &str) -> CatalogResult<FetchResponse> {
        let url = self.resolve(path)?;
        debug!(%url, "GET");

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        Ok(FetchResponse {
            status: status.as_u16(),
            status_text: status_text(status),
            body: body.to_vec(),
        })
    }
}

/// Reason phrase of a status, or the bare code when it has none (e.g. 520)
fn status_text(status: reqwest::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => status.as_u16().to_string(),
    }
}

/// GET and decode the whole catalog resource
pub async fn fetch_catalog(fetch: &dyn HttpFetch) -> CatalogResult<Vec<CatalogRecord>> {
    let resp = fetch.get(CATALOG_PATH).await?;
    if !resp.is_ok() {
        warn!(
            status = resp.status,
            status_text = %resp.status_text,
            "Failed to fetch {}",
            CATALOG_PATH
        );
    }
    resp.json()
}

// ============================================================================
// TESTS
// ============================================================================
