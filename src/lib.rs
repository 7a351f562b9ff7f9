// Pokédex - Core Library
// Shared by the terminal client, the CLI subcommands and the catalog server

pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod lookup;
pub mod model;
pub mod resolver;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{ClientCommand, ClientConfig, ServerConfig, DEFAULT_UPSTREAM};
pub use error::{CatalogError, CatalogResult};
pub use loader::{CatalogLoader, CatalogState, CatalogView};
pub use lookup::{ItemLookup, LocalScan, LookupStrategy, RemoteLookup};
pub use model::{find_by_identifier, to_display_records, CatalogRecord, DisplayRecord};
pub use resolver::{DetailPhase, ItemResolver, ResolverEvent, ResolverState, RouteParams};
pub use source::{
    fetch_catalog, lookup_path, FetchResponse, HttpFetch, ReqwestFetcher, CATALOG_PATH,
    LOOKUP_PATH,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
