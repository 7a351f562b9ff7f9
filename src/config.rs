// ⚙️ Configuration - command line flags with environment fallbacks
//
// Client: where the catalog lives + which lookup strategy the detail view uses.
// Server: where to listen, what to serve, where /api/pokemon is rewritten to.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use url::Url;

use crate::error::CatalogResult;
use crate::lookup::{ItemLookup, LookupStrategy};
use crate::source::{HttpFetch, ReqwestFetcher};

/// Upstream of the `/api/pokemon` rewrite
pub const DEFAULT_UPSTREAM: &str =
    "https://r5d2yrnr91.execute-api.eu-west-2.amazonaws.com/Prod/pokemon";

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone, Parser)]
#[command(name = "pokedex", version, about = "Browse the Pokémon catalog")]
pub struct ClientConfig {
    /// Origin serving /pokemons.json and /api/pokemon
    #[arg(long, env = "POKEDEX_BASE_URL", default_value = "http://localhost:3000")]
    pub base_url: Url,

    /// How the detail view retrieves one Pokémon
    #[arg(long, env = "POKEDEX_LOOKUP", value_enum, default_value_t = LookupStrategy::Local)]
    pub lookup: LookupStrategy,

    /// Write logs here while the terminal UI owns the screen
    #[arg(long, env = "POKEDEX_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<ClientCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ClientCommand {
    /// Print every card in the catalog
    List,

    /// Print one Pokémon by identifier
    Show {
        /// Identifier (decimal Pokémon number)
        pokemon_id: String,
    },
}

impl ClientConfig {
    pub fn fetcher(&self) -> CatalogResult<Arc<dyn HttpFetch>> {
        Ok(Arc::new(ReqwestFetcher::new(self.base_url.clone())?))
    }

    pub fn lookup(&self, fetch: Arc<dyn HttpFetch>) -> Arc<dyn ItemLookup> {
        self.lookup.build(fetch)
    }
}

// ============================================================================
// SERVER
// ============================================================================

#[derive(Debug, Clone, Parser)]
#[command(
    name = "pokedex-server",
    version,
    about = "Serve the catalog and rewrite /api/pokemon"
)]
pub struct ServerConfig {
    #[arg(long, env = "POKEDEX_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Directory holding pokemons.json (and any other static files)
    #[arg(long, env = "POKEDEX_PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// Target of /api/pokemon and /api/pokemon/{id}
    #[arg(long, env = "POKEDEX_UPSTREAM", default_value = DEFAULT_UPSTREAM)]
    pub upstream: Url,
}
