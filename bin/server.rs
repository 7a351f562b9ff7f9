// Pokédex - Web Server
// Static catalog resource + rewrite of /api/pokemon to the upstream API

use anyhow::{Context, Result};
use axum::{
    extract::{Path, RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use pokedex::{logging, ServerConfig, CATALOG_PATH};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use url::Url;

/// Shared application state
#[derive(Clone)]
struct AppState {
    client: reqwest::Client,
    upstream: Arc<Url>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// 502 answer when the upstream cannot be reached or read
fn bad_gateway() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiResponse::<()>::error("Upstream Pokémon API unavailable")),
    )
        .into_response()
}

impl AppState {
    /// Upstream URL for the list (`None`) or one item; the query string
    /// is passed through unchanged
    fn upstream_url(&self, pokemon_id: Option<&str>, query: Option<&str>) -> String {
        let mut url = match pokemon_id {
            None => self.upstream.to_string(),
            Some(id) => format!(
                "{}/{}",
                self.upstream.as_str().trim_end_matches('/'),
                urlencoding::encode(id)
            ),
        };
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/pokemon - forwarded to the upstream list
async fn proxy_pokemon_list(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    forward(&state, None, query.as_deref()).await
}

/// GET /api/pokemon/:id - forwarded to the upstream item
async fn proxy_pokemon(
    State(state): State<AppState>,
    Path(pokemon_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    forward(&state, Some(&pokemon_id), query.as_deref()).await
}

/// Relay status, content type and body of the upstream answer verbatim
async fn forward(state: &AppState, pokemon_id: Option<&str>, query: Option<&str>) -> Response {
    let url = state.upstream_url(pokemon_id, query);

    let resp = match state.client.get(&url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!(%url, error = %e, "Upstream request failed");
            return bad_gateway();
        }
    };

    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = HeaderMap::new();
    if let Some(content_type) = resp.headers().get(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, content_type.clone());
    }

    match resp.bytes().await {
        Ok(body) => {
            if !status.is_success() {
                warn!(%url, status = status.as_u16(), "Upstream answered with an error status");
            }
            (status, headers, body).into_response()
        }
        Err(e) => {
            error!(%url, error = %e, "Failed to read upstream body");
            bad_gateway()
        }
    }
}

// ============================================================================
// Router
// ============================================================================

fn app(state: AppState, public_dir: PathBuf) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/pokemon", get(proxy_pokemon_list))
        .route("/pokemon/:id", get(proxy_pokemon))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    logging::init(logging::LogTarget::Stderr)?;

    println!("🌐 Pokédex - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let catalog = config.public_dir.join(CATALOG_PATH.trim_start_matches('/'));
    if !catalog.exists() {
        warn!("Catalog resource not found at {:?}", catalog);
        eprintln!("⚠️  {:?} is missing; {} will answer 404", catalog, CATALOG_PATH);
    } else {
        println!("✓ Catalog: {:?}", catalog);
    }

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;
    let state = AppState {
        client,
        upstream: Arc::new(config.upstream.clone()),
    };

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(bind = %config.bind, upstream = %config.upstream, "Server starting");
    println!("\n🚀 Server running on http://{}", config.bind);
    println!("   Catalog: http://{}{}", config.bind, CATALOG_PATH);
    println!("   API:     http://{}/api/pokemon/{{id}} → {}", config.bind, config.upstream);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state, config.public_dir))
        .await
        .context("Server stopped with an error")?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
