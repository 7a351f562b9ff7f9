// Error taxonomy for catalog access
//
// Display carries operator detail (status codes, decoder messages).
// `user_message` is the one sentence shown on screen.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport succeeded but the status was not ok
    #[error("HTTP {code} {status_text}")]
    Status { code: u16, status_text: String },

    /// Network failure before a status was received
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body was not the expected JSON shape
    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl CatalogError {
    pub fn status(code: u16, status_text: impl Into<String>) -> Self {
        CatalogError::Status {
            code,
            status_text: status_text.into(),
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, CatalogError::Status { .. })
    }

    /// Short sentence for the catalog list view
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::Status { code, status_text } => {
                let status_text = status_text.trim();
                if status_text.is_empty() {
                    format!("Failed to load Pokémon data: {}", code)
                } else {
                    format!("Failed to load Pokémon data: {}", status_text)
                }
            }
            CatalogError::Transport(e) => failure_message(&e.to_string()),
            CatalogError::Decode(e) => failure_message(&e.to_string()),
            CatalogError::InvalidUrl { source, .. } => failure_message(&source.to_string()),
        }
    }
}

/// Sentence for a failure that never produced a status
fn failure_message(detail: &str) -> String {
    match detail.trim() {
        "" => "An unknown error occurred while loading Pokémon data.".to_string(),
        detail => format!("An error occurred while loading Pokémon data: {}", detail),
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
