// 📚 Catalog Loader - one fetch of the catalog per loader lifetime
//
// Exposes {items, is_loading, error}. Success is transport-level only; a
// payload that does not decode is an error like any other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info};

use crate::model::{to_display_records, DisplayRecord};
use crate::source::{fetch_catalog, HttpFetch, CATALOG_PATH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogState {
    pub items: Vec<DisplayRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for CatalogState {
    fn default() -> Self {
        CatalogState {
            items: Vec::new(),
            is_loading: true,
            error: None,
        }
    }
}

/// What the list view should show for a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogView<'a> {
    Loading,
    Failed(&'a str),
    Empty,
    Cards(&'a [DisplayRecord]),
}

impl CatalogState {
    pub fn view(&self) -> CatalogView<'_> {
        if self.is_loading {
            CatalogView::Loading
        } else if let Some(error) = &self.error {
            CatalogView::Failed(error)
        } else if self.items.is_empty() {
            CatalogView::Empty
        } else {
            CatalogView::Cards(&self.items)
        }
    }
}

pub struct CatalogLoader {
    fetch: Arc<dyn HttpFetch>,
    state: Mutex<CatalogState>,
    started: AtomicBool,
}

impl CatalogLoader {
    pub fn new(fetch: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetch,
            state: Mutex::new(CatalogState::default()),
            started: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CatalogState {
        self.state.lock().clone()
    }

    /// Fetch the catalog. Only the first call does any I/O; later calls
    /// return the current state as-is.
    pub async fn load(&self) -> CatalogState {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        {
            let mut state = self.state.lock();
            state.is_loading = true;
            state.error = None;
        }

        let outcome = fetch_catalog(self.fetch.as_ref()).await;

        let mut state = self.state.lock();
        match outcome {
            Ok(records) => {
                state.items = to_display_records(records);
                state.error = None;
                info!(count = state.items.len(), "Loaded {}", CATALOG_PATH);
            }
            Err(e) => {
                error!(error = %e, "Error fetching or processing {}", CATALOG_PATH);
                state.items = Vec::new();
                state.error = Some(e.user_message());
            }
        }
        state.is_loading = false;
        state.clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================
