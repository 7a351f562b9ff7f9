// Test doubles for the HTTP source
//
// `GatedFetcher` hands out one oneshot gate per expected request, so a test
// decides the order in which in-flight fetches complete.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{CatalogError, CatalogResult};
use crate::source::{FetchResponse, HttpFetch};

pub(crate) type Gate = oneshot::Sender<CatalogResult<FetchResponse>>;

#[derive(Default)]
pub(crate) struct GatedFetcher {
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<CatalogResult<FetchResponse>>>>>,
    calls: AtomicUsize,
}

impl GatedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register the next response for `path`; requests to the same path
    /// consume gates in registration order
    pub(crate) fn gate(&self, path: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(rx);
        tx
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpFetch for GatedFetcher {
    async fn get(&self, path: &str) -> CatalogResult<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .gates
            .lock()
            .get_mut(path)
            .and_then(|queue| queue.pop_front());

        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(CatalogError::status(599, "gate dropped"))),
            None => Ok(FetchResponse::new(404, "Not Found", Vec::<u8>::new())),
        }
    }
}

pub(crate) fn ok_json(body: impl Into<String>) -> CatalogResult<FetchResponse> {
    Ok(FetchResponse::new(200, "OK", body.into()))
}

/// Release a gate; the receiver may already be gone if the request was cancelled
pub(crate) fn release(gate: Gate, response: CatalogResult<FetchResponse>) {
    let _ = gate.send(response);
}
