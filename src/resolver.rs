// 🧭 Item Resolver - identifier first, then the item
//
// Stage 1 awaits the route parameter. Stage 2 looks the item up through the
// configured `ItemLookup`. Every stage invocation owns a CancellationToken;
// a token is cancelled when the resolver is torn down or when a newer
// invocation supersedes it, and a cancelled invocation never writes state.
//
// Cancellation, restart and publish all happen under one lock, so a write
// from a superseded attempt can never land after a newer attempt started.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::lookup::ItemLookup;
use crate::model::DisplayRecord;

/// Route-bound parameters of the detail view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    pub pokemon_id: String,
}

impl RouteParams {
    pub fn new(pokemon_id: impl Into<String>) -> Self {
        RouteParams {
            pokemon_id: pokemon_id.into(),
        }
    }
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverState {
    pub identifier: Option<String>,
    pub item: Option<DisplayRecord>,
    pub is_loading_id: bool,
    pub is_loading_data: bool,
}

impl Default for ResolverState {
    fn default() -> Self {
        ResolverState {
            identifier: None,
            item: None,
            is_loading_id: true,
            is_loading_data: false,
        }
    }
}

/// Every state write the resolver performs, in publish order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverEvent {
    IdentifierLoading,
    IdentifierSettled(Option<String>),
    /// Stage 2 skipped: no identifier to look up
    DataCleared,
    DataLoading(String),
    DataSettled(Option<DisplayRecord>),
}

/// Render states of the detail view, in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailPhase {
    IdentifierLoading,
    IdentifierMissing,
    DataLoading(String),
    Resolved(DisplayRecord),
    NotFound(String),
}

impl DetailPhase {
    /// No further asynchronous work will change this phase
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DetailPhase::IdentifierMissing | DetailPhase::Resolved(_) | DetailPhase::NotFound(_)
        )
    }
}

impl ResolverState {
    pub fn apply(&mut self, event: &ResolverEvent) {
        match event {
            ResolverEvent::IdentifierLoading => {
                self.is_loading_id = true;
            }
            ResolverEvent::IdentifierSettled(identifier) => {
                self.identifier = identifier.clone();
                self.is_loading_id = false;
            }
            ResolverEvent::DataCleared => {
                self.item = None;
                self.is_loading_data = false;
            }
            ResolverEvent::DataLoading(_) => {
                self.item = None;
                self.is_loading_data = true;
            }
            ResolverEvent::DataSettled(item) => {
                self.item = item.clone();
                self.is_loading_data = false;
            }
        }
    }

    pub fn phase(&self) -> DetailPhase {
        if self.is_loading_id {
            return DetailPhase::IdentifierLoading;
        }
        let Some(identifier) = &self.identifier else {
            return DetailPhase::IdentifierMissing;
        };
        if self.is_loading_data {
            return DetailPhase::DataLoading(identifier.clone());
        }
        match &self.item {
            Some(item) => DetailPhase::Resolved(item.clone()),
            None => DetailPhase::NotFound(identifier.clone()),
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

struct Shared {
    state: ResolverState,
    identifier_session: Option<CancellationToken>,
    data_session: Option<CancellationToken>,
    events: Option<mpsc::UnboundedSender<ResolverEvent>>,
}

impl Shared {
    fn publish(&mut self, event: ResolverEvent) {
        self.state.apply(&event);
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn cancel_sessions(&mut self) {
        if let Some(token) = self.identifier_session.take() {
            token.cancel();
        }
        if let Some(token) = self.data_session.take() {
            token.cancel();
        }
    }
}

struct Inner {
    lookup: Arc<dyn ItemLookup>,
    shared: Mutex<Shared>,
}

/// Resolves one catalog item for the detail view.
///
/// Dropping the resolver tears it down: in-flight stages are cancelled and
/// never publish.
pub struct ItemResolver {
    inner: Arc<Inner>,
}

impl ItemResolver {
    pub fn new(lookup: Arc<dyn ItemLookup>) -> Self {
        Self {
            inner: Arc::new(Inner {
                lookup,
                shared: Mutex::new(Shared {
                    state: ResolverState::default(),
                    identifier_session: None,
                    data_session: None,
                    events: None,
                }),
            }),
        }
    }

    /// Receive every published state write from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ResolverEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.shared.lock().events = Some(tx);
        rx
    }

    pub fn state(&self) -> ResolverState {
        self.inner.shared.lock().state.clone()
    }

    pub fn phase(&self) -> DetailPhase {
        self.state().phase()
    }

    /// Start a new resolution from a route-parameter future, superseding
    /// any resolution still in flight.
    ///
    /// Must be called inside a tokio runtime.
    pub fn resolve<F, E>(&self, params: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<RouteParams, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let token = CancellationToken::new();
        {
            let mut shared = self.inner.shared.lock();
            shared.cancel_sessions();
            shared.identifier_session = Some(token.clone());
            shared.publish(ResolverEvent::IdentifierLoading);
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let identifier = tokio::select! {
                _ = token.cancelled() => return,
                params = params => match params {
                    Ok(params) => Some(params.pokemon_id),
                    Err(e) => {
                        warn!(error = %e, "Error resolving Pokémon ID from params");
                        None
                    }
                },
            };
            inner.settle_identifier(&token, identifier);
        })
    }

    /// Shorthand for a route whose identifier is already known
    pub fn resolve_identifier(&self, identifier: impl Into<String>) -> JoinHandle<()> {
        let params = RouteParams::new(identifier);
        self.resolve(async move { Ok::<_, std::convert::Infallible>(params) })
    }

    /// Cancel every in-flight stage; nothing further is published
    pub fn teardown(&self) {
        self.inner.shared.lock().cancel_sessions();
    }
}

impl Drop for ItemResolver {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Inner {
    fn settle_identifier(self: &Arc<Self>, token: &CancellationToken, identifier: Option<String>) {
        let mut shared = self.shared.lock();
        if token.is_cancelled() {
            debug!("Dropping identifier from a superseded resolution");
            return;
        }
        shared.identifier_session = None;
        shared.publish(ResolverEvent::IdentifierSettled(identifier.clone()));
        self.start_data(&mut shared, identifier);
    }

    /// Stage 2. Called with the lock held so restart and publish are atomic.
    fn start_data(self: &Arc<Self>, shared: &mut Shared, identifier: Option<String>) {
        if let Some(previous) = shared.data_session.take() {
            previous.cancel();
        }

        let Some(identifier) = identifier else {
            shared.publish(ResolverEvent::DataCleared);
            return;
        };

        let token = CancellationToken::new();
        shared.data_session = Some(token.clone());
        shared.publish(ResolverEvent::DataLoading(identifier.clone()));

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => return,
                outcome = inner.lookup.lookup(&identifier) => outcome,
            };

            let item = match outcome {
                Ok(Some(item)) => Some(item),
                Ok(None) => {
                    info!(identifier = %identifier, "Pokémon not found");
                    None
                }
                Err(e) => {
                    warn!(
                        identifier = %identifier,
                        strategy = %inner.lookup.strategy(),
                        error = %e,
                        "Error fetching Pokémon"
                    );
                    None
                }
            };

            let mut shared = inner.shared.lock();
            if token.is_cancelled() {
                debug!(identifier = %identifier, "Dropping item from a superseded lookup");
                return;
            }
            shared.data_session = None;
            shared.publish(ResolverEvent::DataSettled(item));
        });
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::lookup::LookupStrategy;
    use crate::model::tests::{create_test_record, sample_catalog_json};
    use crate::source::{lookup_path, ReqwestFetcher, CATALOG_PATH};
    use crate::testing::{ok_json, release, GatedFetcher};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn resolver_with(strategy: LookupStrategy, fetcher: &Arc<GatedFetcher>) -> ItemResolver {
        ItemResolver::new(strategy.build(fetcher.clone()))
    }

    fn item_json(number: i64, name: &str) -> String {
        serde_json::to_string(&create_test_record(number, name)).unwrap()
    }

    /// Collect events until the resolver reaches a terminal phase
    async fn settle(
        resolver: &ItemResolver,
        rx: &mut mpsc::UnboundedReceiver<ResolverEvent>,
    ) -> Vec<ResolverEvent> {
        let mut events = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !resolver.phase().is_terminal() {
                match rx.recv().await {
                    Some(event) => events.push(event),
                    None => break,
                }
            }
        })
        .await
        .expect("resolver did not settle");
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Let spawned lookups run until `n` requests reached the fetcher
    async fn wait_for_calls(fetcher: &GatedFetcher, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while fetcher.calls() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("lookup never reached the fetcher");
    }

    fn count(events: &[ResolverEvent], pred: impl Fn(&ResolverEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn test_phase_priority_order() {
        let mut state = ResolverState::default();
        assert_eq!(state.phase(), DetailPhase::IdentifierLoading);

        // identifier-loading wins over everything else
        state.is_loading_data = true;
        state.identifier = Some("25".to_string());
        assert_eq!(state.phase(), DetailPhase::IdentifierLoading);

        state.apply(&ResolverEvent::IdentifierSettled(None));
        assert_eq!(state.phase(), DetailPhase::IdentifierMissing);

        state.apply(&ResolverEvent::IdentifierSettled(Some("25".to_string())));
        assert_eq!(state.phase(), DetailPhase::DataLoading("25".to_string()));

        state.apply(&ResolverEvent::DataSettled(None));
        assert_eq!(state.phase(), DetailPhase::NotFound("25".to_string()));

        let item = DisplayRecord::from(create_test_record(25, "Pikachu"));
        state.apply(&ResolverEvent::DataSettled(Some(item.clone())));
        assert_eq!(state.phase(), DetailPhase::Resolved(item));
    }

    #[tokio::test]
    async fn test_local_scan_resolves_pikachu() {
        let fetcher = Arc::new(GatedFetcher::new());
        release(fetcher.gate(CATALOG_PATH), ok_json(sample_catalog_json()));

        let resolver = resolver_with(LookupStrategy::Local, &fetcher);
        let mut rx = resolver.subscribe();
        resolver.resolve_identifier("25");
        settle(&resolver, &mut rx).await;

        let state = resolver.state();
        let item = state.item.unwrap();
        assert_eq!(item.id, "25");
        assert_eq!(item.name(), "Pikachu");
        assert!(!state.is_loading_id);
        assert!(!state.is_loading_data);
    }

    #[tokio::test]
    async fn test_local_scan_unknown_identifier_is_not_found() {
        let fetcher = Arc::new(GatedFetcher::new());
        release(fetcher.gate(CATALOG_PATH), ok_json(sample_catalog_json()));

        let resolver = resolver_with(LookupStrategy::Local, &fetcher);
        let mut rx = resolver.subscribe();
        resolver.resolve_identifier("9999");
        settle(&resolver, &mut rx).await;

        assert_eq!(resolver.phase(), DetailPhase::NotFound("9999".to_string()));
    }

    #[tokio::test]
    async fn test_remote_error_degrades_to_not_found() {
        let fetcher = Arc::new(GatedFetcher::new());
        release(
            fetcher.gate(&lookup_path("7")),
            Err(CatalogError::status(502, "Bad Gateway")),
        );

        let resolver = resolver_with(LookupStrategy::Remote, &fetcher);
        let mut rx = resolver.subscribe();
        resolver.resolve_identifier("7");
        settle(&resolver, &mut rx).await;

        assert_eq!(resolver.phase(), DetailPhase::NotFound("7".to_string()));
    }

    #[tokio::test]
    async fn test_remote_malformed_body_degrades_to_not_found() {
        let fetcher = Arc::new(GatedFetcher::new());
        release(fetcher.gate(&lookup_path("25")), ok_json("<html>"));

        let resolver = resolver_with(LookupStrategy::Remote, &fetcher);
        let mut rx = resolver.subscribe();
        resolver.resolve_identifier("25");
        settle(&resolver, &mut rx).await;

        assert_eq!(resolver.phase(), DetailPhase::NotFound("25".to_string()));
    }

    #[tokio::test]
    async fn test_remote_transport_failure_degrades_to_not_found() {
        let fetch = Arc::new(ReqwestFetcher::parse("http://127.0.0.1:1").unwrap());
        let resolver = ItemResolver::new(LookupStrategy::Remote.build(fetch));
        let mut rx = resolver.subscribe();
        resolver.resolve_identifier("25");
        settle(&resolver, &mut rx).await;

        assert_eq!(resolver.phase(), DetailPhase::NotFound("25".to_string()));
    }

    #[tokio::test]
    async fn test_failed_route_params_is_identifier_missing() {
        let fetcher = Arc::new(GatedFetcher::new());
        let resolver = resolver_with(LookupStrategy::Local, &fetcher);
        let mut rx = resolver.subscribe();

        resolver.resolve(async { Err::<RouteParams, _>("route unavailable") });
        let events = settle(&resolver, &mut rx).await;

        assert_eq!(resolver.phase(), DetailPhase::IdentifierMissing);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(
            events,
            vec![
                ResolverEvent::IdentifierLoading,
                ResolverEvent::IdentifierSettled(None),
                ResolverEvent::DataCleared,
            ]
        );
    }

    #[tokio::test]
    async fn test_loading_flags_settle_exactly_once() {
        let fetcher = Arc::new(GatedFetcher::new());
        release(fetcher.gate(&lookup_path("25")), ok_json(item_json(25, "Pikachu")));

        let resolver = resolver_with(LookupStrategy::Remote, &fetcher);
        let mut rx = resolver.subscribe();
        resolver.resolve_identifier("25");
        let events = settle(&resolver, &mut rx).await;

        assert_eq!(
            count(&events, |e| matches!(e, ResolverEvent::IdentifierSettled(_))),
            1
        );
        assert_eq!(
            count(&events, |e| matches!(e, ResolverEvent::DataSettled(_))),
            1
        );
        let state = resolver.state();
        assert!(!state.is_loading_id);
        assert!(!state.is_loading_data);
    }

    #[tokio::test]
    async fn test_superseded_lookup_never_publishes_when_finishing_last() {
        let fetcher = Arc::new(GatedFetcher::new());
        let gate_a = fetcher.gate(&lookup_path("1"));
        let gate_b = fetcher.gate(&lookup_path("25"));

        let resolver = resolver_with(LookupStrategy::Remote, &fetcher);
        let mut rx = resolver.subscribe();

        resolver.resolve_identifier("1").await.unwrap();
        wait_for_calls(&fetcher, 1).await;
        resolver.resolve_identifier("25").await.unwrap();
        wait_for_calls(&fetcher, 2).await;

        release(gate_b, ok_json(item_json(25, "Pikachu")));
        let events = settle(&resolver, &mut rx).await;
        release(gate_a, ok_json(item_json(1, "Bulbasaur")));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(resolver.state().item.unwrap().name(), "Pikachu");
        assert_eq!(resolver.state().identifier.as_deref(), Some("25"));
        assert_eq!(
            count(&events, |e| matches!(e, ResolverEvent::DataSettled(_))),
            1
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_superseded_lookup_never_publishes_when_finishing_first() {
        let fetcher = Arc::new(GatedFetcher::new());
        let gate_a = fetcher.gate(CATALOG_PATH);
        let gate_b = fetcher.gate(CATALOG_PATH);

        let resolver = resolver_with(LookupStrategy::Local, &fetcher);
        let mut rx = resolver.subscribe();

        resolver.resolve_identifier("1").await.unwrap();
        wait_for_calls(&fetcher, 1).await;
        resolver.resolve_identifier("25").await.unwrap();
        wait_for_calls(&fetcher, 2).await;

        release(gate_a, ok_json(sample_catalog_json()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(resolver.phase(), DetailPhase::DataLoading("25".to_string()));
        assert!(resolver.state().item.is_none());

        release(gate_b, ok_json(sample_catalog_json()));
        settle(&resolver, &mut rx).await;

        let item = resolver.state().item.unwrap();
        assert_eq!(item.id, "25");
    }

    #[tokio::test]
    async fn test_superseded_route_params_never_publish() {
        let fetcher = Arc::new(GatedFetcher::new());
        release(fetcher.gate(&lookup_path("25")), ok_json(item_json(25, "Pikachu")));

        let resolver = resolver_with(LookupStrategy::Remote, &fetcher);
        let mut rx = resolver.subscribe();

        let (slow_tx, slow_rx) = oneshot::channel::<RouteParams>();
        resolver.resolve(slow_rx);
        resolver.resolve_identifier("25");
        settle(&resolver, &mut rx).await;

        // The first route settles late and must not overwrite anything
        let _ = slow_tx.send(RouteParams::new("1"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(resolver.state().identifier.as_deref(), Some("25"));
        assert_eq!(resolver.state().item.unwrap().name(), "Pikachu");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_new_resolution_resets_previous_item() {
        let fetcher = Arc::new(GatedFetcher::new());
        release(fetcher.gate(&lookup_path("25")), ok_json(item_json(25, "Pikachu")));
        let gate_next = fetcher.gate(&lookup_path("4"));

        let resolver = resolver_with(LookupStrategy::Remote, &fetcher);
        let mut rx = resolver.subscribe();
        resolver.resolve_identifier("25");
        settle(&resolver, &mut rx).await;
        assert!(resolver.state().item.is_some());

        resolver.resolve_identifier("4").await.unwrap();
        assert_eq!(resolver.phase(), DetailPhase::DataLoading("4".to_string()));
        assert!(resolver.state().item.is_none());

        release(gate_next, ok_json(item_json(4, "Charmander")));
        settle(&resolver, &mut rx).await;
        assert_eq!(resolver.state().item.unwrap().name(), "Charmander");
    }

    #[tokio::test]
    async fn test_teardown_suppresses_writes() {
        let fetcher = Arc::new(GatedFetcher::new());
        let gate = fetcher.gate(&lookup_path("25"));

        let resolver = resolver_with(LookupStrategy::Remote, &fetcher);
        let mut rx = resolver.subscribe();
        resolver.resolve_identifier("25").await.unwrap();
        resolver.teardown();

        release(gate, ok_json(item_json(25, "Pikachu")));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(resolver.phase(), DetailPhase::DataLoading("25".to_string()));
        let mut late = Vec::new();
        while let Ok(event) = rx.try_recv() {
            late.push(event);
        }
        assert!(!late
            .iter()
            .any(|e| matches!(e, ResolverEvent::DataSettled(_))));
    }

    #[tokio::test]
    async fn test_teardown_before_route_params_suppresses_identifier() {
        let fetcher = Arc::new(GatedFetcher::new());
        let resolver = resolver_with(LookupStrategy::Local, &fetcher);
        let mut rx = resolver.subscribe();

        let (tx, params) = oneshot::channel::<RouteParams>();
        let handle = resolver.resolve(params);
        resolver.teardown();
        let _ = tx.send(RouteParams::new("25"));
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(resolver.phase(), DetailPhase::IdentifierLoading);
        assert_eq!(fetcher.calls(), 0);
        let mut late = Vec::new();
        while let Ok(event) = rx.try_recv() {
            late.push(event);
        }
        assert_eq!(late, vec![ResolverEvent::IdentifierLoading]);
    }
}
