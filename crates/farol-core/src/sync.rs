use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::{demo_state, MonitoredApi, ScheduleGroup, ServiceState};
use crate::store::StatusStore;

/// Banner shown while running off the demonstration dataset.
const FALLBACK_BANNER: &str = "Backend não conectado - usando dados de demonstração";

/// Whether the session is talking to a real backend or running
/// self-contained off the demonstration dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Connected,
    Fallback,
}

/// `POST /toggle-messages` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleOutcome {
    pub ok: bool,
    pub state: bool,
}

/// `POST /test-whatsapp` response.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyOutcome {
    pub ok: bool,
}

/// `POST /send-whatsapp-offline` response.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestOutcome {
    pub ok: bool,
    pub sent: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// The remote authority's command surface.
///
/// Implementations perform the network round trips; the engine decides when
/// to call them and how failures degrade. Non-success statuses are errors.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    async fn fetch_state(&self) -> Result<ServiceState>;
    async fn toggle_messages(&self) -> Result<ToggleOutcome>;
    async fn upsert_api(&self, api: &MonitoredApi) -> Result<()>;
    async fn delete_api(&self, id: &str) -> Result<()>;
    async fn trigger_test(&self, id: &str) -> Result<()>;
    async fn send_test_message(&self, message: &str) -> Result<NotifyOutcome>;
    async fn send_offline_digest(&self) -> Result<DigestOutcome>;
    async fn list_schedule_groups(&self) -> Result<Vec<ScheduleGroup>>;
}

/// Connectivity state shared between the engine and its poll timer task.
#[derive(Debug)]
struct LinkState {
    connectivity: RwLock<Connectivity>,
    connection_error: RwLock<Option<String>>,
    poll_in_flight: AtomicBool,
}

/// Keeps the local store consistent with the remote authority and routes
/// mutations by connectivity.
///
/// Connected, the backend is the sole source of truth: every mutation is a
/// remote command followed by a full re-poll, and the UI tolerates the short
/// stale window in between. In fallback, mutations apply synchronously to
/// the local store and nothing leaves the process.
pub struct SyncEngine {
    store: Arc<StatusStore>,
    remote: Arc<dyn RemoteAuthority>,
    link: Arc<LinkState>,
    test_resync_delay: Duration,
    poll_handle: Option<JoinHandle<()>>,
}

impl SyncEngine {
    /// A new engine starts in fallback with the demonstration dataset loaded
    /// until the first poll resolves.
    pub fn new(
        store: Arc<StatusStore>,
        remote: Arc<dyn RemoteAuthority>,
        test_resync_delay: Duration,
    ) -> Self {
        store.replace(demo_state());
        Self {
            store,
            remote,
            link: Arc::new(LinkState {
                connectivity: RwLock::new(Connectivity::Fallback),
                connection_error: RwLock::new(None),
                poll_in_flight: AtomicBool::new(false),
            }),
            test_resync_delay,
            poll_handle: None,
        }
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    pub fn connectivity(&self) -> Connectivity {
        *self.link.connectivity.read().unwrap()
    }

    /// Banner text for the UI while degraded, if any.
    pub fn connection_error(&self) -> Option<String> {
        self.link.connection_error.read().unwrap().clone()
    }

    /// Fetch the authority's full state and swap it into the store.
    ///
    /// Failure degrades silently to fallback: the demonstration dataset is
    /// loaded and the error surfaces through [`Self::connection_error`], not
    /// the return path. Only one poll runs at a time — a poll fired while
    /// another is outstanding is dropped, so a slow stale response cannot
    /// overwrite a newer one.
    pub async fn poll(&self) {
        Self::poll_once(&self.store, self.remote.as_ref(), &self.link).await;
    }

    async fn poll_once(store: &StatusStore, remote: &dyn RemoteAuthority, link: &LinkState) {
        if link
            .poll_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        match remote.fetch_state().await {
            Ok(state) => {
                let was_fallback = *link.connectivity.read().unwrap() == Connectivity::Fallback;
                info!(
                    "State refreshed: {} APIs, {} online",
                    state.apis.len(),
                    state
                        .apis
                        .iter()
                        .filter(|a| a.is_online == Some(true))
                        .count()
                );
                if was_fallback {
                    info!("Backend reachable, leaving demonstration mode");
                }
                store.replace(state);
                *link.connectivity.write().unwrap() = Connectivity::Connected;
                *link.connection_error.write().unwrap() = None;
            }
            Err(e) => {
                warn!("Backend unreachable, using demonstration data: {e}");
                *link.connectivity.write().unwrap() = Connectivity::Fallback;
                store.replace(demo_state());
                *link.connection_error.write().unwrap() = Some(FALLBACK_BANNER.to_string());
            }
        }

        link.poll_in_flight.store(false, Ordering::SeqCst);
    }

    /// Start the recurring poll: once immediately, then on a fixed timer.
    pub fn start(&mut self, poll_interval: Duration) {
        let store = self.store.clone();
        let remote = self.remote.clone();
        let link = self.link.clone();

        self.poll_handle = Some(tokio::spawn(async move {
            info!("Sync loop started (interval: {}s)", poll_interval.as_secs());
            Self::poll_once(&store, remote.as_ref(), &link).await;
            loop {
                tokio::time::sleep(poll_interval).await;
                Self::poll_once(&store, remote.as_ref(), &link).await;
            }
        }));
    }

    /// Cancel the recurring poll timer. Must run on session shutdown so the
    /// wake-up does not leak.
    pub fn stop(&mut self) {
        if let Some(handle) = self.poll_handle.take() {
            handle.abort();
            info!("Sync loop stopped");
        }
    }

    /// Create or update a definition.
    ///
    /// Connected: the command goes to the backend and the store is refreshed
    /// by a full re-poll. A failed command is logged and the re-poll skipped;
    /// the store stays as it was and the next timer poll shows the truth.
    /// Fallback: applied directly to the store.
    pub async fn save_api(&self, api: MonitoredApi) {
        match self.connectivity() {
            Connectivity::Connected => {
                if let Err(e) = self.remote.upsert_api(&api).await {
                    warn!("Failed to save '{}' on backend: {e}", api.name);
                    return;
                }
                self.poll().await;
            }
            Connectivity::Fallback => self.store.upsert(api),
        }
    }

    /// Delete a definition by id.
    pub async fn delete_api(&self, id: &str) {
        match self.connectivity() {
            Connectivity::Connected => {
                if let Err(e) = self.remote.delete_api(id).await {
                    warn!("Failed to delete '{id}' on backend: {e}");
                    return;
                }
                self.poll().await;
            }
            Connectivity::Fallback => self.store.remove(id),
        }
    }

    /// Flip message sending on the backend, or locally while degraded.
    pub async fn toggle_notifications(&self) {
        match self.connectivity() {
            Connectivity::Connected => {
                if let Err(e) = self.remote.toggle_messages().await {
                    warn!("Failed to toggle message sending: {e}");
                    return;
                }
                self.poll().await;
            }
            Connectivity::Fallback => {
                self.store.toggle_notifications();
            }
        }
    }

    /// Trigger a one-shot probe.
    ///
    /// Connected: the backend runs the real probe; re-poll after a fixed
    /// delay so it has time to execute. Fallback: a simulated outcome is
    /// applied synchronously — never while connected, which would clobber a
    /// genuine probe result.
    pub async fn test_api(&self, id: &str) {
        match self.connectivity() {
            Connectivity::Connected => {
                if let Err(e) = self.remote.trigger_test(id).await {
                    warn!("Failed to trigger test for '{id}': {e}");
                    return;
                }
                tokio::time::sleep(self.test_resync_delay).await;
                self.poll().await;
            }
            Connectivity::Fallback => {
                if !self.store.simulate_probe(id) {
                    warn!("No monitored API with id '{id}'");
                }
            }
        }
    }

    /// Send a test message through the notification channel. Always a remote
    /// call; the dashboard never gated this on connectivity.
    pub async fn send_test_message(&self, message: &str) -> Result<NotifyOutcome> {
        self.remote.send_test_message(message).await
    }

    /// Ask the backend to message the operator about currently offline
    /// routes.
    pub async fn send_offline_digest(&self) -> Result<DigestOutcome> {
        self.remote.send_offline_digest().await
    }

    /// Grouping metadata for the editor's group selector. Any failure
    /// collapses to an empty list.
    pub async fn list_schedule_groups(&self) -> Vec<ScheduleGroup> {
        match self.remote.list_schedule_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                warn!("Failed to list schedule groups: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;
    use crate::state::Method;

    fn sample_api(id: &str, name: &str) -> MonitoredApi {
        MonitoredApi {
            id: id.into(),
            name: name.into(),
            method: Method::Get,
            url: format!("https://example.com/{id}"),
            headers: None,
            body: None,
            cron: "00 08 * * 1".into(),
            enabled: true,
            is_online: None,
            response_time: None,
            last_run: None,
            schedule_group_id: None,
            schedule: None,
        }
    }

    /// In-memory authority with a reachability switch and call counters.
    struct FakeAuthority {
        reachable: AtomicBool,
        fail_mutations: AtomicBool,
        state: Mutex<ServiceState>,
        fetches: AtomicUsize,
    }

    impl FakeAuthority {
        fn new(state: ServiceState) -> Self {
            Self {
                reachable: AtomicBool::new(true),
                fail_mutations: AtomicBool::new(false),
                state: Mutex::new(state),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn check_reachable(&self) -> Result<()> {
            if self.reachable.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(anyhow::anyhow!("connection refused"))
            }
        }

        fn check_mutation(&self) -> Result<()> {
            self.check_reachable()?;
            if self.fail_mutations.load(Ordering::SeqCst) {
                Err(anyhow::anyhow!("HTTP 500"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RemoteAuthority for FakeAuthority {
        async fn fetch_state(&self) -> Result<ServiceState> {
            self.check_reachable()?;
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.state.lock().unwrap().clone())
        }

        async fn toggle_messages(&self) -> Result<ToggleOutcome> {
            self.check_mutation()?;
            let mut state = self.state.lock().unwrap();
            state.is_message_sending_enabled = !state.is_message_sending_enabled;
            Ok(ToggleOutcome {
                ok: true,
                state: state.is_message_sending_enabled,
            })
        }

        async fn upsert_api(&self, api: &MonitoredApi) -> Result<()> {
            self.check_mutation()?;
            let mut state = self.state.lock().unwrap();
            if let Some(pos) = state.apis.iter().position(|a| a.id == api.id) {
                state.apis[pos] = api.clone();
            } else {
                state.apis.push(api.clone());
            }
            Ok(())
        }

        async fn delete_api(&self, id: &str) -> Result<()> {
            self.check_mutation()?;
            self.state.lock().unwrap().apis.retain(|a| a.id != id);
            Ok(())
        }

        async fn trigger_test(&self, id: &str) -> Result<()> {
            self.check_mutation()?;
            let mut state = self.state.lock().unwrap();
            if let Some(api) = state.apis.iter_mut().find(|a| a.id == id) {
                api.is_online = Some(true);
                api.response_time = Some(123);
            }
            Ok(())
        }

        async fn send_test_message(&self, _message: &str) -> Result<NotifyOutcome> {
            self.check_reachable()?;
            Ok(NotifyOutcome { ok: true })
        }

        async fn send_offline_digest(&self) -> Result<DigestOutcome> {
            self.check_reachable()?;
            Ok(DigestOutcome {
                ok: true,
                sent: false,
                message: Some("Nenhuma rota offline para enviar.".into()),
            })
        }

        async fn list_schedule_groups(&self) -> Result<Vec<ScheduleGroup>> {
            self.check_reachable()?;
            Ok(vec![ScheduleGroup {
                id: "g1".into(),
                name: "Horário Comercial".into(),
            }])
        }
    }

    fn engine_with(remote: Arc<FakeAuthority>) -> SyncEngine {
        SyncEngine::new(
            Arc::new(StatusStore::default()),
            remote,
            Duration::from_millis(0),
        )
    }

    fn remote_state() -> ServiceState {
        ServiceState {
            is_message_sending_enabled: false,
            last_run_timestamp: "02/09/2025, 09:00:00".into(),
            last_run_status: "ok".into(),
            next_run_timestamp: "02/09/2025, 09:10:00".into(),
            last_failed_apis: vec!["7".into()],
            apis: vec![sample_api("7", "Pedidos")],
        }
    }

    #[tokio::test]
    async fn test_starts_in_fallback_with_demo_data() {
        let engine = engine_with(Arc::new(FakeAuthority::new(remote_state())));
        assert_eq!(engine.connectivity(), Connectivity::Fallback);
        assert_eq!(engine.store().snapshot(), demo_state());
        assert!(engine.connection_error().is_none());
    }

    #[tokio::test]
    async fn test_failed_poll_degrades_to_fallback() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        let engine = engine_with(remote.clone());

        engine.poll().await;
        assert_eq!(engine.connectivity(), Connectivity::Connected);

        remote.reachable.store(false, Ordering::SeqCst);
        engine.poll().await;
        assert_eq!(engine.connectivity(), Connectivity::Fallback);
        assert_eq!(engine.store().snapshot(), demo_state());
        assert_eq!(engine.connection_error().as_deref(), Some(FALLBACK_BANNER));
    }

    #[tokio::test]
    async fn test_successful_poll_replaces_and_clears_error() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        remote.reachable.store(false, Ordering::SeqCst);
        let engine = engine_with(remote.clone());

        engine.poll().await;
        assert!(engine.connection_error().is_some());

        remote.reachable.store(true, Ordering::SeqCst);
        engine.poll().await;
        assert_eq!(engine.connectivity(), Connectivity::Connected);
        assert_eq!(engine.store().snapshot(), remote_state());
        assert!(engine.connection_error().is_none());
    }

    #[tokio::test]
    async fn test_fallback_mutations_apply_locally() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        remote.reachable.store(false, Ordering::SeqCst);
        let engine = engine_with(remote.clone());
        engine.poll().await;

        engine.save_api(sample_api("99", "Local")).await;
        assert_eq!(engine.store().snapshot().apis.len(), 3);

        engine.delete_api("1").await;
        assert_eq!(engine.store().snapshot().apis.len(), 2);

        let before = engine.store().snapshot().is_message_sending_enabled;
        engine.toggle_notifications().await;
        assert_eq!(
            engine.store().snapshot().is_message_sending_enabled,
            !before
        );

        // Nothing reached the backend
        assert_eq!(remote.fetch_count(), 0);
        assert_eq!(remote.state.lock().unwrap().apis.len(), 1);
    }

    #[tokio::test]
    async fn test_connected_mutation_round_trips_through_backend() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        let engine = engine_with(remote.clone());
        engine.poll().await;

        engine.save_api(sample_api("8", "Nova")).await;

        // initial poll + follow-up re-poll
        assert_eq!(remote.fetch_count(), 2);
        let snapshot = engine.store().snapshot();
        assert_eq!(snapshot.apis.len(), 2);
        assert!(snapshot.apis.iter().any(|a| a.id == "8"));
    }

    #[tokio::test]
    async fn test_connected_mutation_failure_leaves_store_unchanged() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        let engine = engine_with(remote.clone());
        engine.poll().await;
        let before = engine.store().snapshot();

        remote.fail_mutations.store(true, Ordering::SeqCst);
        engine.save_api(sample_api("8", "Nova")).await;
        engine.delete_api("7").await;
        engine.toggle_notifications().await;

        // Logged only: no re-poll, store untouched
        assert_eq!(remote.fetch_count(), 1);
        assert_eq!(engine.store().snapshot(), before);
    }

    #[tokio::test]
    async fn test_connected_test_triggers_probe_and_resyncs() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        let engine = engine_with(remote.clone());
        engine.poll().await;

        engine.test_api("7").await;
        assert_eq!(remote.fetch_count(), 2);
        let api = engine.store().snapshot().apis[0].clone();
        assert_eq!(api.is_online, Some(true));
        assert_eq!(api.response_time, Some(123));
    }

    #[tokio::test]
    async fn test_fallback_test_simulates_probe() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        remote.reachable.store(false, Ordering::SeqCst);
        let engine = engine_with(remote.clone());
        engine.poll().await;

        engine.test_api("1").await;
        let api = engine.store().snapshot().apis[0].clone();
        assert!((100..1100).contains(&api.response_time.unwrap()));
        assert_eq!(remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_poll_in_flight_guard_drops_overlapping_poll() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        let engine = engine_with(remote.clone());

        engine.link.poll_in_flight.store(true, Ordering::SeqCst);
        engine.poll().await;
        assert_eq!(remote.fetch_count(), 0);

        engine.link.poll_in_flight.store(false, Ordering::SeqCst);
        engine.poll().await;
        assert_eq!(remote.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_list_schedule_groups_collapses_failure_to_empty() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        let engine = engine_with(remote.clone());
        assert_eq!(engine.list_schedule_groups().await.len(), 1);

        remote.reachable.store(false, Ordering::SeqCst);
        assert!(engine.list_schedule_groups().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_polls_immediately_and_on_timer() {
        let remote = Arc::new(FakeAuthority::new(remote_state()));
        let mut engine = engine_with(remote.clone());

        engine.start(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.stop();

        let polled = remote.fetch_count();
        assert!(polled >= 2, "expected immediate + timer polls, got {polled}");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(remote.fetch_count(), polled, "timer kept firing after stop");
    }
}
