use std::sync::RwLock;

use chrono::Local;

use crate::state::{MonitoredApi, ServiceState};

/// In-memory authority for the current session's service state.
///
/// One lock guards the whole aggregate, so every operation is atomic even
/// when a multi-threaded host shares the store between the sync engine and a
/// UI. Only the sync engine writes; the UI reads snapshots.
#[derive(Debug, Default)]
pub struct StatusStore {
    state: RwLock<ServiceState>,
}

impl StatusStore {
    pub fn new(initial: ServiceState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    /// Cloned view for display.
    pub fn snapshot(&self) -> ServiceState {
        self.state.read().unwrap().clone()
    }

    /// Wholesale swap, used after every successful poll. The aggregate is
    /// never merged field-by-field across a poll boundary.
    pub fn replace(&self, state: ServiceState) {
        *self.state.write().unwrap() = state;
    }

    /// Insert a new definition, or replace the entry with the same id in
    /// place, preserving its position in the list.
    pub fn upsert(&self, api: MonitoredApi) {
        let mut state = self.state.write().unwrap();
        if let Some(pos) = state.apis.iter().position(|a| a.id == api.id) {
            state.apis[pos] = api;
        } else {
            state.apis.push(api);
        }
    }

    /// Remove by id. Unknown ids are a no-op, not an error.
    pub fn remove(&self, id: &str) {
        let mut state = self.state.write().unwrap();
        state.apis.retain(|a| a.id != id);
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.state.write().unwrap().is_message_sending_enabled = enabled;
    }

    /// Flip the notification flag, returning the new value.
    pub fn toggle_notifications(&self) -> bool {
        let mut state = self.state.write().unwrap();
        state.is_message_sending_enabled = !state.is_message_sending_enabled;
        state.is_message_sending_enabled
    }

    /// Fallback-only stand-in for the probing service: assigns a random
    /// outcome and latency to one entry. Must not run while a real backend
    /// is connected, or it would overwrite a genuine probe result.
    ///
    /// Returns whether the id matched an entry.
    pub fn simulate_probe(&self, id: &str) -> bool {
        let mut state = self.state.write().unwrap();
        let Some(api) = state.apis.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        api.is_online = Some(rand::random_bool(0.7));
        api.response_time = Some(rand::random_range(100..1100));
        api.last_run = Some(Local::now().format("%d/%m/%Y, %H:%M:%S").to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{demo_state, Method};

    fn api(id: &str, name: &str) -> MonitoredApi {
        MonitoredApi {
            id: id.into(),
            name: name.into(),
            method: Method::Get,
            url: format!("https://example.com/{id}"),
            headers: None,
            body: None,
            cron: "*/10 * * * *".into(),
            enabled: true,
            is_online: None,
            response_time: None,
            last_run: None,
            schedule_group_id: None,
            schedule: None,
        }
    }

    #[test]
    fn test_replace_swaps_wholesale() {
        let store = StatusStore::new(demo_state());
        store.replace(ServiceState::default());
        assert!(store.snapshot().apis.is_empty());
        assert!(!store.snapshot().is_message_sending_enabled);
    }

    #[test]
    fn test_upsert_appends_new_id() {
        let store = StatusStore::new(demo_state());
        store.upsert(api("99", "Nova API"));
        let apis = store.snapshot().apis;
        assert_eq!(apis.len(), 3);
        assert_eq!(apis[2].id, "99");
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let store = StatusStore::new(demo_state());
        store.upsert(api("1", "Renomeada"));
        let apis = store.snapshot().apis;
        assert_eq!(apis.len(), 2);
        assert_eq!(apis[0].id, "1");
        assert_eq!(apis[0].name, "Renomeada");
        assert_eq!(apis[1].id, "2");
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let store = StatusStore::new(demo_state());
        store.remove("does-not-exist");
        assert_eq!(store.snapshot().apis.len(), 2);
        store.remove("1");
        assert_eq!(store.snapshot().apis.len(), 1);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let store = StatusStore::new(demo_state());
        let original = store.snapshot().is_message_sending_enabled;
        assert_eq!(store.toggle_notifications(), !original);
        assert_eq!(store.toggle_notifications(), original);
    }

    #[test]
    fn test_set_notifications_enabled() {
        let store = StatusStore::new(demo_state());
        store.set_notifications_enabled(false);
        assert!(!store.snapshot().is_message_sending_enabled);
    }

    #[test]
    fn test_simulate_probe_assigns_outcome() {
        let store = StatusStore::new(demo_state());
        assert!(store.simulate_probe("1"));
        let probed = store.snapshot().apis[0].clone();
        assert!(probed.is_online.is_some());
        let latency = probed.response_time.unwrap();
        assert!((100..1100).contains(&latency));
        assert_ne!(probed.last_run.as_deref(), Some("01/09/2025, 14:30:15"));
    }

    #[test]
    fn test_simulate_probe_unknown_id() {
        let store = StatusStore::new(demo_state());
        assert!(!store.simulate_probe("nope"));
        assert_eq!(store.snapshot(), demo_state());
    }
}
