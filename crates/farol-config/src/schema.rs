use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub backend: BackendConfig,
    pub editor: EditorConfig,
}

/// Where the monitoring backend lives and how often to resync with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Seconds between recurring state polls.
    pub poll_interval_secs: u64,
    /// Seconds to wait after a one-shot test before re-polling, so the
    /// backend has time to run the probe.
    pub test_resync_delay_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8033".into(),
            poll_interval_secs: 30,
            test_resync_delay_secs: 2,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Seed new API drafts with the standard header template
    /// (Content-Type / Cache-Control / User-Agent).
    pub seed_default_headers: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            seed_default_headers: true,
        }
    }
}
