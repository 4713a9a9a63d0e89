//! Editor-side handling of the serialized header set.
//!
//! A monitored API stores its headers as a single JSON object string; the
//! editor works on a row list with per-row enable switches and only the
//! enabled rows make it into the stored form.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One row of the editor's header table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
    pub enabled: bool,
}

impl HeaderEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, enabled: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled,
        }
    }
}

/// Header template a fresh editor form starts from.
pub fn default_entries() -> Vec<HeaderEntry> {
    vec![
        HeaderEntry::new("Content-Type", "application/json", true),
        HeaderEntry::new("Cache-Control", "no-cache", false),
        HeaderEntry::new("User-Agent", "API-Monitor/1.0", true),
    ]
}

/// Serialize the enabled, non-empty rows into the stored JSON object string.
pub fn serialize_enabled(entries: &[HeaderEntry]) -> String {
    let mut object = serde_json::Map::new();
    for entry in entries {
        if entry.enabled && !entry.key.is_empty() && !entry.value.is_empty() {
            object.insert(
                entry.key.clone(),
                serde_json::Value::String(entry.value.clone()),
            );
        }
    }
    serde_json::Value::Object(object).to_string()
}

/// Parse a stored header string back into editor rows.
///
/// Malformed stored data must not block the edit session: it logs and falls
/// back to the default template.
pub fn parse_stored(raw: &str) -> Vec<HeaderEntry> {
    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw) {
        Ok(object) => object
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                HeaderEntry::new(key, value, true)
            })
            .collect(),
        Err(e) => {
            warn!("Could not parse stored headers, falling back to defaults: {e}");
            default_entries()
        }
    }
}

/// Replace any `Authorization` row with Basic credentials. Empty credentials
/// just strip the existing row.
pub fn apply_basic_auth(entries: &mut Vec<HeaderEntry>, username: &str, password: &str) {
    entries.retain(|h| h.key != "Authorization");
    if username.is_empty() || password.is_empty() {
        return;
    }
    let credentials = BASE64.encode(format!("{username}:{password}"));
    entries.insert(
        0,
        HeaderEntry::new("Authorization", format!("Basic {credentials}"), true),
    );
}
