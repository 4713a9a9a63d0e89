use serde::{Deserialize, Serialize};

use crate::schedule::{Day, ScheduleMap, TimeOfDay};

/// HTTP method a monitored endpoint is probed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn parse(s: &str) -> Option<Method> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "PATCH" => Some(Method::Patch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monitored HTTP endpoint definition plus its last observed probe result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredApi {
    /// Assigned once at creation (client-side, from the clock, when created
    /// offline) and immutable thereafter.
    pub id: String,
    pub name: String,
    pub method: Method,
    pub url: String,
    /// Header set serialized as a JSON object string (see [`crate::headers`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// All compiled cron expressions joined with `;`.
    pub cron: String,
    pub enabled: bool,
    /// Written by the probing service (or the fallback simulation), never by
    /// the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
    /// Weak reference to a schedule group. A dangling id simply fails to
    /// resolve; nothing owns or repairs it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_group_id: Option<String>,
    /// Full calendar kept alongside `cron` so the editor can rebuild the
    /// visual grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleMap>,
}

/// Grouping metadata row from the remote authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleGroup {
    pub id: String,
    pub name: String,
}

/// The aggregate exchanged wholesale with the remote authority and held by
/// the store. Never partially merged across a poll boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceState {
    pub is_message_sending_enabled: bool,
    pub last_run_timestamp: String,
    pub last_run_status: String,
    pub next_run_timestamp: String,
    pub last_failed_apis: Vec<String>,
    pub apis: Vec<MonitoredApi>,
}

/// Built-in demonstration dataset shown while no backend is reachable.
pub fn demo_state() -> ServiceState {
    ServiceState {
        is_message_sending_enabled: true,
        last_run_timestamp: "01/09/2025, 14:30:15".into(),
        last_run_status: "✅ Todas as APIs estão operacionais.".into(),
        next_run_timestamp: "01/09/2025, 14:40:15".into(),
        last_failed_apis: Vec::new(),
        apis: vec![
            MonitoredApi {
                id: "1".into(),
                name: "API de Usuários".into(),
                method: Method::Get,
                url: "https://jsonplaceholder.typicode.com/users".into(),
                headers: Some(r#"{"Content-Type": "application/json"}"#.into()),
                body: Some(String::new()),
                cron: "*/10 * * * *".into(),
                enabled: true,
                is_online: Some(true),
                response_time: Some(245),
                last_run: Some("01/09/2025, 14:30:15".into()),
                schedule_group_id: None,
                schedule: None,
            },
            MonitoredApi {
                id: "2".into(),
                name: "API de Posts".into(),
                method: Method::Get,
                url: "https://jsonplaceholder.typicode.com/posts".into(),
                headers: Some(r#"{"Content-Type": "application/json"}"#.into()),
                body: Some(String::new()),
                cron: "*/5 * * * *".into(),
                enabled: true,
                is_online: Some(false),
                response_time: Some(1200),
                last_run: Some("01/09/2025, 14:25:10".into()),
                schedule_group_id: None,
                schedule: None,
            },
        ],
    }
}

/// Calendar a fresh editor form starts from: weekdays at 08:00 and 14:00.
pub fn default_schedule() -> ScheduleMap {
    let mut schedule = ScheduleMap::new();
    for day in Day::WEEKDAYS {
        schedule.set_day(
            day,
            vec![TimeOfDay::from_parts(8, 0), TimeOfDay::from_parts(14, 0)],
        );
    }
    schedule
}
