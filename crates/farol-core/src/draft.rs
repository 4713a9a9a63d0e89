use chrono::Utc;

use crate::error::ScheduleError;
use crate::headers::{self, HeaderEntry};
use crate::schedule::{compile_joined, validate_cron_field, ScheduleMap};
use crate::state::{default_schedule, Method, MonitoredApi};

/// Editable form state for one monitored API.
///
/// Mirrors the dashboard's editor dialog: request fields, the header table,
/// the visual calendar, and an optional hand-typed cron field that wins over
/// the calendar when set.
#[derive(Debug, Clone)]
pub struct ApiDraft {
    pub name: String,
    pub method: Method,
    pub url: String,
    pub body: String,
    pub enabled: bool,
    pub headers: Vec<HeaderEntry>,
    pub schedule: ScheduleMap,
    pub schedule_group_id: Option<String>,
    pub cron_override: Option<String>,
    /// Probe-observed fields carried through an edit untouched; only the
    /// probing service writes them.
    pub is_online: Option<bool>,
    pub response_time: Option<u64>,
    pub last_run: Option<String>,
}

impl Default for ApiDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            method: Method::Get,
            url: String::new(),
            body: String::new(),
            enabled: true,
            headers: headers::default_entries(),
            schedule: default_schedule(),
            schedule_group_id: None,
            cron_override: None,
            is_online: None,
            response_time: None,
            last_run: None,
        }
    }
}

impl ApiDraft {
    /// Load an existing definition into the editor.
    ///
    /// Stored header and schedule data may be malformed or missing; both
    /// recover to editor defaults rather than refusing to open.
    pub fn from_api(api: &MonitoredApi) -> Self {
        let headers = match api.headers.as_deref() {
            Some(raw) => headers::parse_stored(raw),
            None => headers::default_entries(),
        };
        let schedule = match &api.schedule {
            Some(s) if !s.is_empty() => s.clone(),
            _ => default_schedule(),
        };
        Self {
            name: api.name.clone(),
            method: api.method,
            url: api.url.clone(),
            body: api.body.clone().unwrap_or_default(),
            enabled: api.enabled,
            headers,
            schedule,
            schedule_group_id: api.schedule_group_id.clone(),
            cron_override: None,
            is_online: api.is_online,
            response_time: api.response_time,
            last_run: api.last_run.clone(),
        }
    }

    /// Assemble the mutation payload the sync engine dispatches.
    ///
    /// `existing_id` keeps the identity stable on update; on create the id
    /// is generated client-side from the clock. The `cron` field is always
    /// recompiled in full from the calendar — there is no diffing against a
    /// previous schedule.
    pub fn into_api(self, existing_id: Option<String>) -> Result<MonitoredApi, ScheduleError> {
        let cron = match &self.cron_override {
            Some(field) => {
                validate_cron_field(field)?;
                field.clone()
            }
            None => compile_joined(&self.schedule),
        };
        Ok(MonitoredApi {
            id: existing_id.unwrap_or_else(generate_id),
            name: self.name,
            method: self.method,
            url: self.url,
            headers: Some(headers::serialize_enabled(&self.headers)),
            body: if self.body.is_empty() {
                None
            } else {
                Some(self.body)
            },
            cron,
            enabled: self.enabled,
            is_online: self.is_online,
            response_time: self.response_time,
            last_run: self.last_run,
            schedule_group_id: self.schedule_group_id,
            schedule: Some(self.schedule),
        })
    }
}

/// Client-side id: current epoch millis. Unique enough for a single offline
/// session; never reconciled against server-issued ids.
fn generate_id() -> String {
    Utc::now().timestamp_millis().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Day, TimeOfDay};

    fn sample_draft() -> ApiDraft {
        let mut schedule = ScheduleMap::new();
        schedule.insert_slot(Day::try_from(1).unwrap(), "08:00".parse().unwrap());
        schedule.insert_slot(Day::try_from(1).unwrap(), "14:00".parse().unwrap());
        ApiDraft {
            name: "API de Usuários".into(),
            url: "https://jsonplaceholder.typicode.com/users".into(),
            schedule,
            ..ApiDraft::default()
        }
    }

    #[test]
    fn test_create_generates_numeric_id() {
        let api = sample_draft().into_api(None).unwrap();
        assert!(api.id.parse::<i64>().is_ok());
        assert!(!api.id.is_empty());
    }

    #[test]
    fn test_update_preserves_id() {
        let api = sample_draft().into_api(Some("42".into())).unwrap();
        assert_eq!(api.id, "42");
    }

    #[test]
    fn test_cron_compiled_from_calendar() {
        let api = sample_draft().into_api(None).unwrap();
        assert_eq!(api.cron, "00 08 * * 1;00 14 * * 1");
        let schedule = api.schedule.unwrap();
        assert_eq!(schedule.total_slots(), 2);
    }

    #[test]
    fn test_cron_override_wins_when_valid() {
        let mut draft = sample_draft();
        draft.cron_override = Some("*/10 * * * *".into());
        let api = draft.into_api(None).unwrap();
        assert_eq!(api.cron, "*/10 * * * *");
    }

    #[test]
    fn test_cron_override_rejected_when_invalid() {
        let mut draft = sample_draft();
        draft.cron_override = Some("bogus".into());
        assert!(matches!(
            draft.into_api(None),
            Err(ScheduleError::InvalidCron { .. })
        ));
    }

    #[test]
    fn test_headers_serialized_into_stored_form() {
        let api = sample_draft().into_api(None).unwrap();
        let stored = api.headers.unwrap();
        assert!(stored.contains(r#""Content-Type":"application/json""#));
        // Cache-Control row is disabled in the default template
        assert!(!stored.contains("Cache-Control"));
    }

    #[test]
    fn test_from_api_recovers_malformed_headers() {
        let mut api = sample_draft().into_api(None).unwrap();
        api.headers = Some("{broken".into());
        let draft = ApiDraft::from_api(&api);
        assert_eq!(draft.headers, crate::headers::default_entries());
    }

    #[test]
    fn test_from_api_defaults_missing_schedule() {
        let mut api = sample_draft().into_api(None).unwrap();
        api.schedule = None;
        let draft = ApiDraft::from_api(&api);
        assert_eq!(draft.schedule, default_schedule());
        assert_eq!(
            draft.schedule.times(Day::try_from(1).unwrap()),
            &[
                "08:00".parse::<TimeOfDay>().unwrap(),
                "14:00".parse::<TimeOfDay>().unwrap()
            ]
        );
    }

    #[test]
    fn test_edit_round_trip_carries_probe_fields() {
        let mut api = sample_draft().into_api(None).unwrap();
        api.is_online = Some(true);
        api.response_time = Some(245);
        api.last_run = Some("01/09/2025, 14:30:15".into());

        let mut draft = ApiDraft::from_api(&api);
        draft.name = "API renomeada".into();
        let updated = draft.into_api(Some(api.id.clone())).unwrap();

        assert_eq!(updated.name, "API renomeada");
        assert_eq!(updated.is_online, Some(true));
        assert_eq!(updated.response_time, Some(245));
        assert_eq!(updated.last_run.as_deref(), Some("01/09/2025, 14:30:15"));
    }
}
