//! HTTP implementation of the remote authority protocol.
//!
//! Thin by design: every method is one round trip, non-2xx statuses are
//! errors, and all degrade/retry policy lives in the sync engine.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use farol_core::state::{MonitoredApi, ScheduleGroup, ServiceState};
use farol_core::sync::{DigestOutcome, NotifyOutcome, RemoteAuthority, ToggleOutcome};

/// Remote authority reached over plain HTTP.
pub struct HttpAuthority {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthority {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// `GET /schedule-group/list` envelope.
#[derive(Debug, Deserialize)]
struct GroupList {
    #[serde(default)]
    groups: Vec<ScheduleGroup>,
}

#[async_trait]
impl RemoteAuthority for HttpAuthority {
    async fn fetch_state(&self) -> Result<ServiceState> {
        let response = self
            .client
            .get(self.url("/status"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn toggle_messages(&self) -> Result<ToggleOutcome> {
        let response = self
            .client
            .post(self.url("/toggle-messages"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn upsert_api(&self, api: &MonitoredApi) -> Result<()> {
        self.client
            .post(self.url("/api/add"))
            .json(api)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_api(&self, id: &str) -> Result<()> {
        self.client
            .post(self.url("/api/delete"))
            .json(&json!({ "id": id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn trigger_test(&self, id: &str) -> Result<()> {
        self.client
            .post(self.url("/api/test"))
            .json(&json!({ "id": id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_test_message(&self, message: &str) -> Result<NotifyOutcome> {
        let response = self
            .client
            .post(self.url("/test-whatsapp"))
            .json(&json!({ "message": message }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn send_offline_digest(&self) -> Result<DigestOutcome> {
        let response = self
            .client
            .post(self.url("/send-whatsapp-offline"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn list_schedule_groups(&self) -> Result<Vec<ScheduleGroup>> {
        let response = self
            .client
            .get(self.url("/schedule-group/list"))
            .send()
            .await?
            .error_for_status()?;
        let list: GroupList = response.json().await?;
        Ok(list.groups)
    }
}
