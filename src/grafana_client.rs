use std::time::Duration;

use async_trait::async_trait;

use crate::error::PublishError;
use crate::models::dashboard::DashboardImport;

const IMPORT_PATH: &str = "/api/dashboards/db";

/// Destination for assembled dashboards.
#[async_trait]
pub trait DashboardPublisher: Send + Sync {
    /// Submit the payload and return the raw response body on success.
    async fn publish(&self, payload: &DashboardImport) -> Result<String, PublishError>;
}

/// Grafana HTTP API client (`POST /api/dashboards/db`, bearer auth).
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    http: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
    org_id: Option<u64>,
}

impl GrafanaClient {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        org_id: Option<u64>,
        timeout: Option<Duration>,
    ) -> Result<Self, PublishError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: non_blank(base_url).map(|u| u.trim_end_matches('/').to_string()),
            api_key: non_blank(api_key),
            org_id,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl DashboardPublisher for GrafanaClient {
    async fn publish(&self, payload: &DashboardImport) -> Result<String, PublishError> {
        let base = self.base_url.as_deref().ok_or(PublishError::MissingUrl)?;
        let api_key = self.api_key.as_deref().ok_or(PublishError::MissingApiKey)?;

        let mut request = self
            .http
            .post(format!("{base}{IMPORT_PATH}"))
            .bearer_auth(api_key)
            .json(payload);
        if let Some(org_id) = self.org_id {
            request = request.header("X-Grafana-Org-Id", org_id.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("grafana rejected dashboard {}: {status} {body}", payload.dashboard.uid);
            return Err(PublishError::Rejected { status, body });
        }
        tracing::info!(
            "published dashboard {} ({} panels) to {base}",
            payload.dashboard.uid,
            payload.dashboard.panels.len()
        );
        Ok(body)
    }
}
