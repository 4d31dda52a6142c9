use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

use crate::config::AutobuilderConfig;
use crate::csv_parser;
use crate::dashboard_builder::{assemble, import_payload};
use crate::error::ServiceError;
use crate::grafana_client::DashboardPublisher;
use crate::models::dashboard::{DashboardImport, UploadResponse};
use crate::models::validation::ValidationResult;
use crate::panel_builder::{BuildContext, PanelTemplate, build_panels};
use crate::style::StyleConfig;
use crate::validator::{QueryExecutor, ValidationOptions, validate};

const DEFAULT_GRAFANA_BASE: &str = "http://localhost:3000";
const DEFAULT_FILE_STEM: &str = "Dashboard";

/// A dashboard that Grafana accepted.
#[derive(Debug, Clone)]
pub struct CreatedDashboard {
    pub uid: String,
    pub title: String,
    pub url: String,
    pub payload: DashboardImport,
    pub grafana_response: String,
}

impl From<CreatedDashboard> for UploadResponse {
    fn from(created: CreatedDashboard) -> Self {
        Self {
            uid: created.uid,
            title: created.title,
            grafana_url: created.url,
            grafana_response: created.grafana_response,
        }
    }
}

/// CSV → dashboard → Grafana, plus the validation dry-run. Cheap to clone.
#[derive(Clone)]
pub struct DashboardService {
    config: Arc<AutobuilderConfig>,
    style: Arc<StyleConfig>,
    template: Option<Arc<PanelTemplate>>,
    executor: Arc<dyn QueryExecutor>,
    publisher: Arc<dyn DashboardPublisher>,
}

impl DashboardService {
    pub fn new(
        config: Arc<AutobuilderConfig>,
        style: Arc<StyleConfig>,
        template: Option<Arc<PanelTemplate>>,
        executor: Arc<dyn QueryExecutor>,
        publisher: Arc<dyn DashboardPublisher>,
    ) -> Self {
        Self {
            config,
            style,
            template,
            executor,
            publisher,
        }
    }

    /// Parse, lay out, build, assemble and publish. `title` falls back to the
    /// upload's file name plus a timestamp.
    pub async fn create_from_csv(
        &self,
        csv: &[u8],
        file_name: Option<&str>,
        title: Option<&str>,
    ) -> Result<CreatedDashboard, ServiceError> {
        let descriptors = csv_parser::parse(csv)?;
        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => default_title(file_name, Local::now().naive_local()),
        };

        let grafana = &self.config.grafana;
        let ctx = BuildContext::new(
            &self.style,
            self.template.as_deref(),
            grafana.default_datasource_uid.as_deref(),
            grafana.default_datasource_type.as_deref(),
        );
        let panels = build_panels(&descriptors, &ctx);
        let dashboard = assemble(&title, panels, &self.config.presets, self.style.theme.as_deref());
        let uid = dashboard.uid.clone();
        let payload = import_payload(dashboard, grafana.folder_uid.clone());

        tracing::info!(
            "publishing dashboard {uid} \"{title}\" with {} panels",
            payload.dashboard.panels.len()
        );
        let grafana_response = self.publisher.publish(&payload).await?;

        Ok(CreatedDashboard {
            url: dashboard_url(grafana.url.as_deref(), &uid),
            uid,
            title,
            payload,
            grafana_response,
        })
    }

    /// Dry-run every row's query without building anything.
    pub async fn validate_csv(&self, csv: &[u8]) -> Result<Vec<ValidationResult>, ServiceError> {
        let descriptors = csv_parser::parse(csv)?;
        let opts = ValidationOptions {
            window_days: self.config.validation.window_days,
            timeout: self.config.query_timeout(),
        };
        Ok(validate(&descriptors, self.executor.as_ref(), &opts).await)
    }
}

/// `"{file name without .csv} - {yyyy-MM-dd HH:mm}"`.
pub fn default_title(file_name: Option<&str>, now: NaiveDateTime) -> String {
    let stem = file_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(strip_csv_extension)
        .unwrap_or(DEFAULT_FILE_STEM);
    format!("{stem} - {}", now.format("%Y-%m-%d %H:%M"))
}

fn strip_csv_extension(name: &str) -> &str {
    let cut = name.len().saturating_sub(4);
    match name.get(cut..) {
        Some(ext) if ext.eq_ignore_ascii_case(".csv") => &name[..cut],
        _ => name,
    }
}

/// Browser link for a published dashboard.
pub fn dashboard_url(base: Option<&str>, uid: &str) -> String {
    let base = base
        .map(|b| b.trim().trim_end_matches('/'))
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_GRAFANA_BASE);
    format!("{base}/d/{uid}")
}
