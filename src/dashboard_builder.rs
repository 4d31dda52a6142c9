use serde::Deserialize;
use uuid::Uuid;

use crate::models::dashboard::{
    Dashboard, DashboardImport, Panel, SCHEMA_VERSION, Templating, TimePicker, TimeRange,
};

const REFRESH_INTERVALS: [&str; 10] = ["5s", "10s", "30s", "1m", "5m", "15m", "30m", "1h", "2h", "1d"];
const TIME_OPTIONS: [&str; 9] = ["5m", "15m", "1h", "6h", "12h", "24h", "2d", "7d", "30d"];

/// Title-keyword override of dashboard time range, refresh and tags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Preset {
    /// Matched case-insensitively as a substring of the title.
    pub keyword: String,
    #[serde(default)]
    pub time_from: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Preset {
    pub fn business() -> Self {
        Self {
            keyword: "business".into(),
            time_from: Some("now-1y".into()),
            refresh: Some("1h".into()),
            tags: vec!["business".into()],
        }
    }

    fn matches(&self, lowered_title: &str) -> bool {
        !self.keyword.is_empty() && lowered_title.contains(&self.keyword.to_lowercase())
    }
}

pub fn default_presets() -> Vec<Preset> {
    vec![Preset::business()]
}

/// Wrap panels into a complete dashboard with a freshly minted uid. Every
/// matching preset applies in order; later presets win on time and refresh.
pub fn assemble(title: &str, panels: Vec<Panel>, presets: &[Preset], theme: Option<&str>) -> Dashboard {
    let mut dashboard = Dashboard {
        uid: Uuid::new_v4().simple().to_string(),
        title: title.to_string(),
        schema_version: SCHEMA_VERSION,
        panels,
        tags: Vec::new(),
        graph_tooltip: 1,
        time: TimeRange {
            from: "now-7d".into(),
            to: "now".into(),
        },
        timepicker: TimePicker {
            refresh_intervals: REFRESH_INTERVALS.to_vec(),
            time_options: TIME_OPTIONS.to_vec(),
        },
        templating: Templating::default(),
        refresh: "5m".into(),
        timezone: "browser".into(),
        style: theme.map(str::to_string),
    };

    let lowered = title.to_lowercase();
    for preset in presets.iter().filter(|p| p.matches(&lowered)) {
        if let Some(from) = &preset.time_from {
            dashboard.time.from = from.clone();
        }
        if let Some(refresh) = &preset.refresh {
            dashboard.refresh = refresh.clone();
        }
        for tag in &preset.tags {
            if !dashboard.tags.contains(tag) {
                dashboard.tags.push(tag.clone());
            }
        }
    }
    dashboard
}

/// Upsert payload for Grafana's dashboard import endpoint.
pub fn import_payload(dashboard: Dashboard, folder_uid: Option<String>) -> DashboardImport {
    DashboardImport {
        dashboard,
        overwrite: true,
        folder_uid,
    }
}
