use serde::Serialize;
use serde_json::{Map, Value};

/// Grafana dashboard schema version emitted by the assembler.
pub const SCHEMA_VERSION: u32 = 38;

/// Request body for `POST /api/dashboards/db`.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardImport {
    pub dashboard: Dashboard,
    pub overwrite: bool,
    #[serde(rename = "folderUid", skip_serializing_if = "Option::is_none")]
    pub folder_uid: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub uid: String,
    pub title: String,
    pub schema_version: u32,
    pub panels: Vec<Panel>,
    pub tags: Vec<String>,
    pub graph_tooltip: u8,
    pub time: TimeRange,
    pub timepicker: TimePicker,
    pub templating: Templating,
    pub refresh: String,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

// Grafana expects snake_case keys here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePicker {
    pub refresh_intervals: Vec<&'static str>,
    pub time_options: Vec<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Templating {
    pub list: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub grid_pos: GridPos,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceRef>,
    pub targets: Vec<Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<PanelOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_config: Option<FieldConfig>,
    pub transparent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_shift: Option<String>,
    /// Extra keys contributed by a panel template.
    #[serde(flatten)]
    pub template_extras: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasourceRef {
    pub uid: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub ref_id: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceRef>,
    #[serde(flatten)]
    pub query: Option<TargetQuery>,
}

/// Query payload, shaped by the datasource's engine family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TargetQuery {
    Sql(SqlTarget),
    Expression(ExpressionTarget),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlTarget {
    pub raw_query: bool,
    pub raw_sql: String,
    pub format: QueryFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionTarget {
    pub expr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFormat {
    Table,
    TimeSeries,
}

// ── Panel options ──

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PanelOptions {
    TimeSeries(TimeSeriesOptions),
    Stat(StatOptions),
    Table(TableOptions),
    BarChart(BarChartOptions),
    Gauge(GaugeOptions),
    ChartOverlay(ChartOverlayOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesOptions {
    pub legend: LegendOptions,
    pub tooltip: TooltipOptions,
    pub draw_style: &'static str,
    pub line_interpolation: &'static str,
    pub line_width: u32,
    pub fill_opacity: u32,
    pub show_points: &'static str,
    pub span_nulls: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendOptions {
    pub calcs: Vec<&'static str>,
    pub display_mode: &'static str,
    pub placement: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipOptions {
    pub mode: &'static str,
    pub sort: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReduceOptions {
    pub calcs: Vec<&'static str>,
    pub fields: &'static str,
    pub values: bool,
}

impl ReduceOptions {
    pub fn last_not_null() -> Self {
        Self {
            calcs: vec!["lastNotNull"],
            fields: "",
            values: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatOptions {
    pub color_mode: &'static str,
    pub graph_mode: &'static str,
    pub justify_mode: &'static str,
    pub orientation: &'static str,
    pub reduce_options: ReduceOptions,
    pub text_mode: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    pub show_header: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChartOptions {
    pub orientation: &'static str,
    pub show_value: &'static str,
    pub stacking: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeOptions {
    pub orientation: &'static str,
    pub show_threshold_labels: bool,
    pub show_threshold_markers: bool,
    pub reduce_options: ReduceOptions,
}

/// Options for the Business Charts (ECharts) panel. The same script is
/// published under every key the plugin has used across versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOverlayOptions {
    pub function: String,
    pub get_option: String,
    pub script: String,
    pub use_data_frames: bool,
}

// ── Field config ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConfig {
    pub defaults: FieldDefaults,
    pub overrides: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<FieldColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomFieldConfig>,
    /// Globally configured defaults for keys the panel does not set itself.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDefaults {
    /// Whether the panel already provides a value for `key`.
    pub fn has_key(&self, key: &str) -> bool {
        match key {
            "unit" => self.unit.is_some(),
            "decimals" => self.decimals.is_some(),
            "thresholds" => self.thresholds.is_some(),
            "color" => self.color.is_some(),
            "custom" => self.custom.is_some(),
            other => self.extra.contains_key(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unit.is_none()
            && self.decimals.is_none()
            && self.thresholds.is_none()
            && self.color.is_none()
            && self.custom.is_none()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thresholds {
    pub mode: &'static str,
    pub steps: Vec<ThresholdStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdStep {
    pub color: &'static str,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldColor {
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_color: Option<String>,
}

impl FieldColor {
    pub fn fixed(color: impl Into<String>) -> Self {
        Self {
            mode: "fixed",
            fixed_color: Some(color.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_soft_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_soft_max: Option<u32>,
}

// ── Upload surface ──

/// Response of a successful CSV upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub uid: String,
    pub title: String,
    pub grafana_url: String,
    pub grafana_response: String,
}
