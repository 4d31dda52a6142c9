pub const DEFAULT_PANEL_WIDTH: u32 = 12;
pub const DEFAULT_PANEL_HEIGHT: u32 = 8;

/// Series style used by the chart-overlay (ECharts) panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStyle {
    Line,
    Bar,
}

/// Visualization kind requested by a CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visualization {
    #[default]
    TimeSeries,
    Stat,
    Table,
    BarChart,
    Gauge,
    ChartOverlay(OverlayStyle),
}

impl Visualization {
    /// Map a free-form label to a kind. Unknown labels fall back to timeseries.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "stat" => Self::Stat,
            "table" => Self::Table,
            "barchart" | "bar" => Self::BarChart,
            "gauge" => Self::Gauge,
            "echarts" | "echarts-line" | "business" | "chart-overlay" => {
                Self::ChartOverlay(OverlayStyle::Line)
            }
            "echarts-bar" => Self::ChartOverlay(OverlayStyle::Bar),
            _ => Self::TimeSeries,
        }
    }

    /// Grafana panel plugin id.
    pub fn panel_type(self) -> &'static str {
        match self {
            Self::TimeSeries => "timeseries",
            Self::Stat => "stat",
            Self::Table => "table",
            Self::BarChart => "barchart",
            Self::Gauge => "gauge",
            Self::ChartOverlay(_) => "volkovlabs-echarts-panel",
        }
    }

    /// Panels that reduce a query to a single value.
    pub fn is_single_value(self) -> bool {
        matches!(self, Self::Stat | Self::Gauge)
    }

    /// Panels that expect time-bounded data from the dashboard time picker.
    pub fn is_time_oriented(self) -> bool {
        matches!(self, Self::TimeSeries | Self::Stat | Self::Gauge)
    }
}

/// One parsed CSV row, before layout and defaults are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelDescriptor {
    pub title: Option<String>,
    pub datasource: Option<String>,
    pub query: Option<String>,
    pub visualization: Visualization,
    pub unit: Option<String>,
    pub thresholds: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub time_from: Option<String>,
    pub time_shift: Option<String>,
    pub color: Option<String>,
}

impl PanelDescriptor {
    /// Requested size in grid units; absent or non-positive values become 12x8.
    pub fn size(&self) -> (u32, u32) {
        (
            positive_or(self.width, DEFAULT_PANEL_WIDTH),
            positive_or(self.height, DEFAULT_PANEL_HEIGHT),
        )
    }

    pub fn has_query(&self) -> bool {
        self.query.as_deref().is_some_and(|q| !q.trim().is_empty())
    }
}

fn positive_or(value: Option<i64>, fallback: u32) -> u32 {
    match value {
        Some(v) if v > 0 => u32::try_from(v).unwrap_or(u32::MAX),
        _ => fallback,
    }
}
