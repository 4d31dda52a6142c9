//! Per-visualization panel defaults: Grafana panel type, type-specific
//! options, field config (unit, decimals, thresholds, color) and the result
//! format a SQL target should request.
//!
//! Everything here is a pure function of its inputs plus the read-only
//! style config, so identical inputs always resolve to identical output.

use serde_json::Value;

use crate::models::dashboard::{
    BarChartOptions, ChartOverlayOptions, CustomFieldConfig, FieldColor, FieldConfig,
    FieldDefaults, GaugeOptions, LegendOptions, PanelOptions, QueryFormat, ReduceOptions,
    StatOptions, TableOptions, ThresholdStep, Thresholds, TimeSeriesOptions, TooltipOptions,
};
use crate::models::descriptor::{OverlayStyle, Visualization};
use crate::query_macros::has_time_alias;
use crate::style::StyleConfig;

const STAT_COLOR: &str = "#60A5FA";
const GAUGE_COLOR: &str = "#22C55E";
const BAR_COLOR: &str = "#06B6D4";

/// How a SQL target picks its result format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
    Always(QueryFormat),
    /// `time_series` only when the query selects a column aliased `time`.
    TimeSeriesIfTimeAlias,
}

impl FormatRule {
    pub fn format_for(self, query: &str) -> QueryFormat {
        match self {
            Self::Always(format) => format,
            Self::TimeSeriesIfTimeAlias if has_time_alias(query) => QueryFormat::TimeSeries,
            Self::TimeSeriesIfTimeAlias => QueryFormat::Table,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDefaults {
    pub panel_type: &'static str,
    pub options: PanelOptions,
    pub field_config: Option<FieldConfig>,
    pub format_rule: FormatRule,
}

/// Resolve defaults for one panel. `color` is the already-chosen color
/// (explicit row color or palette pick); per-kind fallbacks apply when it
/// is `None`.
pub fn resolve(
    visualization: Visualization,
    unit: Option<&str>,
    thresholds: Option<&str>,
    color: Option<&str>,
    style: &StyleConfig,
) -> ResolvedDefaults {
    let defaults = field_defaults(visualization, unit, thresholds, color);
    ResolvedDefaults {
        panel_type: visualization.panel_type(),
        options: panel_options(visualization, color),
        field_config: merge_global(defaults, style),
        format_rule: format_rule(visualization),
    }
}

pub fn format_rule(visualization: Visualization) -> FormatRule {
    match visualization {
        Visualization::Table => FormatRule::Always(QueryFormat::Table),
        Visualization::Stat
        | Visualization::Gauge
        | Visualization::BarChart
        | Visualization::ChartOverlay(_) => FormatRule::TimeSeriesIfTimeAlias,
        Visualization::TimeSeries => FormatRule::Always(QueryFormat::TimeSeries),
    }
}

fn panel_options(visualization: Visualization, color: Option<&str>) -> PanelOptions {
    match visualization {
        Visualization::Stat => PanelOptions::Stat(StatOptions {
            color_mode: "value",
            graph_mode: "area",
            justify_mode: "auto",
            orientation: "auto",
            reduce_options: ReduceOptions::last_not_null(),
            text_mode: "auto",
        }),
        Visualization::Table => PanelOptions::Table(TableOptions { show_header: true }),
        Visualization::BarChart => PanelOptions::BarChart(BarChartOptions {
            orientation: "vertical",
            show_value: "always",
            stacking: "none",
        }),
        Visualization::Gauge => PanelOptions::Gauge(GaugeOptions {
            orientation: "auto",
            show_threshold_labels: false,
            show_threshold_markers: true,
            reduce_options: ReduceOptions::last_not_null(),
        }),
        Visualization::ChartOverlay(style) => {
            let script = overlay_script(style, color.unwrap_or(STAT_COLOR));
            PanelOptions::ChartOverlay(ChartOverlayOptions {
                function: script.clone(),
                get_option: script.clone(),
                script,
                use_data_frames: true,
            })
        }
        Visualization::TimeSeries => PanelOptions::TimeSeries(TimeSeriesOptions {
            legend: LegendOptions {
                calcs: Vec::new(),
                display_mode: "list",
                placement: "bottom",
            },
            tooltip: TooltipOptions {
                mode: "single",
                sort: "none",
            },
            draw_style: "line",
            line_interpolation: "smooth",
            line_width: 2,
            fill_opacity: 12,
            show_points: "auto",
            span_nulls: true,
        }),
    }
}

const OVERLAY_SCRIPT: &str = r#"// generated by grafana-autobuilder
const data = context?.panel?.data ?? context?.data ?? null;
const frames = Array.isArray(data?.series) ? data.series : [];
const frame = frames.find(f => Array.isArray(f?.fields) && f.fields.some(x => x?.type === 'number'))
  ?? frames.find(f => Array.isArray(f?.fields) && f.fields.length > 0);
if (!frame) {
  return { title: { text: 'No data' } };
}
const values = f => (f?.values && typeof f.values.toArray === 'function') ? f.values.toArray() : (Array.isArray(f?.values) ? f.values : []);
const named = n => frame.fields.find(f => typeof f?.name === 'string' && f.name.toLowerCase() === n);
const typed = t => frame.fields.find(f => f?.type === t);
const timeField = typed('time') ?? named('time');
const valueField = named('value') ?? typed('number');
if (!valueField) {
  return { title: { text: 'No numeric data' } };
}
const labelField = timeField ? null : (named('label') ?? typed('string'));
const color = '__COLOR__';
const points = timeField
  ? values(timeField).map((t, i) => [t, values(valueField)[i]])
  : values(valueField);
return {
  color: [color],
  tooltip: { trigger: timeField ? 'axis' : 'item' },
  xAxis: { type: timeField ? 'time' : 'category', data: timeField ? undefined : values(labelField) },
  yAxis: { type: 'value' },
  series: [{ type: '__SERIES_TYPE__', smooth: true, showSymbol: false, itemStyle: { color }, data: points }],
};
"#;

fn overlay_script(style: OverlayStyle, color: &str) -> String {
    let series_type = match style {
        OverlayStyle::Line => "line",
        OverlayStyle::Bar => "bar",
    };
    let color: String = color
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '#')
        .collect();
    OVERLAY_SCRIPT
        .replace("__SERIES_TYPE__", series_type)
        .replace("__COLOR__", &color)
}

fn field_defaults(
    visualization: Visualization,
    unit: Option<&str>,
    thresholds: Option<&str>,
    color: Option<&str>,
) -> FieldDefaults {
    let percent = unit.is_some_and(|u| u.to_lowercase().contains("percent"));
    let mut defaults = FieldDefaults {
        unit: unit.map(str::to_string),
        decimals: unit.map(decimals_for_unit),
        thresholds: thresholds.map(parse_thresholds),
        ..Default::default()
    };

    match visualization {
        Visualization::Stat => {
            defaults.color = Some(FieldColor::fixed(color.unwrap_or(STAT_COLOR)));
        }
        Visualization::Gauge => {
            defaults.color = Some(FieldColor::fixed(color.unwrap_or(GAUGE_COLOR)));
            if percent {
                defaults.custom = Some(CustomFieldConfig {
                    min: Some(0),
                    max: Some(100),
                    ..Default::default()
                });
            }
        }
        Visualization::BarChart => {
            defaults.color = Some(FieldColor::fixed(color.unwrap_or(BAR_COLOR)));
        }
        Visualization::TimeSeries | Visualization::Table | Visualization::ChartOverlay(_) => {
            // No fallback color: Grafana's own palette applies.
            defaults.color = color.map(FieldColor::fixed);
            if percent {
                defaults.custom = Some(CustomFieldConfig {
                    axis_soft_min: Some(0),
                    axis_soft_max: Some(100),
                    ..Default::default()
                });
            }
        }
    }
    defaults
}

pub fn decimals_for_unit(unit: &str) -> u8 {
    let unit = unit.to_lowercase();
    if unit.contains("percent") {
        1
    } else if unit.contains("currency") {
        0
    } else {
        2
    }
}

/// Parse `"a|b"` into a green / yellow(≥a) / red(≥b) ladder. Steps whose
/// number does not parse are left out.
pub fn parse_thresholds(ladder: &str) -> Thresholds {
    let mut steps = vec![ThresholdStep {
        color: "green",
        value: None,
    }];
    let mut parts = ladder.split('|');
    for color in ["yellow", "red"] {
        let Some(part) = parts.next() else { break };
        if let Some(value) = part.trim().parse::<f64>().ok().filter(|v| v.is_finite()) {
            steps.push(ThresholdStep {
                color,
                value: Some(value),
            });
        }
    }
    Thresholds {
        mode: "absolute",
        steps,
    }
}

/// Layer the global field config under the panel's own: panel keys win,
/// overrides are the panel's followed by the global ones.
fn merge_global(mut defaults: FieldDefaults, style: &StyleConfig) -> Option<FieldConfig> {
    for (key, value) in &style.field_config.defaults {
        if !defaults.has_key(key) {
            defaults.extra.insert(key.clone(), value.clone());
        }
    }

    // Generated panels carry no overrides of their own.
    let overrides: Vec<Value> = style.field_config.overrides.clone();

    if defaults.is_empty() && overrides.is_empty() {
        None
    } else {
        Some(FieldConfig { defaults, overrides })
    }
}
