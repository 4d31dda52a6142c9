use std::path::Path;

use serde_json::{Map, Value};

use crate::layout::{self, GRID_COLUMNS};
use crate::models::dashboard::{
    DatasourceRef, ExpressionTarget, GridPos, Panel, SqlTarget, Target, TargetQuery,
};
use crate::models::descriptor::{DEFAULT_PANEL_HEIGHT, DEFAULT_PANEL_WIDTH, PanelDescriptor};
use crate::style::StyleConfig;
use crate::visualization::{self, FormatRule};

/// Relative range applied to single-value panels that do not set one.
const SINGLE_VALUE_TIME_FROM: &str = "24h";

/// Top-level panel keys the builder always sets itself.
const RESERVED_KEYS: &[&str] = &[
    "id",
    "type",
    "title",
    "gridPos",
    "datasource",
    "targets",
    "options",
    "fieldConfig",
    "transparent",
    "timeFrom",
    "timeShift",
];

/// How targets carry their query, decided by the default datasource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFamily {
    /// `rawQuery` / `rawSql` / `format`.
    Sql,
    /// `expr` (Prometheus and friends).
    Expression,
}

impl EngineFamily {
    pub fn from_datasource_type(kind: Option<&str>) -> Self {
        let Some(kind) = non_blank(kind) else {
            return Self::Expression;
        };
        let kind = kind.to_ascii_lowercase();
        // "sql" covers mysql, mssql and sqlite plugin ids.
        let sql = ["postgres", "clickhouse", "sql"]
            .iter()
            .any(|k| kind.contains(k));
        if sql { Self::Sql } else { Self::Expression }
    }

    fn target_query(self, query: &str, rule: FormatRule) -> TargetQuery {
        match self {
            Self::Sql => TargetQuery::Sql(SqlTarget {
                raw_query: true,
                raw_sql: query.to_string(),
                format: rule.format_for(query),
            }),
            Self::Expression => TargetQuery::Expression(ExpressionTarget {
                expr: query.to_string(),
            }),
        }
    }
}

/// Extra panel keys loaded from a JSON template. String values may use the
/// `{{visualization}}`, `{{title}}` and `{{query}}` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelTemplate {
    extras: Map<String, Value>,
}

impl PanelTemplate {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut extras: Map<String, Value> = serde_json::from_str(json)?;
        extras.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
        Ok(Self { extras })
    }

    /// Load a template file; any failure is logged and treated as "no template".
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("panel template {} not readable: {e}", path.display());
                return None;
            }
        };
        match Self::from_json(&contents) {
            Ok(template) => {
                tracing::info!(
                    "loaded panel template from {} ({} extra keys)",
                    path.display(),
                    template.extras.len()
                );
                Some(template)
            }
            Err(e) => {
                tracing::warn!("malformed panel template {}: {e}", path.display());
                None
            }
        }
    }

    pub fn render(&self, visualization: &str, title: &str, query: &str) -> Map<String, Value> {
        self.extras
            .iter()
            .map(|(k, v)| (k.clone(), substitute(v, visualization, title, query)))
            .collect()
    }
}

fn substitute(value: &Value, visualization: &str, title: &str, query: &str) -> Value {
    match value {
        Value::String(s) => Value::String(
            s.replace("{{visualization}}", visualization)
                .replace("{{title}}", title)
                .replace("{{query}}", query),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| substitute(v, visualization, title, query))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, visualization, title, query)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Everything panel building needs besides the descriptors themselves.
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    pub style: &'a StyleConfig,
    pub template: Option<&'a PanelTemplate>,
    pub default_datasource_uid: Option<&'a str>,
    pub default_datasource_type: Option<&'a str>,
    family: EngineFamily,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        style: &'a StyleConfig,
        template: Option<&'a PanelTemplate>,
        default_datasource_uid: Option<&'a str>,
        default_datasource_type: Option<&'a str>,
    ) -> Self {
        let default_datasource_type = non_blank(default_datasource_type);
        Self {
            style,
            template,
            default_datasource_uid: non_blank(default_datasource_uid),
            default_datasource_type,
            family: EngineFamily::from_datasource_type(default_datasource_type),
        }
    }

    /// Row uid, else the configured default uid; the type is always the
    /// configured default type.
    fn datasource_for(&self, descriptor: &PanelDescriptor) -> Option<DatasourceRef> {
        let uid = descriptor
            .datasource
            .as_deref()
            .or(self.default_datasource_uid)?;
        Some(DatasourceRef {
            uid: uid.to_string(),
            kind: self.default_datasource_type.map(str::to_string),
        })
    }
}

/// Build panel documents for all descriptors, ids `1..=n` in row order.
pub fn build_panels(descriptors: &[PanelDescriptor], ctx: &BuildContext<'_>) -> Vec<Panel> {
    let sizes: Vec<(u32, u32)> = descriptors.iter().map(PanelDescriptor::size).collect();
    let positions = layout::layout(&sizes, GRID_COLUMNS);

    descriptors
        .iter()
        .zip(sizes)
        .zip(positions)
        .enumerate()
        .map(|(i, ((descriptor, size), position))| {
            let id = u32::try_from(i + 1).unwrap_or(u32::MAX);
            build_panel(id, descriptor, size, position, ctx)
        })
        .collect()
}

pub fn build_panel(
    id: u32,
    descriptor: &PanelDescriptor,
    (w, h): (u32, u32),
    (x, y): (u32, u32),
    ctx: &BuildContext<'_>,
) -> Panel {
    let title = descriptor
        .title
        .clone()
        .unwrap_or_else(|| format!("Panel {id}"));
    let color = descriptor
        .color
        .as_deref()
        .or_else(|| ctx.style.pick_color(&title));

    let resolved = visualization::resolve(
        descriptor.visualization,
        descriptor.unit.as_deref(),
        descriptor.thresholds.as_deref(),
        color,
        ctx.style,
    );

    let datasource = ctx.datasource_for(descriptor);
    let query = descriptor
        .query
        .as_deref()
        .filter(|_| descriptor.has_query())
        .map(|q| ctx.family.target_query(q, resolved.format_rule));
    let target = Target {
        ref_id: "A",
        datasource: datasource.clone(),
        query,
    };

    let (grid_pos, template_extras) = match ctx.template {
        Some(template) => (
            GridPos {
                x,
                y,
                w: DEFAULT_PANEL_WIDTH,
                h: DEFAULT_PANEL_HEIGHT,
            },
            template.render(
                resolved.panel_type,
                &title,
                descriptor.query.as_deref().unwrap_or_default(),
            ),
        ),
        None => (
            GridPos {
                x,
                y,
                w: layout::clamp_width(w, GRID_COLUMNS),
                h,
            },
            Map::new(),
        ),
    };

    let time_from = descriptor.time_from.clone().or_else(|| {
        descriptor
            .visualization
            .is_single_value()
            .then(|| SINGLE_VALUE_TIME_FROM.to_string())
    });

    Panel {
        id,
        kind: resolved.panel_type,
        title,
        grid_pos,
        datasource,
        targets: vec![target],
        options: Some(resolved.options),
        field_config: resolved.field_config,
        transparent: true,
        time_from,
        time_shift: descriptor.time_shift.clone(),
        template_extras,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dashboard::{FieldColor, QueryFormat};
    use crate::models::descriptor::Visualization;
    use serde_json::json;

    fn row(title: &str, vis: Visualization, query: &str) -> PanelDescriptor {
        PanelDescriptor {
            title: Some(title.to_string()),
            visualization: vis,
            query: Some(query.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn engine_family_from_type() {
        assert_eq!(EngineFamily::from_datasource_type(None), EngineFamily::Expression);
        assert_eq!(
            EngineFamily::from_datasource_type(Some("prometheus")),
            EngineFamily::Expression
        );
        assert_eq!(EngineFamily::from_datasource_type(Some("postgres")), EngineFamily::Sql);
        assert_eq!(
            EngineFamily::from_datasource_type(Some("grafana-clickhouse-datasource")),
            EngineFamily::Sql
        );
        assert_eq!(EngineFamily::from_datasource_type(Some("MySQL")), EngineFamily::Sql);
    }

    #[test]
    fn ids_are_contiguous_in_row_order() {
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, None, None);
        let rows: Vec<_> = (0..5)
            .map(|i| row(&format!("p{i}"), Visualization::TimeSeries, "up"))
            .collect();
        let panels = build_panels(&rows, &ctx);
        let ids: Vec<u32> = panels.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(panels[3].title, "p3");
    }

    #[test]
    fn sql_family_targets() {
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, Some("ch-main"), Some("grafana-clickhouse-datasource"));
        let panels = build_panels(
            &[
                row("Orders", Visualization::Table, "SELECT * FROM orders"),
                row("Rate", Visualization::TimeSeries, "SELECT ts AS time, v FROM m"),
                row("Total", Visualization::Stat, "SELECT count() FROM orders"),
            ],
            &ctx,
        );

        let formats: Vec<QueryFormat> = panels
            .iter()
            .map(|p| match &p.targets[0].query {
                Some(TargetQuery::Sql(sql)) => sql.format,
                other => panic!("expected sql target, got {other:?}"),
            })
            .collect();
        assert_eq!(
            formats,
            vec![QueryFormat::Table, QueryFormat::TimeSeries, QueryFormat::Table]
        );

        let v = serde_json::to_value(&panels[0]).unwrap();
        assert_eq!(v["targets"][0]["refId"], "A");
        assert_eq!(v["targets"][0]["rawQuery"], true);
        assert_eq!(v["targets"][0]["rawSql"], "SELECT * FROM orders");
        assert_eq!(v["targets"][0]["format"], "table");
        assert_eq!(
            v["datasource"],
            json!({"uid": "ch-main", "type": "grafana-clickhouse-datasource"})
        );
        assert_eq!(v["targets"][0]["datasource"], v["datasource"]);
    }

    #[test]
    fn expression_family_targets() {
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, None, None);
        let panels = build_panels(&[row("Up", Visualization::TimeSeries, "up{job=\"api\"}")], &ctx);
        let v = serde_json::to_value(&panels[0]).unwrap();
        assert_eq!(v["targets"][0]["expr"], "up{job=\"api\"}");
        assert!(v["targets"][0].get("rawSql").is_none());
        assert!(v.get("datasource").is_none());
        assert!(v["targets"][0].get("datasource").is_none());
    }

    #[test]
    fn missing_query_emits_bare_target() {
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, None, Some("postgres"));
        let d = PanelDescriptor::default();
        let panels = build_panels(&[d], &ctx);
        let v = serde_json::to_value(&panels[0]).unwrap();
        assert_eq!(v["title"], "Panel 1");
        assert_eq!(v["targets"][0], json!({"refId": "A"}));
    }

    #[test]
    fn datasource_precedence() {
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, Some("default-uid"), Some("postgres"));
        let mut d = row("a", Visualization::Table, "SELECT 1");
        d.datasource = Some("row-uid".into());
        let panel = build_panel(1, &d, (12, 8), (0, 0), &ctx);
        assert_eq!(
            panel.datasource,
            Some(DatasourceRef {
                uid: "row-uid".into(),
                kind: Some("postgres".into())
            })
        );

        d.datasource = None;
        let panel = build_panel(1, &d, (12, 8), (0, 0), &ctx);
        assert_eq!(panel.datasource.unwrap().uid, "default-uid");
    }

    #[test]
    fn blank_defaults_omit_datasource() {
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, Some(""), Some("  "));
        let panel = build_panel(1, &row("Up", Visualization::TimeSeries, "up"), (12, 8), (0, 0), &ctx);
        let v = serde_json::to_value(&panel).unwrap();
        assert!(v.get("datasource").is_none());
        assert_eq!(v["targets"][0], json!({"refId": "A", "expr": "up"}));
        assert_eq!(EngineFamily::from_datasource_type(Some("")), EngineFamily::Expression);

        // A row uid still applies, without a blank type alongside it.
        let mut d = row("Up", Visualization::TimeSeries, "up");
        d.datasource = Some("prom".into());
        let panel = build_panel(1, &d, (12, 8), (0, 0), &ctx);
        assert_eq!(
            serde_json::to_value(&panel.datasource).unwrap(),
            json!({"uid": "prom"})
        );
    }

    #[test]
    fn tall_rows_lay_out_without_overflow() {
        let csv = "title,query,w,h\na,q,24,3000000000\nb,q,24,3000000000\nc,q,24,1\n";
        let rows = crate::csv_parser::parse(csv.as_bytes()).unwrap();
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, None, None);
        let panels = build_panels(&rows, &ctx);
        assert_eq!(panels.len(), 3);
        assert_eq!(panels[0].grid_pos.y, 0);
        assert_eq!(panels[1].grid_pos.y, 3_000_000_000);
        assert_eq!(panels[2].grid_pos.y, u32::MAX);
    }

    #[test]
    fn fallback_path_uses_requested_size() {
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, None, None);
        let mut rows = Vec::new();
        for i in 0..4 {
            let mut d = row(&format!("p{i}"), Visualization::Stat, "SELECT 1");
            d.width = Some(6);
            d.height = Some(4);
            rows.push(d);
        }
        let panels = build_panels(&rows, &ctx);
        let grid: Vec<GridPos> = panels.iter().map(|p| p.grid_pos).collect();
        assert_eq!(
            grid,
            vec![
                GridPos { x: 0, y: 0, w: 6, h: 4 },
                GridPos { x: 6, y: 0, w: 6, h: 4 },
                GridPos { x: 12, y: 0, w: 6, h: 4 },
                GridPos { x: 18, y: 0, w: 6, h: 4 },
            ]
        );
        assert!(panels.iter().all(|p| p.transparent));
        assert!(panels.iter().all(|p| p.template_extras.is_empty()));
    }

    #[test]
    fn template_path_normalizes_size_and_substitutes() {
        let template = PanelTemplate::from_json(
            r#"{
                "description": "{{title}} ({{visualization}})",
                "links": [{"title": "query", "url": "/explore?q={{query}}"}],
                "pluginVersion": "10.4.0",
                "type": "piechart",
                "gridPos": {"x": 5, "y": 5, "w": 1, "h": 1}
            }"#,
        )
        .unwrap();
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, Some(&template), None, None);

        let mut a = row("Latency", Visualization::Gauge, "p99");
        a.width = Some(6);
        a.height = Some(4);
        let b = a.clone();
        let panels = build_panels(&[a, b], &ctx);

        assert_eq!(panels[0].kind, "gauge");
        assert_eq!(panels[0].grid_pos, GridPos { x: 0, y: 0, w: 12, h: 8 });
        assert_eq!(panels[1].grid_pos, GridPos { x: 6, y: 0, w: 12, h: 8 });

        let v = serde_json::to_value(&panels[0]).unwrap();
        assert_eq!(v["description"], "Latency (gauge)");
        assert_eq!(v["links"][0]["url"], "/explore?q=p99");
        assert_eq!(v["pluginVersion"], "10.4.0");
        assert_eq!(v["type"], "gauge");
        assert_eq!(v["transparent"], true);
    }

    #[test]
    fn single_value_panels_default_time_from() {
        let style = StyleConfig::empty();
        let ctx = BuildContext::new(&style, None, None, None);
        let mut explicit = row("b", Visualization::Gauge, "q");
        explicit.time_from = Some("1h".into());
        explicit.time_shift = Some("1d".into());
        let panels = build_panels(
            &[
                row("a", Visualization::Stat, "q"),
                explicit,
                row("c", Visualization::TimeSeries, "q"),
            ],
            &ctx,
        );
        assert_eq!(panels[0].time_from.as_deref(), Some("24h"));
        assert_eq!(panels[1].time_from.as_deref(), Some("1h"));
        assert_eq!(panels[1].time_shift.as_deref(), Some("1d"));
        assert_eq!(panels[2].time_from, None);
    }

    #[test]
    fn explicit_color_beats_palette() {
        let style = StyleConfig::from_json(r##"{"palette": ["#111111"]}"##).unwrap();
        let ctx = BuildContext::new(&style, None, None, None);

        let plain = row("Errors", Visualization::TimeSeries, "q");
        let mut colored = plain.clone();
        colored.color = Some("#ff0000".into());
        let panels = build_panels(&[plain, colored], &ctx);

        let color = |p: &Panel| p.field_config.as_ref().and_then(|fc| fc.defaults.color.clone());
        assert_eq!(color(&panels[0]), Some(FieldColor::fixed("#111111")));
        assert_eq!(color(&panels[1]), Some(FieldColor::fixed("#ff0000")));
    }
}
