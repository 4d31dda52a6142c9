use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dashboard_builder::{Preset, default_presets};

/// Top-level config loaded from `autobuilder.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AutobuilderConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub grafana: GrafanaConfig,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub style: StyleFiles,
    /// Title keyword presets. Replaces the built-in list when present.
    #[serde(default = "default_presets")]
    pub presets: Vec<Preset>,
}

impl Default for AutobuilderConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            grafana: GrafanaConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            validation: ValidationConfig::default(),
            style: StyleFiles::default(),
            presets: default_presets(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GrafanaConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub folder_uid: Option<String>,
    pub org_id: Option<u64>,
    pub default_datasource_uid: Option<String>,
    /// Plugin id of the default datasource, e.g. `grafana-clickhouse-datasource`.
    pub default_datasource_type: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl GrafanaConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    #[serde(default = "default_clickhouse_url")]
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_clickhouse_url(),
            database: default_database(),
            user: default_user(),
            password: String::new(),
        }
    }
}

fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_database() -> String {
    "default".to_string()
}

fn default_user() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Per-row dry-run limit. Unset = no limit.
    pub query_timeout_secs: Option<u64>,
    /// Days covered by the substituted time macros.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: None,
            window_days: default_window_days(),
        }
    }
}

fn default_window_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct StyleFiles {
    #[serde(default = "default_colors_path")]
    pub colors_path: PathBuf,
    pub panel_template_path: Option<PathBuf>,
}

impl Default for StyleFiles {
    fn default() -> Self {
        Self {
            colors_path: default_colors_path(),
            panel_template_path: None,
        }
    }
}

fn default_colors_path() -> PathBuf {
    PathBuf::from("config/visualization-colors.json")
}

impl AutobuilderConfig {
    /// Load config from a TOML file. Returns defaults if the file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `GRAFANA_*` / `CLICKHOUSE_*` environment variables on top of
    /// the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Blank values count as unset.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let g = &mut self.grafana;
        for (key, slot) in [
            ("GRAFANA_URL", &mut g.url),
            ("GRAFANA_API_KEY", &mut g.api_key),
            ("GRAFANA_FOLDER_UID", &mut g.folder_uid),
            ("GRAFANA_DEFAULT_DATASOURCE_UID", &mut g.default_datasource_uid),
            ("GRAFANA_DEFAULT_DATASOURCE_TYPE", &mut g.default_datasource_type),
        ] {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }

        let ch = &mut self.clickhouse;
        for (key, slot) in [
            ("CLICKHOUSE_URL", &mut ch.url),
            ("CLICKHOUSE_DATABASE", &mut ch.database),
            ("CLICKHOUSE_USER", &mut ch.user),
            ("CLICKHOUSE_PASSWORD", &mut ch.password),
        ] {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.validation.query_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_file() {
        let config = AutobuilderConfig::load("/no/such/autobuilder.toml").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.clickhouse.url, "http://localhost:8123");
        assert_eq!(config.validation.window_days, 7);
        assert_eq!(config.query_timeout(), None);
        assert_eq!(config.grafana.timeout(), None);
        assert_eq!(config.presets, vec![Preset::business()]);
        assert!(config.grafana.url.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let config = AutobuilderConfig::from_toml(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [grafana]
            url = "https://grafana.example.com"
            api_key = "glsa_x"
            folder_uid = "ops"
            org_id = 2
            default_datasource_uid = "ch"
            default_datasource_type = "grafana-clickhouse-datasource"
            timeout_secs = 15

            [clickhouse]
            url = "http://ch:8123"
            database = "analytics"

            [validation]
            query_timeout_secs = 30
            window_days = 1

            [style]
            colors_path = "/etc/autobuilder/colors.json"
            panel_template_path = "/etc/autobuilder/panel.json"

            [[presets]]
            keyword = "realtime"
            time_from = "now-15m"
            refresh = "10s"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.grafana.org_id, Some(2));
        assert_eq!(config.grafana.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.clickhouse.database, "analytics");
        assert_eq!(config.clickhouse.user, "default");
        assert_eq!(config.query_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.validation.window_days, 1);
        assert_eq!(
            config.style.panel_template_path.as_deref(),
            Some(Path::new("/etc/autobuilder/panel.json"))
        );
        assert_eq!(config.presets.len(), 1);
        assert_eq!(config.presets[0].keyword, "realtime");
        assert!(config.presets[0].tags.is_empty());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AutobuilderConfig::from_toml(
            r#"
            [grafana]
            url = "http://from-file:3000"
            api_key = "file-key"
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("GRAFANA_URL", "http://from-env:3000"),
            ("GRAFANA_DEFAULT_DATASOURCE_TYPE", "postgres"),
            ("CLICKHOUSE_PASSWORD", "hunter2"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.grafana.url.as_deref(), Some("http://from-env:3000"));
        assert_eq!(config.grafana.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.grafana.default_datasource_type.as_deref(), Some("postgres"));
        assert_eq!(config.clickhouse.password, "hunter2");
        assert_eq!(config.clickhouse.database, "default");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AutobuilderConfig::from_toml(
            r#"
            [grafana]
            default_datasource_uid = "ch"
            "#,
        )
        .unwrap();
        config.apply_overrides(|k| match k {
            "GRAFANA_DEFAULT_DATASOURCE_UID" | "GRAFANA_DEFAULT_DATASOURCE_TYPE" => Some(String::new()),
            "CLICKHOUSE_DATABASE" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.grafana.default_datasource_uid.as_deref(), Some("ch"));
        assert_eq!(config.grafana.default_datasource_type, None);
        assert_eq!(config.clickhouse.database, "default");
    }
}
