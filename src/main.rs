use clickhouse::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use grafana_autobuilder::AppState;
use grafana_autobuilder::config::AutobuilderConfig;
use grafana_autobuilder::dashboard_service::DashboardService;
use grafana_autobuilder::grafana_client::GrafanaClient;
use grafana_autobuilder::panel_builder::PanelTemplate;
use grafana_autobuilder::style::StyleConfig;
use grafana_autobuilder::validator::ClickHouseExecutor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("grafana_autobuilder=debug,tower_http=debug")
        }))
        .init();

    let config_path =
        std::env::var("AUTOBUILDER_CONFIG").unwrap_or_else(|_| "autobuilder.toml".to_string());
    let mut config = AutobuilderConfig::load(&config_path)?;
    config.apply_env();

    if config.grafana.url.is_none() || config.grafana.api_key.is_none() {
        tracing::warn!("grafana url or api key not configured; uploads will fail until they are set");
    }

    // Styling and the panel template are optional; both degrade to "none".
    let style = Arc::new(StyleConfig::load(&config.style.colors_path));
    if !style.is_loaded() {
        tracing::warn!("no style config loaded; panels fall back to per-kind default colors");
    }
    let template = config
        .style
        .panel_template_path
        .as_ref()
        .and_then(PanelTemplate::load)
        .map(Arc::new);

    let ch = Client::default()
        .with_url(&config.clickhouse.url)
        .with_database(&config.clickhouse.database)
        .with_user(&config.clickhouse.user)
        .with_password(&config.clickhouse.password);
    tracing::info!(
        "validating queries against clickhouse at {} ({})",
        config.clickhouse.url,
        config.clickhouse.database
    );

    let grafana = GrafanaClient::new(
        config.grafana.url.clone(),
        config.grafana.api_key.clone(),
        config.grafana.org_id,
        config.grafana.timeout(),
    )?;

    let addr: SocketAddr = config.server.bind.parse()?;
    let service = DashboardService::new(
        Arc::new(config),
        style,
        template,
        Arc::new(ClickHouseExecutor::new(ch)),
        Arc::new(grafana),
    );

    let app = grafana_autobuilder::router(AppState { service });

    tracing::info!("grafana-autobuilder listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
