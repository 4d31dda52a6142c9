use std::time::{Duration, Instant};

use async_trait::async_trait;
use clickhouse::Client;

use crate::error::ExecutionError;
use crate::models::descriptor::PanelDescriptor;
use crate::models::validation::ValidationResult;
use crate::query_macros::{TimeWindow, has_time_alias, mentions_time_macro, prepare_sql, wrap_dry_run};

const DEFAULT_WINDOW_DAYS: i64 = 7;

const NO_TIME_BINDING: &str = "time-based panel without $__timeFilter()/$__timeFrom()/$__timeTo() \
                               or a time alias may show 'No data' for some dashboard ranges";

/// Runs a query against the backing engine and discards the result.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn dry_run(&self, sql: &str) -> Result<(), ExecutionError>;
}

/// Dry-runs queries over the ClickHouse HTTP interface.
#[derive(Clone)]
pub struct ClickHouseExecutor {
    client: Client,
}

impl ClickHouseExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryExecutor for ClickHouseExecutor {
    async fn dry_run(&self, sql: &str) -> Result<(), ExecutionError> {
        // The client treats `?` as a bind placeholder; `??` is a literal.
        let escaped = sql.replace('?', "??");
        self.client
            .query(&escaped)
            .execute()
            .await
            .map_err(|e| match e {
                clickhouse::error::Error::BadResponse(message) => ExecutionError::new(message),
                other => ExecutionError::new(other.to_string()),
            })
    }
}

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Length of the window substituted for the time macros.
    pub window_days: i64,
    /// Per-row limit; `None` waits as long as the engine does.
    pub timeout: Option<Duration>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            timeout: None,
        }
    }
}

/// Dry-run every row's query, one after another. Always returns exactly one
/// result per descriptor, in row order.
pub async fn validate(
    descriptors: &[PanelDescriptor],
    executor: &dyn QueryExecutor,
    opts: &ValidationOptions,
) -> Vec<ValidationResult> {
    let start = Instant::now();
    let window = TimeWindow::last_days(opts.window_days);
    let mut results = Vec::with_capacity(descriptors.len());

    for (i, descriptor) in descriptors.iter().enumerate() {
        let row = i + 1;
        let result = validate_row(row, descriptor, executor, &window, opts.timeout).await;
        tracing::debug!("row {row} ({}): {:?} {}", result.title, result.status, result.message);
        results.push(result);
    }

    let failed = results.iter().filter(|r| !r.ok).count();
    tracing::info!(
        "validated {} rows ({failed} failed) in {} ms",
        results.len(),
        start.elapsed().as_millis()
    );
    results
}

async fn validate_row(
    row: usize,
    descriptor: &PanelDescriptor,
    executor: &dyn QueryExecutor,
    window: &TimeWindow,
    timeout: Option<Duration>,
) -> ValidationResult {
    let title = descriptor
        .title
        .clone()
        .unwrap_or_else(|| format!("Row {row}"));

    let Some(query) = descriptor.query.as_deref().filter(|_| descriptor.has_query()) else {
        return ValidationResult::error(row, title, "empty query");
    };
    let prepared = prepare_sql(query, window);
    if prepared.is_empty() {
        return ValidationResult::error(row, title, "empty query");
    }
    let sql = wrap_dry_run(&prepared);

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, executor.dry_run(&sql)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ExecutionError::new(format!(
                "query timed out after {} ms",
                limit.as_millis()
            ))),
        },
        None => executor.dry_run(&sql).await,
    };

    match outcome {
        Err(e) => ValidationResult::error(row, title, e.message),
        Ok(()) if descriptor.visualization.is_time_oriented()
            && !mentions_time_macro(query)
            && !has_time_alias(query) =>
        {
            ValidationResult::warn(row, title, NO_TIME_BINDING)
        }
        Ok(()) => ValidationResult::ok(row, title),
    }
}
