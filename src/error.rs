//! Error types for the autobuilder pipeline.
//!
//! Row-level problems never show up here: malformed CSV fields degrade to
//! `None` and failed dry-runs are reported inside `ValidationResult`.

use reqwest::StatusCode;

/// The CSV stream itself could not be read.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("failed to read CSV header: {0}")]
    Header(#[source] csv::Error),

    #[error("failed to read CSV record {record}: {source}")]
    Record {
        record: usize,
        #[source]
        source: csv::Error,
    },
}

/// Failure of a dry-run query, carrying the engine's message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised while submitting a dashboard to Grafana.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("grafana.url is not configured")]
    MissingUrl,

    #[error("grafana.api_key is not configured")]
    MissingApiKey,

    #[error("request to grafana failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("grafana rejected dashboard ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
}

impl PublishError {
    /// Configuration problems are detected before any network call.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingUrl | Self::MissingApiKey)
    }
}

/// Pipeline-level failure for one upload request.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
