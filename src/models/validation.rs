use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Ok,
    Warn,
    Error,
}

/// Dry-run outcome for one CSV row. `row` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub row: usize,
    pub title: String,
    pub ok: bool,
    pub status: Verdict,
    pub message: String,
}

impl ValidationResult {
    pub fn ok(row: usize, title: impl Into<String>) -> Self {
        Self {
            row,
            title: title.into(),
            ok: true,
            status: Verdict::Ok,
            message: "OK".to_string(),
        }
    }

    /// A warning still counts as a pass.
    pub fn warn(row: usize, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            title: title.into(),
            ok: true,
            status: Verdict::Warn,
            message: message.into(),
        }
    }

    pub fn error(row: usize, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            title: title.into(),
            ok: false,
            status: Verdict::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResponse {
    pub results: Vec<ValidationResult>,
}
