use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Field config applied to every panel underneath its own settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlobalFieldConfig {
    #[serde(default)]
    pub defaults: Map<String, Value>,
    #[serde(default)]
    pub overrides: Vec<Value>,
}

/// Process-wide visual styling, read once at startup from
/// `visualization-colors.json` and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    #[serde(default)]
    pub field_config: GlobalFieldConfig,
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl StyleConfig {
    /// The "nothing loaded" state: no palette, no global field config.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a JSON file. A missing or malformed file yields the empty
    /// config; startup never fails because of styling.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("style config not found at {}, using empty style", path.display());
            return Self::empty();
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("failed to read style config {}: {e}", path.display());
                return Self::empty();
            }
        };
        match Self::from_json(&contents) {
            Ok(mut style) => {
                style.source = Some(path.to_path_buf());
                tracing::info!(
                    "loaded style config from {} ({} palette colors, {} global overrides)",
                    path.display(),
                    style.palette.len(),
                    style.field_config.overrides.len()
                );
                style
            }
            Err(e) => {
                tracing::warn!("malformed style config {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    /// Palette color for a seed string (normally the panel title).
    pub fn pick_color(&self, seed: &str) -> Option<&str> {
        palette_index(seed, self.palette.len()).map(|i| self.palette[i].as_str())
    }
}

/// Stable palette slot for `seed`: a 31-multiplier string hash over UTF-16
/// code units, masked non-negative, modulo the palette length.
pub fn palette_index(seed: &str, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let hash = seed
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    let positive = (hash & 0x7fff_ffff) as usize;
    Some(positive % len)
}
