//! Canvas configuration.

use crate::error::{CanvasError, CanvasResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How dropped elements are constrained to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementMode {
    /// Keep relocated elements inside `[0, width - w] x [0, height - h]`.
    #[default]
    Clamped,
    /// Allow elements to overlap the canvas edges.
    Free,
}

/// Tunables for the canvas model.
///
/// Every field has a default, so a partial JSON file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    /// Fixed canvas width used for clamping.
    pub canvas_width: f64,
    /// Canvas height never shrinks below this.
    pub minimum_height: f64,
    /// Free space kept below the bottom-most element.
    pub buffer_space: f64,
    /// Vertical gap between consecutive elements after reflow.
    pub spacing: f64,
    /// New elements dropped above this y are inserted at the top.
    pub top_insert_threshold: f64,
    /// Width of newly created text elements.
    pub text_width: f64,
    /// Clamping policy for relocated elements.
    pub placement: PlacementMode,
    /// Maximum number of undo snapshots kept.
    pub history_limit: usize,
    /// Placeholder token names offered for insertion.
    pub placeholders: Vec<String>,
    /// Options of an inserted dropdown control.
    pub dropdown_options: Vec<String>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            minimum_height: 500.0,
            buffer_space: 50.0,
            spacing: 10.0,
            top_insert_threshold: 50.0,
            text_width: 500.0,
            placement: PlacementMode::Clamped,
            history_limit: 50,
            placeholders: vec!["Name".to_string(), "Date".to_string(), "Address".to_string()],
            dropdown_options: vec![
                "Option 1".to_string(),
                "Option 2".to_string(),
                "Option 3".to_string(),
            ],
        }
    }
}

impl CanvasConfig {
    /// Parse and validate a config from JSON.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let config: CanvasConfig =
            serde_json::from_str(json).map_err(|e| CanvasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| CanvasError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Reject values the placement engine cannot work with.
    pub fn validate(&self) -> CanvasResult<()> {
        let positive = [
            ("canvasWidth", self.canvas_width),
            ("textWidth", self.text_width),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CanvasError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("minimumHeight", self.minimum_height),
            ("bufferSpace", self.buffer_space),
            ("spacing", self.spacing),
            ("topInsertThreshold", self.top_insert_threshold),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CanvasError::Config(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        if self.history_limit == 0 {
            return Err(CanvasError::Config("historyLimit must be at least 1".to_string()));
        }
        if self.dropdown_options.is_empty() {
            return Err(CanvasError::Config("dropdownOptions must not be empty".to_string()));
        }
        Ok(())
    }
}
