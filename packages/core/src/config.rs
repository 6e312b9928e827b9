//! Engine configuration
//!
//! All fields have defaults, so a partial JSON file (or none at all) is enough.
//! Values are validated once at construction; the rest of the crate assumes a
//! validated config.

use crate::error::{OutlineError, OutlineResult};
use crate::models::{DEFAULT_SORT_INDEX_STEP, MAX_SORT_INDEX_STEP};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on the undo history to keep memory bounded for long sessions
const MAX_UNDO_LIMIT: usize = 100_000;

/// Tunables for documents, codec and autosave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before a scheduled save runs
    pub autosave_debounce_ms: u64,

    /// Spacing between consecutive sibling sort indices
    pub sort_index_step: i64,

    /// Spaces per nesting level in the text format
    pub indent_width: usize,

    /// Columns a tab counts for when parsing
    pub tab_width: usize,

    /// Maximum number of undo entries retained
    pub undo_limit: usize,

    /// Capacity of the document event broadcast channel
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 1_000,
            sort_index_step: DEFAULT_SORT_INDEX_STEP,
            indent_width: 4,
            tab_width: 4,
            undo_limit: 500,
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file, falling back to defaults for missing fields
    pub fn from_json_file(path: impl AsRef<Path>) -> OutlineResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OutlineError::io(format!("reading config {:?}", path), e))?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            OutlineError::invalid_config(format!("failed to parse {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> OutlineResult<()> {
        if !(2..=MAX_SORT_INDEX_STEP).contains(&self.sort_index_step) {
            return Err(OutlineError::invalid_config(format!(
                "sort_index_step must be between 2 and {}",
                MAX_SORT_INDEX_STEP
            )));
        }

        if self.indent_width == 0 {
            return Err(OutlineError::invalid_config(
                "indent_width must be greater than 0",
            ));
        }

        if self.tab_width == 0 {
            return Err(OutlineError::invalid_config(
                "tab_width must be greater than 0",
            ));
        }

        if self.undo_limit == 0 || self.undo_limit > MAX_UNDO_LIMIT {
            return Err(OutlineError::invalid_config(format!(
                "undo_limit must be between 1 and {}",
                MAX_UNDO_LIMIT
            )));
        }

        if self.event_capacity == 0 {
            return Err(OutlineError::invalid_config(
                "event_capacity must be greater than 0",
            ));
        }

        Ok(())
    }
}
