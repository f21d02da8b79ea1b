//! Timeline document exchanged with the editor.
//!
//! The editor hands over a JSON snapshot of its effects:
//!
//! ```json
//! { "zoomEffects": [ ... ], "textOverlays": [ ... ] }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::effect::{TextOverlay, ZoomEffect};
use crate::timeline::EffectTimeline;

/// Serialized timeline snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDocument {
    #[serde(default)]
    pub zoom_effects: Vec<ZoomEffect>,

    #[serde(default)]
    pub text_overlays: Vec<TextOverlay>,
}

impl TimelineDocument {
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        serde_json::from_str(json).map_err(TimelineError::Parse)
    }

    /// Read a document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TimelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TimelineError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| TimelineError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, TimelineError> {
        serde_json::to_string_pretty(self).map_err(TimelineError::Parse)
    }

    /// Freeze into an ordered snapshot.
    pub fn into_timeline(self) -> EffectTimeline {
        EffectTimeline::from_parts(self.zoom_effects, self.text_overlays)
    }
}

impl From<&EffectTimeline> for TimelineDocument {
    fn from(timeline: &EffectTimeline) -> Self {
        Self {
            zoom_effects: timeline.effects().to_vec(),
            text_overlays: timeline.overlays().to_vec(),
        }
    }
}

/// Errors reading a timeline document.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid timeline document: {0}")]
    Parse(#[source] serde_json::Error),
}
