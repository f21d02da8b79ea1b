//! Error types shared across Kenburns crates.

use std::fmt;

/// Phase of an export in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportPhase {
    Idle,
    Preparing,
    Rendering,
    Encoding,
}

impl ExportPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportPhase::Idle => "idle",
            ExportPhase::Preparing => "preparing",
            ExportPhase::Rendering => "rendering",
            ExportPhase::Encoding => "encoding",
        }
    }
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for Kenburns operations.
#[derive(Debug, thiserror::Error)]
pub enum KenburnsError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Media load error: {message}")]
    MediaLoad { message: String },

    #[error("Frame render error at frame {frame_index}: {message}")]
    FrameRender { frame_index: u64, message: String },

    #[error("Encode service error: {message}")]
    EncodeService { message: String },

    #[error("Export cancelled during {phase}")]
    Cancelled { phase: ExportPhase },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using KenburnsError.
pub type KenburnsResult<T> = Result<T, KenburnsError>;

impl KenburnsError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn media_load(msg: impl Into<String>) -> Self {
        Self::MediaLoad {
            message: msg.into(),
        }
    }

    pub fn frame_render(frame_index: u64, msg: impl Into<String>) -> Self {
        Self::FrameRender {
            frame_index,
            message: msg.into(),
        }
    }

    pub fn encode_service(msg: impl Into<String>) -> Self {
        Self::EncodeService {
            message: msg.into(),
        }
    }

    pub fn cancelled(phase: ExportPhase) -> Self {
        Self::Cancelled { phase }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// The export phase this error belongs to, when it has one.
    pub fn phase(&self) -> Option<ExportPhase> {
        match self {
            Self::InvalidInput { .. } => Some(ExportPhase::Idle),
            Self::MediaLoad { .. } => Some(ExportPhase::Preparing),
            Self::FrameRender { .. } => Some(ExportPhase::Rendering),
            Self::EncodeService { .. } => Some(ExportPhase::Encoding),
            Self::Cancelled { phase } => Some(*phase),
            _ => None,
        }
    }

    /// Frame index for mid-render failures.
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            Self::FrameRender { frame_index, .. } => Some(*frame_index),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// One-line report suitable for showing to a user.
    pub fn report(&self) -> String {
        match self.phase() {
            Some(phase) => format!("export failed while {phase}: {self}"),
            None => format!("export failed: {self}"),
        }
    }
}
