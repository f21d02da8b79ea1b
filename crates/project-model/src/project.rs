//! Export parameters.

use serde::{Deserialize, Serialize};

/// Default export frame rate.
pub const DEFAULT_EXPORT_FPS: u32 = 30;

/// Caller-facing export parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportParams {
    /// Target frame rate.
    pub fps: u32,

    /// Output resolution. Applies only when both are set; otherwise the
    /// source resolution is kept.
    pub width: Option<u32>,
    pub height: Option<u32>,

    /// Limit on the exported duration. The source duration always caps it.
    pub duration_secs: Option<f64>,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            fps: DEFAULT_EXPORT_FPS,
            width: None,
            height: None,
            duration_secs: None,
        }
    }
}

impl ExportParams {
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    /// Output size for a source of `source_width` x `source_height`.
    ///
    /// A requested size is used only when both dimensions are given. Either
    /// way the result is rounded down to even values with a floor of 2: the
    /// encoder writes yuv420p, which subsamples chroma by two in each axis.
    pub fn output_size(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        let (width, height) = match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            _ => (source_width, source_height),
        };
        ((width & !1).max(2), (height & !1).max(2))
    }

    /// Duration actually exported for a source of `source_duration_secs`.
    pub fn export_duration(&self, source_duration_secs: f64) -> f64 {
        match self.duration_secs {
            Some(requested) => requested.min(source_duration_secs),
            None => source_duration_secs,
        }
    }
}
