//! Preview motion helpers.
//!
//! Generates CSS-like transform samples so UI clients can preview pan/zoom
//! without running the renderer. The transform is derived from the same
//! clamped source window the export renderer crops, so the framing matches.

use kenburns_project_model::timeline::EffectTimeline;
use kenburns_project_model::viewport::{SourceWindow, ZoomState};

use crate::interpolate::{InterpolationMode, Interpolator};

/// Reference size used to express the window as percentages.
const REFERENCE_SIZE: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewMotionFrame {
    pub time_secs: f64,
    pub state: ZoomState,
    pub translate_x_percent: f64,
    pub translate_y_percent: f64,
    pub scale: f64,
}

impl PreviewMotionFrame {
    /// Transform for a full-size element with `transform-origin: 0 0`.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({:.3}%, {:.3}%) scale({:.4})",
            self.translate_x_percent, self.translate_y_percent, self.scale
        )
    }
}

/// Transform sample for one state.
pub fn preview_frame(time_secs: f64, state: ZoomState) -> PreviewMotionFrame {
    let window: SourceWindow = state.source_window(REFERENCE_SIZE, REFERENCE_SIZE);
    let scale = REFERENCE_SIZE as f64 / window.w;
    PreviewMotionFrame {
        time_secs,
        state,
        translate_x_percent: -(window.x / REFERENCE_SIZE as f64) * 100.0 * scale,
        translate_y_percent: -(window.y / REFERENCE_SIZE as f64) * 100.0 * scale,
        scale,
    }
}

/// Sample preview-mode transforms from a timeline.
pub fn simulate_preview_motion(
    timeline: &EffectTimeline,
    interpolator: &Interpolator,
    duration_secs: f64,
    sample_rate_fps: f64,
) -> Vec<PreviewMotionFrame> {
    let sample_rate_fps = sample_rate_fps.max(1.0);
    let duration_secs = duration_secs.max(0.0);
    let count = (duration_secs * sample_rate_fps).floor() as u64;

    (0..=count)
        .map(|i| {
            let t = (i as f64 / sample_rate_fps).min(duration_secs);
            let state = interpolator.state_on(t, timeline, InterpolationMode::Preview);
            preview_frame(t, state)
        })
        .collect()
}
