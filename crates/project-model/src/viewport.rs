//! Zoom state and source-window geometry.
//!
//! A [`ZoomState`] is an anchor in percent plus a scale. The renderer turns
//! it into a [`SourceWindow`]: the rectangle of the source frame that is
//! stretched over the whole output.

use serde::{Deserialize, Serialize};

/// Continuous visual state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    /// Anchor x as a percentage of frame width.
    pub x: f64,
    /// Anchor y as a percentage of frame height.
    pub y: f64,
    /// Zoom factor (1.0 = no zoom).
    pub scale: f64,
}

impl ZoomState {
    /// The identity view: centered, no zoom.
    pub const NEUTRAL: ZoomState = ZoomState {
        x: 50.0,
        y: 50.0,
        scale: 1.0,
    };

    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    /// Componentwise linear interpolation. `t` is clamped to `[0, 1]`.
    pub fn lerp(a: &ZoomState, b: &ZoomState, t: f64) -> ZoomState {
        let t = t.clamp(0.0, 1.0);
        ZoomState {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
            scale: a.scale + (b.scale - a.scale) * t,
        }
    }

    /// Copy with the scale clamped to `[min, max]`.
    pub fn clamp_scale(&self, min: f64, max: f64) -> ZoomState {
        ZoomState {
            scale: self.scale.clamp(min, max),
            ..*self
        }
    }

    /// The source rectangle shown for this state on a `width` x `height`
    /// source. Scales below 1.0 are treated as 1.0.
    pub fn source_window(&self, width: u32, height: u32) -> SourceWindow {
        SourceWindow::for_state(self, width, height)
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// A rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceWindow {
    /// Left edge (pixels).
    pub x: f64,
    /// Top edge (pixels).
    pub y: f64,
    /// Width (pixels).
    pub w: f64,
    /// Height (pixels).
    pub h: f64,
}

impl SourceWindow {
    /// The window of size `(W/s, H/s)` whose center is the anchor, clamped
    /// into `[0, W - W/s] x [0, H - H/s]` so it never leaves the source.
    pub fn for_state(state: &ZoomState, width: u32, height: u32) -> Self {
        let src_w = width as f64;
        let src_h = height as f64;
        let scale = if state.scale.is_finite() {
            state.scale.max(1.0)
        } else {
            1.0
        };

        let w = src_w / scale;
        let h = src_h / scale;

        let cx = state.x / 100.0 * src_w;
        let cy = state.y / 100.0 * src_h;

        let x = (cx - w / 2.0).clamp(0.0, (src_w - w).max(0.0));
        let y = (cy - h / 2.0).clamp(0.0, (src_h - h).max(0.0));

        Self { x, y, w, h }
    }

    /// The whole source.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: width as f64,
            h: height as f64,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Center point of the window.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Whether the window lies inside a `width` x `height` source.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.right() <= width as f64 + EPS
            && self.bottom() <= height as f64 + EPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_neutral_window_is_full_source() {
        let window = ZoomState::NEUTRAL.source_window(1920, 1080);
        assert_eq!(window, SourceWindow::full(1920, 1080));
    }

    #[test]
    fn test_window_centered_on_anchor() {
        let window = ZoomState::new(50.0, 50.0, 2.0).source_window(1000, 500);
        assert!((window.w - 500.0).abs() < 1e-9);
        assert!((window.h - 250.0).abs() < 1e-9);
        assert!((window.x - 250.0).abs() < 1e-9);
        assert!((window.y - 125.0).abs() < 1e-9);
        assert_eq!(window.center(), (500.0, 250.0));
    }

    #[test]
    fn test_window_clamps_near_edges() {
        // Anchor at the top-right corner: window pinned to the corner.
        let window = ZoomState::new(100.0, 0.0, 2.0).source_window(1000, 500);
        assert!((window.x - 500.0).abs() < 1e-9);
        assert!(window.y.abs() < 1e-9);
        assert!(window.is_within(1000, 500));

        let window = ZoomState::new(80.0, 20.0, 2.0).source_window(1000, 500);
        assert!((window.x - 500.0).abs() < 1e-9); // 800 - 250 = 550 -> clamped to 500
        assert!(window.y.abs() < 1e-9); // 100 - 125 < 0 -> clamped to 0
    }

    #[test]
    fn test_scale_below_one_treated_as_identity() {
        let window = ZoomState::new(10.0, 10.0, 0.5).source_window(640, 480);
        assert_eq!(window, SourceWindow::full(640, 480));
    }

    #[test]
    fn test_lerp() {
        let a = ZoomState::NEUTRAL;
        let b = ZoomState::new(80.0, 20.0, 2.0);
        let mid = ZoomState::lerp(&a, &b, 0.5);
        assert!((mid.x - 65.0).abs() < 1e-9);
        assert!((mid.y - 35.0).abs() < 1e-9);
        assert!((mid.scale - 1.5).abs() < 1e-9);
        assert_eq!(ZoomState::lerp(&a, &b, 2.0), b);
    }

    #[test]
    fn test_clamp_scale() {
        let state = ZoomState::new(10.0, 10.0, 9.0).clamp_scale(1.0, 5.0);
        assert_eq!(state.scale, 5.0);
        assert_eq!(state.x, 10.0);
    }

    proptest! {
        #[test]
        fn prop_window_never_leaves_source(
            x in -50.0f64..150.0,
            y in -50.0f64..150.0,
            scale in 0.1f64..10.0,
            width in 1u32..4000,
            height in 1u32..4000,
        ) {
            let window = ZoomState::new(x, y, scale).source_window(width, height);
            prop_assert!(window.is_within(width, height));
            prop_assert!(window.w > 0.0 && window.h > 0.0);
        }
    }
}
