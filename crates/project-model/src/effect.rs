//! Zoom effects and text overlays.
//!
//! Effects are immutable value snapshots as far as the engine is concerned.
//! The editor creates and mutates them; the engine only reads.

use serde::{Deserialize, Serialize};

use crate::viewport::ZoomState;

/// How an effect enters and leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Eased entry/exit in export mode.
    #[default]
    Smooth,
    /// Hard cut in every mode.
    Instant,
}

/// Where an effect came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EffectOrigin {
    /// Placed by hand in the editor.
    #[default]
    Manual,
    /// Generated from a click recording. The payload is passed through
    /// without interpretation.
    Autozoom {
        #[serde(default)]
        payload: serde_json::Value,
    },
}

/// A timed pan+scale transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomEffect {
    /// Unique identifier.
    pub id: String,

    /// Start of the effect (seconds). Callers guarantee `start_time < end_time`.
    pub start_time: f64,

    /// End of the effect (seconds, inclusive).
    pub end_time: f64,

    /// Anchor x as a percentage of frame width.
    pub x: f64,

    /// Anchor y as a percentage of frame height.
    pub y: f64,

    /// Zoom factor (1.0 = no zoom).
    pub scale: f64,

    #[serde(default)]
    pub transition: TransitionKind,

    #[serde(default)]
    pub origin: EffectOrigin,
}

impl ZoomEffect {
    /// A manual, smooth effect.
    pub fn new(
        id: impl Into<String>,
        start_time: f64,
        end_time: f64,
        x: f64,
        y: f64,
        scale: f64,
    ) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            x,
            y,
            scale,
            transition: TransitionKind::Smooth,
            origin: EffectOrigin::Manual,
        }
    }

    pub fn with_transition(mut self, transition: TransitionKind) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_origin(mut self, origin: EffectOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Inclusive interval test.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t <= self.end_time
    }

    /// The effect's target state, unclamped.
    pub fn state(&self) -> ZoomState {
        ZoomState {
            x: self.x,
            y: self.y,
            scale: self.scale,
        }
    }

    pub fn is_autozoom(&self) -> bool {
        matches!(self.origin, EffectOrigin::Autozoom { .. })
    }
}

fn default_font_size() -> f64 {
    24.0
}

fn default_text_color() -> String {
    "white".to_string()
}

/// A timed text caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub id: String,

    pub start_time: f64,

    pub end_time: f64,

    /// Center x as a percentage of frame width.
    pub x: f64,

    /// Center y as a percentage of frame height.
    pub y: f64,

    pub text: String,

    /// Font size in output pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    #[serde(default = "default_text_color")]
    pub color: String,

    /// Font file for this overlay. `None` uses the renderer's default face.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,

    /// Optional box drawn beneath the text.
    #[serde(default)]
    pub background_color: Option<String>,

    /// Horizontal and vertical padding around the text inside the box.
    #[serde(default)]
    pub padding: f64,

    #[serde(default)]
    pub corner_radius: f64,
}

impl TextOverlay {
    pub fn new(id: impl Into<String>, start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            x: 50.0,
            y: 50.0,
            text: text.into(),
            font_size: default_font_size(),
            color: default_text_color(),
            font_family: None,
            background_color: None,
            padding: 0.0,
            corner_radius: 0.0,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_background(mut self, color: impl Into<String>, padding: f64, corner_radius: f64) -> Self {
        self.background_color = Some(color.into());
        self.padding = padding;
        self.corner_radius = corner_radius;
        self
    }

    pub fn with_font_family(mut self, font: impl Into<String>) -> Self {
        self.font_family = Some(font.into());
        self
    }

    /// Active iff `start_time <= t <= end_time`.
    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start_time && t <= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_interval_is_inclusive() {
        let effect = ZoomEffect::new("z1", 1.0, 3.0, 80.0, 20.0, 2.0);
        assert!(effect.contains(1.0));
        assert!(effect.contains(3.0));
        assert!(!effect.contains(0.999));
        assert!(!effect.contains(3.001));
        assert!((effect.duration() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_effect_deserializes_camel_case_with_defaults() {
        let json = r#"{"id":"a","startTime":1,"endTime":2,"x":10,"y":20,"scale":2.5}"#;
        let effect: ZoomEffect = serde_json::from_str(json).unwrap();
        assert_eq!(effect.transition, TransitionKind::Smooth);
        assert_eq!(effect.origin, EffectOrigin::Manual);
        assert!((effect.scale - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_autozoom_payload_passes_through() {
        let json = r#"{"id":"a","startTime":1,"endTime":2,"x":10,"y":20,"scale":2,
            "transition":"instant",
            "origin":{"kind":"autozoom","payload":{"click":{"x":140,"y":90},"button":"left"}}}"#;
        let effect: ZoomEffect = serde_json::from_str(json).unwrap();
        assert_eq!(effect.transition, TransitionKind::Instant);
        assert!(effect.is_autozoom());

        let round = serde_json::to_value(&effect).unwrap();
        assert_eq!(round["origin"]["payload"]["click"]["x"], 140);
        assert_eq!(round["origin"]["kind"], "autozoom");
    }

    #[test]
    fn test_overlay_defaults() {
        let json = r#"{"id":"t","startTime":0,"endTime":1,"x":50,"y":90,"text":"Hello"}"#;
        let overlay: TextOverlay = serde_json::from_str(json).unwrap();
        assert_eq!(overlay.font_size, 24.0);
        assert_eq!(overlay.color, "white");
        assert!(overlay.background_color.is_none());
        assert!(overlay.font_family.is_none());
        assert!(overlay.is_active(0.0));
        assert!(overlay.is_active(1.0));
        assert!(!overlay.is_active(1.5));
    }

    #[test]
    fn test_overlay_font_family_round_trips_camel_case() {
        let json = r#"{"id":"t","startTime":0,"endTime":1,"x":50,"y":50,"text":"Hi",
            "fontFamily":"/usr/share/fonts/Inter.ttf"}"#;
        let overlay: TextOverlay = serde_json::from_str(json).unwrap();
        assert_eq!(overlay.font_family.as_deref(), Some("/usr/share/fonts/Inter.ttf"));

        let value = serde_json::to_value(TextOverlay::new("u", 0.0, 1.0, "x")).unwrap();
        assert!(value.get("fontFamily").is_none());
    }
}
