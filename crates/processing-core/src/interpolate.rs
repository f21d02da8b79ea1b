//! Effect interpolation.
//!
//! One interpolator serves both preview and export so the two can never
//! drift apart on window length, easing, or scale clamp.
//!
//! # Export-mode transitions
//!
//! For an effect `e` with window `w = min(max_window, e.duration / divisor)`:
//!
//! ```text
//! neutral ──ease──▶ effect ─────────── effect ──ease──▶ neutral
//!         [start, start+w)                  (end-w, end]
//! ```
//!
//! Inside the windows the state is `lerp(neutral, effect, ease(progress))`.
//! Everywhere else the result equals the preview result.

use kenburns_common::config::{EasingCurve, InterpolationConfig};
use kenburns_project_model::effect::{TransitionKind, ZoomEffect};
use kenburns_project_model::timeline::{active_state, ActiveState, EffectTimeline};
use kenburns_project_model::viewport::ZoomState;
use serde::{Deserialize, Serialize};

/// Which fidelity contract to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// Exact values with hard cuts at effect boundaries.
    Preview,
    /// Eased entry/exit transitions.
    Export,
}

/// Transition window length and easing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionPolicy {
    pub max_window_secs: f64,
    pub window_divisor: f64,
    pub easing: EasingCurve,
}

impl TransitionPolicy {
    /// Transition window for `effect`: `min(max_window, duration / divisor)`.
    pub fn window(&self, effect: &ZoomEffect) -> f64 {
        (effect.duration() / self.window_divisor)
            .min(self.max_window_secs)
            .max(0.0)
    }

    /// Apply the easing curve to `progress` in `[0, 1]`.
    pub fn ease(&self, progress: f64) -> f64 {
        let p = progress.clamp(0.0, 1.0);
        match self.easing {
            EasingCurve::Linear => p,
            EasingCurve::QuinticOut => 1.0 - (1.0 - p).powi(5),
        }
    }
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        let config = InterpolationConfig::default();
        Self {
            max_window_secs: config.max_window_secs,
            window_divisor: config.window_divisor,
            easing: config.easing,
        }
    }
}

/// Inclusive scale clamp applied in every mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min, self.max)
    }

    pub fn contains(&self, scale: f64) -> bool {
        scale >= self.min && scale <= self.max
    }
}

impl Default for ScaleBounds {
    fn default() -> Self {
        let config = InterpolationConfig::default();
        Self {
            min: config.min_scale,
            max: config.max_scale,
        }
    }
}

/// The single authoritative interpolator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interpolator {
    policy: TransitionPolicy,
    bounds: ScaleBounds,
}

impl Interpolator {
    pub fn new(policy: TransitionPolicy, bounds: ScaleBounds) -> Self {
        Self { policy, bounds }
    }

    /// Build from configuration. The config is expected to be validated.
    pub fn from_config(config: &InterpolationConfig) -> Self {
        Self {
            policy: TransitionPolicy {
                max_window_secs: config.max_window_secs,
                window_divisor: config.window_divisor,
                easing: config.easing,
            },
            bounds: ScaleBounds {
                min: config.min_scale,
                max: config.max_scale,
            },
        }
    }

    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    pub fn bounds(&self) -> &ScaleBounds {
        &self.bounds
    }

    /// State at `t` under `mode`.
    pub fn state_at(&self, t: f64, effects: &[ZoomEffect], mode: InterpolationMode) -> ZoomState {
        match mode {
            InterpolationMode::Preview => self.preview_state(t, effects),
            InterpolationMode::Export => self.export_state(t, effects),
        }
    }

    /// Convenience over a timeline snapshot.
    pub fn state_on(&self, t: f64, timeline: &EffectTimeline, mode: InterpolationMode) -> ZoomState {
        self.state_at(t, timeline.effects(), mode)
    }

    /// Preview mode: the active state exactly, scale clamped.
    pub fn preview_state(&self, t: f64, effects: &[ZoomEffect]) -> ZoomState {
        self.clamped(active_state(t, effects).zoom_state())
    }

    /// Export mode: eased transitions at effect boundaries.
    pub fn export_state(&self, t: f64, effects: &[ZoomEffect]) -> ZoomState {
        match active_state(t, effects) {
            ActiveState::Neutral { .. } => ZoomState::NEUTRAL,
            ActiveState::Effect(effect) => {
                let target = self.clamped(effect.state());
                match self.transition_progress(t, effect) {
                    Some(progress) => ZoomState::lerp(&ZoomState::NEUTRAL, &target, progress),
                    None => target,
                }
            }
        }
    }

    /// Transition window for `effect` under this interpolator's policy.
    pub fn transition_window(&self, effect: &ZoomEffect) -> f64 {
        self.policy.window(effect)
    }

    /// Eased progress toward the effect when `t` is inside the entry or exit
    /// window, `None` when the effect holds fully.
    fn transition_progress(&self, t: f64, effect: &ZoomEffect) -> Option<f64> {
        if effect.transition == TransitionKind::Instant {
            return None;
        }
        let window = self.policy.window(effect);
        if !(window > 0.0) {
            return None;
        }

        let since_start = t - effect.start_time;
        let until_end = effect.end_time - t;

        // Entry wins when both windows overlap (they cannot with divisor >= 2).
        if since_start < window {
            return Some(self.policy.ease(since_start / window));
        }
        if until_end < window {
            return Some(self.policy.ease(until_end / window));
        }
        None
    }

    fn clamped(&self, state: ZoomState) -> ZoomState {
        state.clamp_scale(self.bounds.min, self.bounds.max)
    }
}
