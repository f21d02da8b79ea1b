//! Ordered effect timeline and neutral-state synthesis.
//!
//! The timeline is an immutable snapshot of the editor's effects. Zoom
//! effects are kept in `start_time`-ascending order (ties keep insertion
//! order); text overlays keep insertion order, which is also their paint
//! order.

use serde::{Deserialize, Serialize};

use crate::effect::{TextOverlay, ZoomEffect};
use crate::viewport::ZoomState;

/// The time span covered by a synthesized neutral state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeutralSpan {
    /// Start of the span (seconds).
    pub start: f64,
    /// End of the span (seconds). `None` means unbounded.
    pub end: Option<f64>,
}

impl NeutralSpan {
    /// The span covering the whole timeline.
    pub const ALL: NeutralSpan = NeutralSpan {
        start: 0.0,
        end: None,
    };

    pub fn new(start: f64, end: Option<f64>) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.end.is_none()
    }
}

/// What is active at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveState<'a> {
    /// No effect; the identity view over `span`.
    Neutral { span: NeutralSpan },
    /// An explicit effect.
    Effect(&'a ZoomEffect),
}

impl<'a> ActiveState<'a> {
    /// The state values, unclamped.
    pub fn zoom_state(&self) -> ZoomState {
        match self {
            ActiveState::Neutral { .. } => ZoomState::NEUTRAL,
            ActiveState::Effect(effect) => effect.state(),
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, ActiveState::Neutral { .. })
    }

    pub fn effect(&self) -> Option<&'a ZoomEffect> {
        match self {
            ActiveState::Effect(effect) => Some(effect),
            ActiveState::Neutral { .. } => None,
        }
    }
}

/// Ordered view over zoom effects and text overlays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectTimeline {
    effects: Vec<ZoomEffect>,
    overlays: Vec<TextOverlay>,
}

impl EffectTimeline {
    /// An empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot. Effects are stably sorted by start time.
    pub fn from_parts(mut effects: Vec<ZoomEffect>, overlays: Vec<TextOverlay>) -> Self {
        effects.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Self { effects, overlays }
    }

    pub fn with_effects(effects: Vec<ZoomEffect>) -> Self {
        Self::from_parts(effects, vec![])
    }

    /// Zoom effects in start-ascending order.
    pub fn effects(&self) -> &[ZoomEffect] {
        &self.effects
    }

    /// Text overlays in insertion order.
    pub fn overlays(&self) -> &[TextOverlay] {
        &self.overlays
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.overlays.is_empty()
    }

    /// The effect or neutral span active at `t`. See [`active_state`].
    pub fn active_state(&self, t: f64) -> ActiveState<'_> {
        active_state(t, &self.effects)
    }

    /// Overlays active at `t`, in paint order.
    pub fn active_overlays(&self, t: f64) -> Vec<&TextOverlay> {
        self.overlays.iter().filter(|o| o.is_active(t)).collect()
    }

    /// Latest end time of any effect or overlay.
    pub fn end_time(&self) -> f64 {
        self.effects
            .iter()
            .map(|e| e.end_time)
            .chain(self.overlays.iter().map(|o| o.end_time))
            .fold(0.0, f64::max)
    }
}

/// Resolve the state at `t` over effects sorted by `start_time`.
///
/// - no effects: neutral over all time
/// - before the first start: neutral over `[0, first_start)`
/// - after the last end: neutral over `[last_end, inf)`
/// - inside an effect: the first effect (in sorted order) containing `t`
/// - in a gap: neutral spanning exactly that gap
pub fn active_state(t: f64, effects: &[ZoomEffect]) -> ActiveState<'_> {
    let Some(first) = effects.first() else {
        return ActiveState::Neutral {
            span: NeutralSpan::ALL,
        };
    };

    if t < first.start_time {
        return ActiveState::Neutral {
            span: NeutralSpan::new(0.0, Some(first.start_time)),
        };
    }

    let last_end = effects.iter().map(|e| e.end_time).fold(f64::MIN, f64::max);
    if t > last_end {
        return ActiveState::Neutral {
            span: NeutralSpan::new(last_end, None),
        };
    }

    // Gap bounds are gathered during the same scan: the latest end before t
    // and the earliest start after t.
    let mut gap_start = first.start_time;
    let mut gap_end = last_end;
    for effect in effects {
        if effect.contains(t) {
            return ActiveState::Effect(effect);
        }
        if effect.end_time < t {
            gap_start = gap_start.max(effect.end_time);
        }
        if effect.start_time > t {
            gap_end = gap_end.min(effect.start_time);
            // Sorted by start: nothing later can contain t.
            break;
        }
    }

    ActiveState::Neutral {
        span: NeutralSpan::new(gap_start, Some(gap_end)),
    }
}
