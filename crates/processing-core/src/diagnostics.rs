//! Timeline diagnostics.
//!
//! Reports conditions the engine tolerates but an editor may want to
//! surface. The timeline is never modified: overlapping effects still
//! resolve to the earliest-starting effect.

use std::fmt;

use kenburns_project_model::timeline::EffectTimeline;
use serde::Serialize;

use crate::interpolate::ScaleBounds;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum TimelineIssue {
    /// Two zoom effects overlap; `winner` is used inside the overlap.
    Overlap {
        winner: String,
        shadowed: String,
        from: f64,
        to: f64,
    },
    /// `start_time >= end_time`.
    EmptyInterval { id: String, start: f64, end: f64 },
    /// Scale outside the configured bound; it will be clamped.
    ScaleOutOfBounds { id: String, scale: f64, clamped: f64 },
    /// Anchor or overlay position outside `0..=100`.
    PositionOutOfRange { id: String, x: f64, y: f64 },
    /// Overlay with no visible text.
    EmptyText { id: String },
}

impl fmt::Display for TimelineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineIssue::Overlap {
                winner,
                shadowed,
                from,
                to,
            } => write!(
                f,
                "effects {winner} and {shadowed} overlap in [{from:.3}s, {to:.3}s]; {winner} wins"
            ),
            TimelineIssue::EmptyInterval { id, start, end } => {
                write!(f, "{id}: empty interval [{start:.3}s, {end:.3}s]")
            }
            TimelineIssue::ScaleOutOfBounds { id, scale, clamped } => {
                write!(f, "{id}: scale {scale} outside bounds, clamped to {clamped}")
            }
            TimelineIssue::PositionOutOfRange { id, x, y } => {
                write!(f, "{id}: position ({x}, {y}) outside 0..=100")
            }
            TimelineIssue::EmptyText { id } => write!(f, "{id}: overlay text is empty"),
        }
    }
}

fn in_percent_range(v: f64) -> bool {
    (0.0..=100.0).contains(&v)
}

/// Collect every issue in `timeline`.
pub fn diagnose(timeline: &EffectTimeline, bounds: &ScaleBounds) -> Vec<TimelineIssue> {
    let mut issues = vec![];
    let effects = timeline.effects();

    for (i, effect) in effects.iter().enumerate() {
        if effect.start_time >= effect.end_time {
            issues.push(TimelineIssue::EmptyInterval {
                id: effect.id.clone(),
                start: effect.start_time,
                end: effect.end_time,
            });
        }
        if !bounds.contains(effect.scale) {
            issues.push(TimelineIssue::ScaleOutOfBounds {
                id: effect.id.clone(),
                scale: effect.scale,
                clamped: bounds.clamp(effect.scale),
            });
        }
        if !in_percent_range(effect.x) || !in_percent_range(effect.y) {
            issues.push(TimelineIssue::PositionOutOfRange {
                id: effect.id.clone(),
                x: effect.x,
                y: effect.y,
            });
        }

        // Sorted by start: only later entries can start inside this one.
        for later in &effects[i + 1..] {
            if later.start_time > effect.end_time {
                break;
            }
            issues.push(TimelineIssue::Overlap {
                winner: effect.id.clone(),
                shadowed: later.id.clone(),
                from: later.start_time,
                to: later.end_time.min(effect.end_time),
            });
        }
    }

    for overlay in timeline.overlays() {
        if overlay.start_time >= overlay.end_time {
            issues.push(TimelineIssue::EmptyInterval {
                id: overlay.id.clone(),
                start: overlay.start_time,
                end: overlay.end_time,
            });
        }
        if overlay.text.trim().is_empty() {
            issues.push(TimelineIssue::EmptyText {
                id: overlay.id.clone(),
            });
        }
        if !in_percent_range(overlay.x) || !in_percent_range(overlay.y) {
            issues.push(TimelineIssue::PositionOutOfRange {
                id: overlay.id.clone(),
                x: overlay.x,
                y: overlay.y,
            });
        }
    }

    if !issues.is_empty() {
        tracing::debug!(issues = issues.len(), "Timeline diagnostics found issues");
    }

    issues
}
