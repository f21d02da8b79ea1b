//! Kenburns Processing Core: the interpolation engine
//!
//! Turns a sparse, possibly gapped timeline of zoom effects into a
//! continuous state at any query time:
//! - **Interpolator:** Preview (exact, hard cuts) and Export (eased
//!   transitions) modes under one transition policy and one scale bound
//! - **Preview motion:** CSS-like transform samples for UI clients
//! - **Diagnostics:** Overlap and range reports that never mutate the timeline
//!
//! This crate is pure computation with no I/O or platform dependencies.

pub mod diagnostics;
pub mod interpolate;
pub mod preview;

pub use diagnostics::{diagnose, TimelineIssue};
pub use interpolate::{InterpolationMode, Interpolator, ScaleBounds, TransitionPolicy};
