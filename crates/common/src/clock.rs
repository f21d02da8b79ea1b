//! Deterministic frame clock for export.
//!
//! Export never samples state from live playback. Instead the frame clock
//! enumerates sample times as a pure function of `(duration, fps)`, and the
//! pipeline seeks the source to each one. Two clocks built from the same
//! inputs always yield the same sequence.

/// Tolerance used when deciding whether `duration * fps` is a whole number.
const FRAME_COUNT_EPSILON: f64 = 1e-9;

/// Sample time of frame `index` for a clip of `duration_secs` at `fps`.
///
/// `min(index / fps, duration)`.
pub fn frame_time(index: u64, duration_secs: f64, fps: u32) -> f64 {
    (index as f64 / fps.max(1) as f64).min(duration_secs)
}

/// Number of frames for a clip: `ceil(duration * fps)`.
///
/// Products that are whole numbers up to floating-point noise (for example
/// `0.1 * 30`) are not rounded up to an extra frame.
pub fn frame_count(duration_secs: f64, fps: u32) -> u64 {
    if !(duration_secs > 0.0) || !duration_secs.is_finite() {
        return 0;
    }
    let raw = duration_secs * fps.max(1) as f64;
    let nearest = raw.round();
    if (raw - nearest).abs() < FRAME_COUNT_EPSILON {
        nearest as u64
    } else {
        raw.ceil() as u64
    }
}

/// A single sample produced by the frame clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Zero-based frame index.
    pub index: u64,
    /// Sample time in seconds.
    pub time_secs: f64,
}

/// Enumerates export sample times for a given duration and frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    duration_secs: f64,
    fps: u32,
}

impl FrameClock {
    /// Create a clock. An fps of zero is treated as one.
    pub fn new(duration_secs: f64, fps: u32) -> Self {
        Self {
            duration_secs,
            fps: fps.max(1),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Total number of frames.
    pub fn frame_count(&self) -> u64 {
        frame_count(self.duration_secs, self.fps)
    }

    /// Sample time of frame `index`.
    pub fn frame_time(&self, index: u64) -> f64 {
        frame_time(index, self.duration_secs, self.fps)
    }

    /// Iterate all ticks in time order.
    pub fn ticks(&self) -> FrameTicks {
        FrameTicks {
            clock: *self,
            next: 0,
            total: self.frame_count(),
        }
    }
}

impl IntoIterator for FrameClock {
    type Item = FrameTick;
    type IntoIter = FrameTicks;

    fn into_iter(self) -> Self::IntoIter {
        self.ticks()
    }
}

/// Iterator over [`FrameTick`]s.
#[derive(Debug, Clone)]
pub struct FrameTicks {
    clock: FrameClock,
    next: u64,
    total: u64,
}

impl Iterator for FrameTicks {
    type Item = FrameTick;

    fn next(&mut self) -> Option<FrameTick> {
        if self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(FrameTick {
            index,
            time_secs: self.clock.frame_time(index),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameTicks {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_seconds_at_thirty_fps() {
        let clock = FrameClock::new(2.0, 30);
        let ticks: Vec<FrameTick> = clock.ticks().collect();
        assert_eq!(ticks.len(), 60);
        assert_eq!(ticks[0].time_secs, 0.0);
        assert_eq!(ticks[59].index, 59);
        assert_eq!(frame_time(59, 2.0, 30), (59.0f64 / 30.0).min(2.0));
        assert_eq!(ticks[59].time_secs, frame_time(59, 2.0, 30));
    }

    #[test]
    fn test_frame_count_rounds_up_fractional_duration() {
        assert_eq!(frame_count(1.01, 30), 31);
        assert_eq!(frame_count(0.1, 30), 3);
        assert_eq!(frame_count(0.0, 30), 0);
        assert_eq!(frame_count(-1.0, 30), 0);
        assert_eq!(frame_count(f64::NAN, 30), 0);
    }

    #[test]
    fn test_last_frame_time_clamped_to_duration() {
        // 1.01s at 30fps -> 31 frames, last sample 30/30 = 1.0 (< 1.01)
        let clock = FrameClock::new(1.01, 30);
        let last = clock.ticks().last().unwrap();
        assert!(last.time_secs <= 1.01);

        // index past the end is clamped to the duration
        assert_eq!(frame_time(100, 1.0, 30), 1.0);
    }

    #[test]
    fn test_zero_fps_treated_as_one() {
        let clock = FrameClock::new(3.0, 0);
        assert_eq!(clock.fps(), 1);
        assert_eq!(clock.frame_count(), 3);
    }

    proptest! {
        #[test]
        fn prop_clock_is_deterministic_and_ordered(duration in 0.01f64..30.0, fps in 1u32..120) {
            let a: Vec<FrameTick> = FrameClock::new(duration, fps).ticks().collect();
            let b: Vec<FrameTick> = FrameClock::new(duration, fps).ticks().collect();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.len() as u64, frame_count(duration, fps));
            for pair in a.windows(2) {
                prop_assert!(pair[1].time_secs >= pair[0].time_secs);
            }
            for tick in &a {
                prop_assert!(tick.time_secs <= duration);
            }
        }
    }
}
