pub mod check;
pub mod demo;
pub mod export;
pub mod frames;
pub mod preview;
pub mod validate;

use kenburns_render_engine::export::{ExportProgress, ProgressCallback};

/// Progress line printed in place.
pub fn progress_printer() -> ProgressCallback {
    Box::new(|p: ExportProgress| {
        eprint!(
            "\r  Progress: {:>5.1}% [{:?}] ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.stage,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
    })
}
