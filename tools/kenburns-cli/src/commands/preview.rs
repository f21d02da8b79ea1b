//! Print interpolated zoom states.

use std::path::PathBuf;

use kenburns_common::config::AppConfig;
use kenburns_processing_core::interpolate::{InterpolationMode, Interpolator};
use kenburns_processing_core::preview::{preview_frame, simulate_preview_motion};
use kenburns_project_model::document::TimelineDocument;
use kenburns_project_model::timeline::ActiveState;
use serde_json::json;

pub fn run(
    timeline: PathBuf,
    at: Option<f64>,
    mode: InterpolationMode,
    fps: f64,
    config: &AppConfig,
) -> anyhow::Result<()> {
    config.interpolation.validate()?;
    let timeline = TimelineDocument::load(&timeline)
        .map_err(|e| anyhow::anyhow!("Failed to load timeline: {e}"))?
        .into_timeline();
    let interpolator = Interpolator::from_config(&config.interpolation);

    if let Some(t) = at {
        let state = interpolator.state_on(t, &timeline, mode);
        let active = match timeline.active_state(t) {
            ActiveState::Effect(effect) => json!({ "effect": effect.id }),
            ActiveState::Neutral { span } => json!({ "neutral": span }),
        };
        let overlays: Vec<&str> = timeline
            .active_overlays(t)
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        let out = json!({
            "time": t,
            "mode": mode,
            "state": state,
            "active": active,
            "overlays": overlays,
            "css": preview_frame(t, state).css_transform(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let duration = timeline.end_time().max(1.0);
    match mode {
        InterpolationMode::Preview => {
            for frame in simulate_preview_motion(&timeline, &interpolator, duration, fps) {
                println!(
                    "{:>8.3}s  scale={:.4}  {}",
                    frame.time_secs,
                    frame.state.scale,
                    frame.css_transform()
                );
            }
        }
        InterpolationMode::Export => {
            let step = 1.0 / fps.max(1.0);
            let count = (duration / step).floor() as u64;
            for i in 0..=count {
                let t = (i as f64 * step).min(duration);
                let state = interpolator.state_on(t, &timeline, mode);
                let frame = preview_frame(t, state);
                println!(
                    "{:>8.3}s  scale={:.4}  {}",
                    t,
                    state.scale,
                    frame.css_transform()
                );
            }
        }
    }
    Ok(())
}
