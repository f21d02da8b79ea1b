//! Export a synthetic test pattern through a built-in timeline.

use std::path::PathBuf;

use kenburns_common::config::AppConfig;
use kenburns_project_model::document::TimelineDocument;
use kenburns_project_model::effect::{TextOverlay, TransitionKind, ZoomEffect};
use kenburns_project_model::timeline::EffectTimeline;
use kenburns_render_engine::{
    ExportPipeline, ExportSettings, FfmpegEncodeService, RawFileSink, SyntheticSource,
};

use super::export::drive;

/// Effects spaced across `duration`: a slow push into the top-left marker,
/// a hard cut to the bottom-right, and a caption over the first half.
fn demo_timeline(duration: f64) -> EffectTimeline {
    let d = duration.max(1.0);
    EffectTimeline::from_parts(
        vec![
            ZoomEffect::new("push-in", d * 0.10, d * 0.45, 15.0, 15.0, 2.5),
            ZoomEffect::new("cut", d * 0.55, d * 0.90, 85.0, 85.0, 2.0)
                .with_transition(TransitionKind::Instant),
        ],
        vec![
            TextOverlay::new("caption", 0.0, d * 0.5, "Ken Burns demo")
                .at(50.0, 85.0)
                .with_background("#000000b0", 8.0, 6.0),
            TextOverlay::new("footer", d * 0.5, d, "cut to corner").at(50.0, 10.0),
        ],
    )
}

pub async fn run(
    output: PathBuf,
    timeline_out: Option<PathBuf>,
    duration: f64,
    width: u32,
    height: u32,
    config: AppConfig,
) -> anyhow::Result<()> {
    if !(duration > 0.0) {
        anyhow::bail!("--duration must be positive");
    }
    let timeline = demo_timeline(duration);

    if let Some(path) = timeline_out {
        let json = TimelineDocument::from(&timeline).to_json_pretty()?;
        std::fs::write(&path, json)?;
        println!("Demo timeline written to {}", path.display());
    }

    let encoder = FfmpegEncodeService::new(config.encoder.clone()).with_filename(
        output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.export.artifact_filename.clone()),
    );
    if !encoder.is_available() {
        anyhow::bail!("{} not found in PATH", config.encoder.ffmpeg);
    }

    println!("Rendering {width}x{height} synthetic source for {duration}s");
    let settings = ExportSettings::from_config(&config)?;
    let mut source = SyntheticSource::new(width, height, duration);
    let mut sink = RawFileSink::new();

    drive(
        ExportPipeline::new(timeline, settings),
        &mut source,
        &mut sink,
        &encoder,
        &output,
    )
    .await
}
