//! Export a source video through a timeline.

use std::path::{Path, PathBuf};

use kenburns_common::cancel::CancellationToken;
use kenburns_common::config::AppConfig;
use kenburns_processing_core::diagnose;
use kenburns_processing_core::interpolate::ScaleBounds;
use kenburns_project_model::document::TimelineDocument;
use kenburns_project_model::timeline::EffectTimeline;
use kenburns_render_engine::{
    EncodeService, ExportPipeline, ExportSettings, FfmpegEncodeService, FfmpegMediaSource,
    FrameSink, MediaSource, RawFileSink,
};

use super::progress_printer;

pub struct ExportArgs {
    pub source: PathBuf,
    pub timeline: PathBuf,
    pub output: Option<PathBuf>,
    pub fps: Option<u32>,
    pub size: Option<(u32, u32)>,
    pub font: Option<PathBuf>,
    pub duration: Option<f64>,
}

pub async fn run(args: ExportArgs, mut config: AppConfig) -> anyhow::Result<()> {
    println!("Exporting: {}", args.source.display());

    let timeline = TimelineDocument::load(&args.timeline)
        .map_err(|e| anyhow::anyhow!("Failed to load timeline: {e}"))?
        .into_timeline();

    if let Some(font) = args.font {
        config.render.font_path = Some(font);
    }
    if let Some(fps) = args.fps {
        config.export.fps = fps;
    }
    if let Some((width, height)) = args.size {
        config.export.width = Some(width);
        config.export.height = Some(height);
    }

    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.export.artifact_filename));

    let mut settings = ExportSettings::from_config(&config)?;
    settings.params.duration_secs = args.duration;

    report_issues(&timeline, &config);

    let encoder = FfmpegEncodeService::new(config.encoder.clone())
        .with_filename(artifact_name(&output_path, &config));
    if !encoder.is_available() {
        anyhow::bail!(
            "{} not found in PATH; run `kenburns check` for details",
            config.encoder.ffmpeg
        );
    }

    let mut source = FfmpegMediaSource::with_config(&args.source, &config.encoder)
        .with_decode_fps(settings.params.fps);
    let mut sink = RawFileSink::new();

    println!("  Timeline: {}", args.timeline.display());
    println!("  Output: {}", output_path.display());
    println!("  FPS: {}", settings.params.fps);

    drive(
        ExportPipeline::new(timeline, settings),
        &mut source,
        &mut sink,
        &encoder,
        &output_path,
    )
    .await
}

fn artifact_name(output: &Path, config: &AppConfig) -> String {
    output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.export.artifact_filename.clone())
}

fn report_issues(timeline: &EffectTimeline, config: &AppConfig) {
    let bounds = ScaleBounds {
        min: config.interpolation.min_scale,
        max: config.interpolation.max_scale,
    };
    for issue in diagnose(timeline, &bounds) {
        tracing::warn!("{issue}");
    }
}

/// Run a pipeline with Ctrl-C cancellation and write the artifact next to
/// `output_path`.
pub(crate) async fn drive(
    mut pipeline: ExportPipeline,
    source: &mut dyn MediaSource,
    sink: &mut dyn FrameSink,
    encoder: &dyn EncodeService,
    output_path: &Path,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling export...");
            on_signal.cancel();
        }
    });

    let result = pipeline
        .run(source, sink, encoder, &cancel, Some(progress_printer()))
        .await;
    signal_task.abort();
    eprintln!();

    match result {
        Ok(report) => {
            let dir = output_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let written = report.artifact.save_in(dir)?;
            println!("Export complete: {}", written.display());
            println!(
                "  {} frames at {}x{} in {:.1}s{}{}",
                report.frames_rendered,
                report.width,
                report.height,
                report.elapsed.as_secs_f64(),
                if report.artifact.has_audio { ", with audio" } else { ", no audio" },
                if report.used_fallback { " (visual-only fallback)" } else { "" },
            );
            if report.lossy_frames > 0 {
                println!("  {} frame(s) reused after seek timeouts", report.lossy_frames);
            }
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            println!("Export cancelled.");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e.report())),
    }
}
