//! Export pipeline and progress reporting.
//!
//! ```text
//! Idle ─▶ Preparing ─▶ Rendering ─▶ Encoding ─▶ Complete
//!            │             │            │
//!            └─────────────┴────────────┴──▶ Failed | Cancelled
//! ```
//!
//! Frames are produced strictly in [`FrameClock`] order. Each sample seeks
//! the source, interpolates the zoom state in export mode, composites and
//! appends the raster to the sink. Cancellation is checked at every frame
//! boundary and raced against the encode call.

use std::future::Future;
use std::time::{Duration, Instant};

use image::RgbaImage;
use kenburns_common::cancel::CancellationToken;
use kenburns_common::clock::FrameClock;
use kenburns_common::config::AppConfig;
use kenburns_common::error::{ExportPhase, KenburnsError, KenburnsResult};
use kenburns_processing_core::interpolate::{InterpolationMode, Interpolator};
use kenburns_project_model::project::ExportParams;
use kenburns_project_model::timeline::EffectTimeline;
use serde::Serialize;

use crate::compositor::FrameRenderer;
use crate::encode::{Artifact, EncodeService};
use crate::media::{MediaInfo, MediaSource};
use crate::sink::{FrameSink, StreamFormat};

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Share of overall progress assigned to each working stage.
pub const PREPARING_WEIGHT: f64 = 0.05;
pub const RENDERING_WEIGHT: f64 = 0.85;
pub const ENCODING_WEIGHT: f64 = 0.10;

/// Export progress report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportProgress {
    /// Overall progress `[0.0, 1.0]`, never decreasing.
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    Idle,
    Preparing,
    Rendering,
    Encoding,
    Complete,
    Failed,
    Cancelled,
}

impl ExportStage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExportStage::Complete | ExportStage::Failed | ExportStage::Cancelled
        )
    }

    /// Error phase for a working stage.
    pub fn phase(self) -> Option<ExportPhase> {
        match self {
            ExportStage::Idle => Some(ExportPhase::Idle),
            ExportStage::Preparing => Some(ExportPhase::Preparing),
            ExportStage::Rendering => Some(ExportPhase::Rendering),
            ExportStage::Encoding => Some(ExportPhase::Encoding),
            _ => None,
        }
    }

    /// Overall progress range covered by this stage.
    pub fn progress_span(self) -> (f64, f64) {
        let render_start = PREPARING_WEIGHT;
        let encode_start = PREPARING_WEIGHT + RENDERING_WEIGHT;
        match self {
            ExportStage::Idle => (0.0, 0.0),
            ExportStage::Preparing => (0.0, render_start),
            ExportStage::Rendering => (render_start, encode_start),
            ExportStage::Encoding => (encode_start, encode_start + ENCODING_WEIGHT),
            ExportStage::Complete | ExportStage::Failed => (1.0, 1.0),
            ExportStage::Cancelled => (0.0, 0.0),
        }
    }
}

/// Settings for one export.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Frame rate, output size and duration limit.
    pub params: ExportParams,

    /// Bound on a single per-frame seek. On timeout the last decoded frame
    /// is reused.
    pub seek_timeout: Duration,

    /// Bound on loading the source, and on any seek made before the source
    /// has decoded its first frame.
    pub load_timeout: Duration,

    pub interpolator: Interpolator,

    /// Text settings; the output size is set once the source is known.
    pub renderer: FrameRenderer,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            params: ExportParams::default(),
            seek_timeout: Duration::from_millis(100),
            load_timeout: Duration::from_secs(10),
            interpolator: Interpolator::default(),
            renderer: FrameRenderer::new(0, 0),
        }
    }
}

impl ExportSettings {
    /// Settings from application configuration. Loads the configured
    /// overlay font, or the bundled one.
    pub fn from_config(config: &AppConfig) -> KenburnsResult<Self> {
        config.interpolation.validate()?;
        let params = ExportParams {
            fps: config.export.fps,
            width: config.export.width,
            height: config.export.height,
            duration_secs: None,
        };
        Ok(Self {
            params,
            seek_timeout: Duration::from_millis(config.export.seek_timeout_ms),
            load_timeout: Duration::from_millis(config.export.load_timeout_ms),
            interpolator: Interpolator::from_config(&config.interpolation),
            renderer: FrameRenderer::from_config(0, 0, &config.render)?,
        })
    }

    pub fn with_params(mut self, params: ExportParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_seek_timeout(mut self, timeout: Duration) -> Self {
        self.seek_timeout = timeout;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn with_interpolator(mut self, interpolator: Interpolator) -> Self {
        self.interpolator = interpolator;
        self
    }

    pub fn with_renderer(mut self, renderer: FrameRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    fn validate(&self) -> KenburnsResult<()> {
        if self.params.fps == 0 {
            return Err(KenburnsError::invalid_input("frame rate must be positive"));
        }
        if let Some(d) = self.params.duration_secs {
            if !d.is_finite() || d <= 0.0 {
                return Err(KenburnsError::invalid_input(format!(
                    "requested duration {d} must be positive"
                )));
            }
        }
        if self.params.width == Some(0) || self.params.height == Some(0) {
            return Err(KenburnsError::invalid_input("output size must be non-zero"));
        }
        Ok(())
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub artifact: Artifact,
    pub source: MediaInfo,
    pub width: u32,
    pub height: u32,
    pub frames_rendered: u64,
    /// Frames that reused the previous frame after a seek timeout.
    pub lossy_frames: u64,
    /// Whether the visual-only fallback produced the artifact.
    pub used_fallback: bool,
    pub elapsed: Duration,
}

/// Emits monotonic, stage-weighted progress.
struct ProgressTracker {
    callback: Option<ProgressCallback>,
    last: f64,
    frames_rendered: u64,
    total_frames: u64,
    render_started: Option<Instant>,
}

impl ProgressTracker {
    fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: 0.0,
            frames_rendered: 0,
            total_frames: 0,
            render_started: None,
        }
    }

    /// Report `fraction` of the way through `stage`.
    fn stage(&mut self, stage: ExportStage, fraction: f64) {
        let (lo, hi) = stage.progress_span();
        self.emit(stage, lo + (hi - lo) * fraction.clamp(0.0, 1.0));
    }

    fn frame_done(&mut self, frames_rendered: u64) {
        self.frames_rendered = frames_rendered;
        let fraction = if self.total_frames == 0 {
            1.0
        } else {
            frames_rendered as f64 / self.total_frames as f64
        };
        self.stage(ExportStage::Rendering, fraction);
    }

    fn cancelled(&mut self) {
        let last = self.last;
        self.emit(ExportStage::Cancelled, last);
    }

    fn eta_secs(&self, stage: ExportStage) -> f64 {
        match (stage, self.render_started) {
            (ExportStage::Rendering, Some(started)) if self.frames_rendered > 0 => {
                let per_frame = started.elapsed().as_secs_f64() / self.frames_rendered as f64;
                per_frame * self.total_frames.saturating_sub(self.frames_rendered) as f64
            }
            _ => 0.0,
        }
    }

    fn emit(&mut self, stage: ExportStage, value: f64) {
        let progress = value.clamp(0.0, 1.0).max(self.last);
        self.last = progress;
        if let Some(cb) = &self.callback {
            cb(ExportProgress {
                progress,
                frames_rendered: self.frames_rendered,
                total_frames: self.total_frames,
                eta_secs: self.eta_secs(stage),
                stage,
            });
        }
    }
}

/// An ownable export state machine. One pipeline runs one export.
#[derive(Debug)]
pub struct ExportPipeline {
    timeline: EffectTimeline,
    settings: ExportSettings,
    stage: ExportStage,
}

impl ExportPipeline {
    pub fn new(timeline: EffectTimeline, settings: ExportSettings) -> Self {
        Self {
            timeline,
            settings,
            stage: ExportStage::Idle,
        }
    }

    pub fn stage(&self) -> ExportStage {
        self.stage
    }

    pub fn timeline(&self) -> &EffectTimeline {
        &self.timeline
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Run the export to completion.
    ///
    /// The source must not be shared with any other export or preview while
    /// this runs.
    pub async fn run(
        &mut self,
        source: &mut dyn MediaSource,
        sink: &mut dyn FrameSink,
        encoder: &dyn EncodeService,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> KenburnsResult<ExportReport> {
        if self.stage != ExportStage::Idle {
            return Err(KenburnsError::invalid_input(format!(
                "export pipeline already ran (stage {:?})",
                self.stage
            )));
        }

        let started = Instant::now();
        let mut tracker = ProgressTracker::new(progress);
        tracing::info!(
            source = %source.describe(),
            effects = self.timeline.effects().len(),
            overlays = self.timeline.overlays().len(),
            fps = self.settings.params.fps,
            encoder = encoder.name(),
            "Starting export"
        );

        let result = self
            .execute(source, sink, encoder, cancel, &mut tracker, started)
            .await;

        match &result {
            Ok(report) => {
                self.stage = ExportStage::Complete;
                tracker.stage(ExportStage::Complete, 1.0);
                tracing::info!(
                    frames = report.frames_rendered,
                    lossy_frames = report.lossy_frames,
                    used_fallback = report.used_fallback,
                    bytes = report.artifact.len(),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Export complete"
                );
            }
            Err(err) if err.is_cancelled() => {
                self.stage = ExportStage::Cancelled;
                tracker.cancelled();
                tracing::info!(error = %err, "Export cancelled");
            }
            Err(err) => {
                self.stage = ExportStage::Failed;
                tracker.stage(ExportStage::Failed, 1.0);
                tracing::error!(error = %err, "{}", err.report());
            }
        }

        result
    }

    fn cancelled_here(&self) -> KenburnsError {
        KenburnsError::cancelled(self.stage.phase().unwrap_or(ExportPhase::Idle))
    }

    fn check_cancel(&self, cancel: &CancellationToken) -> KenburnsResult<()> {
        if cancel.is_cancelled() {
            Err(self.cancelled_here())
        } else {
            Ok(())
        }
    }

    async fn execute(
        &mut self,
        source: &mut dyn MediaSource,
        sink: &mut dyn FrameSink,
        encoder: &dyn EncodeService,
        cancel: &CancellationToken,
        tracker: &mut ProgressTracker,
        started: Instant,
    ) -> KenburnsResult<ExportReport> {
        self.settings.validate()?;
        self.check_cancel(cancel)?;

        // Preparing
        self.stage = ExportStage::Preparing;
        tracker.stage(ExportStage::Preparing, 0.0);

        let load_timeout = self.settings.load_timeout;
        let info = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(self.cancelled_here()),
            loaded = tokio::time::timeout(load_timeout, source.load()) => match loaded {
                Ok(Ok(info)) => info,
                Ok(Err(err @ KenburnsError::MediaLoad { .. })) => return Err(err),
                Ok(Err(err)) => return Err(KenburnsError::media_load(err.to_string())),
                Err(_) => {
                    return Err(KenburnsError::media_load(format!(
                        "source did not load within {} ms",
                        load_timeout.as_millis()
                    )))
                }
            },
        };

        if !info.duration_secs.is_finite() || info.duration_secs <= 0.0 {
            return Err(KenburnsError::invalid_input(format!(
                "source duration {} must be positive",
                info.duration_secs
            )));
        }

        let params = self.settings.params;
        let duration = params.export_duration(info.duration_secs);
        let (width, height) = params.output_size(info.width, info.height);
        let clock = FrameClock::new(duration, params.fps);
        let total_frames = clock.frame_count();
        let mut renderer = self.settings.renderer.resized(width, height);
        renderer.load_overlay_fonts(self.timeline.overlays());

        sink.begin(StreamFormat {
            width,
            height,
            fps: params.fps,
        })?;
        tracker.total_frames = total_frames;
        tracker.stage(ExportStage::Preparing, 1.0);

        tracing::info!(
            width,
            height,
            fps = params.fps,
            duration_secs = duration,
            total_frames,
            "Export plan built"
        );

        // Rendering
        self.stage = ExportStage::Rendering;
        tracker.render_started = Some(Instant::now());
        tracker.stage(ExportStage::Rendering, 0.0);

        let interpolator = self.settings.interpolator;
        let seek_timeout = self.settings.seek_timeout;
        let mut lossy_frames = 0u64;

        for tick in clock.ticks() {
            self.check_cancel(cancel)?;
            let index = tick.index;
            let t = tick.time_secs;

            // Until a first frame exists there is nothing to continue from, so
            // that seek gets the load budget.
            let bound = if source.current_frame().is_some() {
                seek_timeout
            } else {
                seek_timeout.max(self.settings.load_timeout)
            };
            let seeked = tokio::time::timeout(bound, source.seek(t)).await;
            let fresh: RgbaImage;
            let frame = match seeked {
                Ok(Ok(decoded)) => {
                    fresh = decoded;
                    &fresh
                }
                Ok(Err(err)) => return Err(KenburnsError::frame_render(index, err.to_string())),
                Err(_) => {
                    lossy_frames += 1;
                    tracing::warn!(
                        frame = index,
                        time_secs = t,
                        timeout_ms = bound.as_millis() as u64,
                        "Seek timed out; reusing last decoded frame"
                    );
                    source.current_frame().ok_or_else(|| {
                        KenburnsError::frame_render(index, "seek timed out before any frame was decoded")
                    })?
                }
            };

            let state = interpolator.state_on(t, &self.timeline, InterpolationMode::Export);
            let overlays = self.timeline.active_overlays(t);
            let composed = renderer
                .render(frame, &state, &overlays)
                .map_err(|e| KenburnsError::frame_render(index, e.to_string()))?;

            sink.append(index, &composed).map_err(|err| match err {
                KenburnsError::FrameRender { .. } => err,
                other => KenburnsError::frame_render(index, other.to_string()),
            })?;

            tracker.frame_done(index + 1);
            tokio::task::yield_now().await;
        }

        let stream = sink.finish()?;
        self.check_cancel(cancel)?;

        if lossy_frames > 0 {
            tracing::warn!(lossy_frames, total_frames, "Export used lossy seek continuation");
        }

        // Encoding
        self.stage = ExportStage::Encoding;
        tracker.stage(ExportStage::Encoding, 0.0);

        let mut used_fallback = false;
        let artifact = match race_cancel(cancel, encoder.submit(&stream, &info)).await {
            Ok(artifact) => artifact,
            Err(err) if err.is_cancelled() => return Err(err),
            Err(mux_err) => {
                tracing::warn!(error = %mux_err, "Audio mux failed; retrying visual-only");
                used_fallback = true;
                tracker.stage(ExportStage::Encoding, 0.5);
                match race_cancel(cancel, encoder.convert_visual_only(&stream)).await {
                    Ok(artifact) => artifact,
                    Err(err) if err.is_cancelled() => return Err(err),
                    Err(fallback_err) => {
                        return Err(KenburnsError::encode_service(format!(
                            "mux failed ({mux_err}); visual-only fallback failed ({fallback_err})"
                        )))
                    }
                }
            }
        };

        Ok(ExportReport {
            artifact,
            source: info,
            width,
            height,
            frames_rendered: stream.frame_count,
            lossy_frames,
            used_fallback,
            elapsed: started.elapsed(),
        })
    }
}

/// Await `fut` unless `cancel` fires first. The losing future is dropped,
/// which aborts any external process it started.
async fn race_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = KenburnsResult<T>>,
) -> KenburnsResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(KenburnsError::cancelled(ExportPhase::Encoding)),
        result = fut => result,
    }
}
