//! End-to-end export pipeline behaviour against synthetic sources and
//! scripted encoders.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use kenburns_common::cancel::CancellationToken;
use kenburns_common::error::{ExportPhase, KenburnsError, KenburnsResult};
use kenburns_processing_core::interpolate::Interpolator;
use kenburns_project_model::effect::{TextOverlay, ZoomEffect};
use kenburns_project_model::project::ExportParams;
use kenburns_project_model::timeline::EffectTimeline;
use kenburns_project_model::viewport::ZoomState;
use kenburns_render_engine::{
    Artifact, EncodeService, ExportPipeline, ExportProgress, ExportSettings, ExportStage,
    FrameRenderer, MediaInfo, MediaSource, MemoryFrameSink, ProgressCallback, RawFileSink,
    RenderedStream, StreamData, StreamFormat, SyntheticSource,
};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 36;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Synthetic source with scripted delays and failures.
struct TestSource {
    inner: SyntheticSource,
    load_delay: Option<Duration>,
    load_error: bool,
    slow_seeks: Vec<u64>,
    failing_seek: Option<u64>,
    seek_calls: u64,
}

impl TestSource {
    fn new(duration_secs: f64) -> Self {
        Self {
            inner: SyntheticSource::new(WIDTH, HEIGHT, duration_secs),
            load_delay: None,
            load_error: false,
            slow_seeks: vec![],
            failing_seek: None,
            seek_calls: 0,
        }
    }
}

#[async_trait]
impl MediaSource for TestSource {
    async fn load(&mut self) -> KenburnsResult<MediaInfo> {
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if self.load_error {
            return Err(KenburnsError::media_load("unsupported codec"));
        }
        self.inner.load().await
    }

    async fn seek(&mut self, time_secs: f64) -> KenburnsResult<RgbaImage> {
        let call = self.seek_calls;
        self.seek_calls += 1;
        if self.failing_seek == Some(call) {
            return Err(KenburnsError::media_load("decoder error"));
        }
        if self.slow_seeks.contains(&call) {
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        self.inner.seek(time_secs).await
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        self.inner.current_frame()
    }

    fn describe(&self) -> String {
        "test source".to_string()
    }
}

/// Decrements the in-flight counter when the call's future is dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default, Clone)]
struct ScriptedEncoder {
    fail_submit: bool,
    fail_fallback: bool,
    cancel_on_submit: Option<CancellationToken>,
    calls: Arc<Mutex<Vec<&'static str>>>,
    in_flight: Arc<AtomicUsize>,
    captured: Arc<Mutex<Option<(StreamFormat, Vec<u8>)>>>,
}

impl ScriptedEncoder {
    fn capture(&self, stream: &RenderedStream) {
        if let StreamData::Memory(bytes) = &stream.data {
            *self.captured.lock().unwrap() = Some((stream.format, bytes.clone()));
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn captured_frame(&self, index: u64) -> RgbaImage {
        let captured = self.captured.lock().unwrap();
        let (format, bytes) = captured.as_ref().expect("no stream captured");
        let size = format.frame_bytes();
        let start = index as usize * size;
        RgbaImage::from_raw(format.width, format.height, bytes[start..start + size].to_vec())
            .expect("frame bytes")
    }
}

#[async_trait]
impl EncodeService for ScriptedEncoder {
    async fn submit(&self, stream: &RenderedStream, original: &MediaInfo) -> KenburnsResult<Artifact> {
        let _guard = InFlight::enter(&self.in_flight);
        self.calls.lock().unwrap().push("submit");
        self.capture(stream);
        if let Some(token) = &self.cancel_on_submit {
            token.cancel();
            std::future::pending::<()>().await;
        }
        if self.fail_submit {
            return Err(KenburnsError::encode_service("mux endpoint returned 500"));
        }
        Ok(Artifact::new("exported.mp4", vec![0xAA; 16], original.has_audio))
    }

    async fn convert_visual_only(&self, stream: &RenderedStream) -> KenburnsResult<Artifact> {
        let _guard = InFlight::enter(&self.in_flight);
        self.calls.lock().unwrap().push("visual");
        self.capture(stream);
        if self.fail_fallback {
            return Err(KenburnsError::encode_service("convert endpoint unavailable"));
        }
        Ok(Artifact::new("exported.mp4", vec![0xBB; 8], false))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn recording() -> (ProgressCallback, Arc<Mutex<Vec<ExportProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let cb: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p));
    (cb, seen)
}

fn timeline() -> EffectTimeline {
    EffectTimeline::from_parts(
        vec![ZoomEffect::new("zoom", 0.5, 1.5, 80.0, 20.0, 2.0)],
        vec![TextOverlay::new("title", 0.0, 1.0, "Hello").with_background("#000000", 4.0, 2.0)],
    )
}

fn settings() -> ExportSettings {
    ExportSettings::default().with_seek_timeout(Duration::from_millis(40))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn export_renders_every_clock_sample_and_completes() {
    let mut pipeline = ExportPipeline::new(timeline(), settings());
    let mut source = TestSource::new(2.0);
    let mut sink = MemoryFrameSink::new();
    let encoder = ScriptedEncoder::default();
    let (cb, seen) = recording();

    let report = pipeline
        .run(&mut source, &mut sink, &encoder, &CancellationToken::new(), Some(cb))
        .await
        .unwrap();

    assert_eq!(pipeline.stage(), ExportStage::Complete);
    assert_eq!(report.frames_rendered, 60);
    assert_eq!((report.width, report.height), (WIDTH, HEIGHT));
    assert_eq!(report.lossy_frames, 0);
    assert!(!report.used_fallback);
    assert_eq!(encoder.calls(), vec!["submit"]);

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[1].progress >= w[0].progress));
    let last = seen.last().unwrap();
    assert_eq!(last.stage, ExportStage::Complete);
    assert_eq!(last.progress, 1.0);
    assert_eq!(last.total_frames, 60);
    assert!(seen
        .iter()
        .filter(|p| p.stage != ExportStage::Complete)
        .all(|p| p.progress < 1.0));
}

#[tokio::test]
async fn exported_frames_match_direct_render() {
    let interpolator = Interpolator::default();
    let mut pipeline = ExportPipeline::new(timeline(), settings().with_interpolator(interpolator));
    let mut source = TestSource::new(2.0);
    let encoder = ScriptedEncoder::default();

    pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    // Frame 30 is t = 1.0: inside the zoom effect with the overlay active.
    let t = 1.0;
    let timeline = timeline();
    let synthetic = SyntheticSource::new(WIDTH, HEIGHT, 2.0);
    let state = interpolator.export_state(t, timeline.effects());
    let expected = FrameRenderer::new(WIDTH, HEIGHT)
        .render(&synthetic.frame_at(t), &state, &timeline.active_overlays(t))
        .unwrap();

    assert_eq!(encoder.captured_frame(30), expected);
}

#[tokio::test]
async fn caption_glyphs_appear_only_inside_overlay_span() {
    let captions = EffectTimeline::from_parts(
        vec![],
        vec![TextOverlay::new("caption", 0.5, 1.0, "HELLO").at(50.0, 50.0)],
    );
    let mut pipeline = ExportPipeline::new(captions, settings());
    let encoder = ScriptedEncoder::default();

    pipeline
        .run(
            &mut TestSource::new(2.0),
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    let synthetic = SyntheticSource::new(WIDTH, HEIGHT, 2.0);
    let renderer = FrameRenderer::new(WIDTH, HEIGHT);
    let plain = |index: u64| {
        let t = index as f64 / 30.0;
        renderer
            .render(&synthetic.frame_at(t), &ZoomState::NEUTRAL, &[])
            .unwrap()
    };

    // 0.5s and 1.0s are frames 15 and 30; both ends are inclusive
    for index in [0, 14, 31, 45] {
        assert_eq!(encoder.captured_frame(index), plain(index), "frame {index}");
    }
    for index in [15, 22, 30] {
        assert_ne!(encoder.captured_frame(index), plain(index), "frame {index}");
    }
}

#[tokio::test]
async fn repeated_exports_are_byte_identical() {
    let mut streams = vec![];
    for _ in 0..2 {
        let mut pipeline = ExportPipeline::new(timeline(), settings());
        let encoder = ScriptedEncoder::default();
        pipeline
            .run(
                &mut TestSource::new(1.0),
                &mut MemoryFrameSink::new(),
                &encoder,
                &CancellationToken::new(),
                None,
            )
            .await
            .unwrap();
        let captured = encoder.captured.lock().unwrap().take().unwrap();
        streams.push(captured.1);
    }
    assert_eq!(streams[0], streams[1]);
}

#[tokio::test]
async fn requested_duration_is_capped_by_source() {
    let params = ExportParams::default().with_duration(1.0).with_size(33, 21);
    let mut pipeline = ExportPipeline::new(EffectTimeline::new(), settings().with_params(params));
    let report = pipeline
        .run(
            &mut TestSource::new(2.0),
            &mut MemoryFrameSink::new(),
            &ScriptedEncoder::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(report.frames_rendered, 30);
    assert_eq!((report.width, report.height), (32, 20));

    let mut pipeline = ExportPipeline::new(
        EffectTimeline::new(),
        settings().with_params(ExportParams::default().with_duration(10.0)),
    );
    let report = pipeline
        .run(
            &mut TestSource::new(0.5),
            &mut MemoryFrameSink::new(),
            &ScriptedEncoder::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(report.frames_rendered, 15);
}

#[tokio::test]
async fn mux_failure_falls_back_to_visual_only_once() {
    let mut pipeline = ExportPipeline::new(timeline(), settings());
    let encoder = ScriptedEncoder {
        fail_submit: true,
        ..Default::default()
    };

    let report = pipeline
        .run(
            &mut TestSource::new(0.5),
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert!(report.used_fallback);
    assert!(!report.artifact.has_audio);
    assert_eq!(encoder.calls(), vec!["submit", "visual"]);
    assert_eq!(pipeline.stage(), ExportStage::Complete);
}

#[tokio::test]
async fn failed_fallback_surfaces_encode_error() {
    let mut pipeline = ExportPipeline::new(timeline(), settings());
    let encoder = ScriptedEncoder {
        fail_submit: true,
        fail_fallback: true,
        ..Default::default()
    };
    let (cb, seen) = recording();

    let err = pipeline
        .run(
            &mut TestSource::new(0.5),
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            Some(cb),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KenburnsError::EncodeService { .. }));
    assert_eq!(err.phase(), Some(ExportPhase::Encoding));
    assert_eq!(encoder.calls(), vec!["submit", "visual"]);
    assert_eq!(pipeline.stage(), ExportStage::Failed);

    let last = seen.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.stage, ExportStage::Failed);
    assert_eq!(last.progress, 1.0);
}

#[tokio::test]
async fn cancel_mid_render_stops_at_frame_boundary() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let cb: ProgressCallback = Box::new(move |p| {
        if p.stage == ExportStage::Rendering && p.frames_rendered == 10 {
            trigger.cancel();
        }
    });

    let mut pipeline = ExportPipeline::new(timeline(), settings());
    let mut sink = MemoryFrameSink::new();
    let encoder = ScriptedEncoder::default();

    let err = pipeline
        .run(&mut TestSource::new(2.0), &mut sink, &encoder, &cancel, Some(cb))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        KenburnsError::Cancelled {
            phase: ExportPhase::Rendering
        }
    ));
    assert_eq!(pipeline.stage(), ExportStage::Cancelled);
    assert_eq!(sink.frames_received(), 10);
    assert!(encoder.calls().is_empty());
    assert_eq!(encoder.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancel_during_encode_aborts_call() {
    let cancel = CancellationToken::new();
    let encoder = ScriptedEncoder {
        cancel_on_submit: Some(cancel.clone()),
        ..Default::default()
    };
    let (cb, seen) = recording();
    let mut pipeline = ExportPipeline::new(timeline(), settings());

    let err = pipeline
        .run(
            &mut TestSource::new(0.5),
            &mut MemoryFrameSink::new(),
            &encoder,
            &cancel,
            Some(cb),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        KenburnsError::Cancelled {
            phase: ExportPhase::Encoding
        }
    ));
    assert_eq!(encoder.calls(), vec!["submit"]);
    assert_eq!(encoder.in_flight.load(Ordering::SeqCst), 0);

    let last = seen.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.stage, ExportStage::Cancelled);
    assert!(last.progress < 1.0);
}

#[tokio::test]
async fn cancelled_before_start_never_loads() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut source = TestSource::new(1.0);
    let mut pipeline = ExportPipeline::new(timeline(), settings());

    let err = pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &ScriptedEncoder::default(),
            &cancel,
            None,
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(source.seek_calls, 0);
    assert_eq!(pipeline.stage(), ExportStage::Cancelled);
}

#[tokio::test]
async fn seek_timeout_reuses_last_frame() {
    let mut source = TestSource::new(0.5);
    source.slow_seeks = vec![3, 4];
    let mut pipeline = ExportPipeline::new(EffectTimeline::new(), settings());
    let encoder = ScriptedEncoder::default();

    let report = pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.frames_rendered, 15);
    assert_eq!(report.lossy_frames, 2);
    // Frames 3 and 4 hold frame 2.
    assert_eq!(encoder.captured_frame(3), encoder.captured_frame(2));
    assert_eq!(encoder.captured_frame(4), encoder.captured_frame(2));
}

#[tokio::test]
async fn first_frame_seek_gets_load_budget() {
    let mut source = TestSource::new(0.5);
    source.slow_seeks = vec![0];
    let mut pipeline = ExportPipeline::new(timeline(), settings());
    let encoder = ScriptedEncoder::default();

    let report = pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.frames_rendered, 15);
    assert_eq!(report.lossy_frames, 0);
}

#[tokio::test]
async fn seek_timeout_without_any_frame_fails_at_that_frame() {
    let mut source = TestSource::new(0.5);
    source.slow_seeks = vec![0];
    let mut pipeline = ExportPipeline::new(
        timeline(),
        settings().with_load_timeout(Duration::from_millis(50)),
    );

    let err = pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &ScriptedEncoder::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.frame_index(), Some(0));
    assert_eq!(pipeline.stage(), ExportStage::Failed);
}

#[tokio::test]
async fn seek_error_reports_failing_frame() {
    let mut source = TestSource::new(0.5);
    source.failing_seek = Some(7);
    let mut pipeline = ExportPipeline::new(timeline(), settings());
    let encoder = ScriptedEncoder::default();

    let err = pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.frame_index(), Some(7));
    assert!(err.report().contains("rendering"));
    assert!(encoder.calls().is_empty());
}

#[tokio::test]
async fn load_timeout_is_media_load_error() {
    let mut source = TestSource::new(1.0);
    source.load_delay = Some(Duration::from_millis(500));
    let mut pipeline = ExportPipeline::new(
        timeline(),
        settings().with_load_timeout(Duration::from_millis(20)),
    );

    let err = pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &ScriptedEncoder::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KenburnsError::MediaLoad { .. }));
    assert_eq!(err.phase(), Some(ExportPhase::Preparing));
    assert_eq!(pipeline.stage(), ExportStage::Failed);
}

#[tokio::test]
async fn load_error_is_media_load_error() {
    let mut source = TestSource::new(1.0);
    source.load_error = true;
    let mut pipeline = ExportPipeline::new(timeline(), settings());

    let err = pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &ScriptedEncoder::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KenburnsError::MediaLoad { .. }));
}

#[tokio::test]
async fn zero_duration_source_is_invalid_input() {
    let mut pipeline = ExportPipeline::new(timeline(), settings());

    let err = pipeline
        .run(
            &mut TestSource::new(0.0),
            &mut MemoryFrameSink::new(),
            &ScriptedEncoder::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KenburnsError::InvalidInput { .. }));
    assert_eq!(pipeline.stage(), ExportStage::Failed);
}

#[tokio::test]
async fn pipeline_runs_only_once() {
    let mut pipeline = ExportPipeline::new(EffectTimeline::new(), settings());
    let encoder = ScriptedEncoder::default();
    pipeline
        .run(
            &mut TestSource::new(0.2),
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    let err = pipeline
        .run(
            &mut TestSource::new(0.2),
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KenburnsError::InvalidInput { .. }));
    assert_eq!(pipeline.stage(), ExportStage::Complete);
    assert_eq!(encoder.calls(), vec!["submit"]);
}

#[tokio::test]
async fn raw_file_stream_is_removed_after_export() {
    let mut sink = RawFileSink::new();
    let path = sink.path().to_path_buf();
    let mut pipeline = ExportPipeline::new(timeline(), settings());

    pipeline
        .run(
            &mut TestSource::new(0.3),
            &mut sink,
            &ScriptedEncoder::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert!(!path.exists());
}

// ---------------------------------------------------------------------------
// ffmpeg-backed source against stand-in tools
// ---------------------------------------------------------------------------

/// Stand-in ffprobe/ffmpeg scripts. The decoder script logs each start,
/// waits `startup_ms` like a cold decoder, then streams `frames` gray frames.
#[cfg(unix)]
struct FakeTools {
    dir: std::path::PathBuf,
    video: std::path::PathBuf,
    config: kenburns_common::config::EncoderConfig,
}

#[cfg(unix)]
impl FakeTools {
    const W: u32 = 16;
    const H: u32 = 8;

    fn new(name: &str, duration_secs: f64, frames: u32, startup_ms: u64) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("kenburns-tools-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let probe = dir.join("ffprobe");
        std::fs::write(
            &probe,
            format!(
                "#!/bin/sh\necho '{{\"streams\":[{{\"codec_type\":\"video\",\"width\":{},\"height\":{}}}],\"format\":{{\"duration\":\"{duration_secs}\"}}}}'\n",
                Self::W,
                Self::H
            ),
        )
        .unwrap();

        let decoder = dir.join("ffmpeg");
        let bytes = Self::W * Self::H * 4 * frames;
        std::fs::write(
            &decoder,
            format!(
                "#!/bin/sh\necho start >> '{}'\nsleep {}\nhead -c {bytes} /dev/zero | tr '\\000' '\\200'\n",
                dir.join("starts").display(),
                startup_ms as f64 / 1000.0
            ),
        )
        .unwrap();

        for tool in [&probe, &decoder] {
            std::fs::set_permissions(tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let video = dir.join("input.mp4");
        std::fs::write(&video, b"not really a video").unwrap();

        let config = kenburns_common::config::EncoderConfig {
            ffmpeg: decoder.to_string_lossy().into_owned(),
            ffprobe: probe.to_string_lossy().into_owned(),
            ..Default::default()
        };
        Self { dir, video, config }
    }

    fn source(&self) -> kenburns_render_engine::FfmpegMediaSource {
        kenburns_render_engine::FfmpegMediaSource::with_config(&self.video, &self.config)
            .with_decode_fps(30)
    }

    fn decoder_starts(&self) -> usize {
        std::fs::read_to_string(self.dir.join("starts"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }
}

#[cfg(unix)]
impl Drop for FakeTools {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[cfg(unix)]
#[tokio::test]
async fn slow_decoder_start_still_exports_every_frame() {
    use kenburns_common::config::AppConfig;

    let tools = FakeTools::new("slow-start", 1.0, 40, 150);
    let mut source = tools.source();
    let settings = ExportSettings::from_config(&AppConfig::default()).unwrap();
    assert_eq!(settings.seek_timeout, Duration::from_millis(100));
    let mut pipeline = ExportPipeline::new(EffectTimeline::new(), settings);
    let encoder = ScriptedEncoder::default();

    let report = pipeline
        .run(
            &mut source,
            &mut MemoryFrameSink::new(),
            &encoder,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.frames_rendered, 30);
    assert_eq!(report.lossy_frames, 0);
    assert_eq!((report.width, report.height), (FakeTools::W, FakeTools::H));
    assert_eq!(tools.decoder_starts(), 1);
    assert_eq!(encoder.captured_frame(29).get_pixel(3, 3)[0], 0x80);
}

#[cfg(unix)]
#[tokio::test]
async fn decoder_restarts_only_for_backward_seeks() {
    let tools = FakeTools::new("backward", 2.0, 60, 0);
    let mut source = tools.source();
    source.load().await.unwrap();
    assert!(source.current_frame().is_some());

    source.seek(0.0).await.unwrap();
    source.seek(0.5).await.unwrap();
    source.seek(0.9).await.unwrap();
    assert_eq!(tools.decoder_starts(), 1);

    source.seek(0.2).await.unwrap();
    assert_eq!(tools.decoder_starts(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn seeking_past_decoded_frames_holds_the_last_one() {
    let tools = FakeTools::new("short", 2.0, 3, 0);
    let mut source = tools.source();
    source.load().await.unwrap();

    let last = source.seek(1.5).await.unwrap();
    assert_eq!(last.dimensions(), (FakeTools::W, FakeTools::H));
    assert_eq!(source.current_frame(), Some(&last));
    assert_eq!(tools.decoder_starts(), 1);
}
