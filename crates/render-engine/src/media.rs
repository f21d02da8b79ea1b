//! Seekable source media.
//!
//! Seeking is stateful: a [`MediaSource`] is owned by exactly one export (or
//! one preview) at a time.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use kenburns_common::config::EncoderConfig;
use kenburns_common::error::{KenburnsError, KenburnsResult};
use kenburns_project_model::project::DEFAULT_EXPORT_FPS;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;

use crate::ffmpeg::{drain_stderr, run_tool, spawn_tool, stderr_tail};

/// Facts about loaded source media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub has_audio: bool,
    /// Backing file, when the source is file based. The encoder reads the
    /// audio track from it.
    pub path: Option<PathBuf>,
}

/// A seekable source of video frames.
#[async_trait]
pub trait MediaSource: Send {
    /// Open the media and report its properties.
    async fn load(&mut self) -> KenburnsResult<MediaInfo>;

    /// Decode the frame displayed at `time_secs`.
    async fn seek(&mut self, time_secs: f64) -> KenburnsResult<RgbaImage>;

    /// The most recently decoded frame, if any.
    fn current_frame(&self) -> Option<&RgbaImage>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Seeks further ahead than this restart the decoder at the target instead
/// of reading through the frames in between.
const RESTART_AHEAD_SECS: f64 = 5.0;

/// File-backed source decoded by one long-running ffmpeg process.
///
/// Export seeks move forward one frame at a time, so the decoder streams raw
/// RGBA frames at a fixed rate and each seek reads ahead to the frame shown
/// at the requested time. A backward seek, or a jump past
/// [`RESTART_AHEAD_SECS`], restarts the decoder at the target. `load` decodes
/// the first frame, so process start-up is paid inside the load budget.
#[derive(Debug)]
pub struct FfmpegMediaSource {
    path: PathBuf,
    ffmpeg: String,
    ffprobe: String,
    decode_fps: u32,
    info: Option<MediaInfo>,
    decoder: Option<FrameDecoder>,
    current: Option<RgbaImage>,
    /// Decoder frame index held in `current`.
    shown: Option<u64>,
}

impl FfmpegMediaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, &EncoderConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, config: &EncoderConfig) -> Self {
        Self {
            path: path.into(),
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
            decode_fps: DEFAULT_EXPORT_FPS,
            info: None,
            decoder: None,
            current: None,
            shown: None,
        }
    }

    /// Rate the decoder emits frames at. Matching the export frame rate makes
    /// every export seek a single frame read.
    pub fn with_decode_fps(mut self, fps: u32) -> Self {
        self.decode_fps = fps.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn probe_args(&self) -> Vec<String> {
        vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "stream=codec_type,width,height:format=duration".into(),
            "-of".into(),
            "json".into(),
            self.path.to_string_lossy().into_owned(),
        ]
    }

    fn decode_args(&self, start_secs: f64, width: u32, height: u32) -> Vec<String> {
        vec![
            "-v".into(),
            "error".into(),
            "-ss".into(),
            format!("{start_secs:.6}"),
            "-i".into(),
            self.path.to_string_lossy().into_owned(),
            "-an".into(),
            "-vf".into(),
            format!("fps={},scale={width}:{height}", self.decode_fps),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "-".into(),
        ]
    }

    fn dimensions(&self) -> KenburnsResult<(u32, u32)> {
        self.info
            .as_ref()
            .map(|info| (info.width, info.height))
            .ok_or_else(|| KenburnsError::media_load("seek before load"))
    }

    /// Replace the decoder with one starting at `start_secs`.
    fn restart(&mut self, start_secs: f64, width: u32, height: u32) -> KenburnsResult<()> {
        let start_secs = start_secs.max(0.0);
        self.decoder = None;
        self.shown = None;
        let args = self.decode_args(start_secs, width, height);
        let decoder = FrameDecoder::spawn(
            &self.ffmpeg,
            &args,
            start_secs,
            self.decode_fps as f64,
            width as usize * height as usize * 4,
        )?;
        self.decoder = Some(decoder);
        Ok(())
    }

    /// Decoder frame index to read up to for `time_secs`, or `None` when the
    /// running decoder cannot reach it going forward.
    fn reachable_index(&self, time_secs: f64) -> Option<u64> {
        let decoder = self.decoder.as_ref()?;
        let index = decoder.index_for(time_secs)?;
        if self.shown == Some(index) {
            return Some(index);
        }
        let ahead = index.checked_sub(decoder.next_index)?;
        (ahead as f64 <= RESTART_AHEAD_SECS * decoder.fps).then_some(index)
    }
}

#[async_trait]
impl MediaSource for FfmpegMediaSource {
    async fn load(&mut self) -> KenburnsResult<MediaInfo> {
        if !self.path.is_file() {
            return Err(KenburnsError::media_load(format!(
                "source {} does not exist",
                self.path.display()
            )));
        }

        let output = run_tool(&self.ffprobe, &self.probe_args())
            .await
            .map_err(|e| KenburnsError::media_load(format!("failed to start {}: {e}", self.ffprobe)))?;
        if !output.status.success() {
            return Err(KenburnsError::media_load(format!(
                "{} could not read {}: {}",
                self.ffprobe,
                self.path.display(),
                stderr_tail(&output)
            )));
        }

        let mut info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        info.path = Some(self.path.clone());
        self.info = Some(info.clone());

        if info.duration_secs > 0.0 {
            self.restart(0.0, info.width, info.height)?;
            self.seek(0.0).await?;
        }

        tracing::info!(
            source = %self.path.display(),
            width = info.width,
            height = info.height,
            duration_secs = info.duration_secs,
            has_audio = info.has_audio,
            decode_fps = self.decode_fps,
            "Source media loaded"
        );
        Ok(info)
    }

    async fn seek(&mut self, time_secs: f64) -> KenburnsResult<RgbaImage> {
        let (width, height) = self.dimensions()?;

        let target = match self.reachable_index(time_secs) {
            Some(index) if self.shown == Some(index) => {
                if let Some(frame) = &self.current {
                    return Ok(frame.clone());
                }
                index
            }
            Some(index) => index,
            None => {
                tracing::debug!(time_secs, "Restarting decoder");
                self.restart(time_secs, width, height)?;
                0
            }
        };

        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| KenburnsError::media_load("decoder not running"))?;

        loop {
            let advanced = decoder
                .advance()
                .await
                .map_err(|e| KenburnsError::media_load(format!("decoder read failed: {e}")))?;

            if !advanced {
                // Past the last decodable frame: hold it.
                let last = decoder.next_index.checked_sub(1);
                if decoder.filled == 0 && last.is_some() && last != self.shown {
                    if let Some(frame) = RgbaImage::from_raw(width, height, decoder.buf.clone()) {
                        self.current = Some(frame);
                        self.shown = last;
                    }
                }
                if let Some(frame) = &self.current {
                    tracing::debug!(time_secs, "Decoder finished; holding previous frame");
                    return Ok(frame.clone());
                }
                let reason = decoder.failure().await;
                return Err(KenburnsError::media_load(format!(
                    "no frame decoded at {time_secs:.3}s: {reason}"
                )));
            }

            if decoder.next_index > target {
                let frame = RgbaImage::from_raw(width, height, decoder.buf.clone())
                    .ok_or_else(|| KenburnsError::media_load("decoded frame has wrong size"))?;
                self.current = Some(frame.clone());
                self.shown = Some(target);
                return Ok(frame);
            }
        }
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        self.current.as_ref()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A running ffmpeg process writing fixed-size RGBA frames to stdout.
#[derive(Debug)]
struct FrameDecoder {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    start_secs: f64,
    fps: f64,
    /// Index of the frame the next complete read yields.
    next_index: u64,
    buf: Vec<u8>,
    filled: usize,
    finished: bool,
}

impl FrameDecoder {
    fn spawn(
        ffmpeg: &str,
        args: &[String],
        start_secs: f64,
        fps: f64,
        frame_bytes: usize,
    ) -> KenburnsResult<Self> {
        let mut child = spawn_tool(ffmpeg, args)
            .map_err(|e| KenburnsError::media_load(format!("failed to start {ffmpeg}: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| KenburnsError::media_load("failed to capture decoder stdout"))?;
        let stderr = drain_stderr(&mut child);
        tracing::debug!(pid = child.id(), start_secs, fps, "Decoder started");

        Ok(Self {
            child,
            stdout,
            stderr,
            start_secs,
            fps,
            next_index: 0,
            buf: vec![0; frame_bytes],
            filled: 0,
            finished: false,
        })
    }

    /// Index of the frame shown at `time_secs`, or `None` before the start.
    fn index_for(&self, time_secs: f64) -> Option<u64> {
        let offset = time_secs - self.start_secs;
        if offset < -1e-9 {
            return None;
        }
        Some((offset * self.fps + 1e-6).floor().max(0.0) as u64)
    }

    /// Read the next whole frame into `buf`; `false` once the stream ends.
    ///
    /// Cancel safe: bytes of a partially read frame are kept, so a seek that
    /// times out resumes where it stopped.
    async fn advance(&mut self) -> std::io::Result<bool> {
        if self.finished {
            return Ok(false);
        }
        while self.filled < self.buf.len() {
            let n = self.stdout.read(&mut self.buf[self.filled..]).await?;
            if n == 0 {
                self.finished = true;
                return Ok(false);
            }
            self.filled += n;
        }
        self.filled = 0;
        self.next_index += 1;
        Ok(true)
    }

    /// Why the stream ended without a frame.
    async fn failure(&mut self) -> String {
        let status = self.child.wait().await;
        let tail = match self.stderr.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        match status {
            Ok(status) if !status.success() => format!("decoder exited with {status}: {tail}"),
            Ok(_) => "decoder produced no frames".to_string(),
            Err(e) => format!("decoder did not exit cleanly: {e}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into [`MediaInfo`].
pub fn parse_probe_output(json: &str) -> KenburnsResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| KenburnsError::media_load(format!("unreadable probe output: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| KenburnsError::media_load("source has no video stream"))?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(KenburnsError::media_load("video stream has no dimensions")),
    };

    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .ok_or_else(|| KenburnsError::media_load("source duration is unknown"))?;

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        width,
        height,
        duration_secs,
        has_audio,
        path: None,
    })
}

/// Deterministic test-pattern source.
///
/// Draws a grid, colored corner markers and a marker that sweeps left to
/// right over the duration, so zoom framing and timing are visible.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    duration_secs: f64,
    has_audio: bool,
    current: Option<RgbaImage>,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, duration_secs: f64) -> Self {
        Self {
            width,
            height,
            duration_secs,
            has_audio: false,
            current: None,
        }
    }

    /// Report an audio track (there is no backing file to mux from).
    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    /// The frame shown at `time_secs`.
    pub fn frame_at(&self, time_secs: f64) -> RgbaImage {
        let (w, h) = (self.width, self.height);
        let mut img = RgbaImage::from_pixel(w, h, Rgba([24, 28, 36, 255]));
        let grid = Rgba([70, 78, 92, 255]);

        for i in 1..10 {
            let x = (w as f32) * i as f32 / 10.0;
            let y = (h as f32) * i as f32 / 10.0;
            draw_line_segment_mut(&mut img, (x, 0.0), (x, h as f32), grid);
            draw_line_segment_mut(&mut img, (0.0, y), (w as f32, y), grid);
        }

        let radius = (w.min(h) / 16).max(1) as i32;
        let (right, bottom) = (w as i32 - 1 - radius, h as i32 - 1 - radius);
        draw_filled_circle_mut(&mut img, (radius, radius), radius, Rgba([220, 60, 60, 255]));
        draw_filled_circle_mut(&mut img, (right, radius), radius, Rgba([60, 200, 90, 255]));
        draw_filled_circle_mut(&mut img, (radius, bottom), radius, Rgba([70, 110, 230, 255]));
        draw_filled_circle_mut(&mut img, (right, bottom), radius, Rgba([240, 240, 240, 255]));

        let progress = if self.duration_secs > 0.0 {
            (time_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let size = (w.min(h) / 10).max(1);
        let travel = w.saturating_sub(size) as f64;
        let x = (progress * travel).round() as i32;
        let y = (h / 2).saturating_sub(size / 2) as i32;
        draw_filled_rect_mut(
            &mut img,
            Rect::at(x, y).of_size(size, size),
            Rgba([250, 200, 40, 255]),
        );

        img
    }
}

#[async_trait]
impl MediaSource for SyntheticSource {
    async fn load(&mut self) -> KenburnsResult<MediaInfo> {
        if self.width == 0 || self.height == 0 {
            return Err(KenburnsError::media_load("synthetic source has zero size"));
        }
        Ok(MediaInfo {
            width: self.width,
            height: self.height,
            duration_secs: self.duration_secs,
            has_audio: self.has_audio,
            path: None,
        })
    }

    async fn seek(&mut self, time_secs: f64) -> KenburnsResult<RgbaImage> {
        let frame = self.frame_at(time_secs);
        self.current = Some(frame.clone());
        Ok(frame)
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        self.current.as_ref()
    }

    fn describe(&self) -> String {
        format!(
            "synthetic {}x{} {:.2}s",
            self.width, self.height, self.duration_secs
        )
    }
}
