//! Encode/mux service.
//!
//! The rendered stream carries no audio. [`EncodeService::submit`] muxes it
//! with the original source's audio track; [`EncodeService::convert_visual_only`]
//! is the fallback that produces a silent artifact.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use kenburns_common::config::EncoderConfig;
use kenburns_common::error::{KenburnsError, KenburnsResult};

use crate::ffmpeg::{check_encode, remove_scratch, run_tool, scratch_path};
use crate::media::MediaInfo;
use crate::sink::{RenderedStream, StreamData, StreamFormat};

/// Device names Windows refuses as file names.
const RESERVED_NAMES: &[&str] = &[
    "aux", "con", "prn", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Final encoded output, handed to the caller as bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub has_audio: bool,
}

impl Artifact {
    pub fn new(filename: &str, bytes: Vec<u8>, has_audio: bool) -> Self {
        Self {
            filename: sanitize_filename(filename),
            bytes,
            has_audio,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the artifact into `dir` under its filename.
    pub fn save_in(&self, dir: &Path) -> KenburnsResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Make an untrusted filename safe to use as a path component.
///
/// Directory parts are dropped, reserved device names get a `safe_` prefix
/// and anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (base, ext) = match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name.as_str(), ""),
    };

    let mut base = base.to_string();
    if RESERVED_NAMES.contains(&base.to_ascii_lowercase().as_str()) {
        base.insert_str(0, "safe_");
    }

    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };

    let sanitized = format!("{}{}", clean(&base), clean(ext));
    if sanitized.is_empty() {
        "exported".to_string()
    } else {
        sanitized
    }
}

/// External encoder contract.
#[async_trait]
pub trait EncodeService: Send + Sync {
    /// Mux the visual stream with the audio of `original`.
    async fn submit(&self, stream: &RenderedStream, original: &MediaInfo) -> KenburnsResult<Artifact>;

    /// Encode the visual stream alone.
    async fn convert_visual_only(&self, stream: &RenderedStream) -> KenburnsResult<Artifact>;

    /// Service name for logs.
    fn name(&self) -> &str;
}

/// Encoder backed by a local ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegEncodeService {
    config: EncoderConfig,
    artifact_filename: String,
}

impl FfmpegEncodeService {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            artifact_filename: "exported.mp4".to_string(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.artifact_filename = filename.into();
        self
    }

    pub fn is_available(&self) -> bool {
        crate::ffmpeg::tool_available(&self.config.ffmpeg)
    }

    fn raw_input_args(format: &StreamFormat, input: &Path) -> Vec<String> {
        vec![
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "-s".into(),
            format!("{}x{}", format.width, format.height),
            "-r".into(),
            format.fps.to_string(),
            "-i".into(),
            input.to_string_lossy().into_owned(),
        ]
    }

    fn video_codec_args(&self) -> Vec<String> {
        vec![
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            self.config.preset.clone(),
            "-crf".into(),
            self.config.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ]
    }

    /// Arguments muxing `input` (visual) with the audio of `original`.
    pub(crate) fn mux_args(
        &self,
        format: &StreamFormat,
        input: &Path,
        original: &Path,
        duration_secs: f64,
        output: &Path,
    ) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".into(), "error".into()];
        args.extend(Self::raw_input_args(format, input));
        args.extend(["-i".into(), original.to_string_lossy().into_owned()]);
        args.extend(self.video_codec_args());
        args.extend([
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            format!("{}k", self.config.audio_bitrate_kbps),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-shortest".into(),
            "-t".into(),
            format!("{duration_secs:.3}"),
            "-avoid_negative_ts".into(),
            "make_zero".into(),
            "-movflags".into(),
            "+faststart".into(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }

    /// Arguments encoding `input` with no audio track.
    pub(crate) fn visual_only_args(&self, format: &StreamFormat, input: &Path, output: &Path) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".into(), "error".into()];
        args.extend(Self::raw_input_args(format, input));
        args.extend(self.video_codec_args());
        args.extend([
            "-an".into(),
            "-movflags".into(),
            "+faststart".into(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }

    async fn encode(&self, args: Vec<String>, output: &Path, has_audio: bool) -> KenburnsResult<Artifact> {
        let timeout = Duration::from_secs(self.config.timeout_secs.max(1));
        let started = std::time::Instant::now();

        let result = tokio::time::timeout(timeout, run_tool(&self.config.ffmpeg, &args)).await;
        let outcome = match result {
            Ok(output) => check_encode(&self.config.ffmpeg, output),
            Err(_) => Err(KenburnsError::encode_service(format!(
                "encode timed out after {}s",
                timeout.as_secs()
            ))),
        };
        if let Err(err) = outcome {
            remove_scratch(output);
            return Err(err);
        }

        let bytes = tokio::fs::read(output).await.map_err(|e| {
            KenburnsError::encode_service(format!("encoded output unreadable: {e}"))
        })?;
        remove_scratch(output);

        tracing::info!(
            bytes = bytes.len(),
            has_audio,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Encode finished"
        );
        Ok(Artifact::new(&self.artifact_filename, bytes, has_audio))
    }
}

/// A scratch copy of an in-memory stream, removed on drop.
struct ScratchInput(PathBuf);

impl Drop for ScratchInput {
    fn drop(&mut self) {
        remove_scratch(&self.0);
    }
}

/// Path ffmpeg can read the stream from, plus the scratch copy if one was
/// needed.
async fn stream_input(stream: &RenderedStream) -> KenburnsResult<(PathBuf, Option<ScratchInput>)> {
    match &stream.data {
        StreamData::File(path) => Ok((path.clone(), None)),
        StreamData::Memory(bytes) => {
            let path = scratch_path("stream", "rgba");
            tokio::fs::write(&path, bytes).await.map_err(|e| {
                KenburnsError::encode_service(format!("failed to stage stream: {e}"))
            })?;
            Ok((path.clone(), Some(ScratchInput(path))))
        }
    }
}

/// Length of the muxed output: the rendered stream, never past the end of
/// the source. The frame clock rounds up to whole frames, so a full-length
/// stream can overshoot the source by up to one frame.
fn mux_duration(stream_secs: f64, source_secs: f64) -> f64 {
    if source_secs.is_finite() && source_secs > 0.0 {
        stream_secs.min(source_secs)
    } else {
        stream_secs
    }
}

#[async_trait]
impl EncodeService for FfmpegEncodeService {
    async fn submit(&self, stream: &RenderedStream, original: &MediaInfo) -> KenburnsResult<Artifact> {
        let original_path = match (&original.path, original.has_audio) {
            (Some(path), true) => path.clone(),
            _ => {
                tracing::info!("Source has no audio track; encoding visual stream only");
                return self.convert_visual_only(stream).await;
            }
        };

        let (input, _scratch) = stream_input(stream).await?;
        let output = scratch_path("mux", "mp4");
        let args = self.mux_args(
            &stream.format,
            &input,
            &original_path,
            mux_duration(stream.duration_secs(), original.duration_secs),
            &output,
        );
        tracing::info!(frames = stream.frame_count, "Muxing rendered stream with source audio");
        self.encode(args, &output, true).await
    }

    async fn convert_visual_only(&self, stream: &RenderedStream) -> KenburnsResult<Artifact> {
        let (input, _scratch) = stream_input(stream).await?;
        let output = scratch_path("visual", "mp4");
        let args = self.visual_only_args(&stream.format, &input, &output);
        tracing::info!(frames = stream.frame_count, "Encoding visual-only stream");
        self.encode(args, &output, false).await
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
