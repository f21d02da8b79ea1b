//! Kenburns Render Engine
//!
//! Deterministic export rendering: every frame-clock sample is seeked,
//! interpolated in export mode, composited and appended to a raw stream,
//! which the encode service muxes with the source audio.
//!
//! # Pipeline Architecture
//!
//! ```text
//! FrameClock ──▶ t_i
//!                 │
//! MediaSource ────┼── seek(t_i) ──▶ source frame
//!                 │                      │
//! timeline ───────┼── Interpolator ──▶ ZoomState
//!                 │                      │
//!                 └── active overlays ───┤
//!                                        ▼
//!                                  FrameRenderer
//!                                        │
//!                                        ▼
//!                               FrameSink (raw RGBA)
//!                                        │
//!                original audio ─────────┤
//!                                        ▼
//!                          EncodeService (H.264 + AAC)
//!                                        │
//!                                        ▼
//!                                 Artifact (bytes)
//! ```
//!
//! Source media, output stream and encoder are injected capabilities, so
//! the pipeline runs against synthetic sources and in-memory sinks in tests.

pub mod compositor;
pub mod encode;
pub mod export;
pub mod ffmpeg;
pub mod media;
pub mod sink;
pub mod text;

pub use compositor::{FrameRenderer, RenderError};
pub use encode::{sanitize_filename, Artifact, EncodeService, FfmpegEncodeService};
pub use export::*;
pub use ffmpeg::tool_available;
pub use media::{FfmpegMediaSource, MediaInfo, MediaSource, SyntheticSource};
pub use sink::{FrameSink, MemoryFrameSink, RawFileSink, RenderedStream, StreamData, StreamFormat};
pub use text::TextRenderer;
