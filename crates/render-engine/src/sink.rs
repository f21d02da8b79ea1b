//! Output streams for rendered frames.
//!
//! Sinks receive raw RGBA frames in strictly increasing index order and
//! produce a [`RenderedStream`] the encoder can consume. The stream carries
//! no audio.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::RgbaImage;
use kenburns_common::error::{KenburnsError, KenburnsResult};

use crate::ffmpeg::{remove_scratch, scratch_path};

/// Geometry and rate of a raw frame stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl StreamFormat {
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Where the rendered frames live.
#[derive(Debug)]
pub enum StreamData {
    Memory(Vec<u8>),
    /// Scratch file, removed when the stream is dropped.
    File(PathBuf),
}

/// A finished, visual-only raw RGBA stream.
#[derive(Debug)]
pub struct RenderedStream {
    pub format: StreamFormat,
    pub frame_count: u64,
    pub data: StreamData,
}

impl RenderedStream {
    pub fn duration_secs(&self) -> f64 {
        if self.format.fps == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.format.fps as f64
    }

    /// Raw bytes of frame `index`, for in-memory streams.
    pub fn frame_bytes(&self, index: u64) -> Option<&[u8]> {
        let StreamData::Memory(bytes) = &self.data else {
            return None;
        };
        let size = self.format.frame_bytes();
        let start = usize::try_from(index).ok()?.checked_mul(size)?;
        bytes.get(start..start + size)
    }

    /// Frame `index` as an image, for in-memory streams.
    pub fn frame(&self, index: u64) -> Option<RgbaImage> {
        let bytes = self.frame_bytes(index)?.to_vec();
        RgbaImage::from_raw(self.format.width, self.format.height, bytes)
    }
}

impl Drop for RenderedStream {
    fn drop(&mut self) {
        if let StreamData::File(path) = &self.data {
            remove_scratch(path);
        }
    }
}

/// Receives rendered frames.
pub trait FrameSink: Send {
    /// Called once before the first frame.
    fn begin(&mut self, format: StreamFormat) -> KenburnsResult<()>;

    /// Append frame `index`. Indices start at 0 and increase by one.
    fn append(&mut self, index: u64, frame: &RgbaImage) -> KenburnsResult<()>;

    /// Close the stream.
    fn finish(&mut self) -> KenburnsResult<RenderedStream>;
}

/// Ordering and size checks shared by the sinks.
#[derive(Debug, Default)]
struct FrameGate {
    format: Option<StreamFormat>,
    next_index: u64,
}

impl FrameGate {
    fn begin(&mut self, format: StreamFormat) -> KenburnsResult<()> {
        if self.format.is_some() {
            return Err(KenburnsError::invalid_input("frame sink already started"));
        }
        if format.width == 0 || format.height == 0 || format.fps == 0 {
            return Err(KenburnsError::invalid_input(format!(
                "invalid stream format {}x{} @ {} fps",
                format.width, format.height, format.fps
            )));
        }
        self.format = Some(format);
        Ok(())
    }

    fn admit(&mut self, index: u64, frame: &RgbaImage) -> KenburnsResult<StreamFormat> {
        let format = self
            .format
            .ok_or_else(|| KenburnsError::frame_render(index, "frame sink not started"))?;
        if index != self.next_index {
            return Err(KenburnsError::frame_render(
                index,
                format!("out-of-order frame, expected {}", self.next_index),
            ));
        }
        if frame.dimensions() != (format.width, format.height) {
            return Err(KenburnsError::frame_render(
                index,
                format!(
                    "frame is {}x{}, stream is {}x{}",
                    frame.width(),
                    frame.height(),
                    format.width,
                    format.height
                ),
            ));
        }
        self.next_index += 1;
        Ok(format)
    }

    fn finish(&mut self) -> KenburnsResult<(StreamFormat, u64)> {
        let format = self
            .format
            .take()
            .ok_or_else(|| KenburnsError::invalid_input("frame sink finished before start"))?;
        Ok((format, std::mem::take(&mut self.next_index)))
    }
}

/// Keeps the stream in memory.
#[derive(Debug, Default)]
pub struct MemoryFrameSink {
    gate: FrameGate,
    bytes: Vec<u8>,
}

impl MemoryFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_received(&self) -> u64 {
        self.gate.next_index
    }
}

impl FrameSink for MemoryFrameSink {
    fn begin(&mut self, format: StreamFormat) -> KenburnsResult<()> {
        self.gate.begin(format)
    }

    fn append(&mut self, index: u64, frame: &RgbaImage) -> KenburnsResult<()> {
        self.gate.admit(index, frame)?;
        self.bytes.extend_from_slice(frame.as_raw());
        Ok(())
    }

    fn finish(&mut self) -> KenburnsResult<RenderedStream> {
        let (format, frame_count) = self.gate.finish()?;
        Ok(RenderedStream {
            format,
            frame_count,
            data: StreamData::Memory(std::mem::take(&mut self.bytes)),
        })
    }
}

/// Streams frames to a scratch file so long exports stay out of memory.
#[derive(Debug)]
pub struct RawFileSink {
    gate: FrameGate,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl RawFileSink {
    /// Sink writing to a fresh scratch file in the temp directory.
    pub fn new() -> Self {
        Self::at(scratch_path("frames", "rgba"))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            gate: FrameGate::default(),
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for RawFileSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for RawFileSink {
    fn begin(&mut self, format: StreamFormat) -> KenburnsResult<()> {
        self.gate.begin(format)?;
        let file = File::create(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        tracing::debug!(path = %self.path.display(), "Raw frame stream opened");
        Ok(())
    }

    fn append(&mut self, index: u64, frame: &RgbaImage) -> KenburnsResult<()> {
        self.gate.admit(index, frame)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| KenburnsError::frame_render(index, "raw frame stream closed"))?;
        writer
            .write_all(frame.as_raw())
            .map_err(|e| KenburnsError::frame_render(index, format!("write failed: {e}")))
    }

    fn finish(&mut self) -> KenburnsResult<RenderedStream> {
        let (format, frame_count) = self.gate.finish()?;
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| KenburnsError::invalid_input("raw frame stream never opened"))?;
        writer.flush()?;
        drop(writer);
        Ok(RenderedStream {
            format,
            frame_count,
            data: StreamData::File(self.path.clone()),
        })
    }
}

impl Drop for RawFileSink {
    fn drop(&mut self) {
        // Unfinished stream: nobody else owns the scratch file.
        if self.writer.take().is_some() {
            remove_scratch(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn format() -> StreamFormat {
        StreamFormat {
            width: 4,
            height: 2,
            fps: 30,
        }
    }

    fn frame(value: u8) -> RgbaImage {
        RgbaImage::from_pixel(4, 2, Rgba([value, value, value, 255]))
    }

    #[test]
    fn test_memory_sink_collects_frames_in_order() {
        let mut sink = MemoryFrameSink::new();
        sink.begin(format()).unwrap();
        for i in 0..3 {
            sink.append(i, &frame(i as u8 * 10)).unwrap();
        }
        let stream = sink.finish().unwrap();
        assert_eq!(stream.frame_count, 3);
        assert!((stream.duration_secs() - 0.1).abs() < 1e-9);
        assert_eq!(stream.frame(2).unwrap(), frame(20));
        assert!(stream.frame(3).is_none());
    }

    #[test]
    fn test_out_of_order_frame_is_rejected() {
        let mut sink = MemoryFrameSink::new();
        sink.begin(format()).unwrap();
        sink.append(0, &frame(0)).unwrap();
        let err = sink.append(2, &frame(0)).unwrap_err();
        assert_eq!(err.frame_index(), Some(2));
    }

    #[test]
    fn test_size_mismatch_is_frame_render_error() {
        let mut sink = MemoryFrameSink::new();
        sink.begin(format()).unwrap();
        let err = sink.append(0, &RgbaImage::new(2, 2)).unwrap_err();
        assert!(matches!(err, KenburnsError::FrameRender { frame_index: 0, .. }));
    }

    #[test]
    fn test_raw_file_sink_writes_and_cleans_up() {
        let mut sink = RawFileSink::new();
        sink.begin(format()).unwrap();
        sink.append(0, &frame(1)).unwrap();
        sink.append(1, &frame(2)).unwrap();
        let stream = sink.finish().unwrap();

        let path = match &stream.data {
            StreamData::File(path) => path.clone(),
            StreamData::Memory(_) => panic!("expected file-backed stream"),
        };
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * 4 * 2 * 4);

        drop(stream);
        assert!(!path.exists());
    }

    #[test]
    fn test_abandoned_raw_file_sink_removes_scratch() {
        let mut sink = RawFileSink::new();
        sink.begin(format()).unwrap();
        sink.append(0, &frame(1)).unwrap();
        let path = sink.path().to_path_buf();
        assert!(path.exists());
        drop(sink);
        assert!(!path.exists());
    }
}
