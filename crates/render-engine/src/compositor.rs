//! Frame compositor: crops the zoomed source window and paints overlays.
//!
//! [`FrameRenderer::render`] is a pure function of (source frame, zoom
//! state, active overlays). Export reproducibility rests on that: the same
//! inputs always give a byte-identical raster.

use image::{Rgba, RgbaImage};
use kenburns_common::config::RenderConfig;
use kenburns_common::error::KenburnsResult;
use kenburns_project_model::color::ColorParseError;
use kenburns_project_model::effect::TextOverlay;
use kenburns_project_model::viewport::{SourceWindow, ZoomState};
use rusttype::Font;

use crate::text::TextRenderer;

/// Failure while compositing a single frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("source frame is empty")]
    EmptySource,

    #[error("invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error(transparent)]
    InvalidColor(#[from] ColorParseError),
}

/// Renders output frames at a fixed size.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    width: u32,
    height: u32,
    text: TextRenderer,
}

impl FrameRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text: TextRenderer::new(),
        }
    }

    /// Build a renderer from configuration. A configured font replaces the
    /// bundled default face.
    pub fn from_config(width: u32, height: u32, config: &RenderConfig) -> KenburnsResult<Self> {
        let mut text =
            TextRenderer::new().with_shadow(config.shadow_offset_px, config.shadow_opacity);
        match &config.font_path {
            Some(path) => {
                text = text.with_font(TextRenderer::load_font(path)?);
                tracing::debug!(font = %path.display(), "Loaded overlay font");
            }
            None if text.has_font() => {
                tracing::debug!("Using bundled overlay font");
            }
            None => {
                tracing::warn!("Bundled overlay font unusable; text overlays render background only");
            }
        }
        Ok(Self {
            width,
            height,
            text,
        })
    }

    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.text = self.text.with_font(font);
        self
    }

    pub fn with_shadow(mut self, offset_px: i32, opacity: f64) -> Self {
        self.text = self.text.with_shadow(offset_px, opacity);
        self
    }

    /// Same text settings, different output size.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text: self.text.clone(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn text(&self) -> &TextRenderer {
        &self.text
    }

    /// Cache the font files named by `overlays` so rendering never touches
    /// the filesystem.
    pub fn load_overlay_fonts<'a>(&mut self, overlays: impl IntoIterator<Item = &'a TextOverlay>) {
        self.text.load_families(overlays);
    }

    /// Composite one output frame.
    ///
    /// `overlays` are painted in the given order, so later entries cover
    /// earlier ones.
    pub fn render(
        &self,
        source: &RgbaImage,
        state: &ZoomState,
        overlays: &[&TextOverlay],
    ) -> Result<RgbaImage, RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        if source.width() == 0 || source.height() == 0 {
            return Err(RenderError::EmptySource);
        }

        let window = SourceWindow::for_state(state, source.width(), source.height());
        let mut frame = sample_window(source, &window, self.width, self.height);

        for overlay in overlays {
            self.text.draw_overlay(&mut frame, overlay)?;
        }
        Ok(frame)
    }
}

/// Resample `window` of `source` to `out_w` x `out_h` with bilinear
/// filtering. Sample positions are pixel centers, clamped to the source.
fn sample_window(source: &RgbaImage, window: &SourceWindow, out_w: u32, out_h: u32) -> RgbaImage {
    let step_x = window.w / out_w as f64;
    let step_y = window.h / out_h as f64;
    let max_x = (source.width() - 1) as f64;
    let max_y = (source.height() - 1) as f64;

    RgbaImage::from_fn(out_w, out_h, |ox, oy| {
        let u = (window.x + (ox as f64 + 0.5) * step_x - 0.5).clamp(0.0, max_x);
        let v = (window.y + (oy as f64 + 0.5) * step_y - 0.5).clamp(0.0, max_y);
        bilinear(source, u, v)
    })
}

fn bilinear(source: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
    let x0 = u.floor() as u32;
    let y0 = v.floor() as u32;
    let x1 = (x0 + 1).min(source.width() - 1);
    let y1 = (y0 + 1).min(source.height() - 1);
    let fx = u - x0 as f64;
    let fy = v - y0 as f64;

    let p00 = source.get_pixel(x0, y0);
    let p10 = source.get_pixel(x1, y0);
    let p01 = source.get_pixel(x0, y1);
    let p11 = source.get_pixel(x1, y1);

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        *slot = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}
