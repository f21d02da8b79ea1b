//! Text overlay rasterisation.
//!
//! Overlays are drawn centered on their anchor. An optional background box
//! (measured text size plus padding on each side, optionally rounded) goes
//! beneath the glyphs. Overlays without a box get a drop shadow instead so
//! text stays legible on busy footage.
//!
//! DejaVu Sans is compiled in as the default face. Overlays may name their
//! own font file in `fontFamily`; those faces are loaded once into the
//! renderer's cache before rendering starts.

use std::collections::HashMap;
use std::path::Path;

use image::{GrayImage, Luma, Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use kenburns_common::error::{KenburnsError, KenburnsResult};
use kenburns_project_model::color::Rgba8;
use kenburns_project_model::effect::TextOverlay;
use rusttype::{point, Font, Scale};

use crate::compositor::RenderError;

/// Default overlay face.
static DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Advance width per character, relative to font size, used when no face is
/// available.
const FALLBACK_ADVANCE_EM: f64 = 0.6;
/// Line height relative to font size, used when no face is available.
const FALLBACK_LINE_EM: f64 = 1.2;

/// Measured extent of a line of text in output pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
    /// Distance from the top of the line box to the baseline.
    pub ascent: f64,
}

/// Draws overlays onto a composited frame.
#[derive(Clone)]
pub struct TextRenderer {
    font: Option<Font<'static>>,
    faces: HashMap<String, Font<'static>>,
    shadow_offset_px: i32,
    shadow_opacity: f64,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<&str> = self.faces.keys().map(String::as_str).collect();
        families.sort_unstable();
        f.debug_struct("TextRenderer")
            .field("font_loaded", &self.font.is_some())
            .field("families", &families)
            .field("shadow_offset_px", &self.shadow_offset_px)
            .field("shadow_opacity", &self.shadow_opacity)
            .finish()
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            font: bundled_font(),
            faces: HashMap::new(),
            shadow_offset_px: 2,
            shadow_opacity: 0.8,
        }
    }
}

/// The compiled-in default face.
pub fn bundled_font() -> Option<Font<'static>> {
    Font::try_from_bytes(DEFAULT_FONT)
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default face.
    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_shadow(mut self, offset_px: i32, opacity: f64) -> Self {
        self.shadow_offset_px = offset_px;
        self.shadow_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Load a TrueType/OpenType font from disk.
    pub fn load_font(path: &Path) -> KenburnsResult<Font<'static>> {
        let bytes = std::fs::read(path)?;
        Font::try_from_vec(bytes).ok_or_else(|| {
            KenburnsError::config(format!("{} is not a usable font file", path.display()))
        })
    }

    /// Register a face under the name overlays use in `fontFamily`.
    pub fn register_face(&mut self, family: impl Into<String>, font: Font<'static>) {
        self.faces.insert(family.into(), font);
    }

    pub fn has_face(&self, family: &str) -> bool {
        self.faces.contains_key(family)
    }

    /// Load every font file named by `overlays` that is not cached yet.
    ///
    /// A family that cannot be loaded is skipped with a warning; overlays
    /// naming it render with the default face.
    pub fn load_families<'a>(&mut self, overlays: impl IntoIterator<Item = &'a TextOverlay>) {
        for overlay in overlays {
            let Some(family) = overlay.font_family.as_deref() else {
                continue;
            };
            if self.faces.contains_key(family) {
                continue;
            }
            match Self::load_font(Path::new(family)) {
                Ok(font) => {
                    tracing::debug!(family, overlay = %overlay.id, "Loaded overlay font");
                    self.faces.insert(family.to_string(), font);
                }
                Err(e) => {
                    tracing::warn!(
                        family,
                        overlay = %overlay.id,
                        error = %e,
                        "Overlay font unavailable; using default face"
                    );
                }
            }
        }
    }

    /// Face used for `overlay`.
    fn face_for(&self, overlay: &TextOverlay) -> Option<&Font<'static>> {
        overlay
            .font_family
            .as_deref()
            .and_then(|family| self.faces.get(family))
            .or(self.font.as_ref())
    }

    /// Size of `text` at `font_size` pixels in the default face.
    pub fn measure(&self, text: &str, font_size: f64) -> TextExtent {
        measure_with(self.font.as_ref(), text, font_size)
    }

    /// Size of an overlay's text in the face it renders with.
    pub fn measure_overlay(&self, overlay: &TextOverlay) -> TextExtent {
        measure_with(self.face_for(overlay), &overlay.text, overlay.font_size)
    }

    /// Draw one overlay centered at `(x% * W, y% * H)`.
    pub fn draw_overlay(&self, canvas: &mut RgbaImage, overlay: &TextOverlay) -> Result<(), RenderError> {
        let color: Rgba8 = overlay.color.parse()?;
        let background: Option<Rgba8> = overlay
            .background_color
            .as_deref()
            .map(str::parse)
            .transpose()?;

        let face = self.face_for(overlay);
        let cx = overlay.x / 100.0 * canvas.width() as f64;
        let cy = overlay.y / 100.0 * canvas.height() as f64;
        let extent = measure_with(face, &overlay.text, overlay.font_size);
        let padding = overlay.padding.max(0.0);

        if let Some(bg) = background {
            let box_w = extent.width + 2.0 * padding;
            let box_h = extent.height + 2.0 * padding;
            fill_rounded_rect(
                canvas,
                cx - box_w / 2.0,
                cy - box_h / 2.0,
                box_w,
                box_h,
                overlay.corner_radius,
                bg,
            );
        }

        let Some(font) = face else {
            return Ok(());
        };

        let left = cx - extent.width / 2.0;
        let baseline = cy - extent.height / 2.0 + extent.ascent;

        if background.is_none() && self.shadow_opacity > 0.0 {
            let offset = self.shadow_offset_px as f64;
            draw_glyphs(
                canvas,
                font,
                &overlay.text,
                overlay.font_size,
                left + offset,
                baseline + offset,
                Rgba8::BLACK.with_opacity(self.shadow_opacity),
            );
        }
        draw_glyphs(
            canvas,
            font,
            &overlay.text,
            overlay.font_size,
            left,
            baseline,
            color,
        );
        Ok(())
    }
}

fn measure_with(font: Option<&Font<'static>>, text: &str, font_size: f64) -> TextExtent {
    match font {
        Some(font) => {
            let scale = Scale::uniform(font_size as f32);
            let v = font.v_metrics(scale);
            let width = font
                .layout(text, scale, point(0.0, v.ascent))
                .last()
                .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                .unwrap_or(0.0);
            TextExtent {
                width: width.max(0.0) as f64,
                height: (v.ascent - v.descent) as f64,
                ascent: v.ascent as f64,
            }
        }
        None => TextExtent {
            width: text.chars().count() as f64 * font_size * FALLBACK_ADVANCE_EM,
            height: font_size * FALLBACK_LINE_EM,
            ascent: font_size,
        },
    }
}

fn draw_glyphs(
    canvas: &mut RgbaImage,
    font: &Font<'static>,
    text: &str,
    font_size: f64,
    left: f64,
    baseline: f64,
    color: Rgba8,
) {
    let scale = Scale::uniform(font_size as f32);
    for glyph in font.layout(text, scale, point(left as f32, baseline as f32)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = bb.min.x + gx as i32;
            let py = bb.min.y + gy as i32;
            blend_pixel(canvas, px, py, color, coverage as f64);
        });
    }
}

/// Source-over blend of `color`, its alpha scaled by `coverage` in `[0, 1]`.
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba8, coverage: f64) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let alpha = (color.a as f64 * coverage.clamp(0.0, 1.0)).round() as u8;
    if alpha == 0 {
        return;
    }
    canvas
        .get_pixel_mut(x as u32, y as u32)
        .blend(&Rgba([color.r, color.g, color.b, alpha]));
}

/// Fill an axis-aligned rectangle with optionally rounded corners.
///
/// The shape is drawn once into a coverage mask and then blended, so a
/// translucent color never compounds where the corner pieces overlap.
pub(crate) fn fill_rounded_rect(
    canvas: &mut RgbaImage,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    radius: f64,
    color: Rgba8,
) {
    let w = width.round();
    let h = height.round();
    if w < 1.0 || h < 1.0 {
        return;
    }
    let (w, h) = (w as u32, h as u32);
    let x0 = left.round() as i64;
    let y0 = top.round() as i64;
    let r = radius.clamp(0.0, (w.min(h) / 2) as f64).round() as u32;

    let on = Luma([255u8]);
    let mut mask = GrayImage::new(w, h);
    if r == 0 {
        draw_filled_rect_mut(&mut mask, Rect::at(0, 0).of_size(w, h), on);
    } else {
        if w > 2 * r {
            draw_filled_rect_mut(&mut mask, Rect::at(r as i32, 0).of_size(w - 2 * r, h), on);
        }
        if h > 2 * r {
            draw_filled_rect_mut(&mut mask, Rect::at(0, r as i32).of_size(w, h - 2 * r), on);
        }
        let (ri, right, bottom) = (r as i32, (w - 1 - r) as i32, (h - 1 - r) as i32);
        for center in [(ri, ri), (right, ri), (ri, bottom), (right, bottom)] {
            draw_filled_circle_mut(&mut mask, center, ri, on);
        }
    }

    let fill = Rgba([color.r, color.g, color.b, color.a]);
    for (mx, my, m) in mask.enumerate_pixels() {
        if m[0] == 0 {
            continue;
        }
        let (x, y) = (x0 + mx as i64, y0 + my as i64);
        if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
            continue;
        }
        canvas.get_pixel_mut(x as u32, y as u32).blend(&fill);
    }
}
