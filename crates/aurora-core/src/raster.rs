//! Offscreen alpha raster that target silhouettes are painted into before sampling.

use ab_glyph::{point, Font, FontRef, Glyph, GlyphId, PxScale, ScaleFont};
use glam::Vec2;
use image::{GrayImage, Luma};

use crate::error::Result;

static TARGET_FONT: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

/// Bold face used for text targets.
pub fn target_font() -> Result<FontRef<'static>> {
    Ok(FontRef::try_from_slice(TARGET_FONT)?)
}

/// Single-channel coverage buffer; each pixel stores alpha in 0..=255.
#[derive(Debug, Clone)]
pub struct AlphaCanvas {
    image: GrayImage,
}

impl AlphaCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y)[0]
    }

    pub fn clear(&mut self) {
        for px in self.image.pixels_mut() {
            *px = Luma([0]);
        }
    }

    pub fn opaque_pixels(&self, threshold: u8) -> usize {
        self.image.pixels().filter(|p| p[0] > threshold).count()
    }

    /// Fill an axis-aligned rectangle, covering pixels whose centres fall inside it.
    pub fn fill_rect(&mut self, origin: Vec2, size: Vec2) {
        let x0 = pixel_start(origin.x);
        let y0 = pixel_start(origin.y);
        let x1 = pixel_end(origin.x + size.x, self.width());
        let y1 = pixel_end(origin.y + size.y, self.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.image.put_pixel(x, y, Luma([255]));
            }
        }
    }

    /// Fill a closed polygon with the nonzero winding rule, sampling at pixel centres.
    pub fn fill_polygon(&mut self, points: &[Vec2]) {
        if points.len() < 3 {
            return;
        }
        let mut crossings: Vec<(f32, i32)> = Vec::with_capacity(points.len());
        for y in 0..self.height() {
            let sy = y as f32 + 0.5;
            crossings.clear();
            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                if (a.y <= sy && b.y > sy) || (b.y <= sy && a.y > sy) {
                    let t = (sy - a.y) / (b.y - a.y);
                    let winding = if b.y > a.y { 1 } else { -1 };
                    crossings.push((a.x + t * (b.x - a.x), winding));
                }
            }
            crossings.sort_by(|l, r| l.0.total_cmp(&r.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if winding != 0 {
                    self.fill_span(y, pair[0].0, pair[1].0);
                }
            }
        }
    }

    /// Paint `text` with `font` at an em size of `px`, centred on `center`.
    ///
    /// The vertical anchor is the middle of the em box, and glyph coverage is
    /// kept as anti-aliased alpha.
    pub fn fill_text(&mut self, font: &FontRef<'_>, text: &str, center: Vec2, px: f32) {
        let units_per_em = font.units_per_em().unwrap_or_else(|| font.height_unscaled());
        let scaled = font.as_scaled(PxScale::from(px * font.height_unscaled() / units_per_em));

        let mut caret = 0.0;
        let mut previous: Option<GlyphId> = None;
        let mut glyphs: Vec<Glyph> = Vec::new();
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scaled.scale(), point(caret, 0.0)));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }

        let origin = Vec2::new(
            center.x - caret * 0.5,
            center.y + (scaled.ascent() + scaled.descent()) * 0.5,
        );
        for mut glyph in glyphs {
            glyph.position = point(glyph.position.x + origin.x, origin.y);
            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|x, y, coverage| {
                let cx = bounds.min.x as i64 + x as i64;
                let cy = bounds.min.y as i64 + y as i64;
                self.blend(cx, cy, coverage);
            });
        }
    }

    fn blend(&mut self, x: i64, y: i64, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        px[0] = px[0].max(value);
    }

    fn fill_span(&mut self, y: u32, from: f32, to: f32) {
        let x0 = pixel_start(from);
        let x1 = pixel_end(to, self.width());
        for x in x0..x1 {
            self.image.put_pixel(x, y, Luma([255]));
        }
    }
}

/// First pixel whose centre lies at or after `edge`.
fn pixel_start(edge: f32) -> u32 {
    (edge - 0.5).ceil().max(0.0) as u32
}

/// One past the last pixel whose centre lies before `edge`, clipped to `limit`.
fn pixel_end(edge: f32, limit: u32) -> u32 {
    ((edge - 0.5).ceil().max(0.0) as u32).min(limit)
}

/// Source of offscreen canvases; `None` means no context could be created.
pub trait RasterProvider {
    fn offscreen(&mut self, width: u32, height: u32) -> Option<AlphaCanvas>;
}

/// In-memory rasterizer that always succeeds for non-empty sizes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareRaster;

impl RasterProvider for SoftwareRaster {
    fn offscreen(&mut self, width: u32, height: u32) -> Option<AlphaCanvas> {
        (width > 0 && height > 0).then(|| AlphaCanvas::new(width, height))
    }
}
