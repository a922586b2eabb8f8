//! Drawing surfaces.
//!
//! The renderer only talks to a [`Surface`]; [`PixmapSurface`] is the
//! tiny-skia implementation with text from a [`FontBook`].

use tiny_skia::{
    Color, FillRule, Mask, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::chain::ByteSink;
use crate::color::Rgb;
use crate::error::{RenderError, RenderResult};
use crate::fonts::{layout_glyphs, FontBook};
use crate::layout::{FontFace, PathSpec, TextExtents};
use crate::png::encode_png_auto;

/// Drawing and encoding capability used by the renderer.
pub trait Surface {
    /// Side length in pixels.
    fn size(&self) -> u32;

    fn fill_path(&mut self, path: &PathSpec, color: Rgb) -> RenderResult<()>;

    fn stroke_path(&mut self, path: &PathSpec, color: Rgb, width: f64) -> RenderResult<()>;

    fn measure_text(&self, face: &FontFace, size: f64, text: &str) -> TextExtents;

    /// Draw `text` with its baseline origin at `origin`.
    fn draw_text(
        &mut self,
        face: &FontFace,
        size: f64,
        text: &str,
        origin: (f64, f64),
        color: Rgb,
    ) -> RenderResult<()>;

    /// Encode the current image as PNG into `sink`. Returns bytes written.
    fn encode_png(&self, sink: &mut dyn ByteSink) -> RenderResult<u64>;
}

/// Square premultiplied RGBA raster backed by a tiny-skia [`Pixmap`].
pub struct PixmapSurface<'f> {
    pixmap: Pixmap,
    fonts: &'f FontBook,
}

impl std::fmt::Debug for PixmapSurface<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixmapSurface")
            .field("size", &self.pixmap.width())
            .field("fonts", self.fonts)
            .finish()
    }
}

fn solid_paint(color: Rgb) -> Paint<'static> {
    let (r, g, b) = color.to_u8();
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(r, g, b, 255));
    paint.anti_alias = true;
    paint
}

/// Build a tiny-skia path. `None` for degenerate geometry (zero or negative
/// radius, empty rectangle).
fn to_skia_path(path: &PathSpec) -> Option<Path> {
    match *path {
        PathSpec::Circle { cx, cy, radius } => {
            PathBuilder::from_circle(cx as f32, cy as f32, radius as f32)
        }
        PathSpec::Rect {
            x,
            y,
            width,
            height,
        } => Rect::from_xywh(x as f32, y as f32, width as f32, height as f32)
            .map(PathBuilder::from_rect),
    }
}

impl<'f> PixmapSurface<'f> {
    /// Allocate a transparent `size × size` surface.
    pub fn new(size: u32, fonts: &'f FontBook) -> RenderResult<Self> {
        let pixmap = Pixmap::new(size, size).ok_or(RenderError::SurfaceAllocation { size })?;
        Ok(Self { pixmap, fonts })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight (non-premultiplied) RGBA bytes, row-major.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        rgba
    }

    /// Rasterize glyph coverage for `text` into an alpha mask.
    fn text_mask(&self, face: &FontFace, size: f64, text: &str, origin: (f64, f64)) -> Option<Mask> {
        let font = self.fonts.select(face)?;
        let width = self.pixmap.width();
        let height = self.pixmap.height();
        let mut mask = Mask::new(width, height)?;
        let data = mask.data_mut();

        for glyph in layout_glyphs(font, size, text, origin.0, origin.1) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let x = bb.min.x + gx as i32;
                let y = bb.min.y + gy as i32;
                if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                    return;
                }
                let idx = y as usize * width as usize + x as usize;
                let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                data[idx] = data[idx].max(alpha);
            });
        }
        Some(mask)
    }
}

impl Surface for PixmapSurface<'_> {
    fn size(&self) -> u32 {
        self.pixmap.width()
    }

    fn fill_path(&mut self, path: &PathSpec, color: Rgb) -> RenderResult<()> {
        match to_skia_path(path) {
            Some(skia_path) => self.pixmap.fill_path(
                &skia_path,
                &solid_paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            ),
            None => tracing::debug!(?path, "skipping fill of degenerate path"),
        }
        Ok(())
    }

    fn stroke_path(&mut self, path: &PathSpec, color: Rgb, width: f64) -> RenderResult<()> {
        let Some(skia_path) = to_skia_path(path) else {
            tracing::debug!(?path, "skipping stroke of degenerate path");
            return Ok(());
        };
        let stroke = Stroke {
            width: width as f32,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &skia_path,
            &solid_paint(color),
            &stroke,
            Transform::identity(),
            None,
        );
        Ok(())
    }

    fn measure_text(&self, face: &FontFace, size: f64, text: &str) -> TextExtents {
        self.fonts.measure(face, size, text)
    }

    fn draw_text(
        &mut self,
        face: &FontFace,
        size: f64,
        text: &str,
        origin: (f64, f64),
        color: Rgb,
    ) -> RenderResult<()> {
        if self.fonts.is_empty() {
            tracing::warn!(family = %face.family, "no fonts registered, skipping text");
            return Ok(());
        }
        let Some(mask) = self.text_mask(face, size, text, origin) else {
            return Ok(());
        };
        let full = Rect::from_xywh(0.0, 0.0, self.pixmap.width() as f32, self.pixmap.height() as f32);
        if let Some(full) = full {
            self.pixmap
                .fill_rect(full, &solid_paint(color), Transform::identity(), Some(&mask));
        }
        Ok(())
    }

    fn encode_png(&self, sink: &mut dyn ByteSink) -> RenderResult<u64> {
        let size = self.pixmap.width() as usize;
        let stats = encode_png_auto(&self.to_rgba(), size, size, sink)?;
        tracing::debug!(
            mode = ?stats.mode,
            bytes = stats.bytes_written,
            chunks = stats.chunks,
            "encoded png"
        );
        Ok(stats.bytes_written)
    }
}
