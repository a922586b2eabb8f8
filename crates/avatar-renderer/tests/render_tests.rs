//! End-to-end rendering tests.
//!
//! Covers the full pipeline (pixmap surface, PNG stream, output chain) and
//! the renderer's decisions against a recording surface.

use avatar_renderer::error::{RenderError, RenderResult, WriteFailure};
use avatar_renderer::layout::{FontFace, PathSpec, TextExtents};
use avatar_renderer::png::IDAT_CHUNK_SIZE;
use avatar_renderer::{
    parse_color, render_avatar, render_to_sink, Background, BoundedAllocator, ByteSink, FontBook,
    HeapAllocator, Label, RandomSource, Rgb, RngSource, Shape, StyleConfig, StyleSettings, Surface,
};

// ============================================================================
// Helpers
// ============================================================================

/// Returns the same draw forever.
struct FixedDraws(f64);

impl RandomSource for FixedDraws {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

/// Surface that records calls and measures text as `per_char * size` per
/// character.
#[derive(Default)]
struct RecordingSurface {
    size: u32,
    per_char: f64,
    fills: Vec<(PathSpec, Rgb)>,
    strokes: Vec<(PathSpec, Rgb, f64)>,
    text: Option<(String, f64, (f64, f64), Rgb)>,
}

impl RecordingSurface {
    fn new(size: u32, per_char: f64) -> Self {
        Self {
            size,
            per_char,
            ..Default::default()
        }
    }

    fn extents(&self, size: f64, text: &str) -> TextExtents {
        TextExtents {
            width: size * self.per_char * text.chars().count() as f64,
            height: size * 0.7,
            x_bearing: 0.0,
            y_bearing: -size * 0.7,
        }
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> u32 {
        self.size
    }

    fn fill_path(&mut self, path: &PathSpec, color: Rgb) -> RenderResult<()> {
        self.fills.push((*path, color));
        Ok(())
    }

    fn stroke_path(&mut self, path: &PathSpec, color: Rgb, width: f64) -> RenderResult<()> {
        self.strokes.push((*path, color, width));
        Ok(())
    }

    fn measure_text(&self, _face: &FontFace, size: f64, text: &str) -> TextExtents {
        self.extents(size, text)
    }

    fn draw_text(
        &mut self,
        _face: &FontFace,
        size: f64,
        text: &str,
        origin: (f64, f64),
        color: Rgb,
    ) -> RenderResult<()> {
        self.text = Some((text.to_string(), size, origin, color));
        Ok(())
    }

    fn encode_png(&self, sink: &mut dyn ByteSink) -> RenderResult<u64> {
        for chunk in [&b"head"[..], &b""[..], &b"tail!"[..]] {
            sink.ingest(chunk)?;
        }
        Ok(9)
    }
}

fn decode(png: &[u8]) -> image::RgbaImage {
    image::load_from_memory(png)
        .expect("renderer output should be a valid PNG")
        .to_rgba8()
}

fn label(text: &str) -> Label {
    Label::parse(text).unwrap()
}

// ============================================================================
// Full pipeline
// ============================================================================

#[test]
fn test_default_circle_avatar() {
    let style = StyleSettings {
        bg_color: Some(parse_color("428DF5").unwrap()),
        ..Default::default()
    }
    .resolve()
    .unwrap();
    let fonts = FontBook::new();

    let (chain, outcome) = render_avatar(
        &label("AB"),
        &style,
        &fonts,
        &mut FixedDraws(0.5),
        HeapAllocator,
    )
    .unwrap();

    assert_eq!(outcome.bytes_written, chain.total_length());
    assert_eq!(outcome.text_color, Rgb::WHITE);
    assert_eq!(outcome.font_fit.iterations, 0);
    assert_eq!(outcome.font_fit.size, 50.0);

    let img = decode(&chain.to_vec());
    assert_eq!(img.dimensions(), (100, 100));

    // Fill at the center, transparent outside the circle
    assert_eq!(img.get_pixel(50, 50).0, [0x42, 0x8D, 0xF5, 255]);
    assert_eq!(img.get_pixel(0, 0).0[3], 0);
    assert_eq!(img.get_pixel(99, 99).0[3], 0);

    // Contour straddles the circle edge at the top
    let contour = img.get_pixel(50, 1).0;
    assert_eq!(contour[3], 255);
    assert!(contour[2] < 100, "expected gray contour, got {contour:?}");
}

#[test]
fn test_square_without_contour_fills_every_pixel() {
    let style = StyleSettings {
        size: Some(32),
        square: Some(true),
        show_contour: Some(false),
        bg_color: Some(parse_color("FF8000").unwrap()),
        ..Default::default()
    }
    .resolve()
    .unwrap();
    let fonts = FontBook::new();

    let (chain, _) = render_avatar(
        &label("Q"),
        &style,
        &fonts,
        &mut FixedDraws(0.0),
        HeapAllocator,
    )
    .unwrap();

    let img = decode(&chain.to_vec());
    assert_eq!(img.dimensions(), (32, 32));
    assert!(img.pixels().all(|p| p.0 == [0xFF, 0x80, 0x00, 255]));
}

#[test]
fn test_chain_segments_follow_png_chunks() {
    let style = StyleSettings {
        size: Some(512),
        random_bg_color: Some(true),
        ..Default::default()
    }
    .resolve()
    .unwrap();
    let fonts = FontBook::new();

    let (chain, outcome) = render_avatar(
        &label("XY"),
        &style,
        &fonts,
        &mut RngSource::seeded(7),
        HeapAllocator,
    )
    .unwrap();

    let segments: Vec<_> = chain.iter().collect();
    assert!(segments.len() >= 4);
    assert_eq!(segments.iter().filter(|s| s.is_last()).count(), 1);
    assert!(segments.last().unwrap().is_last());

    let sum: u64 = segments.iter().map(|s| s.len() as u64).sum();
    assert_eq!(sum, chain.total_length());
    assert_eq!(sum, outcome.bytes_written);

    // Chunk framing adds 12 bytes around each payload
    assert!(segments.iter().all(|s| s.len() <= IDAT_CHUNK_SIZE + 12));
    assert_eq!(&segments[0].bytes()[..], &[137, 80, 78, 71, 13, 10, 26, 10]);

    assert_eq!(decode(&chain.to_vec()).dimensions(), (512, 512));
}

#[test]
fn test_budget_exhaustion_aborts_render() {
    let style = StyleConfig::default();
    let fonts = FontBook::new();

    let err = render_avatar(
        &label("AB"),
        &style,
        &fonts,
        &mut FixedDraws(0.5),
        BoundedAllocator::new(64),
    )
    .unwrap_err();

    assert!(err.is_write_failure());
    assert!(matches!(
        err,
        RenderError::Write(WriteFailure::BudgetExceeded { .. })
    ));
}

/// Bounding box `(min_x, min_y, max_x, max_y)` of pixels whose red channel
/// is above zero.
fn lit_box(img: &image::RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in img.enumerate_pixels() {
        if p.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds
}

#[test]
fn test_label_ink_is_centered() {
    let fonts = FontBook::builtin().unwrap();
    let style = StyleSettings {
        bg_color: Some(parse_color("000000").unwrap()),
        font_color: Some(parse_color("FFFFFF").unwrap()),
        show_contour: Some(false),
        square: Some(true),
        ..Default::default()
    }
    .resolve()
    .unwrap();

    let (chain, outcome) = render_avatar(
        &label("AB"),
        &style,
        &fonts,
        &mut FixedDraws(0.5),
        HeapAllocator,
    )
    .unwrap();

    assert!(outcome.font_fit.extents.width > 0.0);
    assert!(outcome.font_fit.extents.width <= 90.0);

    let img = decode(&chain.to_vec());
    let (x0, y0, x1, y1) = lit_box(&img).expect("label should be drawn");
    let center_x = (x0 + x1 + 1) as f64 / 2.0;
    let center_y = (y0 + y1 + 1) as f64 / 2.0;
    assert!((center_x - 50.0).abs() <= 1.5, "ink center x {center_x}");
    assert!((center_y - 50.0).abs() <= 1.5, "ink center y {center_y}");

    let ink_width = (x1 - x0 + 1) as f64;
    assert!((ink_width - outcome.font_fit.extents.width).abs() <= 2.0);
}

#[test]
fn test_bold_label_draws_more_ink() {
    let fonts = FontBook::builtin().unwrap();
    let lit_pixels = |bold: bool| {
        let style = StyleSettings {
            bg_color: Some(Rgb::BLACK),
            font_color: Some(Rgb::WHITE),
            show_contour: Some(false),
            square: Some(true),
            font_bold: Some(bold),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        let (chain, _) = render_avatar(
            &label("AB"),
            &style,
            &fonts,
            &mut FixedDraws(0.5),
            HeapAllocator,
        )
        .unwrap();
        decode(&chain.to_vec())
            .pixels()
            .filter(|p| p.0[0] > 128)
            .count()
    };

    assert!(lit_pixels(true) > lit_pixels(false));
}

#[test]
fn test_long_label_shrinks_with_real_glyphs() {
    let fonts = FontBook::builtin().unwrap();
    let style = StyleConfig::default();

    let (_, outcome) = render_avatar(
        &label("WWWWWWWW"),
        &style,
        &fonts,
        &mut FixedDraws(0.5),
        HeapAllocator,
    )
    .unwrap();

    assert!(outcome.font_fit.iterations > 0);
    assert!(outcome.font_fit.size >= 8.0);
    assert!(outcome.font_fit.fits(90.0) || outcome.font_fit.size == 8.0);
}

// ============================================================================
// Renderer decisions
// ============================================================================

#[test]
fn test_light_random_background_gets_black_text() {
    let style = StyleConfig {
        background: Background::Random,
        ..Default::default()
    };
    let mut surface = RecordingSurface::new(100, 0.1);
    let mut sink = Vec::new();

    let outcome = render_to_sink(
        &mut surface,
        &label("AB"),
        &style,
        &mut FixedDraws(0.9),
        &mut sink,
    )
    .unwrap();

    assert!((outcome.background.luminance() - 0.9).abs() < 1e-9);
    assert_eq!(outcome.text_color, Rgb::BLACK);
    assert_eq!(surface.text.unwrap().3, Rgb::BLACK);
}

#[test]
fn test_dark_random_background_gets_white_text() {
    let style = StyleConfig {
        background: Background::Random,
        font_color: Rgb::BLACK,
        ..Default::default()
    };
    let mut surface = RecordingSurface::new(100, 0.1);
    let mut sink = Vec::new();

    let outcome = render_to_sink(
        &mut surface,
        &label("AB"),
        &style,
        &mut FixedDraws(0.1),
        &mut sink,
    )
    .unwrap();

    assert_eq!(outcome.text_color, Rgb::WHITE);
    assert_eq!(surface.fills[0].1, outcome.background);
}

#[test]
fn test_fitting_label_is_not_shrunk() {
    let style = StyleConfig::default();
    // 10 px per character at size 50
    let mut surface = RecordingSurface::new(100, 0.2);
    let mut sink = Vec::new();

    let outcome = render_to_sink(
        &mut surface,
        &label("AB"),
        &style,
        &mut FixedDraws(0.5),
        &mut sink,
    )
    .unwrap();

    assert_eq!(outcome.font_fit.iterations, 0);
    let (text, size, origin, color) = surface.text.unwrap();
    assert_eq!(text, "AB");
    assert_eq!(size, 50.0);
    assert_eq!(color, Rgb::WHITE);
    // width 20, height 35, y_bearing -35
    assert_eq!(origin, (40.0, 67.5));
}

#[test]
fn test_wide_label_shrinks_to_fit() {
    let style = StyleConfig::default();
    // 100 px wide at size 50 against a 90 px budget
    let mut surface = RecordingSurface::new(100, 1.0);
    let mut sink = Vec::new();

    let outcome = render_to_sink(
        &mut surface,
        &label("AB"),
        &style,
        &mut FixedDraws(0.5),
        &mut sink,
    )
    .unwrap();

    assert!(outcome.font_fit.iterations > 0);
    assert!(outcome.font_fit.extents.width <= 90.0);
    assert!(outcome.font_fit.size < 50.0);
}

#[test]
fn test_contour_is_stroked_on_the_fill_path() {
    let style = StyleConfig {
        shape: Shape::Square,
        ..Default::default()
    };
    let mut surface = RecordingSurface::new(100, 0.1);
    let mut sink = Vec::new();

    render_to_sink(
        &mut surface,
        &label("AB"),
        &style,
        &mut FixedDraws(0.5),
        &mut sink,
    )
    .unwrap();

    assert_eq!(surface.fills.len(), 1);
    assert_eq!(surface.strokes.len(), 1);
    assert_eq!(surface.strokes[0].0, surface.fills[0].0);
    assert_eq!(surface.strokes[0].2, 2.5);
}

#[test]
fn test_sink_receives_surface_chunks_in_order() {
    let style = StyleConfig::default();
    let mut surface = RecordingSurface::new(100, 0.1);
    let mut sink = Vec::new();

    let outcome = render_to_sink(
        &mut surface,
        &label("AB"),
        &style,
        &mut FixedDraws(0.5),
        &mut sink,
    )
    .unwrap();

    assert_eq!(sink, b"headtail!");
    assert_eq!(outcome.bytes_written, 9);
}
