//! Avatar rendering pipeline.
//!
//! [`render_to_sink`] draws one avatar on any [`Surface`] and streams the PNG
//! into a [`ByteSink`]. [`render_avatar`] is the usual entry point: it owns
//! the pixmap surface and collects the output into an [`OutputChain`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::alloc::SegmentAllocator;
use crate::chain::{ByteSink, ChainBuilder, OutputChain};
use crate::color::{contrasting_monochrome, Rgb};
use crate::error::RenderResult;
use crate::fonts::FontBook;
use crate::label::Label;
use crate::layout::{
    centered_text_origin, contour_inset, fit_font_size, max_text_width, shape_geometry, FontFit,
    CONTOUR_WIDTH,
};
use crate::style::{Background, StyleConfig};
use crate::surface::{PixmapSurface, Surface};

/// Source of uniform draws in `[0, 1]` for random backgrounds.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Adapts any [`rand::Rng`] into a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// What a render actually drew.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOutcome {
    pub background: Rgb,
    pub text_color: Rgb,
    pub font_fit: FontFit,
    pub bytes_written: u64,
}

/// Clamp a draw into the unit interval; non-finite draws become 0.
fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn background_color(background: Background, rng: &mut dyn RandomSource) -> Rgb {
    match background {
        Background::Fixed(color) => color,
        Background::Random => {
            let red = unit(rng.next_unit());
            let green = unit(rng.next_unit());
            let blue = unit(rng.next_unit());
            Rgb::from_unit(red, green, blue)
        }
    }
}

/// Draw `label` with `style` on `surface` and encode it into `sink`.
///
/// The surface must be `style.size` pixels square. A sink failure aborts
/// encoding and is returned as is.
pub fn render_to_sink<S: Surface + ?Sized>(
    surface: &mut S,
    label: &Label,
    style: &StyleConfig,
    rng: &mut dyn RandomSource,
    sink: &mut dyn ByteSink,
) -> RenderResult<RenderOutcome> {
    let size = surface.size();
    let path = shape_geometry(size, style.shape, contour_inset(style.show_contour));

    let background = background_color(style.background, rng);
    surface.fill_path(&path, background)?;
    if style.show_contour {
        surface.stroke_path(&path, style.contour_color, CONTOUR_WIDTH)?;
    }

    let face = style.font_face();
    let font_fit = fit_font_size(
        label,
        &face,
        style.font_size,
        max_text_width(size),
        |face, font_size, text| surface.measure_text(face, font_size, text),
    );

    let text_color = match style.background {
        Background::Random => contrasting_monochrome(&background),
        Background::Fixed(_) => style.font_color,
    };
    let origin = centered_text_origin(size, &font_fit.extents);
    surface.draw_text(&face, font_fit.size, label, origin, text_color)?;

    let bytes_written = surface.encode_png(sink)?;

    tracing::debug!(
        label = %label,
        size,
        background = %background,
        font_size = font_fit.size,
        shrink_steps = font_fit.iterations,
        bytes = bytes_written,
        "rendered avatar"
    );

    Ok(RenderOutcome {
        background,
        text_color,
        font_fit,
        bytes_written,
    })
}

/// Render `label` into a new [`OutputChain`] using `allocator` for every
/// output segment.
pub fn render_avatar<A: SegmentAllocator>(
    label: &Label,
    style: &StyleConfig,
    fonts: &FontBook,
    rng: &mut dyn RandomSource,
    allocator: A,
) -> RenderResult<(OutputChain, RenderOutcome)> {
    let mut builder = ChainBuilder::with_allocator(allocator);
    let outcome = {
        let mut surface = PixmapSurface::new(style.size, fonts)?;
        render_to_sink(&mut surface, label, style, rng, &mut builder)?
    };
    Ok((builder.finish(), outcome))
}
