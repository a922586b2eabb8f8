//! Shape geometry and font-size fitting.
//!
//! Nothing in here touches pixels. Text measurement is passed in as a closure
//! so the fitting loop can be driven by any text backend (or a stub in tests).

use crate::style::Shape;

/// Stroke width of the optional contour.
pub const CONTOUR_WIDTH: f64 = 2.5;

/// Inset applied to the shape when a contour is drawn (half the stroke width),
/// so the stroke stays inside the image.
pub const CONTOUR_INSET: f64 = CONTOUR_WIDTH / 2.0;

/// Font size below which fitting stops shrinking.
pub const MIN_FONT_SIZE: f64 = 8.0;

/// Multiplier applied to the font size on each fitting step.
pub const SHRINK_FACTOR: f64 = 0.95;

/// Fraction of the image width the label may occupy.
pub const MAX_TEXT_WIDTH_RATIO: f64 = 0.9;

/// Geometry of the avatar shape, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSpec {
    /// Full circle (arc from 0 to 2π).
    Circle { cx: f64, cy: f64, radius: f64 },
    /// Axis-aligned rectangle.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// Ink extents of a piece of text, relative to its baseline origin.
///
/// `y_bearing` is negative for ink above the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextExtents {
    pub width: f64,
    pub height: f64,
    pub x_bearing: f64,
    pub y_bearing: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// A font selection: family name plus slant and weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontFace {
    pub family: String,
    pub slant: FontSlant,
    pub weight: FontWeight,
}

impl FontFace {
    pub fn new(family: impl Into<String>, italic: bool, bold: bool) -> Self {
        Self {
            family: family.into(),
            slant: if italic {
                FontSlant::Italic
            } else {
                FontSlant::Normal
            },
            weight: if bold {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            },
        }
    }
}

/// Result of [`fit_font_size`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontFit {
    /// Final font size.
    pub size: f64,
    /// Extents of the label at `size`.
    pub extents: TextExtents,
    /// Number of shrink steps taken.
    pub iterations: u32,
}

impl FontFit {
    /// Whether the label ended up within `max_width`.
    pub fn fits(&self, max_width: f64) -> bool {
        self.extents.width <= max_width
    }
}

/// Inset for the shape path: [`CONTOUR_INSET`] with a contour, else zero.
pub fn contour_inset(show_contour: bool) -> f64 {
    if show_contour {
        CONTOUR_INSET
    } else {
        0.0
    }
}

/// Compute the shape path for a `size × size` image.
pub fn shape_geometry(size: u32, shape: Shape, contour_inset: f64) -> PathSpec {
    let size = size as f64;
    match shape {
        Shape::Circle => {
            let half = size / 2.0;
            PathSpec::Circle {
                cx: half,
                cy: half,
                radius: half - contour_inset,
            }
        }
        Shape::Square => PathSpec::Rect {
            x: contour_inset,
            y: contour_inset,
            width: size - 2.0 * contour_inset,
            height: size - 2.0 * contour_inset,
        },
    }
}

/// Maximum label width for a `size × size` image.
pub fn max_text_width(size: u32) -> f64 {
    size as f64 * MAX_TEXT_WIDTH_RATIO
}

/// Shrink the font until `label` fits within `max_width`.
///
/// Starts at `initial_size` and multiplies by [`SHRINK_FACTOR`] while the
/// measured width exceeds `max_width` and the size is above
/// [`MIN_FONT_SIZE`]. Each step is clamped to the floor, so a shrunk size is
/// never below [`MIN_FONT_SIZE`] even when a plain 0.95 step would land just
/// under it. If the label still overflows at the floor it is returned as is;
/// overflow is not an error.
///
/// An `initial_size` at or below the floor is measured once and returned
/// unchanged.
pub fn fit_font_size<F>(
    label: &str,
    face: &FontFace,
    initial_size: f64,
    max_width: f64,
    mut measure: F,
) -> FontFit
where
    F: FnMut(&FontFace, f64, &str) -> TextExtents,
{
    let mut size = initial_size;
    let mut extents = measure(face, size, label);
    let mut iterations = 0;

    while extents.width > max_width && size > MIN_FONT_SIZE {
        size = (size * SHRINK_FACTOR).max(MIN_FONT_SIZE);
        extents = measure(face, size, label);
        iterations += 1;
    }

    if extents.width > max_width {
        tracing::debug!(
            label,
            size,
            width = extents.width,
            max_width,
            "label overflows at minimum font size"
        );
    }

    FontFit {
        size,
        extents,
        iterations,
    }
}

/// Baseline origin that centers the text's ink box on the image center.
pub fn centered_text_origin(size: u32, extents: &TextExtents) -> (f64, f64) {
    let half = size as f64 / 2.0;
    (
        half - (extents.width / 2.0 + extents.x_bearing),
        half - (extents.height / 2.0 + extents.y_bearing),
    )
}
