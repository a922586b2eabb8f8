//! Initials avatar rendering.
//!
//! Draws a label (usually a person's initials) centered on a filled circle
//! or square, optionally outlined, and streams the result as a PNG:
//! - Color parsing and contrast selection
//! - Shape geometry and font-size fitting
//! - Streaming PNG encoding into an output chain of immutable segments

pub mod alloc;
pub mod chain;
pub mod color;
pub mod error;
pub mod fonts;
pub mod label;
pub mod layout;
pub mod png;
pub mod render;
pub mod style;
pub mod surface;

pub use alloc::{BoundedAllocator, HeapAllocator, SegmentAllocator};
pub use chain::{BufferSegment, ByteSink, ChainBuilder, OutputChain};
pub use color::{contrasting_monochrome, luminance, parse_color, Rgb};
pub use error::{
    ColorError, FontError, LabelError, RenderError, RenderResult, StyleError, WriteFailure,
};
pub use fonts::{FontBook, BUILTIN_FAMILY};
pub use label::{Label, INITIALS_MAX_SIZE};
pub use layout::{FontFace, FontFit, FontSlant, FontWeight, PathSpec, TextExtents};
pub use render::{render_avatar, render_to_sink, RandomSource, RenderOutcome, RngSource};
pub use style::{Background, Shape, StyleConfig, StyleSettings};
pub use surface::{PixmapSurface, Surface};
