//! Error types for avatar rendering.

use thiserror::Error;

/// Errors from parsing or constructing colors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorError {
    #[error("invalid color '{value}': expected exactly 6 hex digits (RRGGBB)")]
    InvalidFormat { value: String },

    #[error("color channel {channel} out of range [0, 1]: {value}")]
    OutOfRange { channel: &'static str, value: f64 },
}

/// Errors from validating a request label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("label is empty")]
    Empty,

    #[error("label is {len} bytes, maximum is {max}")]
    TooLong { len: usize, max: usize },

    #[error("label contains a control character")]
    ControlCharacter,
}

/// Raised by a byte sink when it cannot store an encoded chunk.
///
/// Once returned, the chain being built is invalid and must be discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteFailure {
    #[error("failed to allocate {requested} bytes for an output segment")]
    Allocation { requested: usize },

    #[error("output budget exhausted: requested {requested} bytes, {remaining} remaining")]
    BudgetExceeded { requested: usize, remaining: usize },
}

/// Errors from resolving style settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    #[error("avatar size {0} is out of range (1..={max})", max = crate::style::MAX_AVATAR_SIZE)]
    InvalidSize(u32),

    #[error("font size must be a finite positive number, got {0}")]
    InvalidFontSize(f64),

    #[error(transparent)]
    Color(#[from] ColorError),
}

/// Errors from registering fonts.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("font data for '{family}' is not a valid TrueType/OpenType font")]
    InvalidFont { family: String },
}

/// Errors that abort a render.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to allocate a {size}x{size} drawing surface")]
    SurfaceAllocation { size: u32 },

    #[error(transparent)]
    Write(#[from] WriteFailure),

    #[error("PNG compression failed: {0}")]
    Compression(#[source] std::io::Error),
}

impl RenderError {
    /// Whether this error belongs to the write-failure class, meaning the
    /// host should answer with a service-unavailable response.
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            RenderError::Write(_) | RenderError::SurfaceAllocation { .. }
        )
    }
}

/// Result alias for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
