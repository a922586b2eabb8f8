//! Font registry and text measurement.
//!
//! Fonts are looked up by family name, slant and weight. A family is chosen
//! first (the requested one, then the fallback family, then the first
//! registered family) and the closest slant/weight is picked within it, so
//! every style of one request comes from the same typeface. The generic names
//! `sans`, `serif` and `monospace` resolve to a registered family of that
//! kind.
//!
//! DejaVu Sans is compiled in (see [`FontBook::builtin`]) so a renderer
//! always has a face for the default `sans` family.

use std::path::Path;

use rusttype::{point, Font, PositionedGlyph, Scale};
use walkdir::WalkDir;

use crate::error::FontError;
use crate::layout::{FontFace, FontSlant, FontWeight, TextExtents};
use crate::style::DEFAULT_FONT_FAMILY;

/// Family name of the fonts compiled into the crate.
pub const BUILTIN_FAMILY: &str = "DejaVu Sans";

struct BuiltinFont {
    slant: FontSlant,
    weight: FontWeight,
    data: &'static [u8],
}

const BUILTIN_FONTS: [BuiltinFont; 4] = [
    BuiltinFont {
        slant: FontSlant::Normal,
        weight: FontWeight::Normal,
        data: include_bytes!("../assets/DejaVuSans.ttf"),
    },
    BuiltinFont {
        slant: FontSlant::Normal,
        weight: FontWeight::Bold,
        data: include_bytes!("../assets/DejaVuSans-Bold.ttf"),
    },
    BuiltinFont {
        slant: FontSlant::Italic,
        weight: FontWeight::Normal,
        data: include_bytes!("../assets/DejaVuSans-Oblique.ttf"),
    },
    BuiltinFont {
        slant: FontSlant::Italic,
        weight: FontWeight::Bold,
        data: include_bytes!("../assets/DejaVuSans-BoldOblique.ttf"),
    },
];

const SANS_FAMILIES: &[&str] = &[
    "dejavusans",
    "liberationsans",
    "notosans",
    "freesans",
    "arial",
    "helvetica",
];

const SERIF_FAMILIES: &[&str] = &[
    "dejavuserif",
    "liberationserif",
    "notoserif",
    "freeserif",
    "timesnewroman",
];

const MONO_FAMILIES: &[&str] = &[
    "dejavusansmono",
    "liberationmono",
    "notosansmono",
    "freemono",
    "couriernew",
];

/// Concrete families a normalized generic name may resolve to, in order of
/// preference.
fn generic_candidates(family: &str) -> &'static [&'static str] {
    match family {
        "sans" | "sansserif" => SANS_FAMILIES,
        "serif" => SERIF_FAMILIES,
        "mono" | "monospace" => MONO_FAMILIES,
        _ => &[],
    }
}

struct RegisteredFont {
    family: String,
    slant: FontSlant,
    weight: FontWeight,
    font: Font<'static>,
}

impl RegisteredFont {
    /// Lower is closer. Slant mismatches cost less than weight mismatches.
    fn distance(&self, face: &FontFace) -> u8 {
        let mut distance = 0;
        if self.slant != face.slant {
            distance += 1;
        }
        if self.weight != face.weight {
            distance += 2;
        }
        distance
    }
}

/// Registry of fonts available for rendering.
pub struct FontBook {
    fonts: Vec<RegisteredFont>,
    fallback_family: String,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("fonts", &self.fonts.len())
            .field("fallback_family", &self.fallback_family)
            .finish()
    }
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a family name for lookup: lowercase, no spaces, dashes or
/// underscores. "DejaVu Sans" and "dejavu-sans" are the same family.
pub fn normalize_family(family: &str) -> String {
    family
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split a `Family-Style` file stem into family and style.
///
/// Unknown or missing style suffixes leave the whole stem as the family.
fn parse_file_stem(stem: &str) -> (String, FontSlant, FontWeight) {
    if let Some((family, style)) = stem.rsplit_once('-') {
        let style = style.to_ascii_lowercase();
        let parsed = match style.as_str() {
            "regular" | "book" | "roman" => Some((FontSlant::Normal, FontWeight::Normal)),
            "bold" => Some((FontSlant::Normal, FontWeight::Bold)),
            "italic" | "oblique" => Some((FontSlant::Italic, FontWeight::Normal)),
            "bolditalic" | "boldoblique" => Some((FontSlant::Italic, FontWeight::Bold)),
            _ => None,
        };
        if let Some((slant, weight)) = parsed {
            return (family.to_string(), slant, weight);
        }
    }
    (stem.to_string(), FontSlant::Normal, FontWeight::Normal)
}

impl FontBook {
    /// An empty book whose fallback family is [`DEFAULT_FONT_FAMILY`].
    pub fn new() -> Self {
        Self {
            fonts: Vec::new(),
            fallback_family: normalize_family(DEFAULT_FONT_FAMILY),
        }
    }

    /// A book holding the built-in DejaVu Sans faces.
    pub fn builtin() -> Result<Self, FontError> {
        let mut book = Self::new();
        book.register_builtin()?;
        Ok(book)
    }

    /// Use `family` when a requested family is not registered.
    pub fn with_fallback(mut self, family: &str) -> Self {
        self.fallback_family = normalize_family(family);
        self
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Normalized family names, in registration order, without duplicates.
    pub fn families(&self) -> Vec<&str> {
        let mut families: Vec<&str> = Vec::new();
        for font in &self.fonts {
            if !families.contains(&font.family.as_str()) {
                families.push(&font.family);
            }
        }
        families
    }

    /// Register a font from raw TrueType/OpenType data.
    pub fn register_bytes(
        &mut self,
        family: &str,
        slant: FontSlant,
        weight: FontWeight,
        data: Vec<u8>,
    ) -> Result<(), FontError> {
        let font = Font::try_from_vec(data).ok_or_else(|| FontError::InvalidFont {
            family: family.to_string(),
        })?;
        self.fonts.push(RegisteredFont {
            family: normalize_family(family),
            slant,
            weight,
            font,
        });
        Ok(())
    }

    /// Register the four compiled-in DejaVu Sans faces under
    /// [`BUILTIN_FAMILY`].
    pub fn register_builtin(&mut self) -> Result<(), FontError> {
        for builtin in &BUILTIN_FONTS {
            let font =
                Font::try_from_bytes(builtin.data).ok_or_else(|| FontError::InvalidFont {
                    family: BUILTIN_FAMILY.to_string(),
                })?;
            self.fonts.push(RegisteredFont {
                family: normalize_family(BUILTIN_FAMILY),
                slant: builtin.slant,
                weight: builtin.weight,
                font,
            });
        }
        Ok(())
    }

    /// Register a font file under an explicit family and style.
    pub fn register_file(
        &mut self,
        family: &str,
        slant: FontSlant,
        weight: FontWeight,
        path: impl AsRef<Path>,
    ) -> Result<(), FontError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.register_bytes(family, slant, weight, data)
    }

    /// Register every `.ttf`/`.otf` file below `dir`, deriving family and
    /// style from `Family-Style` file names. Unreadable or invalid files are
    /// skipped with a warning. Returns the number of fonts added.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> usize {
        let mut added = 0;
        for entry in WalkDir::new(dir.as_ref())
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"))
                .unwrap_or(false);
            if !is_font {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let (family, slant, weight) = parse_file_stem(stem);
            match self.register_file(&family, slant, weight, path) {
                Ok(()) => {
                    tracing::debug!(family = %family, path = %path.display(), "registered font");
                    added += 1;
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping font"),
            }
        }
        added
    }

    /// Find the font to use for `face`, or `None` if the book is empty.
    pub fn select(&self, face: &FontFace) -> Option<&Font<'static>> {
        self.select_registered(face).map(|f| &f.font)
    }

    /// Normalized family that [`FontBook::select`] draws `face` from.
    pub fn selected_family(&self, face: &FontFace) -> Option<&str> {
        self.select_registered(face).map(|f| f.family.as_str())
    }

    fn select_registered(&self, face: &FontFace) -> Option<&RegisteredFont> {
        let family = self
            .resolve_family(&face.family)
            .or_else(|| self.resolve_family(&self.fallback_family))
            .or_else(|| self.fonts.first().map(|f| f.family.as_str()))?;
        self.fonts
            .iter()
            .filter(|f| f.family == family)
            .min_by_key(|f| f.distance(face))
    }

    /// Registered family for `family`: an exact match, or the first
    /// registered candidate of a generic name.
    fn resolve_family(&self, family: &str) -> Option<&str> {
        let family = normalize_family(family);
        let registered = |name: &str| {
            self.fonts
                .iter()
                .find(|f| f.family == name)
                .map(|f| f.family.as_str())
        };
        registered(&family).or_else(|| {
            generic_candidates(&family)
                .iter()
                .find_map(|candidate| registered(candidate))
        })
    }

    /// Ink extents of `text` at `size`. Zero when no font is available or
    /// the text has no visible glyphs.
    pub fn measure(&self, face: &FontFace, size: f64, text: &str) -> TextExtents {
        match self.select(face) {
            Some(font) => measure_glyphs(&layout_glyphs(font, size, text, 0.0, 0.0)),
            None => TextExtents::default(),
        }
    }
}

/// Lay out `text` on a single line with its baseline origin at `(x, y)`.
pub(crate) fn layout_glyphs(
    font: &Font<'static>,
    size: f64,
    text: &str,
    x: f64,
    y: f64,
) -> Vec<PositionedGlyph<'static>> {
    font.layout(text, Scale::uniform(size as f32), point(x as f32, y as f32))
        .collect()
}

/// Union of the glyphs' pixel bounding boxes, as extents relative to the
/// layout origin.
pub(crate) fn measure_glyphs(glyphs: &[PositionedGlyph<'_>]) -> TextExtents {
    let mut bounds: Option<(i32, i32, i32, i32)> = None;
    for bb in glyphs.iter().filter_map(|g| g.pixel_bounding_box()) {
        bounds = Some(match bounds {
            None => (bb.min.x, bb.min.y, bb.max.x, bb.max.y),
            Some((x0, y0, x1, y1)) => (
                x0.min(bb.min.x),
                y0.min(bb.min.y),
                x1.max(bb.max.x),
                y1.max(bb.max.y),
            ),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => TextExtents {
            width: (x1 - x0) as f64,
            height: (y1 - y0) as f64,
            x_bearing: x0 as f64,
            y_bearing: y0 as f64,
        },
        None => TextExtents::default(),
    }
}
