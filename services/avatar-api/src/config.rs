//! Service configuration loading and types.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use avatar_renderer::{FontBook, FontSlant, FontWeight, StyleConfig, StyleSettings};
use serde::{Deserialize, Serialize};

/// Default per-response memory budget (4 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Avatar service configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Server-wide style defaults.
    #[serde(default)]
    pub style: StyleSettings,

    /// Font files registered under an explicit family and style.
    #[serde(default)]
    pub fonts: Vec<FontSource>,

    /// Directories scanned for `Family-Style.ttf` files.
    #[serde(default)]
    pub font_dirs: Vec<PathBuf>,

    /// Family used when a requested family is not registered.
    #[serde(default)]
    pub fallback_family: Option<String>,

    /// Memory budget for one encoded response, segment headers included.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Whether query parameters may override the configured style.
    #[serde(default = "default_true")]
    pub allow_overrides: bool,
}

/// One explicitly configured font file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontSource {
    pub family: String,
    pub path: PathBuf,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub bold: bool,
}

fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

fn default_true() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            style: StyleSettings::default(),
            fonts: Vec::new(),
            font_dirs: Vec::new(),
            fallback_family: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            allow_overrides: true,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged. A file that exists but does not parse is.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file does not exist, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            fonts = config.fonts.len(),
            font_dirs = config.font_dirs.len(),
            "Loaded service config"
        );
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Resolve the server-wide style, so bad defaults fail at startup rather
    /// than on every request.
    pub fn base_style(&self) -> Result<StyleConfig> {
        self.style
            .resolve()
            .context("Invalid style defaults in service config")
    }

    /// Build the font book: explicit files first (any failure is fatal),
    /// then every configured directory, then the built-in DejaVu Sans faces.
    pub fn load_fonts(&self) -> Result<FontBook> {
        let mut book = FontBook::new();
        if let Some(family) = &self.fallback_family {
            book = book.with_fallback(family);
        }

        for source in &self.fonts {
            let slant = if source.italic {
                FontSlant::Italic
            } else {
                FontSlant::Normal
            };
            let weight = if source.bold {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            };
            book.register_file(&source.family, slant, weight, &source.path)
                .with_context(|| format!("Failed to load font '{}'", source.family))?;
        }

        for dir in &self.font_dirs {
            let added = book.load_dir(dir);
            tracing::info!(dir = %dir.display(), fonts = added, "Scanned font directory");
        }

        book.register_builtin()
            .context("Failed to load built-in fonts")?;
        Ok(book)
    }
}
