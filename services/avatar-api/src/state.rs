//! Application state for the avatar API.

use std::sync::Arc;

use anyhow::Result;
use avatar_renderer::{FontBook, StyleSettings};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::ServiceConfig;
use crate::metrics::MetricsCollector;

/// Shared application state.
pub struct AppState {
    pub config: ServiceConfig,

    /// Fonts shared read-only by every render.
    pub fonts: Arc<FontBook>,

    pub metrics: MetricsCollector,

    /// Prometheus exporter, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Validate the configured style and load fonts.
    pub fn new(config: ServiceConfig, prometheus: Option<PrometheusHandle>) -> Result<Self> {
        let base = config.base_style()?;
        tracing::info!(
            size = base.size,
            shape = ?base.shape,
            font_family = %base.font_family,
            "Resolved default style"
        );

        let fonts = config.load_fonts()?;
        tracing::info!(fonts = fonts.len(), families = ?fonts.families(), "Fonts loaded");

        Ok(Self {
            config,
            fonts: Arc::new(fonts),
            metrics: MetricsCollector::new(),
            prometheus,
        })
    }

    /// Configured style defaults that request overrides merge onto.
    pub fn base_settings(&self) -> &StyleSettings {
        &self.config.style
    }
}
