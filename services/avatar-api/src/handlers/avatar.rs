//! `GET|HEAD /avatar/:initials`

use std::convert::Infallible;
use std::sync::Arc;

use avatar_renderer::{
    parse_color, render_avatar, BoundedAllocator, Label, RngSource, Shape, StyleSettings,
};
use axum::body::Body;
use axum::extract::{Extension, Path, Query};
use axum::http::{header, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::ApiError;
use crate::metrics::Timer;
use crate::state::AppState;

/// Per-request style overrides.
#[derive(Debug, Default, Deserialize)]
pub struct AvatarQuery {
    pub size: Option<u32>,
    pub shape: Option<Shape>,
    pub contour: Option<bool>,
    /// `RRGGBB` or `random`.
    pub bg: Option<String>,
    pub contour_color: Option<String>,
    pub font_color: Option<String>,
    pub font: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

impl AvatarQuery {
    /// Convert to sparse settings, parsing colors.
    pub fn to_settings(&self) -> Result<StyleSettings, ApiError> {
        let color = |param: &'static str, value: &Option<String>| {
            value
                .as_deref()
                .map(|v| parse_color(v).map_err(|source| ApiError::Color { param, source }))
                .transpose()
        };

        let (bg_color, random_bg_color) = match self.bg.as_deref() {
            Some(v) if v.eq_ignore_ascii_case("random") => (None, Some(true)),
            Some(_) => (color("bg", &self.bg)?, Some(false)),
            None => (None, None),
        };

        Ok(StyleSettings {
            size: self.size,
            square: self.shape.map(|s| s == Shape::Square),
            show_contour: self.contour,
            bg_color,
            random_bg_color,
            contour_color: color("contour_color", &self.contour_color)?,
            font_color: color("font_color", &self.font_color)?,
            font_face: self.font.clone(),
            font_size: self.font_size,
            font_italic: self.italic,
            font_bold: self.bold,
        })
    }
}

pub async fn avatar_handler(
    Extension(state): Extension<Arc<AppState>>,
    method: Method,
    Path(initials): Path<String>,
    Query(query): Query<AvatarQuery>,
) -> Response {
    match render_response(&state, method, &initials, &query).await {
        Ok(response) => response,
        Err(e) => {
            state.metrics.record_error(e.kind());
            axum::response::IntoResponse::into_response(e)
        }
    }
}

async fn render_response(
    state: &Arc<AppState>,
    method: Method,
    initials: &str,
    query: &AvatarQuery,
) -> Result<Response, ApiError> {
    let label = Label::truncate(initials)?;

    let settings = if state.config.allow_overrides {
        query.to_settings()?.merge(state.base_settings())
    } else {
        state.base_settings().clone()
    };
    let style = settings.resolve()?;

    let fonts = Arc::clone(&state.fonts);
    let budget = state.config.max_response_bytes;
    let timer = Timer::start();

    let (chain, outcome) = tokio::task::spawn_blocking(move || {
        let mut rng = RngSource::from_entropy();
        render_avatar(&label, &style, &fonts, &mut rng, BoundedAllocator::new(budget))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("render task failed: {e}")))??;

    state
        .metrics
        .record_render(timer.elapsed_us(), outcome.bytes_written);
    tracing::debug!(
        initials,
        background = %outcome.background,
        font_size = outcome.font_fit.size,
        bytes = chain.total_length(),
        segments = chain.len(),
        "Serving avatar"
    );

    let total_length = chain.total_length();
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        let segments = chain.into_iter().map(Ok::<Bytes, Infallible>);
        Body::from_stream(futures::stream::iter(segments))
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CONTENT_LENGTH, total_length)
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}
