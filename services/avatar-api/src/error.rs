//! HTTP error responses.

use avatar_renderer::{ColorError, LabelError, RenderError, StyleError};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::metrics::RenderErrorKind;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid initials: {0}")]
    Label(#[from] LabelError),

    #[error("invalid parameter '{param}': {source}")]
    Color {
        param: &'static str,
        #[source]
        source: ColorError,
    },

    #[error("invalid style: {0}")]
    Style(#[from] StyleError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Label(_) | ApiError::Color { .. } | ApiError::Style(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Render(e) if e.is_write_failure() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Render(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> RenderErrorKind {
        match self.status() {
            StatusCode::BAD_REQUEST => RenderErrorKind::BadRequest,
            StatusCode::SERVICE_UNAVAILABLE => RenderErrorKind::WriteFailure,
            _ => RenderErrorKind::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Avatar request failed");
        } else {
            tracing::debug!(error = %self, "Rejected avatar request");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_renderer::WriteFailure;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(LabelError::Empty).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(StyleError::InvalidSize(0)).status(),
            StatusCode::BAD_REQUEST
        );
        let write = RenderError::from(WriteFailure::Allocation { requested: 8 });
        assert_eq!(
            ApiError::from(write).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let surface = RenderError::SurfaceAllocation { size: 100 };
        assert_eq!(ApiError::from(surface).kind(), RenderErrorKind::WriteFailure);
        assert_eq!(
            ApiError::Internal("join".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
