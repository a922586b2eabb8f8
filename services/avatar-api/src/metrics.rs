//! Render metrics collection and reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;

/// Metrics collector for the avatar API.
///
/// Everything is also forwarded to the `metrics` recorder, which the binary
/// exports in Prometheus format.
#[derive(Debug)]
pub struct MetricsCollector {
    pub renders_total: AtomicU64,
    pub render_errors: AtomicU64,
    pub bytes_total: AtomicU64,
    start_time: Instant,
}

/// Why a request did not produce an avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderErrorKind {
    BadRequest,
    WriteFailure,
    Internal,
}

impl RenderErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            RenderErrorKind::BadRequest => "bad_request",
            RenderErrorKind::WriteFailure => "write_failure",
            RenderErrorKind::Internal => "internal",
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub renders_total: u64,
    pub render_errors: u64,
    pub bytes_total: u64,
    pub uptime_secs: u64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            renders_total: AtomicU64::new(0),
            render_errors: AtomicU64::new(0),
            bytes_total: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful render.
    pub fn record_render(&self, duration_us: u64, bytes: u64) {
        self.renders_total.fetch_add(1, Ordering::Relaxed);
        self.bytes_total.fetch_add(bytes, Ordering::Relaxed);
        counter!("avatar_renders_total").increment(1);
        histogram!("avatar_render_duration_seconds").record(duration_us as f64 / 1_000_000.0);
        histogram!("avatar_response_bytes").record(bytes as f64);
    }

    /// Record a failed request.
    pub fn record_error(&self, kind: RenderErrorKind) {
        self.render_errors.fetch_add(1, Ordering::Relaxed);
        counter!("avatar_render_errors_total", "kind" => kind.as_str()).increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            renders_total: self.renders_total.load(Ordering::Relaxed),
            render_errors: self.render_errors.load(Ordering::Relaxed),
            bytes_total: self.bytes_total.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

/// Simple wall-clock timer.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}
