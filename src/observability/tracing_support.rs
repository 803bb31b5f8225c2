//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Create a span covering one capture setup attempt.
///
/// # Example
///
/// ```rust
/// use rocketcap::observability::span_setup;
///
/// let span = span_setup("HD-PVR Rocket");
/// let _guard = span.enter();
/// // Setup steps here...
/// ```
#[inline]
pub fn span_setup(device: &str) -> Span {
    span!(Level::INFO, "capture_setup", device = %device)
}

/// Create a span for delivering samples out of one pushed chunk.
#[inline]
pub fn span_delivery(device: &str, bytes: usize) -> Span {
    span!(Level::TRACE, "deliver", device = %device, bytes = bytes)
}

/// Enter a setup span and return the guard.
pub fn instrument_setup(device: &str) -> tracing::span::EnteredSpan {
    span_setup(device).entered()
}

/// Log a setup step that succeeded.
#[inline]
pub fn trace_step(device: &str, step: &dyn std::fmt::Display) {
    tracing::debug!(device = %device, step = %step, "setup step complete");
}

/// Log a setup step that failed.
#[inline]
pub fn trace_step_failed(
    device: &str,
    step: &dyn std::fmt::Display,
    error: &dyn std::error::Error,
) {
    tracing::warn!(device = %device, step = %step, error = %error, "capture setup failed");
}

/// Log a session state change.
#[inline]
pub fn trace_state_change(device: &str, from: &str, to: &str) {
    tracing::info!(device = %device, from = %from, to = %to, "capture session state changed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let _span = span_setup("device");
        let _span = span_delivery("device", 188);
    }

    #[test]
    fn test_instrumentation() {
        let _guard = instrument_setup("device");
        trace_step("device", &"find encoder");
        trace_state_change("device", "Ready", "Stopped");
    }
}
