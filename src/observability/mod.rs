//! Observability features: metrics and tracing.
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `rocketcap_samples_delivered` | Counter | Samples handed to callbacks, by `kind` |
//! | `rocketcap_bytes_delivered` | Counter | Payload bytes handed to callbacks, by `kind` |
//! | `rocketcap_packets_dropped` | Counter | Transport packets dropped, by `reason` |
//! | `rocketcap_setup_failures` | Counter | Failed setup attempts, by `step` |
//! | `rocketcap_bytes_pushed` | Counter | Bytes pushed into sessions, by `device` |
//! | `rocketcap_push_time_ns` | Histogram | Time to demultiplex and deliver one chunk |
//!
//! Nothing is exported unless the application installs a `metrics` recorder.
//!
//! ## Tracing
//!
//! Setup runs inside a `capture_setup` span; each step logs at `debug`, and a
//! failing step logs at `warn` with the step name before the error returns.

mod metrics;
mod tracing_support;

pub use metrics::{
    SessionMetrics, TimerGuard, init_metrics, record_packet_dropped, record_sample_delivered,
    record_setup_failure,
};
pub use tracing_support::{
    instrument_setup, span_delivery, span_setup, trace_state_change, trace_step,
    trace_step_failed,
};
