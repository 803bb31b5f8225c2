//! Metrics collection using metrics-rs.

use crate::format::MediaKind;
use metrics::{Counter, Histogram, Unit, counter, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const SAMPLES_DELIVERED: &str = "rocketcap_samples_delivered";
const BYTES_DELIVERED: &str = "rocketcap_bytes_delivered";
const PACKETS_DROPPED: &str = "rocketcap_packets_dropped";
const SETUP_FAILURES: &str = "rocketcap_setup_failures";
const PUSH_TIME_NS: &str = "rocketcap_push_time_ns";
const BYTES_PUSHED: &str = "rocketcap_bytes_pushed";

/// Initialize metrics descriptions.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        SAMPLES_DELIVERED,
        Unit::Count,
        "Samples handed to capture callbacks"
    );
    metrics::describe_counter!(
        BYTES_DELIVERED,
        Unit::Bytes,
        "Payload bytes handed to capture callbacks"
    );
    metrics::describe_counter!(
        PACKETS_DROPPED,
        Unit::Count,
        "Transport packets dropped by the demultiplexer"
    );
    metrics::describe_counter!(
        SETUP_FAILURES,
        Unit::Count,
        "Capture setup attempts that failed"
    );
    metrics::describe_counter!(
        BYTES_PUSHED,
        Unit::Bytes,
        "Transport stream bytes pushed into capture sessions"
    );
    metrics::describe_histogram!(
        PUSH_TIME_NS,
        Unit::Nanoseconds,
        "Time to demultiplex and deliver one pushed chunk"
    );
}

/// Record a sample handed to a callback.
#[inline]
pub fn record_sample_delivered(kind: MediaKind, bytes: u64) {
    let kind = kind.to_string();
    counter!(SAMPLES_DELIVERED, "kind" => kind.clone()).increment(1);
    counter!(BYTES_DELIVERED, "kind" => kind).increment(bytes);
}

/// Record a transport packet dropped by the demultiplexer.
#[inline]
pub fn record_packet_dropped(reason: &'static str) {
    counter!(PACKETS_DROPPED, "reason" => reason).increment(1);
}

/// Record a failed setup attempt.
#[inline]
pub fn record_setup_failure(step: &str) {
    counter!(SETUP_FAILURES, "step" => step.to_string()).increment(1);
}

/// Metrics collector for one capture session.
///
/// Counters are registered once with the device label attached.
#[derive(Clone)]
pub struct SessionMetrics {
    device: String,
    bytes_pushed: Counter,
    push_time: Histogram,
}

impl SessionMetrics {
    /// Create a collector for a device.
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            bytes_pushed: counter!(BYTES_PUSHED, "device" => device.to_string()),
            push_time: histogram!(PUSH_TIME_NS, "device" => device.to_string()),
        }
    }

    /// Record bytes pushed into the session.
    #[inline]
    pub fn record_push(&self, bytes: usize) {
        self.bytes_pushed.increment(bytes as u64);
    }

    /// Record the time spent on one push.
    #[inline]
    pub fn record_time(&self, duration: Duration) {
        self.push_time.record(duration.as_nanos() as f64);
    }

    /// Start a timer and return a guard that records on drop.
    pub fn start_timer(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            metrics: self,
        }
    }

    /// Get the device name.
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl std::fmt::Debug for SessionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMetrics")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Guard that records push time when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    metrics: &'a SessionMetrics,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.metrics.record_time(self.start.elapsed());
    }
}
