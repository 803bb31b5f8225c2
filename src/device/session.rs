//! A running capture: pushes transport stream in, samples out.

use super::profile::CaptureConfig;
use crate::elements::{CaptureSink, CaptureSinkStats, RoutedSample, TsDemux, TsDemuxStats};
use crate::error::{Error, Result};
use crate::format::MediaKind;
use crate::observability::{self, SessionMetrics};
use crate::pipeline::{Pipeline, PipelineState};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Statistics for a capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Demultiplexer counters.
    pub demux: TsDemuxStats,
    /// Video sink counters.
    pub video: CaptureSinkStats,
    /// Audio sink counters, when audio is captured.
    pub audio: Option<CaptureSinkStats>,
    /// Samples routed to a pad without a sink.
    pub unclaimed: u64,
}

/// Result of a successful setup.
///
/// Owns every stage of the pipeline. The topology is fixed; dropping the
/// session tears the whole pipeline down at once.
///
/// `push` may be called from any thread. Calls are serialised, so samples
/// reach the callbacks one at a time and in stream order, and `push` returns
/// only after every callback it triggered has returned.
pub struct CaptureSession {
    device: String,
    config: CaptureConfig,
    pipeline: Pipeline,
    demux: Arc<TsDemux>,
    video: Arc<CaptureSink>,
    audio: Option<Arc<CaptureSink>>,
    /// Output pad name to sink.
    routes: HashMap<String, Arc<CaptureSink>>,
    delivery: Mutex<()>,
    unclaimed: AtomicU64,
    stopped: AtomicBool,
    metrics: SessionMetrics,
}

impl CaptureSession {
    pub(crate) fn new(
        device: String,
        config: CaptureConfig,
        pipeline: Pipeline,
        demux: Arc<TsDemux>,
        routes: Vec<(String, Arc<CaptureSink>)>,
    ) -> Result<Self> {
        let find = |kind: MediaKind| {
            routes
                .iter()
                .find(|(_, sink)| sink.kind() == kind)
                .map(|(_, sink)| Arc::clone(sink))
        };
        let video = find(MediaKind::Video)
            .ok_or_else(|| Error::InvalidStream("session has no video sink".into()))?;
        let audio = find(MediaKind::Audio);

        let metrics = SessionMetrics::new(&device);
        Ok(Self {
            device,
            config,
            pipeline,
            demux,
            video,
            audio,
            routes: routes.into_iter().collect(),
            delivery: Mutex::new(()),
            unclaimed: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            metrics,
        })
    }

    /// Resolved video configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The assembled pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Name of the device this session captures from.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Check if the session still accepts data.
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    /// Feed encoder output and deliver every completed sample.
    ///
    /// Returns the number of samples handed to callbacks.
    pub fn push(&self, data: &[u8]) -> Result<usize> {
        if !self.is_running() {
            return Err(Error::InvalidStream(format!(
                "capture session for '{}' is stopped",
                self.device
            )));
        }

        let _delivery = self.delivery.lock().unwrap();
        let _span = observability::span_delivery(&self.device, data.len()).entered();
        let _timer = self.metrics.start_timer();
        self.metrics.record_push(data.len());

        let routed = self.demux.push(data);
        self.dispatch(routed)
    }

    /// Deliver units still being reassembled, marked as truncated.
    pub fn flush(&self) -> Result<usize> {
        let _delivery = self.delivery.lock().unwrap();
        let routed = self.demux.flush();
        self.dispatch(routed)
    }

    fn dispatch(&self, routed: Vec<RoutedSample>) -> Result<usize> {
        let mut delivered = 0;
        for item in routed {
            match self.routes.get(&item.pad) {
                Some(sink) => {
                    sink.deliver(item.sample)?;
                    delivered += 1;
                }
                None => {
                    self.unclaimed.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(device = %self.device, pad = %item.pad, "no sink for sample");
                }
            }
        }
        Ok(delivered)
    }

    /// Flush pending units and stop accepting data.
    ///
    /// Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<SessionStats> {
        if self.stopped.load(Ordering::Acquire) {
            return Ok(self.stats());
        }
        let flushed = self.flush()?;
        self.stopped.store(true, Ordering::Release);
        self.pipeline.set_state(PipelineState::Stopped);

        observability::trace_state_change(&self.device, "Ready", "Stopped");
        let stats = self.stats();
        tracing::info!(
            device = %self.device,
            flushed,
            video_samples = stats.video.delivered,
            packets = stats.demux.packets,
            "capture stopped"
        );
        Ok(stats)
    }

    /// Get statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            demux: self.demux.stats(),
            video: self.video.stats(),
            audio: self.audio.as_ref().map(|sink| sink.stats()),
            unclaimed: self.unclaimed.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device)
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("running", &self.is_running())
            .finish()
    }
}
