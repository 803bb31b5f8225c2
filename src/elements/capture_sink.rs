//! Terminal stage handing samples to application code.

use crate::error::{Error, Result};
use crate::format::{AudioFormat, MediaFormat, MediaKind, VideoFormat};
use crate::observability;
use crate::sample::Sample;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback invoked once per delivered sample.
pub type SampleCallback = Box<dyn FnMut(Sample) + Send>;

/// A sink that forwards every sample to a callback.
///
/// Delivery is synchronous: [`CaptureSink::deliver`] returns only after the
/// callback has returned, and the callback is never entered by two threads at
/// once. A slow callback therefore slows the capture path down; it must not
/// block indefinitely. The sink neither buffers nor retries.
///
/// # Example
///
/// ```rust
/// use rocketcap::elements::CaptureSink;
/// use rocketcap::format::{FrameInterval, VideoCodec, VideoFormat};
///
/// let format = VideoFormat::new(1920, 1080, FrameInterval::from_ticks(333_667), VideoCodec::H264);
/// let sink = CaptureSink::video(format, |sample| {
///     println!("got {} bytes", sample.len());
/// });
/// assert_eq!(sink.stats().delivered, 0);
/// ```
pub struct CaptureSink {
    kind: MediaKind,
    format: MediaFormat,
    callback: Mutex<SampleCallback>,
    delivered: AtomicU64,
    bytes: AtomicU64,
    rejected: AtomicU64,
}

impl CaptureSink {
    /// Create a sink for video samples.
    pub fn video<F>(format: VideoFormat, callback: F) -> Self
    where
        F: FnMut(Sample) + Send + 'static,
    {
        Self::new(MediaKind::Video, format.into(), Box::new(callback))
    }

    /// Create a sink for audio samples.
    pub fn audio<F>(format: AudioFormat, callback: F) -> Self
    where
        F: FnMut(Sample) + Send + 'static,
    {
        Self::new(MediaKind::Audio, format.into(), Box::new(callback))
    }

    fn new(kind: MediaKind, format: MediaFormat, callback: SampleCallback) -> Self {
        Self {
            kind,
            format,
            callback: Mutex::new(callback),
            delivered: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Kind of samples this sink accepts.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Format of the sink's input pad.
    pub fn format(&self) -> MediaFormat {
        self.format
    }

    /// Hand one sample to the callback.
    ///
    /// Samples of the wrong kind are rejected without calling the callback.
    pub fn deliver(&self, sample: Sample) -> Result<()> {
        if sample.kind() != self.kind {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(Error::InvalidStream(format!(
                "{} sink received a {} sample",
                self.kind,
                sample.kind()
            )));
        }

        let len = sample.len() as u64;
        {
            let mut callback = self.callback.lock().unwrap();
            (*callback)(sample);
        }

        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len, Ordering::Relaxed);
        observability::record_sample_delivered(self.kind, len);
        Ok(())
    }

    /// Get statistics.
    pub fn stats(&self) -> CaptureSinkStats {
        CaptureSinkStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSink")
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics for a capture sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSinkStats {
    /// Samples handed to the callback.
    pub delivered: u64,
    /// Payload bytes handed to the callback.
    pub bytes: u64,
    /// Samples rejected for the wrong kind.
    pub rejected: u64,
}
