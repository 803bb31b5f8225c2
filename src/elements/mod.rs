//! Software stages of the capture path.
//!
//! - [`TsDemux`]: splits the encoder's transport stream by fixed stream id
//! - [`StreamBinder`]: creates the demultiplexer's output pads and binds ids
//! - [`CaptureSink`]: hands samples to application callbacks

mod binder;
mod capture_sink;
mod ts_demux;

pub use binder::{DEMUX_AUDIO_PAD, DEMUX_VIDEO_PAD, OutputPad, StreamBinder};
pub use capture_sink::{CaptureSink, CaptureSinkStats, SampleCallback};
pub use ts_demux::{
    DemuxConfig, RoutedSample, StreamId, TS_PACKET_SIZE, TsDemux, TsDemuxStats, testing,
};
