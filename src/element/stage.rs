//! Processing stages.

use super::pad::{Pad, PadList};
use crate::elements::{CaptureSink, TsDemux};
use crate::format::MediaFormat;
use std::fmt;
use std::sync::Arc;

/// Name of a demultiplexer's transport-stream input pad.
pub const DEMUX_INPUT_PAD: &str = "MPEG-2 Stream";

/// Category a stage is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageCategory {
    /// Input routing hardware (tuner / crossbar).
    Crossbar,
    /// Hardware encoder producing the transport stream.
    Encoder,
    /// The capture device itself.
    Device,
    /// Software transport-stream demultiplexer.
    Demultiplexer,
    /// Terminal stage handing samples to the application.
    Sink,
}

impl fmt::Display for StageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Crossbar => "crossbar",
            Self::Encoder => "encoder",
            Self::Device => "device",
            Self::Demultiplexer => "demultiplexer",
            Self::Sink => "sink",
        };
        f.write_str(s)
    }
}

/// What runs behind a stage.
///
/// Hardware stages move data in the driver and are opaque here. Software
/// stages carry the engine that processes data once capture runs.
#[derive(Clone)]
pub enum StageKind {
    /// Driver-backed stage.
    Hardware,
    /// Transport-stream demultiplexer.
    Demultiplexer(Arc<TsDemux>),
    /// Capture sink.
    Sink(Arc<CaptureSink>),
}

impl fmt::Debug for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware => f.write_str("Hardware"),
            Self::Demultiplexer(_) => f.write_str("Demultiplexer"),
            Self::Sink(sink) => f.debug_tuple("Sink").field(&sink.kind()).finish(),
        }
    }
}

/// A processing stage with its pads.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    category: StageCategory,
    kind: StageKind,
    pads: PadList,
}

impl Stage {
    /// Create a hardware stage.
    pub fn hardware(name: impl Into<String>, category: StageCategory) -> Self {
        Self {
            name: name.into(),
            category,
            kind: StageKind::Hardware,
            pads: PadList::new(),
        }
    }

    /// Create a demultiplexer stage.
    ///
    /// It starts with a single transport-stream input and no outputs.
    pub fn demultiplexer(name: impl Into<String>, demux: Arc<TsDemux>) -> Self {
        Self {
            name: name.into(),
            category: StageCategory::Demultiplexer,
            kind: StageKind::Demultiplexer(demux),
            pads: PadList::new(),
        }
        .with_pad(Pad::input(DEMUX_INPUT_PAD).with_format(MediaFormat::MpegTs))
    }

    /// Create a sink stage with a single input pad.
    pub fn sink(name: impl Into<String>, sink: Arc<CaptureSink>) -> Self {
        let pad = Pad::input("In").with_format(sink.format());
        let mut stage = Self {
            name: name.into(),
            category: StageCategory::Sink,
            kind: StageKind::Sink(sink),
            pads: PadList::new(),
        };
        stage.add_pad(pad);
        stage
    }

    /// Add a pad (builder style).
    pub fn with_pad(mut self, pad: Pad) -> Self {
        self.add_pad(pad);
        self
    }

    /// Add a pad.
    pub fn add_pad(&mut self, pad: Pad) {
        self.pads.add(pad);
    }

    /// Stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the stage.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Stage category.
    pub fn category(&self) -> StageCategory {
        self.category
    }

    /// What runs behind the stage.
    pub fn kind(&self) -> &StageKind {
        &self.kind
    }

    /// Stage pads.
    pub fn pads(&self) -> &PadList {
        &self.pads
    }

    /// Demultiplexer engine, if this is a demultiplexer stage.
    pub fn demux(&self) -> Option<&Arc<TsDemux>> {
        match &self.kind {
            StageKind::Demultiplexer(demux) => Some(demux),
            _ => None,
        }
    }

    /// Capture sink, if this is a sink stage.
    pub fn capture_sink(&self) -> Option<&Arc<CaptureSink>> {
        match &self.kind {
            StageKind::Sink(sink) => Some(sink),
            _ => None,
        }
    }
}
