//! # rocketcap
//!
//! Capture pipeline setup for devices whose hardware paths cannot be wired by
//! format negotiation.
//!
//! Devices of the HD-PVR Rocket class expose their input routing (crossbar)
//! and their encoder as separate stages with mutually incompatible declared
//! formats. rocketcap locates those stages by the hardware medium on the
//! device's pads, links them directly, feeds the encoder's transport stream
//! into a demultiplexer with fixed stream-id routing, and hands the resulting
//! video (and optionally audio) samples to application callbacks.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rocketcap::prelude::*;
//!
//! let session = RocketCapture::new(&registry, &factory)
//!     .setup(device, CaptureCallbacks::video(|sample| decode(sample.data())))?;
//!
//! // Feed encoder output as it arrives
//! while let Some(chunk) = driver.read()? {
//!     session.push(&chunk)?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod element;
pub mod elements;
pub mod error;
pub mod format;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod sample;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::device::{
        CaptureCallbacks, CaptureConfig, CaptureSession, DeviceProfile, RocketCapture, StageNames,
    };
    pub use crate::element::{HardwareMedium, Pad, PadDirection, Stage, StageCategory};
    pub use crate::elements::{CaptureSink, StreamId, TsDemux};
    pub use crate::error::{Error, Result};
    pub use crate::format::{AudioFormat, MediaFormat, MediaKind, VideoFormat};
    pub use crate::pipeline::Pipeline;
    pub use crate::registry::{MemoryRegistry, StageFactory, StageRegistry};
    pub use crate::sample::Sample;
}

pub use error::{Error, Result};
