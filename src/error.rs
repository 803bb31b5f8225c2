//! Error types for rocketcap.

use crate::element::{HardwareMedium, PadDirection, StageCategory};
use thiserror::Error;

/// Result type alias using rocketcap's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for capture setup and delivery.
///
/// Every setup error is fatal for the attempt that produced it. Retrying the
/// same step cannot succeed; the caller has to discard the attempt and run
/// setup again from scratch.
#[derive(Error, Debug)]
pub enum Error {
    /// A stage has no pad with the requested direction (and name).
    #[error("stage '{stage}' has no {direction} pad{}", .name.as_deref().map(|n| format!(" named '{n}'")).unwrap_or_default())]
    EndpointNotFound {
        /// Stage that was searched.
        stage: String,
        /// Requested direction.
        direction: PadDirection,
        /// Requested pad name, if any.
        name: Option<String>,
    },

    /// A pad carries no hardware medium binding.
    #[error("pad '{pad}' on stage '{stage}' has no hardware medium")]
    NoHardwareMedium {
        /// Stage owning the pad.
        stage: String,
        /// Pad name.
        pad: String,
    },

    /// No registered stage of a category exposes the given medium.
    #[error("no {category} stage is bound to medium {medium}")]
    StageNotFound {
        /// Category that was searched.
        category: StageCategory,
        /// Medium that had to match.
        medium: HardwareMedium,
    },

    /// A stage could not be instantiated.
    #[error("failed to create stage '{name}': {reason}")]
    StageCreationFailed {
        /// Factory name of the stage.
        name: String,
        /// Reason for the failure.
        reason: String,
    },

    /// A demultiplexer output pad could not be created or tagged.
    #[error("failed to bind pad '{pad}'{}: {reason}", .stream_id.map(|id| format!(" to stream id {id:#x}")).unwrap_or_default())]
    BindingFailed {
        /// Pad being created or tagged.
        pad: String,
        /// Identifier value, when tagging.
        stream_id: Option<u16>,
        /// Reason for the failure.
        reason: String,
    },

    /// Two stages could not be connected.
    #[error("failed to connect '{upstream}' to '{downstream}': {reason}")]
    ConnectionFailed {
        /// Upstream stage name.
        upstream: String,
        /// Downstream stage name.
        downstream: String,
        /// Reason for the failure.
        reason: String,
    },

    /// Data was pushed into a session that cannot accept it.
    #[error("invalid stream: {0}")]
    InvalidStream(String),
}

impl Error {
    pub(crate) fn connection(
        upstream: impl Into<String>,
        downstream: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConnectionFailed {
            upstream: upstream.into(),
            downstream: downstream.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn binding(
        pad: impl Into<String>,
        stream_id: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Self::BindingFailed {
            pad: pad.into(),
            stream_id,
            reason: reason.into(),
        }
    }
}
