//! Samples delivered to capture callbacks.
//!
//! A [`Sample`] is one reassembled elementary-stream unit (a complete PES
//! packet) taken from the transport stream, together with routing metadata.

use crate::elements::StreamId;
use crate::format::MediaKind;
use bytes::Bytes;

/// Flags describing a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleFlags {
    /// Packets were lost between the previous sample on this stream and this one.
    pub discontinuity: bool,
    /// The unit was cut short by a flush rather than by the next unit start.
    pub truncated: bool,
}

/// Metadata associated with a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleMetadata {
    /// Stream identifier the payload was routed by.
    pub stream_id: StreamId,
    /// Kind of the stream.
    pub kind: MediaKind,
    /// Per-stream sequence number, starting at zero.
    pub sequence: u64,
    /// Sample flags.
    pub flags: SampleFlags,
}

impl SampleMetadata {
    /// Create metadata for the given stream.
    pub fn new(stream_id: StreamId, kind: MediaKind, sequence: u64) -> Self {
        Self {
            stream_id,
            kind,
            sequence,
            flags: SampleFlags::default(),
        }
    }
}

/// A delivered elementary-stream unit.
#[derive(Debug, Clone)]
pub struct Sample {
    data: Bytes,
    metadata: SampleMetadata,
}

impl Sample {
    /// Create a new sample.
    pub fn new(data: impl Into<Bytes>, metadata: SampleMetadata) -> Self {
        Self {
            data: data.into(),
            metadata,
        }
    }

    /// Payload bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample metadata.
    pub fn metadata(&self) -> &SampleMetadata {
        &self.metadata
    }

    /// Stream kind shortcut.
    pub fn kind(&self) -> MediaKind {
        self.metadata.kind
    }

    /// Consume the sample, returning its payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}
