//! Ordered wiring of the device's hardware path.

use super::graph::{LinkId, NodeId, Pipeline};
use crate::error::Result;
use std::fmt;

/// One of the three direct connections of the hardware path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connection {
    /// Crossbar output to device input.
    CrossbarToDevice,
    /// Device output to encoder input.
    DeviceToEncoder,
    /// Encoder output to demultiplexer input.
    EncoderToDemux,
}

impl Connection {
    /// The order connections are made in.
    pub const ORDER: [Connection; 3] = [
        Connection::CrossbarToDevice,
        Connection::DeviceToEncoder,
        Connection::EncoderToDemux,
    ];
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CrossbarToDevice => "crossbar to device",
            Self::DeviceToEncoder => "device to encoder",
            Self::EncoderToDemux => "encoder to demuxer",
        };
        f.write_str(s)
    }
}

/// The four stages of the hardware path, already added to a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwarePath {
    /// Input routing stage.
    pub crossbar: NodeId,
    /// The capture device.
    pub device: NodeId,
    /// Hardware encoder.
    pub encoder: NodeId,
    /// Transport-stream demultiplexer.
    pub demux: NodeId,
}

impl HardwarePath {
    /// Upstream and downstream stage of a connection.
    pub fn endpoints(&self, connection: Connection) -> (NodeId, NodeId) {
        match connection {
            Connection::CrossbarToDevice => (self.crossbar, self.device),
            Connection::DeviceToEncoder => (self.device, self.encoder),
            Connection::EncoderToDemux => (self.encoder, self.demux),
        }
    }

    /// Make one direct connection.
    pub fn connect(&self, pipeline: &mut Pipeline, connection: Connection) -> Result<LinkId> {
        let (upstream, downstream) = self.endpoints(connection);
        let id = pipeline.connect_direct(upstream, downstream)?;
        tracing::debug!(%connection, link = id.index(), "hardware path connected");
        Ok(id)
    }
}

/// Wire crossbar, device, encoder and demultiplexer in that order.
///
/// Each connection is made by hardware medium. The first failure stops the
/// assembly; links made before it stay in `pipeline`, which the caller is
/// expected to discard.
pub fn assemble(pipeline: &mut Pipeline, path: &HardwarePath) -> Result<[LinkId; 3]> {
    let [first, second, third] = Connection::ORDER;
    Ok([
        path.connect(pipeline, first)?,
        path.connect(pipeline, second)?,
        path.connect(pipeline, third)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{HardwareMedium, Pad, Stage, StageCategory};
    use crate::error::Error;
    use std::sync::Arc;

    fn medium(token: u64) -> HardwareMedium {
        HardwareMedium::standard(token)
    }

    fn build(encoder_input: u64) -> (Pipeline, HardwarePath) {
        let mut pipeline = Pipeline::new();
        let crossbar = pipeline
            .add_stage(
                Stage::hardware("crossbar", StageCategory::Crossbar)
                    .with_pad(Pad::output("Out").with_medium(medium(1))),
            )
            .unwrap();
        let device = pipeline
            .add_stage(
                Stage::hardware("device", StageCategory::Device)
                    .with_pad(Pad::input("In").with_medium(medium(1)))
                    .with_pad(Pad::output("Out").with_medium(medium(2))),
            )
            .unwrap();
        let encoder = pipeline
            .add_stage(
                Stage::hardware("encoder", StageCategory::Encoder)
                    .with_pad(Pad::input("In").with_medium(medium(encoder_input)))
                    .with_pad(Pad::output("TS")),
            )
            .unwrap();
        let demux = pipeline
            .add_stage(
                Stage::demultiplexer("demux", Arc::new(crate::elements::TsDemux::new())),
            )
            .unwrap();
        (
            pipeline,
            HardwarePath {
                crossbar,
                device,
                encoder,
                demux,
            },
        )
    }

    #[test]
    fn test_assemble_links_in_order() {
        let (mut pipeline, path) = build(2);
        let links = assemble(&mut pipeline, &path).unwrap();

        assert_eq!(pipeline.direct_link_count(), 3);
        let infos = pipeline.links();
        for (info, connection) in infos.iter().zip(Connection::ORDER) {
            assert_eq!((info.upstream, info.downstream), path.endpoints(connection));
        }
        assert_eq!(links.map(|l| l.index()), [0, 1, 2]);
    }

    #[test]
    fn test_assemble_stops_at_first_failure() {
        let (mut pipeline, path) = build(5);
        let err = assemble(&mut pipeline, &path).unwrap_err();

        assert!(matches!(
            err,
            Error::ConnectionFailed { ref upstream, ref downstream, .. }
                if upstream == "device" && downstream == "encoder"
        ));
        assert_eq!(pipeline.link_count(), 1);
    }

    #[test]
    fn test_connection_display() {
        assert_eq!(Connection::CrossbarToDevice.to_string(), "crossbar to device");
        assert_eq!(Connection::EncoderToDemux.to_string(), "encoder to demuxer");
    }
}
