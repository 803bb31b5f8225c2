//! Capture graph construction.
//!
//! - [`Pipeline`]: the stage graph (a DAG)
//! - [`Link`]: a connection between two pads, direct or format-checked
//! - [`assemble`]: wires the device's hardware path in its fixed order
//!
//! Hardware stages of the capture device declare formats that do not agree
//! with each other, so they are linked by [`Pipeline::connect_direct`], which
//! trusts hardware-medium equality. Software stages downstream of the
//! demultiplexer use [`Pipeline::link_pads`], which checks formats.

mod assembler;
mod graph;

pub use assembler::{Connection, HardwarePath, assemble};
pub use graph::{Link, LinkId, LinkInfo, LinkKind, Node, NodeId, Pipeline, PipelineState};
