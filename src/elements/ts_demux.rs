//! Transport-stream demultiplexer with fixed stream-id routing.
//!
//! The capture device's encoder emits an MPEG transport stream without
//! usable program tables, so routing cannot be learned from the stream.
//! Instead each output pad is mapped to a fixed packet identifier up front
//! and packets are routed by that identifier alone.
//!
//! Payloads are reassembled into PES units: a unit starts at a packet with the
//! payload-unit-start flag and ends at the next such packet on the same
//! stream (or at [`TsDemux::flush`]).
//!
//! # Example
//!
//! ```rust
//! use rocketcap::elements::{StreamId, TsDemux};
//! use rocketcap::format::MediaKind;
//!
//! let demux = TsDemux::new();
//! demux.map_stream(StreamId::VIDEO, "Video", MediaKind::Video)?;
//!
//! // Feed transport stream data in chunks of any size
//! for routed in demux.push(&[0u8; 0]) {
//!     println!("{} -> {} bytes", routed.pad, routed.sample.len());
//! }
//! # Ok::<(), rocketcap::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::format::MediaKind;
use crate::observability;
use crate::sample::{Sample, SampleFlags, SampleMetadata};
use bytes::BytesMut;
use mpeg2ts_reader::packet::Packet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Size of a single MPEG-TS packet.
pub const TS_PACKET_SIZE: usize = 188;

/// Largest value a 13-bit packet identifier can take.
const MAX_PACKET_ID: u16 = 0x1FFF;

// ============================================================================
// Stream identifiers
// ============================================================================

/// Packet identifier an output pad is bound to.
///
/// [`StreamId::VIDEO`] and [`StreamId::AUDIO`] are what the device firmware
/// puts on its elementary streams. They are part of the wire contract with
/// the hardware and must change together with it, never on one side alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u16);

impl StreamId {
    /// Packet identifier of the device's video elementary stream.
    pub const VIDEO: Self = Self(0x7D1);
    /// Packet identifier of the device's audio elementary stream.
    pub const AUDIO: Self = Self(0x7D2);

    /// Create an identifier from a raw value.
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Raw value.
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// Whether the value fits the 13-bit packet identifier field.
    pub const fn is_valid(&self) -> bool {
        self.0 <= MAX_PACKET_ID
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// ============================================================================
// Configuration and statistics
// ============================================================================

/// Demultiplexer configuration.
#[derive(Debug, Clone)]
pub struct DemuxConfig {
    /// Largest PES unit that is reassembled before it is dropped as corrupt.
    pub max_unit_size: usize,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            max_unit_size: 4 * 1024 * 1024,
        }
    }
}

impl DemuxConfig {
    /// Set the maximum reassembled unit size.
    pub fn with_max_unit_size(mut self, size: usize) -> Self {
        self.max_unit_size = size;
        self
    }
}

/// Statistics for the demultiplexer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TsDemuxStats {
    /// Packets parsed.
    pub packets: u64,
    /// Bytes pushed.
    pub bytes: u64,
    /// Bytes skipped while searching for a sync byte.
    pub sync_errors: u64,
    /// Packets dropped for the transport error indicator.
    pub transport_errors: u64,
    /// Packets whose identifier is not mapped to a pad.
    pub unmapped_packets: u64,
    /// Continuity counter gaps.
    pub discontinuities: u64,
    /// Units handed out.
    pub units: u64,
    /// Units thrown away after loss, for size, or for a missing unit start.
    /// Each unit counts once however many of its packets are skipped.
    pub dropped_units: u64,
}

/// A reassembled unit together with the pad it is routed to.
#[derive(Debug, Clone)]
pub struct RoutedSample {
    /// Output pad name.
    pub pad: String,
    /// The unit.
    pub sample: Sample,
}

// ============================================================================
// Demultiplexer
// ============================================================================

struct Route {
    pad: String,
    stream_id: StreamId,
    kind: MediaKind,
    unit: Option<BytesMut>,
    sequence: u64,
    last_cc: Option<u8>,
    discontinuity: bool,
    /// Remaining packets of a discarded unit are ignored until the next unit start.
    skipping: bool,
}

impl Route {
    fn new(pad: &str, stream_id: StreamId, kind: MediaKind) -> Self {
        Self {
            pad: pad.to_string(),
            stream_id,
            kind,
            unit: None,
            sequence: 0,
            last_cc: None,
            discontinuity: false,
            skipping: false,
        }
    }

    /// Throw away the unit in progress. Returns whether there was one.
    fn discard(&mut self) -> bool {
        self.skipping = true;
        self.discontinuity = true;
        self.unit.take().is_some()
    }

    fn finish(&mut self, truncated: bool) -> Option<RoutedSample> {
        let unit = self.unit.take().filter(|u| !u.is_empty())?;
        let mut metadata = SampleMetadata::new(self.stream_id, self.kind, self.sequence);
        metadata.flags = SampleFlags {
            discontinuity: std::mem::take(&mut self.discontinuity),
            truncated,
        };
        self.sequence += 1;
        Some(RoutedSample {
            pad: self.pad.clone(),
            sample: Sample::new(unit.freeze(), metadata),
        })
    }
}

struct DemuxState {
    routes: HashMap<u16, Route>,
    pending: Vec<u8>,
    stats: TsDemuxStats,
}

/// Transport-stream demultiplexer routing by fixed packet identifier.
pub struct TsDemux {
    config: DemuxConfig,
    state: Mutex<DemuxState>,
}

impl TsDemux {
    /// Create a demultiplexer with default settings.
    pub fn new() -> Self {
        Self::with_config(DemuxConfig::default())
    }

    /// Create a demultiplexer with a specific configuration.
    pub fn with_config(config: DemuxConfig) -> Self {
        Self {
            config,
            state: Mutex::new(DemuxState {
                routes: HashMap::new(),
                pending: Vec::with_capacity(TS_PACKET_SIZE * 7),
                stats: TsDemuxStats::default(),
            }),
        }
    }

    /// Route packets carrying `stream_id` to the pad named `pad`.
    pub fn map_stream(&self, stream_id: StreamId, pad: &str, kind: MediaKind) -> Result<()> {
        if !stream_id.is_valid() {
            return Err(Error::binding(
                pad,
                Some(stream_id.value()),
                "outside the 13-bit packet id range",
            ));
        }

        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.routes.get(&stream_id.value()) {
            return Err(Error::binding(
                pad,
                Some(stream_id.value()),
                format!("already bound to pad '{}'", existing.pad),
            ));
        }
        state
            .routes
            .insert(stream_id.value(), Route::new(pad, stream_id, kind));
        Ok(())
    }

    /// Pad a stream identifier is routed to.
    pub fn pad_for(&self, stream_id: StreamId) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.routes.get(&stream_id.value()).map(|r| r.pad.clone())
    }

    /// All mapped stream identifiers, in ascending order.
    pub fn mapped_streams(&self) -> Vec<StreamId> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<StreamId> = state.routes.values().map(|r| r.stream_id).collect();
        ids.sort();
        ids
    }

    /// Feed transport-stream bytes.
    ///
    /// `data` may be any length; an incomplete trailing packet is kept and
    /// completed by the next call. Returns every unit completed by this data,
    /// in stream order.
    pub fn push(&self, data: &[u8]) -> Vec<RoutedSample> {
        let mut state = self.state.lock().unwrap();
        state.stats.bytes += data.len() as u64;

        let mut pending = std::mem::take(&mut state.pending);
        pending.extend_from_slice(data);

        let mut out = Vec::new();
        let mut offset = 0;
        while pending.len() - offset >= TS_PACKET_SIZE {
            // A lone 0x47 in garbage is not sync; confirm on the next
            // packet boundary whenever it is buffered.
            let next = offset + TS_PACKET_SIZE;
            let confirmed = next >= pending.len() || Packet::is_sync_byte(pending[next]);
            if !Packet::is_sync_byte(pending[offset]) || !confirmed {
                state.stats.sync_errors += 1;
                offset += 1;
                continue;
            }
            let chunk = &pending[offset..offset + TS_PACKET_SIZE];
            offset += TS_PACKET_SIZE;
            self.handle_packet(&mut state, chunk, &mut out);
        }

        pending.drain(..offset);
        state.pending = pending;
        out
    }

    /// Emit every partially assembled unit and drop any incomplete packet.
    pub fn flush(&self) -> Vec<RoutedSample> {
        let mut state = self.state.lock().unwrap();
        state.pending.clear();

        let mut ids: Vec<u16> = state.routes.keys().copied().collect();
        ids.sort_unstable();

        let mut out = Vec::new();
        for id in ids {
            if let Some(routed) = state.routes.get_mut(&id).and_then(|r| r.finish(true)) {
                out.push(routed);
            }
        }
        state.stats.units += out.len() as u64;
        out
    }

    /// Get statistics.
    pub fn stats(&self) -> TsDemuxStats {
        self.state.lock().unwrap().stats
    }

    fn handle_packet(&self, state: &mut DemuxState, chunk: &[u8], out: &mut Vec<RoutedSample>) {
        let Some(packet) = Packet::try_new(chunk) else {
            state.stats.sync_errors += 1;
            return;
        };
        state.stats.packets += 1;

        if packet.transport_error_indicator() {
            state.stats.transport_errors += 1;
            observability::record_packet_dropped("transport_error");
            return;
        }

        let pid = u16::from(packet.pid());
        let Some(route) = state.routes.get_mut(&pid) else {
            state.stats.unmapped_packets += 1;
            observability::record_packet_dropped("unmapped");
            return;
        };

        // Adaptation-field-only packets carry no data and do not advance the
        // continuity counter.
        let Some(payload) = packet.payload() else {
            return;
        };

        let cc = packet.continuity_counter().count();
        match route.last_cc {
            Some(last) if last == cc => {
                // Duplicate packet; the standard allows one retransmission.
                return;
            }
            Some(last) if (last + 1) & 0x0F != cc => {
                state.stats.discontinuities += 1;
                if route.discard() {
                    state.stats.dropped_units += 1;
                }
                tracing::debug!(
                    stream_id = %route.stream_id,
                    expected = (last + 1) & 0x0F,
                    got = cc,
                    "continuity counter gap"
                );
            }
            _ => {}
        }
        route.last_cc = Some(cc);

        if packet.payload_unit_start_indicator() {
            if let Some(routed) = route.finish(false) {
                state.stats.units += 1;
                out.push(routed);
            }
            route.skipping = false;
            if payload.len() > self.config.max_unit_size {
                self.drop_oversized(&mut state.stats, route);
                return;
            }
            let mut unit = BytesMut::with_capacity(payload.len().max(TS_PACKET_SIZE));
            unit.extend_from_slice(payload);
            route.unit = Some(unit);
            return;
        }

        match route.unit.as_mut() {
            Some(unit) if unit.len() + payload.len() > self.config.max_unit_size => {
                self.drop_oversized(&mut state.stats, route);
            }
            Some(unit) => unit.extend_from_slice(payload),
            None if route.skipping => {}
            // Continuation of a unit whose start was never seen.
            None => {
                route.skipping = true;
                state.stats.dropped_units += 1;
            }
        }
    }

    fn drop_oversized(&self, stats: &mut TsDemuxStats, route: &mut Route) {
        route.discard();
        stats.dropped_units += 1;
        tracing::warn!(
            stream_id = %route.stream_id,
            max = self.config.max_unit_size,
            "dropping oversized unit"
        );
    }
}

impl Default for TsDemux {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TsDemux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("TsDemux")
            .field("routes", &state.routes.len())
            .field("pending", &state.pending.len())
            .field("stats", &state.stats)
            .finish()
    }
}

/// Build transport-stream packets for tests and benchmarks.
#[doc(hidden)]
pub mod testing {
    use super::TS_PACKET_SIZE;

    /// Build one packet with the given identifier, flags and payload.
    ///
    /// Payloads shorter than the packet body are padded with an adaptation
    /// field so the payload ends exactly at the end of the packet.
    pub fn packet(pid: u16, pusi: bool, cc: u8, payload: &[u8]) -> [u8; TS_PACKET_SIZE] {
        assert!(payload.len() <= TS_PACKET_SIZE - 4);
        let mut buf = [0xFFu8; TS_PACKET_SIZE];
        buf[0] = 0x47;
        buf[1] = ((pid >> 8) as u8 & 0x1F) | if pusi { 0x40 } else { 0 };
        buf[2] = pid as u8;

        let body = TS_PACKET_SIZE - 4;
        if payload.len() == body {
            buf[3] = 0x10 | (cc & 0x0F);
            buf[4..].copy_from_slice(payload);
        } else {
            // Adaptation field followed by payload.
            buf[3] = 0x30 | (cc & 0x0F);
            let af_len = body - payload.len() - 1;
            buf[4] = af_len as u8;
            if af_len > 0 {
                buf[5] = 0x00;
            }
            buf[TS_PACKET_SIZE - payload.len()..].copy_from_slice(payload);
        }
        buf
    }

    /// Split a unit into consecutive packets on one identifier.
    pub fn packetize(pid: u16, first_cc: u8, unit: &[u8]) -> Vec<u8> {
        let body = TS_PACKET_SIZE - 4;
        let mut out = Vec::new();
        let mut cc = first_cc;
        for (i, chunk) in unit.chunks(body - 1).enumerate() {
            out.extend_from_slice(&packet(pid, i == 0, cc, chunk));
            cc = (cc + 1) & 0x0F;
        }
        out
    }
}
