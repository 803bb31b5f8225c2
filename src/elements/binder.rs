//! Demultiplexer output configuration and stream-id binding.

use super::ts_demux::{StreamId, TsDemux};
use crate::element::{Pad, Stage};
use crate::error::{Error, Result};
use crate::format::{AudioFormat, MediaFormat, MediaKind, VideoFormat};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Name of the demultiplexer's video output pad.
pub const DEMUX_VIDEO_PAD: &str = "Video";
/// Name of the demultiplexer's audio output pad.
pub const DEMUX_AUDIO_PAD: &str = "Audio";

static NEXT_BINDER: AtomicU64 = AtomicU64::new(1);

/// Handle to an output pad created by a [`StreamBinder`].
///
/// Handles can only be obtained from a binder, and a binder only accepts
/// its own handles, so a stream id is never bound to a pad the binder did
/// not configure.
///
/// ```compile_fail
/// use rocketcap::element::Pad;
/// use rocketcap::elements::OutputPad;
///
/// let forged = OutputPad { pad: Pad::output("Video"), binder: 1 };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPad {
    pad: Pad,
    binder: u64,
}

impl OutputPad {
    /// The pad as added to the demultiplexer stage.
    pub fn pad(&self) -> &Pad {
        &self.pad
    }

    /// Pad name.
    pub fn name(&self) -> &str {
        self.pad.name()
    }
}

/// Creates a demultiplexer's output pads and tags them with stream ids.
///
/// The device publishes no stream metadata, so pad formats are the device's
/// fixed constants and the routing identifiers are the firmware's fixed
/// packet ids. A binder only tags pads it created itself, and an identifier
/// can be bound once per demultiplexer.
pub struct StreamBinder {
    id: u64,
    demux: Arc<TsDemux>,
    stage: String,
    bound: HashMap<String, StreamId>,
}

impl StreamBinder {
    /// Create a binder for a demultiplexer stage.
    pub fn new(stage: &Stage) -> Result<Self> {
        let demux = stage.demux().ok_or_else(|| Error::StageCreationFailed {
            name: stage.name().to_string(),
            reason: "stage is not a demultiplexer".into(),
        })?;
        Ok(Self {
            id: NEXT_BINDER.fetch_add(1, Ordering::Relaxed),
            demux: Arc::clone(demux),
            stage: stage.name().to_string(),
            bound: HashMap::new(),
        })
    }

    /// Create the video output pad with a fixed format.
    pub fn configure_video_output(
        &mut self,
        demux: &mut Stage,
        format: VideoFormat,
    ) -> Result<OutputPad> {
        self.configure_output(demux, DEMUX_VIDEO_PAD, format.into())
    }

    /// Create the audio output pad with a fixed format.
    pub fn configure_audio_output(
        &mut self,
        demux: &mut Stage,
        format: AudioFormat,
    ) -> Result<OutputPad> {
        self.configure_output(demux, DEMUX_AUDIO_PAD, format.into())
    }

    fn configure_output(
        &mut self,
        demux: &mut Stage,
        name: &str,
        format: MediaFormat,
    ) -> Result<OutputPad> {
        let same_stage = demux
            .demux()
            .is_some_and(|engine| Arc::ptr_eq(engine, &self.demux));
        if !same_stage {
            return Err(Error::binding(
                name,
                None,
                format!("stage '{}' is not the demultiplexer this binder serves", demux.name()),
            ));
        }
        if demux.pads().get(name).is_some() {
            return Err(Error::binding(name, None, "pad already exists"));
        }

        let pad = Pad::output(name).with_format(format);
        demux.add_pad(pad.clone());
        tracing::debug!(stage = %self.stage, pad = %name, ?format, "created demultiplexer output");
        Ok(OutputPad {
            pad,
            binder: self.id,
        })
    }

    /// Route packets carrying `id` to `pad`.
    pub fn bind_stream_identifier(&mut self, output: &OutputPad, id: StreamId) -> Result<()> {
        let pad = output.pad();
        if output.binder != self.id {
            return Err(Error::binding(
                pad.name(),
                Some(id.value()),
                "pad was not created by this binder",
            ));
        }
        if let Some(existing) = self.bound.get(pad.name()) {
            return Err(Error::binding(
                pad.name(),
                Some(id.value()),
                format!("pad already carries stream id {existing}"),
            ));
        }

        let kind = pad
            .format()
            .and_then(MediaFormat::kind)
            .unwrap_or(MediaKind::Video);
        self.demux.map_stream(id, pad.name(), kind)?;
        self.bound.insert(pad.name().to_string(), id);

        tracing::debug!(stage = %self.stage, pad = %pad.name(), stream_id = %id, "bound stream id");
        Ok(())
    }

    /// Demultiplexer engine the binder routes into.
    pub fn demux(&self) -> &Arc<TsDemux> {
        &self.demux
    }

    /// Stream id bound to a pad, if any.
    pub fn stream_id(&self, pad: &str) -> Option<StreamId> {
        self.bound.get(pad).copied()
    }

    /// Number of bound identifiers.
    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AudioCodec, FrameInterval, VideoCodec};

    fn video() -> VideoFormat {
        VideoFormat::new(1920, 1080, FrameInterval::from_ticks(333_667), VideoCodec::H264)
    }

    fn audio() -> AudioFormat {
        AudioFormat::new(48000, 16, 2, AudioCodec::Aac)
    }

    fn demux_stage() -> Stage {
        Stage::demultiplexer("demux", Arc::new(TsDemux::new()))
    }

    #[test]
    fn test_configure_outputs() {
        let mut stage = demux_stage();
        let mut binder = StreamBinder::new(&stage).unwrap();

        let v = binder.configure_video_output(&mut stage, video()).unwrap();
        let a = binder.configure_audio_output(&mut stage, audio()).unwrap();

        assert_eq!(v.name(), DEMUX_VIDEO_PAD);
        assert_eq!(a.name(), DEMUX_AUDIO_PAD);
        assert!(v.pad().is_output());
        assert_eq!(v.pad().format(), Some(&MediaFormat::Video(video())));
        assert_eq!(stage.pads().outputs().count(), 2);
    }

    #[test]
    fn test_configure_twice_fails() {
        let mut stage = demux_stage();
        let mut binder = StreamBinder::new(&stage).unwrap();
        binder.configure_video_output(&mut stage, video()).unwrap();
        let err = binder.configure_video_output(&mut stage, video()).unwrap_err();
        assert!(matches!(err, Error::BindingFailed { stream_id: None, .. }));
    }

    #[test]
    fn test_configure_foreign_stage_fails() {
        let stage = demux_stage();
        let mut other = demux_stage();
        let mut binder = StreamBinder::new(&stage).unwrap();
        assert!(binder.configure_video_output(&mut other, video()).is_err());
        assert_eq!(other.pads().outputs().count(), 0);
    }

    #[test]
    fn test_binder_requires_demux_stage() {
        let stage = Stage::hardware("encoder", crate::element::StageCategory::Encoder);
        assert!(matches!(
            StreamBinder::new(&stage),
            Err(Error::StageCreationFailed { .. })
        ));
    }

    #[test]
    fn test_bind_routes_stream() {
        let mut stage = demux_stage();
        let mut binder = StreamBinder::new(&stage).unwrap();
        let v = binder.configure_video_output(&mut stage, video()).unwrap();

        binder.bind_stream_identifier(&v, StreamId::VIDEO).unwrap();

        assert_eq!(binder.stream_id(DEMUX_VIDEO_PAD), Some(StreamId::VIDEO));
        assert_eq!(
            stage.demux().unwrap().pad_for(StreamId::VIDEO).as_deref(),
            Some(DEMUX_VIDEO_PAD)
        );
    }

    #[test]
    fn test_same_id_on_two_pads_fails() {
        let mut stage = demux_stage();
        let mut binder = StreamBinder::new(&stage).unwrap();
        let v = binder.configure_video_output(&mut stage, video()).unwrap();
        let a = binder.configure_audio_output(&mut stage, audio()).unwrap();

        binder.bind_stream_identifier(&v, StreamId::VIDEO).unwrap();
        let err = binder.bind_stream_identifier(&a, StreamId::VIDEO).unwrap_err();

        assert!(matches!(err, Error::BindingFailed { stream_id: Some(0x7D1), .. }));
        assert_eq!(binder.bound_count(), 1);
        assert_eq!(binder.stream_id(DEMUX_AUDIO_PAD), None);
    }

    #[test]
    fn test_pad_from_other_binder_fails() {
        let mut stage = demux_stage();
        let mut binder = StreamBinder::new(&stage).unwrap();
        binder.configure_video_output(&mut stage, video()).unwrap();

        // Same name and format, but configured by a different binder
        let mut other_stage = demux_stage();
        let mut other = StreamBinder::new(&other_stage).unwrap();
        let foreign = other.configure_video_output(&mut other_stage, video()).unwrap();

        let err = binder.bind_stream_identifier(&foreign, StreamId::VIDEO).unwrap_err();
        assert!(matches!(err, Error::BindingFailed { .. }));
        assert_eq!(binder.bound_count(), 0);
        assert!(stage.demux().unwrap().mapped_streams().is_empty());
        assert!(other_stage.demux().unwrap().mapped_streams().is_empty());
    }

    #[test]
    fn test_second_binder_on_same_stage_rejects_first_binders_pad() {
        let mut stage = demux_stage();
        let mut first = StreamBinder::new(&stage).unwrap();
        let v = first.configure_video_output(&mut stage, video()).unwrap();

        let mut second = StreamBinder::new(&stage).unwrap();
        assert!(second.bind_stream_identifier(&v, StreamId::VIDEO).is_err());
        assert!(first.bind_stream_identifier(&v, StreamId::VIDEO).is_ok());
    }

    #[test]
    fn test_pad_bound_once() {
        let mut stage = demux_stage();
        let mut binder = StreamBinder::new(&stage).unwrap();
        let a = binder.configure_audio_output(&mut stage, audio()).unwrap();

        binder.bind_stream_identifier(&a, StreamId::AUDIO).unwrap();
        assert!(binder.bind_stream_identifier(&a, StreamId::new(0x7D3)).is_err());
        assert_eq!(
            stage.demux().unwrap().mapped_streams(),
            vec![StreamId::AUDIO]
        );
    }

    #[test]
    fn test_out_of_range_id_fails() {
        let mut stage = demux_stage();
        let mut binder = StreamBinder::new(&stage).unwrap();
        let v = binder.configure_video_output(&mut stage, video()).unwrap();
        assert!(binder.bind_stream_identifier(&v, StreamId::new(0x2000)).is_err());
        assert_eq!(binder.bound_count(), 0);
    }
}
