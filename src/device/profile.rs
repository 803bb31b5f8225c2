//! Device constants and stage naming.

use crate::format::{AudioCodec, AudioFormat, FrameInterval, VideoCodec, VideoFormat};

/// Fixed stream parameters of a capture device.
///
/// The device's demultiplexer exposes no stream metadata, so these values
/// are what its outputs are configured with. They are never negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Human-readable device name, used in logs.
    pub name: &'static str,
    /// Elementary video stream format.
    pub video: VideoFormat,
    /// Elementary audio stream format.
    pub audio: AudioFormat,
}

impl DeviceProfile {
    /// Hauppauge HD-PVR Rocket: 1080p29.97 H.264 with 48 kHz stereo AAC.
    pub const HD_PVR_ROCKET: Self = Self {
        name: "HD-PVR Rocket",
        video: VideoFormat::new(1920, 1080, FrameInterval::from_ticks(333_667), VideoCodec::H264),
        audio: AudioFormat::new(48_000, 16, 2, AudioCodec::Aac),
    };

    /// Replace the video format.
    pub fn with_video(mut self, video: VideoFormat) -> Self {
        self.video = video;
        self
    }

    /// Replace the audio format.
    pub fn with_audio(mut self, audio: AudioFormat) -> Self {
        self.audio = audio;
        self
    }

    /// Capture configuration reported for this profile.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            width: self.video.width,
            height: self.video.height,
            frame_interval: self.video.interval,
            format: self.video.codec,
            internal_format: self.video.codec,
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::HD_PVR_ROCKET
    }
}

/// Resolved video configuration of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame interval in 100 ns units.
    pub frame_interval: FrameInterval,
    /// Format delivered to the callback.
    pub format: VideoCodec,
    /// Format produced by the device.
    pub internal_format: VideoCodec,
}

/// Names stages are added to the pipeline under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageNames {
    /// Input routing stage.
    pub crossbar: String,
    /// The capture device.
    pub device: String,
    /// Hardware encoder.
    pub encoder: String,
    /// Transport-stream demultiplexer.
    pub demuxer: String,
    /// Video capture sink.
    pub video_sink: String,
    /// Audio capture sink.
    pub audio_sink: String,
}

impl Default for StageNames {
    fn default() -> Self {
        Self {
            crossbar: "HD-PVR Rocket Crossbar".into(),
            device: "HD-PVR Rocket".into(),
            encoder: "HD-PVR Rocket Encoder".into(),
            demuxer: "HD-PVR Rocket Demuxer".into(),
            video_sink: "Capture Filter".into(),
            audio_sink: "Audio Capture Filter".into(),
        }
    }
}

impl StageNames {
    /// Set the video sink name.
    pub fn with_video_sink(mut self, name: impl Into<String>) -> Self {
        self.video_sink = name.into();
        self
    }

    /// Prefix the four hardware-path names with a device label.
    pub fn for_device(label: &str) -> Self {
        Self {
            crossbar: format!("{label} Crossbar"),
            device: label.to_string(),
            encoder: format!("{label} Encoder"),
            demuxer: format!("{label} Demuxer"),
            ..Self::default()
        }
    }
}
