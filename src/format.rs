//! Media format descriptors for pads and samples.
//!
//! Formats here are descriptive only. The capture path never negotiates them:
//! the device's elementary streams have fixed, known shapes and the
//! demultiplexer pads are configured with those shapes directly.

use std::fmt;

// ============================================================================
// Timing
// ============================================================================

/// Duration of one frame in 100 ns units.
///
/// This is the unit capture drivers report frame timing in, so the device
/// constants are expressed with it directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FrameInterval(pub u64);

impl FrameInterval {
    /// Create an interval from a raw 100 ns tick count.
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Raw tick count.
    pub const fn ticks(&self) -> u64 {
        self.0
    }
}

// ============================================================================
// Codecs
// ============================================================================

/// Video codecs a capture device may emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VideoCodec {
    /// H.264 / AVC.
    H264,
    /// MPEG-2 video.
    Mpeg2,
}

/// Audio codecs a capture device may emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AudioCodec {
    /// AAC (ADTS framed).
    Aac,
    /// AC-3.
    Ac3,
    /// MPEG-1 layer II.
    Mpeg1Layer2,
    /// Uncompressed PCM.
    Pcm,
}

// ============================================================================
// Formats
// ============================================================================

/// Elementary video stream format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VideoFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Duration of one frame.
    pub interval: FrameInterval,
    /// Compression format.
    pub codec: VideoCodec,
}

impl VideoFormat {
    /// Create a new video format.
    pub const fn new(width: u32, height: u32, interval: FrameInterval, codec: VideoCodec) -> Self {
        Self {
            width,
            height,
            interval,
            codec,
        }
    }
}

/// Elementary audio stream format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Number of channels.
    pub channels: u16,
    /// Compression format.
    pub codec: AudioCodec,
}

impl AudioFormat {
    /// Create a new audio format.
    pub const fn new(
        sample_rate: u32,
        bits_per_sample: u16,
        channels: u16,
        codec: AudioCodec,
    ) -> Self {
        Self {
            sample_rate,
            bits_per_sample,
            channels,
            codec,
        }
    }

}

/// Kind of an elementary stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Video stream.
    Video,
    /// Audio stream.
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Format carried by a pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    /// Elementary video stream.
    Video(VideoFormat),
    /// Elementary audio stream.
    Audio(AudioFormat),
    /// MPEG transport stream.
    MpegTs,
}

impl MediaFormat {
    /// Elementary stream kind, `None` for multiplexed formats.
    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            Self::Video(_) => Some(MediaKind::Video),
            Self::Audio(_) => Some(MediaKind::Audio),
            Self::MpegTs => None,
        }
    }

    /// Check whether data in `self` can be accepted by a pad declaring `other`.
    pub fn compatible(&self, other: &MediaFormat) -> bool {
        self == other
    }
}

impl From<VideoFormat> for MediaFormat {
    fn from(format: VideoFormat) -> Self {
        Self::Video(format)
    }
}

impl From<AudioFormat> for MediaFormat {
    fn from(format: AudioFormat) -> Self {
        Self::Audio(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind() {
        let video = MediaFormat::from(VideoFormat::new(
            1280,
            720,
            FrameInterval::from_ticks(166_833),
            VideoCodec::H264,
        ));
        let audio = MediaFormat::from(AudioFormat::new(48000, 16, 2, AudioCodec::Aac));

        assert_eq!(video.kind(), Some(MediaKind::Video));
        assert_eq!(audio.kind(), Some(MediaKind::Audio));
        assert_eq!(MediaFormat::MpegTs.kind(), None);
    }

    #[test]
    fn test_compatibility_is_exact() {
        let a = MediaFormat::from(AudioFormat::new(48000, 16, 2, AudioCodec::Aac));
        let b = MediaFormat::from(AudioFormat::new(44100, 16, 2, AudioCodec::Aac));
        assert!(a.compatible(&a));
        assert!(!a.compatible(&b));
        assert!(!a.compatible(&MediaFormat::MpegTs));
    }
}
