//! Capture setup for devices with split hardware paths.
//!
//! The HD-PVR Rocket class of devices publishes its input routing (crossbar)
//! and its encoder as separate stages whose declared formats never agree, so
//! the usual format-driven graph building cannot wire them. Setup instead
//! follows the hardware media on the device's own pads:
//!
//! 1. read the media of the device's input and output pads
//! 2. find the crossbar and encoder stages owning those media
//! 3. create the demultiplexer and give it fixed video/audio outputs
//! 4. add the stages and link crossbar → device → encoder → demultiplexer
//! 5. bind the fixed stream ids and attach the capture sinks
//!
//! The first failing step aborts setup; nothing of the partial pipeline
//! survives.
//!
//! # Example
//!
//! ```rust
//! use rocketcap::device::{CaptureCallbacks, RocketCapture};
//! use rocketcap::element::{HardwareMedium, Pad, Stage, StageCategory};
//! use rocketcap::registry::{MemoryRegistry, StageFactory};
//!
//! let input = HardwareMedium::standard(1);
//! let output = HardwareMedium::standard(2);
//!
//! let registry = MemoryRegistry::new();
//! registry.register(
//!     Stage::hardware("Crossbar", StageCategory::Crossbar)
//!         .with_pad(Pad::output("Video Decoder Out").with_medium(input)),
//! );
//! registry.register(
//!     Stage::hardware("Encoder", StageCategory::Encoder)
//!         .with_pad(Pad::input("Video In").with_medium(output))
//!         .with_pad(Pad::output("TS Out")),
//! );
//! let factory = StageFactory::new();
//!
//! let device = Stage::hardware("Rocket", StageCategory::Device)
//!     .with_pad(Pad::input("Analog In").with_medium(input))
//!     .with_pad(Pad::output("Capture Out").with_medium(output));
//!
//! let session = RocketCapture::new(&registry, &factory)
//!     .setup(device, CaptureCallbacks::video(|sample| println!("{} bytes", sample.len())))?;
//!
//! assert_eq!(session.config().width, 1920);
//! assert_eq!(session.pipeline().direct_link_count(), 3);
//! # Ok::<(), rocketcap::Error>(())
//! ```

mod profile;
mod session;

pub use profile::{CaptureConfig, DeviceProfile, StageNames};
pub use session::{CaptureSession, SessionStats};

use crate::element::{PadDirection, Stage, StageCategory, locate_medium};
use crate::elements::{
    CaptureSink, DEMUX_AUDIO_PAD, DEMUX_VIDEO_PAD, SampleCallback, StreamBinder, StreamId,
};
use crate::error::Result;
use crate::format::MediaKind;
use crate::observability;
use crate::pipeline::{Connection, HardwarePath, NodeId, Pipeline, PipelineState};
use crate::registry::{StageFactory, StageRegistry, StageResolver};
use crate::sample::Sample;
use std::fmt;
use std::sync::Arc;

/// Input pad name of capture sink stages.
const SINK_INPUT_PAD: &str = "In";

/// One step of capture setup.
///
/// Displays as the message logged when the step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    /// Reading the medium of the device's input pad.
    DeviceInputMedium,
    /// Reading the medium of the device's output pad.
    DeviceOutputMedium,
    /// Finding the crossbar by medium.
    FindCrossbar,
    /// Finding the encoder by medium.
    FindEncoder,
    /// Creating the demultiplexer.
    CreateDemuxer,
    /// Creating a demultiplexer output.
    ConfigureOutput(MediaKind),
    /// Adding a stage to the pipeline.
    AddStage(StageCategory),
    /// Making one hardware-path connection.
    Connect(Connection),
    /// Binding a stream id.
    BindStream(MediaKind),
    /// Linking a capture sink to the demultiplexer.
    LinkSink(MediaKind),
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceInputMedium => f.write_str("failed to get device input medium"),
            Self::DeviceOutputMedium => f.write_str("failed to get device output medium"),
            Self::FindCrossbar => f.write_str("failed to get crossbar stage"),
            Self::FindEncoder => f.write_str("failed to get encoder stage"),
            Self::CreateDemuxer => f.write_str("failed to create demuxer"),
            Self::ConfigureOutput(kind) => write!(f, "failed to create demuxer {kind} output"),
            Self::AddStage(category) => write!(f, "failed to add {category} to pipeline"),
            Self::Connect(connection) => write!(f, "failed to connect {connection}"),
            Self::BindStream(kind) => write!(f, "failed to map demuxer {kind} stream id"),
            Self::LinkSink(kind) => write!(f, "failed to connect {kind} capture sink"),
        }
    }
}

/// Callbacks receiving captured samples.
pub struct CaptureCallbacks {
    video: SampleCallback,
    audio: Option<SampleCallback>,
}

impl CaptureCallbacks {
    /// Capture video only.
    pub fn video<F>(callback: F) -> Self
    where
        F: FnMut(Sample) + Send + 'static,
    {
        Self {
            video: Box::new(callback),
            audio: None,
        }
    }

    /// Also capture audio.
    pub fn with_audio<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Sample) + Send + 'static,
    {
        self.audio = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for CaptureCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureCallbacks")
            .field("audio", &self.audio.is_some())
            .finish_non_exhaustive()
    }
}

/// Capture setup entry point.
pub struct RocketCapture<'a> {
    registry: &'a dyn StageRegistry,
    factory: &'a StageFactory,
    profile: DeviceProfile,
    names: StageNames,
}

impl<'a> RocketCapture<'a> {
    /// Create a setup over a stage registry and factory.
    pub fn new(registry: &'a dyn StageRegistry, factory: &'a StageFactory) -> Self {
        Self {
            registry,
            factory,
            profile: DeviceProfile::default(),
            names: StageNames::default(),
        }
    }

    /// Use a different device profile.
    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Use different stage names.
    pub fn with_names(mut self, names: StageNames) -> Self {
        self.names = names;
        self
    }

    /// Build the capture pipeline around `device`.
    ///
    /// Each step is checked as soon as it runs; the first failure is logged
    /// with the step that failed and returned. No session exists afterwards.
    pub fn setup(&self, mut device: Stage, callbacks: CaptureCallbacks) -> Result<CaptureSession> {
        let _span = observability::instrument_setup(self.profile.name);
        let run = |step: SetupStep| Step { device: self.profile.name, step };

        // Hardware path discovery
        let input = run(SetupStep::DeviceInputMedium)
            .check(locate_medium(&device, PadDirection::Input))?;
        let output = run(SetupStep::DeviceOutputMedium)
            .check(locate_medium(&device, PadDirection::Output))?;

        let resolver = StageResolver::new(self.registry, self.factory);
        let mut crossbar = run(SetupStep::FindCrossbar)
            .check(resolver.find_by_medium(StageCategory::Crossbar, input))?;
        let mut encoder = run(SetupStep::FindEncoder)
            .check(resolver.find_by_medium(StageCategory::Encoder, output))?;
        let mut demux = run(SetupStep::CreateDemuxer)
            .check(resolver.create_demultiplexer(&self.names.demuxer))?;

        // Fixed demultiplexer outputs
        let mut binder = run(SetupStep::CreateDemuxer).check(StreamBinder::new(&demux))?;
        let video_pad = run(SetupStep::ConfigureOutput(MediaKind::Video))
            .check(binder.configure_video_output(&mut demux, self.profile.video))?;
        let audio_pad = run(SetupStep::ConfigureOutput(MediaKind::Audio))
            .check(binder.configure_audio_output(&mut demux, self.profile.audio))?;
        let engine = Arc::clone(binder.demux());

        // Assembly
        crossbar.set_name(&self.names.crossbar);
        device.set_name(&self.names.device);
        encoder.set_name(&self.names.encoder);

        let mut pipeline = Pipeline::new();
        let path = HardwarePath {
            crossbar: run(SetupStep::AddStage(StageCategory::Crossbar))
                .check(pipeline.add_stage(crossbar))?,
            device: run(SetupStep::AddStage(StageCategory::Device))
                .check(pipeline.add_stage(device))?,
            encoder: run(SetupStep::AddStage(StageCategory::Encoder))
                .check(pipeline.add_stage(encoder))?,
            demux: run(SetupStep::AddStage(StageCategory::Demultiplexer))
                .check(pipeline.add_stage(demux))?,
        };
        for connection in Connection::ORDER {
            run(SetupStep::Connect(connection)).check(path.connect(&mut pipeline, connection))?;
        }

        // Stream routing
        run(SetupStep::BindStream(MediaKind::Video))
            .check(binder.bind_stream_identifier(&video_pad, StreamId::VIDEO))?;
        run(SetupStep::BindStream(MediaKind::Audio))
            .check(binder.bind_stream_identifier(&audio_pad, StreamId::AUDIO))?;

        // Sinks
        let mut routes = Vec::with_capacity(2);
        let video_sink = Arc::new(CaptureSink::video(self.profile.video, callbacks.video));
        self.attach_sink(
            &mut pipeline,
            path.demux,
            &self.names.video_sink,
            DEMUX_VIDEO_PAD,
            &video_sink,
        )?;
        routes.push((DEMUX_VIDEO_PAD.to_string(), video_sink));

        if let Some(callback) = callbacks.audio {
            let audio_sink = Arc::new(CaptureSink::audio(self.profile.audio, callback));
            self.attach_sink(
                &mut pipeline,
                path.demux,
                &self.names.audio_sink,
                DEMUX_AUDIO_PAD,
                &audio_sink,
            )?;
            routes.push((DEMUX_AUDIO_PAD.to_string(), audio_sink));
        }

        pipeline.set_state(PipelineState::Ready);
        let config = self.profile.capture_config();
        tracing::info!(
            device = %self.profile.name,
            width = config.width,
            height = config.height,
            interval = config.frame_interval.ticks(),
            stages = pipeline.stage_count(),
            links = pipeline.link_count(),
            "capture pipeline ready"
        );

        CaptureSession::new(self.names.device.clone(), config, pipeline, engine, routes)
    }

    fn attach_sink(
        &self,
        pipeline: &mut Pipeline,
        demux: NodeId,
        name: &str,
        pad: &str,
        sink: &Arc<CaptureSink>,
    ) -> Result<()> {
        let kind = sink.kind();
        let step = Step {
            device: self.profile.name,
            step: SetupStep::AddStage(StageCategory::Sink),
        };
        let id = step.check(pipeline.add_stage(Stage::sink(name, Arc::clone(sink))))?;

        let step = Step {
            device: self.profile.name,
            step: SetupStep::LinkSink(kind),
        };
        step.check(pipeline.link_pads(demux, pad, id, SINK_INPUT_PAD))?;
        Ok(())
    }
}

impl fmt::Debug for RocketCapture<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocketCapture")
            .field("profile", &self.profile)
            .field("names", &self.names)
            .field("factory", self.factory)
            .finish_non_exhaustive()
    }
}

/// A setup step about to be checked.
struct Step<'a> {
    device: &'a str,
    step: SetupStep,
}

impl Step<'_> {
    fn check<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                observability::trace_step(self.device, &StepName(self.step));
                Ok(value)
            }
            Err(err) => {
                observability::trace_step_failed(self.device, &self.step, &err);
                observability::record_setup_failure(&self.step.to_string());
                Err(err)
            }
        }
    }
}

/// Step label for success logs, without the failure wording.
struct StepName(SetupStep);

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.to_string();
        f.write_str(text.strip_prefix("failed to ").unwrap_or(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{HardwareMedium, Pad};
    use crate::error::Error;
    use crate::registry::MemoryRegistry;

    const INPUT: HardwareMedium = HardwareMedium::standard(0x10);
    const OUTPUT: HardwareMedium = HardwareMedium::standard(0x20);

    fn registry() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.register(
            Stage::hardware("Rocket Crossbar", StageCategory::Crossbar)
                .with_pad(Pad::output("Video Decoder Out").with_medium(INPUT)),
        );
        registry.register(
            Stage::hardware("Rocket Encoder", StageCategory::Encoder)
                .with_pad(Pad::input("Video In").with_medium(OUTPUT))
                .with_pad(Pad::output("TS Out")),
        );
        registry
    }

    fn device() -> Stage {
        Stage::hardware("Rocket", StageCategory::Device)
            .with_pad(Pad::input("Analog In").with_medium(INPUT))
            .with_pad(Pad::output("Capture Out").with_medium(OUTPUT))
    }

    #[test]
    fn test_setup_step_messages() {
        assert_eq!(SetupStep::FindCrossbar.to_string(), "failed to get crossbar stage");
        assert_eq!(
            SetupStep::Connect(Connection::DeviceToEncoder).to_string(),
            "failed to connect device to encoder"
        );
        assert_eq!(
            SetupStep::BindStream(MediaKind::Audio).to_string(),
            "failed to map demuxer audio stream id"
        );
        assert_eq!(StepName(SetupStep::FindEncoder).to_string(), "get encoder stage");
    }

    #[test]
    fn test_setup_names_stages() {
        let registry = registry();
        let factory = StageFactory::new();
        let session = RocketCapture::new(&registry, &factory)
            .setup(device(), CaptureCallbacks::video(|_| {}))
            .unwrap();

        let names = StageNames::default();
        let pipeline = session.pipeline();
        for name in [
            &names.crossbar,
            &names.device,
            &names.encoder,
            &names.demuxer,
            &names.video_sink,
        ] {
            assert!(pipeline.get_stage_id(name).is_some(), "missing {name}");
        }
        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert_eq!(session.device(), "HD-PVR Rocket");
    }

    #[test]
    fn test_setup_with_audio_adds_sink() {
        let registry = registry();
        let factory = StageFactory::new();
        let session = RocketCapture::new(&registry, &factory)
            .setup(device(), CaptureCallbacks::video(|_| {}).with_audio(|_| {}))
            .unwrap();

        let pipeline = session.pipeline();
        assert_eq!(pipeline.stage_count(), 6);
        assert_eq!(pipeline.link_count(), 5);
        assert_eq!(pipeline.direct_link_count(), 3);
        assert!(session.stats().audio.is_some());
    }

    #[test]
    fn test_device_without_output_medium() {
        let registry = registry();
        let factory = StageFactory::new();
        let device = Stage::hardware("Rocket", StageCategory::Device)
            .with_pad(Pad::input("Analog In").with_medium(INPUT))
            .with_pad(Pad::output("Capture Out"));

        let err = RocketCapture::new(&registry, &factory)
            .setup(device, CaptureCallbacks::video(|_| {}))
            .unwrap_err();
        assert!(matches!(err, Error::NoHardwareMedium { ref pad, .. } if pad == "Capture Out"));
    }

    #[test]
    fn test_missing_factory_entry() {
        let registry = registry();
        let factory = StageFactory::empty();
        let err = RocketCapture::new(&registry, &factory)
            .setup(device(), CaptureCallbacks::video(|_| {}))
            .unwrap_err();
        assert!(matches!(err, Error::StageCreationFailed { .. }));
    }

    #[test]
    fn test_encoder_without_free_output() {
        let registry = MemoryRegistry::new();
        registry.register(
            Stage::hardware("Rocket Crossbar", StageCategory::Crossbar)
                .with_pad(Pad::output("Video Decoder Out").with_medium(INPUT)),
        );
        registry.register(
            Stage::hardware("Rocket Encoder", StageCategory::Encoder)
                .with_pad(Pad::input("Video In").with_medium(OUTPUT)),
        );
        let factory = StageFactory::new();

        let err = RocketCapture::new(&registry, &factory)
            .setup(device(), CaptureCallbacks::video(|_| {}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConnectionFailed { ref upstream, .. } if upstream == "HD-PVR Rocket Encoder"
        ));
    }
}
