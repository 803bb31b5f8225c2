//! Named constructors for software stages.

use crate::element::Stage;
use crate::elements::{DemuxConfig, TsDemux};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory name of the standard transport-stream demultiplexer.
pub const DEMUX_FACTORY: &str = "mpeg2-demux";

/// Constructor signature: instance name and demultiplexer settings.
pub type StageConstructor = fn(&str, &DemuxConfig) -> Result<Stage>;

/// Registry of stage constructors.
///
/// # Example
///
/// ```rust
/// use rocketcap::registry::{DEMUX_FACTORY, StageFactory};
///
/// let factory = StageFactory::new();
/// let demux = factory.create(DEMUX_FACTORY, "Demuxer")?;
/// assert_eq!(demux.pads().outputs().count(), 0);
/// # Ok::<(), rocketcap::Error>(())
/// ```
pub struct StageFactory {
    constructors: HashMap<String, StageConstructor>,
    demux_config: DemuxConfig,
}

impl StageFactory {
    /// Create a factory with the built-in stages registered.
    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register(DEMUX_FACTORY, create_ts_demux);
        factory
    }

    /// Create a factory with nothing registered.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
            demux_config: DemuxConfig::default(),
        }
    }

    /// Set the configuration handed to demultiplexer constructors.
    pub fn with_demux_config(mut self, config: DemuxConfig) -> Self {
        self.demux_config = config;
        self
    }

    /// Register a constructor, replacing any previous one of the same name.
    pub fn register(&mut self, name: &str, constructor: StageConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    /// Create a stage named `instance` from the constructor registered as `name`.
    pub fn create(&self, name: &str, instance: &str) -> Result<Stage> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| Error::StageCreationFailed {
                name: name.to_string(),
                reason: "no constructor registered".into(),
            })?;
        constructor(instance, &self.demux_config)
    }

    /// Check if a constructor is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// List registered constructor names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for StageFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageFactory")
            .field("constructors", &self.list())
            .field("demux_config", &self.demux_config)
            .finish()
    }
}

fn create_ts_demux(name: &str, config: &DemuxConfig) -> Result<Stage> {
    if config.max_unit_size == 0 {
        return Err(Error::StageCreationFailed {
            name: DEMUX_FACTORY.to_string(),
            reason: "maximum unit size must be non-zero".into(),
        });
    }
    let demux = TsDemux::with_config(config.clone());
    Ok(Stage::demultiplexer(name, Arc::new(demux)))
}
