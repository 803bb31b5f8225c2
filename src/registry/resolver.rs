//! Hardware-medium stage lookup.

use super::StageRegistry;
use super::factory::{DEMUX_FACTORY, StageFactory};
use crate::element::{HardwareMedium, Stage, StageCategory};
use crate::error::{Error, Result};

/// Finds the stages a device is physically wired to.
///
/// Hardware paths of the capture device are not discoverable by format. The
/// only reliable key is the medium on each pad, which the driver publishes
/// identically on both ends of a physical connection.
pub struct StageResolver<'a> {
    registry: &'a dyn StageRegistry,
    factory: &'a StageFactory,
}

impl<'a> StageResolver<'a> {
    /// Create a resolver over a registry and a factory.
    pub fn new(registry: &'a dyn StageRegistry, factory: &'a StageFactory) -> Self {
        Self { registry, factory }
    }

    /// Find the stage of `category` exposing a pad bound to `medium`.
    ///
    /// Candidates are checked in registration order. When several match, the
    /// first one is returned.
    pub fn find_by_medium(&self, category: StageCategory, medium: HardwareMedium) -> Result<Stage> {
        let mut matches = self
            .registry
            .enumerate(category)?
            .into_iter()
            .filter(|stage| stage.pads().iter().any(|pad| pad.medium() == Some(medium)));

        let found = matches.next().ok_or(Error::StageNotFound { category, medium })?;

        let extra = matches.count();
        if extra > 0 {
            tracing::warn!(
                %category,
                %medium,
                chosen = %found.name(),
                ignored = extra,
                "several stages share a hardware medium, using the first"
            );
        }

        tracing::debug!(%category, %medium, stage = %found.name(), "resolved stage by medium");
        Ok(found)
    }

    /// Create the standard transport-stream demultiplexer named `name`.
    ///
    /// The new stage has no output pads.
    pub fn create_demultiplexer(&self, name: &str) -> Result<Stage> {
        let stage = self.factory.create(DEMUX_FACTORY, name)?;
        if stage.demux().is_none() || stage.pads().outputs().next().is_some() {
            return Err(Error::StageCreationFailed {
                name: DEMUX_FACTORY.to_string(),
                reason: "constructor did not return an empty demultiplexer".into(),
            });
        }
        Ok(stage)
    }
}
