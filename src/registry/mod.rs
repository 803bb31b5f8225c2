//! Stage lookup and instantiation.
//!
//! - [`StageRegistry`]: enumerates the hardware stages installed on the
//!   system, by category
//! - [`MemoryRegistry`]: an in-process registry stages are registered into
//! - [`StageResolver`]: finds the stage owning a hardware medium and creates
//!   the standard demultiplexer
//! - [`StageFactory`]: named constructors for software stages

mod factory;
mod resolver;

pub use factory::{DEMUX_FACTORY, StageConstructor, StageFactory};
pub use resolver::StageResolver;

use crate::element::{Stage, StageCategory};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::RwLock;

/// Source of registered stages.
///
/// Enumeration order is the registration order and must be stable between
/// calls, so medium lookups are deterministic.
pub trait StageRegistry: Send + Sync {
    /// List every stage registered under `category`.
    fn enumerate(&self, category: StageCategory) -> Result<Vec<Stage>>;
}

/// Registry holding stages in memory.
///
/// # Example
///
/// ```rust
/// use rocketcap::element::{HardwareMedium, Pad, Stage, StageCategory};
/// use rocketcap::registry::{MemoryRegistry, StageRegistry};
///
/// let registry = MemoryRegistry::new();
/// registry.register(
///     Stage::hardware("Crossbar", StageCategory::Crossbar)
///         .with_pad(Pad::output("Video Out").with_medium(HardwareMedium::standard(1))),
/// );
///
/// assert_eq!(registry.enumerate(StageCategory::Crossbar)?.len(), 1);
/// assert!(registry.enumerate(StageCategory::Encoder)?.is_empty());
/// # Ok::<(), rocketcap::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    stages: RwLock<HashMap<StageCategory, Vec<Stage>>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage under its own category.
    pub fn register(&self, stage: Stage) {
        tracing::trace!(stage = %stage.name(), category = %stage.category(), "registered stage");
        let mut stages = self.stages.write().unwrap();
        stages.entry(stage.category()).or_default().push(stage);
    }

    /// Remove every stage with the given name. Returns how many were removed.
    pub fn unregister(&self, name: &str) -> usize {
        let mut stages = self.stages.write().unwrap();
        stages
            .values_mut()
            .map(|list| {
                let before = list.len();
                list.retain(|s| s.name() != name);
                before - list.len()
            })
            .sum()
    }

    /// Total number of registered stages.
    pub fn len(&self) -> usize {
        let stages = self.stages.read().unwrap();
        stages.values().map(Vec::len).sum()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StageRegistry for MemoryRegistry {
    fn enumerate(&self, category: StageCategory) -> Result<Vec<Stage>> {
        let stages = self.stages.read().unwrap();
        Ok(stages.get(&category).cloned().unwrap_or_default())
    }
}
