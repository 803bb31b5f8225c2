//! Pad abstraction for stage inputs and outputs.
//!
//! Pads are the connection points of stages. Hardware pads additionally carry
//! a [`HardwareMedium`] naming the physical signal path they sit on; two pads
//! with the same medium are wired together in hardware whatever formats they
//! declare.

use crate::format::MediaFormat;
use smallvec::SmallVec;
use std::fmt;
use uuid::Uuid;

/// Direction of a pad (input or output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadDirection {
    /// An input pad (receives data from upstream).
    Input,
    /// An output pad (sends data downstream).
    Output,
}

impl fmt::Display for PadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Identifier of a physical signal path.
///
/// A medium is a `(class, token)` pair. The class names the medium set the
/// driver uses and the token identifies one instance within it. Media are only
/// ever compared for equality; they never describe the data that flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareMedium {
    class: Uuid,
    token: u64,
}

impl HardwareMedium {
    /// The standard kernel-streaming medium set.
    pub const STANDARD_CLASS: Uuid = Uuid::from_u128(0x4747b320_62ce_11cf_a5d6_28db04c10000);

    /// Create a medium from a class and instance token.
    pub const fn new(class: Uuid, token: u64) -> Self {
        Self { class, token }
    }

    /// Create a medium in the standard medium set.
    pub const fn standard(token: u64) -> Self {
        Self::new(Self::STANDARD_CLASS, token)
    }

    /// Medium class.
    pub fn class(&self) -> Uuid {
        self.class
    }

    /// Instance token.
    pub fn token(&self) -> u64 {
        self.token
    }
}

impl fmt::Display for HardwareMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}:{:#x}", self.class, self.token)
    }
}

/// A pad on a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pad {
    /// Name of this pad within the stage.
    name: String,
    /// Direction of this pad.
    direction: PadDirection,
    /// Declared format, if fixed.
    format: Option<MediaFormat>,
    /// Hardware path binding, if any.
    medium: Option<HardwareMedium>,
}

impl Pad {
    /// Create a new pad.
    pub fn new(name: impl Into<String>, direction: PadDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            format: None,
            medium: None,
        }
    }

    /// Create an input pad.
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, PadDirection::Input)
    }

    /// Create an output pad.
    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, PadDirection::Output)
    }

    /// Set the declared format.
    pub fn with_format(mut self, format: impl Into<MediaFormat>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Bind the pad to a hardware medium.
    pub fn with_medium(mut self, medium: HardwareMedium) -> Self {
        self.medium = Some(medium);
        self
    }

    /// Get the pad's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pad's direction.
    pub fn direction(&self) -> PadDirection {
        self.direction
    }

    /// Get the declared format.
    pub fn format(&self) -> Option<&MediaFormat> {
        self.format.as_ref()
    }

    /// Get the hardware medium binding.
    pub fn medium(&self) -> Option<HardwareMedium> {
        self.medium
    }

    /// Check if this is an input pad.
    pub fn is_input(&self) -> bool {
        self.direction == PadDirection::Input
    }

    /// Check if this is an output pad.
    pub fn is_output(&self) -> bool {
        self.direction == PadDirection::Output
    }

    /// Check whether two pads may be wired directly.
    ///
    /// Pads on the same medium are connectable. A pad without a medium is a
    /// software pad and accepts any hardware peer.
    pub fn medium_matches(&self, other: &Pad) -> bool {
        match (self.medium, other.medium) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

/// Collection of pads for a stage.
#[derive(Debug, Clone, Default)]
pub struct PadList {
    pads: SmallVec<[Pad; 4]>,
}

impl PadList {
    /// Create an empty pad list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pad to the list.
    pub fn add(&mut self, pad: Pad) {
        self.pads.push(pad);
    }

    /// Get a pad by name.
    pub fn get(&self, name: &str) -> Option<&Pad> {
        self.pads.iter().find(|p| p.name() == name)
    }

    /// First pad with the given direction and, if given, name.
    pub fn find(&self, direction: PadDirection, name: Option<&str>) -> Option<&Pad> {
        self.pads
            .iter()
            .filter(|p| p.direction() == direction)
            .find(|p| name.is_none_or(|n| p.name() == n))
    }

    /// Get all input pads.
    pub fn inputs(&self) -> impl Iterator<Item = &Pad> {
        self.pads.iter().filter(|p| p.is_input())
    }

    /// Get all output pads.
    pub fn outputs(&self) -> impl Iterator<Item = &Pad> {
        self.pads.iter().filter(|p| p.is_output())
    }

    /// Get all pads.
    pub fn iter(&self) -> impl Iterator<Item = &Pad> {
        self.pads.iter()
    }

    /// Get the number of pads.
    pub fn len(&self) -> usize {
        self.pads.len()
    }

    /// Check if the pad list is empty.
    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }
}
