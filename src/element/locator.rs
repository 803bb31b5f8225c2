//! Pad lookup by role and hardware medium extraction.

use super::pad::{HardwareMedium, Pad, PadDirection};
use super::stage::Stage;
use crate::error::{Error, Result};

/// Find the first pad of `stage` with the given direction and, if given, name.
///
/// Stages the capture path deals with expose exactly one pad per direction,
/// so the first match is the pad.
pub fn locate<'a>(
    stage: &'a Stage,
    direction: PadDirection,
    name: Option<&str>,
) -> Result<&'a Pad> {
    stage
        .pads()
        .find(direction, name)
        .ok_or_else(|| Error::EndpointNotFound {
            stage: stage.name().to_string(),
            direction,
            name: name.map(str::to_string),
        })
}

/// Get the hardware medium bound to `pad`.
pub fn medium_of(stage: &Stage, pad: &Pad) -> Result<HardwareMedium> {
    pad.medium().ok_or_else(|| Error::NoHardwareMedium {
        stage: stage.name().to_string(),
        pad: pad.name().to_string(),
    })
}

/// Locate a pad by direction and return its medium.
pub fn locate_medium(stage: &Stage, direction: PadDirection) -> Result<HardwareMedium> {
    let pad = locate(stage, direction, None)?;
    medium_of(stage, pad)
}
