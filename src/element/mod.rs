//! Stages, pads and hardware media.
//!
//! - [`Stage`]: a unit of work in the capture pipeline (hardware or software)
//! - [`Pad`]: a connection point of a stage, optionally bound to a
//!   [`HardwareMedium`]
//! - [`locate`] / [`medium_of`]: role-based pad lookup used to discover which
//!   hardware paths the device sits on
//!
//! # Example
//!
//! ```rust
//! use rocketcap::element::{HardwareMedium, Pad, PadDirection, Stage, StageCategory, locate_medium};
//!
//! let device = Stage::hardware("HD-PVR Rocket", StageCategory::Device)
//!     .with_pad(Pad::input("Analog In").with_medium(HardwareMedium::standard(1)))
//!     .with_pad(Pad::output("TS Out").with_medium(HardwareMedium::standard(2)));
//!
//! let input = locate_medium(&device, PadDirection::Input)?;
//! assert_eq!(input, HardwareMedium::standard(1));
//! # Ok::<(), rocketcap::Error>(())
//! ```

mod locator;
mod pad;
mod stage;

pub use locator::{locate, locate_medium, medium_of};
pub use pad::{HardwareMedium, Pad, PadDirection, PadList};
pub use stage::{DEMUX_INPUT_PAD, Stage, StageCategory, StageKind};
