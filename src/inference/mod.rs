//! Detector boundary.
//!
//! The detection model is opaque: anything implementing [`Detector`] can
//! score chips. [`CommandDetector`] delegates to an external program.

mod command;
mod detector;
mod label_map;

pub use command::{CommandDetector, WireDetection};
pub use detector::{Detector, RawDetection};
pub use label_map::LabelMap;
