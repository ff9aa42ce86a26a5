//! Chip planning and extraction.

mod extractor;
mod planner;

pub use extractor::{ChannelOrder, ChipImage, extract_chip};
pub use planner::{ChipGrid, ChipWindow, default_overlap, plan_chips};
