//! CLI argument parsing and command handling.

mod args;
mod validators;

pub use args::{Cli, Command, ConfigAction, PredictArgs};
pub use validators::parse_threshold;
