//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use crate::constants::threshold;

/// Parse and validate a threshold value (0.0-1.0).
pub fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(threshold::MIN..=threshold::MAX).contains(&value) {
        return Err(format!(
            "threshold must be between {} and {}, got {value}",
            threshold::MIN,
            threshold::MAX
        ));
    }

    Ok(value)
}
