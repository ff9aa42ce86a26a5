//! Configuration validation.

use crate::chip::default_overlap;
use crate::config::Config;
use crate::constants::threshold;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    validate_chip_geometry(
        defaults.chip_size,
        defaults
            .overlap
            .unwrap_or_else(|| default_overlap(defaults.chip_size)),
    )?;
    validate_threshold("score_thresh", defaults.score_thresh)?;
    validate_threshold("merge_thresh", defaults.merge_thresh)?;

    if defaults.threads == Some(0) {
        return Err(Error::ConfigValidation {
            message: "threads must be at least 1".to_string(),
        });
    }

    if config
        .detector
        .program
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(Error::ConfigValidation {
            message: "detector program must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Check a threshold lies in `[0, 1]`.
pub fn validate_threshold(name: &str, value: f32) -> Result<()> {
    if !(threshold::MIN..=threshold::MAX).contains(&value) {
        return Err(Error::ConfigValidation {
            message: format!(
                "{name} must be between {} and {}, got {value}",
                threshold::MIN,
                threshold::MAX
            ),
        });
    }
    Ok(())
}

/// Check the chip size leaves a positive stride after overlap.
pub fn validate_chip_geometry(chip_size: u32, overlap: u32) -> Result<()> {
    if chip_size == 0 || chip_size <= overlap {
        return Err(Error::InvalidChipSize { chip_size, overlap });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_score_thresh() {
        let mut config = Config::default();
        config.defaults.score_thresh = 1.5;
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_validate_negative_merge_thresh() {
        let mut config = Config::default();
        config.defaults.merge_thresh = -0.1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_nan_threshold() {
        assert!(validate_threshold("score_thresh", f32::NAN).is_err());
    }

    #[test]
    fn test_validate_overlap_not_below_chip_size() {
        let mut config = Config::default();
        config.defaults.overlap = Some(300);
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidChipSize {
                chip_size: 300,
                overlap: 300
            })
        ));
    }

    #[test]
    fn test_validate_zero_chip_size() {
        let mut config = Config::default();
        config.defaults.chip_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_threads() {
        let mut config = Config::default();
        config.defaults.threads = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_detector_program() {
        let mut config = Config::default();
        config.detector.program = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }
}
