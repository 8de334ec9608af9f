//! Time-range validation and trim directives.

use crate::error::{MediaError, MediaResult};
use clipforge_models::TimeRange;

/// Floating-point overshoot (seconds) clamped instead of rejected.
pub const OVERSHOOT_TOLERANCE: f64 = 0.05;

/// A validated trim instruction consumed by the orchestrator.
///
/// The directive only describes the cut; the engine invocation that
/// performs it belongs to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimDirective {
    /// Seek position in seconds
    pub start: f64,
    /// Amount of media to keep in seconds
    pub duration: f64,
}

impl TrimDirective {
    /// Validate a requested range against the asset duration.
    ///
    /// Values that overshoot the valid range by at most
    /// [`OVERSHOOT_TOLERANCE`] are clamped; anything further out is an
    /// [`MediaError::InvalidTimeRange`].
    pub fn resolve(range: TimeRange, asset_duration: f64) -> MediaResult<Self> {
        let invalid = || MediaError::InvalidTimeRange {
            start: range.start,
            end: range.end,
            duration: asset_duration,
        };

        if asset_duration <= 0.0 {
            return Err(invalid());
        }

        let start = if range.start < 0.0 {
            if range.start < -OVERSHOOT_TOLERANCE {
                return Err(invalid());
            }
            0.0
        } else {
            range.start
        };

        let end = if range.end > asset_duration {
            if range.end > asset_duration + OVERSHOOT_TOLERANCE {
                return Err(invalid());
            }
            asset_duration
        } else {
            range.end
        };

        if start >= end || start >= asset_duration {
            return Err(invalid());
        }

        Ok(Self {
            start,
            duration: end - start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range() {
        let directive = TrimDirective::resolve(TimeRange::new(5.0, 15.0), 30.0).unwrap();
        assert_eq!(directive.start, 5.0);
        assert!((directive.duration - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_minor_overshoot_clamped() {
        // End 30.04 on a 30s asset: clamp, don't fail
        let directive = TrimDirective::resolve(TimeRange::new(10.0, 30.04), 30.0).unwrap();
        assert!((directive.duration - 20.0).abs() < 1e-9);

        // Slightly negative start from float math: clamp to zero
        let directive = TrimDirective::resolve(TimeRange::new(-0.02, 10.0), 30.0).unwrap();
        assert_eq!(directive.start, 0.0);
        assert!((directive.duration - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_overshoot_rejected() {
        assert!(matches!(
            TrimDirective::resolve(TimeRange::new(0.0, 31.0), 30.0),
            Err(MediaError::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            TrimDirective::resolve(TimeRange::new(-1.0, 10.0), 30.0),
            Err(MediaError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(TrimDirective::resolve(TimeRange::new(15.0, 5.0), 30.0).is_err());
        assert!(TrimDirective::resolve(TimeRange::new(10.0, 10.0), 30.0).is_err());
    }

    #[test]
    fn test_start_beyond_duration_rejected() {
        assert!(TrimDirective::resolve(TimeRange::new(40.0, 50.0), 30.0).is_err());
    }

    #[test]
    fn test_zero_duration_asset_rejected() {
        assert!(TrimDirective::resolve(TimeRange::new(0.0, 1.0), 0.0).is_err());
    }
}
