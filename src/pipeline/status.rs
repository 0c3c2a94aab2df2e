//! Measurement status classification against reference and critical bounds.

use crate::models::BiomarkerStatus;

/// Classify a value against its bounds.
///
/// Critical thresholds win over the reference range. All comparisons are
/// strict: a value sitting exactly on a bound is inside it. Each bound is
/// consulted independently, so a single-sided range still classifies, and
/// with no bounds at all the only honest answer is `Normal`.
pub fn classify(
    value: f64,
    ref_min: Option<f64>,
    ref_max: Option<f64>,
    critical_low: Option<f64>,
    critical_high: Option<f64>,
) -> BiomarkerStatus {
    if let Some(low) = critical_low {
        if value < low {
            return BiomarkerStatus::CriticalLow;
        }
    }
    if let Some(high) = critical_high {
        if value > high {
            return BiomarkerStatus::CriticalHigh;
        }
    }
    if let Some(min) = ref_min {
        if value < min {
            return BiomarkerStatus::Low;
        }
    }
    if let Some(max) = ref_max {
        if value > max {
            return BiomarkerStatus::High;
        }
    }
    BiomarkerStatus::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_range_is_normal() {
        assert_eq!(classify(140.0, Some(120.0), Some(160.0), None, None), BiomarkerStatus::Normal);
    }

    #[test]
    fn boundary_values_are_normal() {
        assert_eq!(classify(120.0, Some(120.0), Some(160.0), None, None), BiomarkerStatus::Normal);
        assert_eq!(classify(160.0, Some(120.0), Some(160.0), None, None), BiomarkerStatus::Normal);
    }

    #[test]
    fn below_min_is_low() {
        assert_eq!(classify(119.9, Some(120.0), Some(160.0), None, None), BiomarkerStatus::Low);
    }

    #[test]
    fn above_max_is_high() {
        assert_eq!(classify(160.1, Some(120.0), Some(160.0), None, None), BiomarkerStatus::High);
    }

    #[test]
    fn critical_bounds_take_precedence() {
        assert_eq!(
            classify(60.0, Some(120.0), Some(160.0), Some(70.0), Some(200.0)),
            BiomarkerStatus::CriticalLow
        );
        assert_eq!(
            classify(210.0, Some(120.0), Some(160.0), Some(70.0), Some(200.0)),
            BiomarkerStatus::CriticalHigh
        );
        // Out of reference range but short of critical.
        assert_eq!(
            classify(100.0, Some(120.0), Some(160.0), Some(70.0), Some(200.0)),
            BiomarkerStatus::Low
        );
    }

    #[test]
    fn single_sided_ranges_classify() {
        assert_eq!(classify(5.0, Some(10.0), None, None, None), BiomarkerStatus::Low);
        assert_eq!(classify(15.0, Some(10.0), None, None, None), BiomarkerStatus::Normal);
        assert_eq!(classify(15.0, None, Some(10.0), None, None), BiomarkerStatus::High);
    }

    #[test]
    fn no_bounds_means_normal() {
        assert_eq!(classify(12345.0, None, None, None, None), BiomarkerStatus::Normal);
    }
}
