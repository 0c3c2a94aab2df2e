//! Decimal-point repair for OCR/LLM numeric artifacts.
//!
//! OCR sometimes drops the decimal point: MCV 92.2 comes back as 922. The
//! repair reinserts the point before the last digit and accepts the result
//! only inside a tight window, so a legitimately large value is never
//! corrupted. False negatives are fine; false positives are not.

use super::vocabulary;

/// Repaired values must land within [expected_min, expected_max * this].
const ACCEPT_MARGIN: f64 = 1.5;

/// Repair is only attempted when the value exceeds expected_min * this.
/// A zero lower bound makes this vacuous, so the value must also sit
/// above expected_max before it counts as suspicious.
const TRIGGER_FACTOR: f64 = 10.0;

/// Try to repair a suspected missing decimal point.
///
/// The expected range is the explicit `(ref_min, ref_max)` when both are
/// present, else the known-good range for the code. With neither, the value
/// is returned unchanged — no basis for a correction.
pub fn fix_decimal(code: &str, value: f64, ref_min: Option<f64>, ref_max: Option<f64>) -> f64 {
    let (expected_min, expected_max) = match (ref_min, ref_max) {
        (Some(min), Some(max)) => (min, max),
        _ => match vocabulary::known_range(code) {
            Some(range) => range,
            None => return value,
        },
    };

    if value <= expected_min * TRIGGER_FACTOR || value <= expected_max {
        return value;
    }

    // A value that still carries a fractional part did not lose its decimal
    // point; leave it alone.
    if value.fract() != 0.0 {
        return value;
    }

    // "922" -> "92.2": shift the decimal point one digit left.
    let repaired = value / 10.0;

    if repaired >= expected_min && repaired <= expected_max * ACCEPT_MARGIN {
        tracing::debug!(code, original = value, repaired, "decimal point repaired");
        repaired
    } else {
        value
    }
}
