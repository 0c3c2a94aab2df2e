//! Pure-regex extraction used when no LLM is reachable.
//!
//! Lower recall than the LLM path but deterministic and offline. Two
//! generic shapes cover most Russian lab printouts: a labeled line
//! ("Гемоглобин: 140 г/л (120-160)") and a short-code line
//! ("HGB 154 г/л 135-169"). Matches flow into the normal validator, so
//! duplicates between the two patterns resolve there.

use std::sync::LazyLock;

use regex::Regex;

use super::parser::{parse_float, RawCandidate, RawExtraction};
use super::vocabulary;

/// "label: value unit (min-max)", Cyrillic or Latin label.
static LABELED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([А-Яа-яA-Za-z][А-Яа-яA-Za-z\s]*):\s*([\d.,]+)\s*([а-яА-Яa-zA-Z/³²]+)?\s*(?:\(?([\d.,]+)\s*[-–]\s*([\d.,]+)\)?)?",
    )
    .unwrap()
});

/// "CODE value unit min-max" with an uppercase short code.
static SHORT_CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([A-Z]{2,5})\s+([\d.,]+)\s*([а-яА-Яa-zA-Z/³²]+)?\s*(?:\(?([\d.,]+)\s*[-–]\s*([\d.,]+)\)?)?",
    )
    .unwrap()
});

/// Parse source text with the generic patterns alone. Never fails; an
/// unrecognized report simply yields an empty candidate list.
pub fn parse(source_text: &str) -> RawExtraction {
    let mut biomarkers = Vec::new();

    for pattern in [&*LABELED_PATTERN, &*SHORT_CODE_PATTERN] {
        for caps in pattern.captures_iter(source_text) {
            let name = match caps.get(1) {
                Some(m) => m.as_str().trim(),
                None => continue,
            };
            let Some(value) = caps.get(2).and_then(|m| parse_float(m.as_str())) else {
                continue;
            };

            biomarkers.push(RawCandidate {
                code: Some(vocabulary::normalize_code(name)),
                raw_name: Some(name.to_string()),
                value: Some(serde_json::json!(value)),
                unit: caps.get(3).map(|m| m.as_str().to_string()),
                ref_min: caps.get(4).map(|m| serde_json::Value::String(m.as_str().to_string())),
                ref_max: caps.get(5).map(|m| serde_json::Value::String(m.as_str().to_string())),
            });
        }
    }

    tracing::debug!(count = biomarkers.len(), "fallback regex parse complete");

    RawExtraction {
        lab_name: None,
        analysis_date: None,
        biomarkers,
    }
}
