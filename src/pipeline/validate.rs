//! Candidate validation and deduplication.
//!
//! Turns the loosely-typed candidates from the parser into clean
//! `BiomarkerCandidate`s: drops entries without a usable code or value,
//! normalizes codes through the vocabulary, fills in the unit placeholder,
//! repairs garbled numerics and deduplicates on the `(code, unit)` pair.

use std::collections::HashSet;

use crate::models::{BiomarkerCandidate, UNIT_PLACEHOLDER};

use super::numeric;
use super::parser::RawCandidate;
use super::vocabulary;

/// Validate a raw candidate list. Input order is preserved; on a
/// `(code, unit)` collision the first occurrence wins. There is no
/// confidence score to compare, so first-wins is the tie-break.
pub fn validate(raw_candidates: &[RawCandidate]) -> Vec<BiomarkerCandidate> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut validated = Vec::with_capacity(raw_candidates.len());

    for raw in raw_candidates {
        let Some(candidate) = validate_one(raw) else {
            continue;
        };

        let key = (candidate.code.clone(), candidate.unit.clone());
        if seen.insert(key) {
            validated.push(candidate);
        } else {
            tracing::debug!(
                code = %candidate.code,
                unit = %candidate.unit,
                "duplicate candidate dropped"
            );
        }
    }

    validated
}

fn validate_one(raw: &RawCandidate) -> Option<BiomarkerCandidate> {
    let reported_code = non_blank(raw.code.as_deref())?;
    let value = raw.numeric_value()?;

    let code = if vocabulary::is_canonical(reported_code) {
        reported_code.to_string()
    } else {
        vocabulary::normalize_code(reported_code)
    };

    let raw_name = non_blank(raw.raw_name.as_deref())
        .unwrap_or(reported_code)
        .to_string();

    let unit = non_blank(raw.unit.as_deref())
        .unwrap_or(UNIT_PLACEHOLDER)
        .to_string();

    let ref_min = raw.numeric_ref_min();
    let ref_max = raw.numeric_ref_max();
    let value = numeric::fix_decimal(&code, value, ref_min, ref_max);

    Some(BiomarkerCandidate {
        code,
        raw_name,
        value,
        unit,
        ref_min,
        ref_max,
    })
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
