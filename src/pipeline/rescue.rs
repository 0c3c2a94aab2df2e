//! Regex rescue pass over the raw source text.
//!
//! The LLM reliably extracts the common CBC panel but misses hormone values
//! tucked into footers and secondary tables, and labs disagree on how to
//! report red-cell distribution width. This pass patches three gaps after
//! validation:
//!
//! 1. recovery of analytes missing from the candidate list,
//! 2. RDW-SD vs RDW-CV disambiguation,
//! 3. reference ranges for leukocyte differential percentages.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{BiomarkerCandidate, UNIT_PLACEHOLDER};

use super::parser::parse_float;

/// Analytes prone to LLM omission. First matching pattern per code wins;
/// patterns are tried in declared order.
static RESCUE_PATTERNS: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (
            "TSH",
            vec![Regex::new(r"(?i)(?:ТТГ|TSH|Тиреотропный)[^:\d]*[:\s]*([\d.,]+)").unwrap()],
        ),
        (
            "FT4",
            vec![Regex::new(r"(?i)(?:Т4\s*своб|FT4|T4\s*free)[^:\d]*[:\s]*([\d.,]+)").unwrap()],
        ),
        (
            "TEST",
            vec![Regex::new(r"(?i)(?:Тестостерон|Testosterone)[^:\d]*[:\s]*([\d.,]+)").unwrap()],
        ),
        (
            "SHBG",
            vec![Regex::new(r"(?i)(?:ГСПГ|SHBG|Sex\s*hormone)[^:\d]*[:\s]*([\d.,]+)").unwrap()],
        ),
        (
            "PROL",
            vec![Regex::new(r"(?i)(?:Пролактин|Prolactin)[^:\d]*[:\s]*([\d.,]+)").unwrap()],
        ),
        (
            "FAI",
            vec![Regex::new(
                r"(?i)(?:ИСТ|FAI|Index of Free Testosterone|Индекс своб\.?\s*тестостерона)[^:\d]*[:\s]*([\d.,]+)",
            )
            .unwrap()],
        ),
        (
            "RDW",
            vec![Regex::new(
                r"(?i)(?:RDW|Ширина\s+распределения\s+эритроцитов)[^:\d]*[:\s]*([\d.,]+)",
            )
            .unwrap()],
        ),
        (
            "PDW",
            vec![Regex::new(
                r"(?i)(?:PDW|Ширина\s+распределения\s+тромбоцитов)[^:\d]*[:\s]*([\d.,]+)",
            )
            .unwrap()],
        ),
    ]
});

/// RDW reported as standard deviation: value, femtoliter unit and an
/// explicit reference range all present. The range requirement keeps this
/// from firing on a lone "фл" elsewhere in the text.
static RDW_SD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:RDW[\s-]*SD|ст\.?\s*откл)[^\d]*([\d.,]+)\s*(?:фл|fl)\s*\(?([\d.,]+)\s*[-–]\s*([\d.,]+)\)?",
    )
    .unwrap()
});

/// Fuller leukocyte differential matches: percentage value followed by a
/// reference range. Used only to fill ranges on existing `%` candidates.
static DIFFERENTIAL_RANGE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("NEUT", diff_regex(r"Нейтрофилы|Neutrophils?|NEUT?")),
        ("LYMPH", diff_regex(r"Лимфоциты|Lymphocytes?|LYMPH?")),
        ("MONO", diff_regex(r"Моноциты|Monocytes?|MONO?")),
        ("EOS", diff_regex(r"Эозинофилы|Eosinophils?|EOS?")),
        ("BASO", diff_regex(r"Базофилы|Basophils?|BASO?")),
    ]
});

fn diff_regex(names: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)(?:{names})[^\d%]*([\d.,]+)\s*%\s*\(?([\d.,]+)\s*[-–]\s*([\d.,]+)\)?"
    ))
    .unwrap()
}

/// Run the rescue pass. Returns the existing list plus recovered candidates;
/// the RDW-SD rule may replace one entry in place instead of appending.
pub fn rescue(mut existing: Vec<BiomarkerCandidate>, source_text: &str) -> Vec<BiomarkerCandidate> {
    resolve_rdw_sd(&mut existing, source_text);
    recover_missing(&mut existing, source_text);
    fill_differential_ranges(&mut existing, source_text);
    existing
}

/// Append candidates for analytes that match a rescue pattern and are not
/// already in the list. Recovered entries carry no reference range and a
/// placeholder unit.
fn recover_missing(existing: &mut Vec<BiomarkerCandidate>, source_text: &str) {
    for (code, patterns) in RESCUE_PATTERNS.iter() {
        if existing.iter().any(|c| c.code == *code) {
            continue;
        }
        for pattern in patterns {
            let Some(caps) = pattern.captures(source_text) else {
                continue;
            };
            let Some(value) = caps.get(1).and_then(|m| parse_float(m.as_str())) else {
                continue;
            };
            tracing::info!(code, value, "regex rescue recovered missing analyte");
            existing.push(BiomarkerCandidate {
                code: (*code).to_string(),
                raw_name: "Rescued by Regex".to_string(),
                value,
                unit: UNIT_PLACEHOLDER.to_string(),
                ref_min: None,
                ref_max: None,
            });
            break;
        }
    }
}

/// Disambiguate red-cell distribution width. An SD reading (femtoliters
/// with an explicit range) is more specific than a CV percentage and
/// replaces it at the same list position.
fn resolve_rdw_sd(existing: &mut Vec<BiomarkerCandidate>, source_text: &str) {
    let Some(caps) = RDW_SD_PATTERN.captures(source_text) else {
        return;
    };
    let parsed = (
        caps.get(1).and_then(|m| parse_float(m.as_str())),
        caps.get(2).and_then(|m| parse_float(m.as_str())),
        caps.get(3).and_then(|m| parse_float(m.as_str())),
    );
    let (Some(value), Some(ref_min), Some(ref_max)) = parsed else {
        return;
    };

    // The LLM path can report both variants already. The SD entry on the
    // list wins; drop the CV duplicate rather than replacing it, which
    // would leave two (RDW, фл) candidates.
    if existing.iter().any(|c| c.code == "RDW" && c.unit == "фл") {
        if let Some(pos) = existing.iter().position(|c| c.code == "RDW" && c.unit == "%") {
            tracing::debug!("RDW-CV entry dropped, SD reading already present");
            existing.remove(pos);
        }
        return;
    }

    let sd_candidate = BiomarkerCandidate {
        code: "RDW".to_string(),
        raw_name: "RDW-SD".to_string(),
        value,
        unit: "фл".to_string(),
        ref_min: Some(ref_min),
        ref_max: Some(ref_max),
    };

    if let Some(cv) = existing.iter_mut().find(|c| c.code == "RDW" && c.unit == "%") {
        tracing::debug!(value, "RDW-SD reading replaces CV entry");
        *cv = sd_candidate;
    } else if !existing.iter().any(|c| c.code == "RDW") {
        existing.push(sd_candidate);
    }
}

/// Fill missing reference ranges on leukocyte differential `%` candidates
/// when the text carries a fuller match. Updates in place, never appends.
fn fill_differential_ranges(existing: &mut [BiomarkerCandidate], source_text: &str) {
    for (code, pattern) in DIFFERENTIAL_RANGE_PATTERNS.iter() {
        let Some(candidate) = existing
            .iter_mut()
            .find(|c| c.code == *code && c.unit == "%" && c.ref_min.is_none() && c.ref_max.is_none())
        else {
            continue;
        };
        let Some(caps) = pattern.captures(source_text) else {
            continue;
        };
        let min = caps.get(2).and_then(|m| parse_float(m.as_str()));
        let max = caps.get(3).and_then(|m| parse_float(m.as_str()));
        if let (Some(min), Some(max)) = (min, max) {
            tracing::debug!(code, min, max, "differential range filled from text");
            candidate.ref_min = Some(min);
            candidate.ref_max = Some(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(code: &str, value: f64, unit: &str) -> BiomarkerCandidate {
        BiomarkerCandidate {
            code: code.to_string(),
            raw_name: code.to_string(),
            value,
            unit: unit.to_string(),
            ref_min: None,
            ref_max: None,
        }
    }

    #[test]
    fn recovers_missing_hormones() {
        let text = "Гормональная панель\nТТГ: 2,4 мЕд/л\nПролактин 350 мЕд/л";
        let result = rescue(vec![candidate("HGB", 140.0, "г/л")], text);
        assert_eq!(result.len(), 3);
        let tsh = result.iter().find(|c| c.code == "TSH").unwrap();
        assert_eq!(tsh.value, 2.4);
        assert_eq!(tsh.unit, UNIT_PLACEHOLDER);
        assert!(tsh.ref_min.is_none());
        assert!(result.iter().any(|c| c.code == "PROL" && c.value == 350.0));
    }

    #[test]
    fn existing_codes_not_duplicated() {
        let text = "ТТГ: 2,4";
        let result = rescue(vec![candidate("TSH", 2.1, "мЕд/л")], text);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value, 2.1);
    }

    #[test]
    fn rdw_sd_replaces_cv_in_place() {
        let existing = vec![
            candidate("HGB", 140.0, "г/л"),
            candidate("RDW", 13.6, "%"),
            candidate("PLT", 250.0, "10^9/л"),
        ];
        let text = "Эритроцитарные индексы, ст.откл. 42.3 фл 36.2-46.3, прочее";
        let result = rescue(existing, text);
        assert_eq!(result.len(), 3);
        assert_eq!(result[1].code, "RDW");
        assert_eq!(result[1].unit, "фл");
        assert_eq!(result[1].value, 42.3);
        assert_eq!(result[1].ref_min, Some(36.2));
        assert_eq!(result[1].ref_max, Some(46.3));
    }

    #[test]
    fn rdw_sd_appended_when_absent() {
        let text = "RDW-SD 42.3 фл (36.2-46.3)";
        let result = rescue(vec![], text);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].unit, "фл");
    }

    #[test]
    fn rdw_cv_dropped_when_sd_already_listed() {
        // Both variants alias to RDW, so the LLM path can produce both.
        let existing = vec![
            candidate("RDW", 13.6, "%"),
            candidate("RDW", 42.3, "фл"),
        ];
        let text = "ст.откл. 42.3 фл 36.2-46.3";
        let result = rescue(existing, text);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].unit, "фл");
        assert_eq!(result[0].value, 42.3);
        for (i, a) in result.iter().enumerate() {
            for b in &result[i + 1..] {
                assert_ne!((a.code.as_str(), a.unit.as_str()), (b.code.as_str(), b.unit.as_str()));
            }
        }
    }

    #[test]
    fn rdw_sd_requires_range() {
        // Unit alone is not specific enough to override the CV entry.
        let text = "ст.откл. 42.3 фл";
        let result = rescue(vec![candidate("RDW", 13.6, "%")], text);
        assert_eq!(result[0].unit, "%");
        assert_eq!(result[0].value, 13.6);
    }

    #[test]
    fn differential_range_filled_in_place() {
        let existing = vec![candidate("NEUT", 55.0, "%")];
        let text = "Нейтрофилы 55 % (47.0-72.0)";
        let result = rescue(existing, text);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].ref_min, Some(47.0));
        assert_eq!(result[0].ref_max, Some(72.0));
        assert_eq!(result[0].value, 55.0);
    }

    #[test]
    fn differential_with_range_untouched() {
        let mut existing = vec![candidate("LYMPH", 30.0, "%")];
        existing[0].ref_min = Some(19.0);
        existing[0].ref_max = Some(37.0);
        let text = "Лимфоциты 30 % (10.0-90.0)";
        let result = rescue(existing, text);
        assert_eq!(result[0].ref_min, Some(19.0));
        assert_eq!(result[0].ref_max, Some(37.0));
    }

    #[test]
    fn no_matches_is_not_an_error() {
        let result = rescue(vec![candidate("HGB", 140.0, "г/л")], "ничего полезного");
        assert_eq!(result.len(), 1);
    }
}
