//! Parsing of chat-completion output into raw extraction structures.
//!
//! The LLM is asked for strict JSON, but responses arrive with markdown
//! fences or surrounding prose often enough that the parser tolerates both.
//! Malformed biomarker entries are dropped here, at the boundary, so the
//! validator only ever sees explicitly-shaped candidates.

use serde::Deserialize;

use super::ExtractionError;

/// Unvalidated extraction output: lab metadata plus loosely-typed
/// biomarker candidates straight out of the model.
#[derive(Debug, Clone, Default)]
pub struct RawExtraction {
    pub lab_name: Option<String>,
    pub analysis_date: Option<String>,
    pub biomarkers: Vec<RawCandidate>,
}

/// One biomarker entry as reported by the LLM or the regex fallback.
/// Numeric fields stay as JSON values: models report "5,2" strings and
/// bare numbers interchangeably, and the coercion rules live in one place.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidate {
    pub code: Option<String>,
    pub raw_name: Option<String>,
    pub value: Option<serde_json::Value>,
    pub unit: Option<String>,
    pub ref_min: Option<serde_json::Value>,
    pub ref_max: Option<serde_json::Value>,
}

impl RawCandidate {
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_ref().and_then(coerce_float)
    }

    pub fn numeric_ref_min(&self) -> Option<f64> {
        self.ref_min.as_ref().and_then(coerce_float)
    }

    pub fn numeric_ref_max(&self) -> Option<f64> {
        self.ref_max.as_ref().and_then(coerce_float)
    }
}

/// Coerce a JSON value to a finite float. Accepts numbers and numeric
/// strings with either decimal separator and stray trailing dots
/// ("5,2", "12.", " 7.1 ").
pub fn coerce_float(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => parse_float(s),
        _ => None,
    }
}

/// Parse a lab-report numeric fragment. Same tolerance as `coerce_float`,
/// shared with the regex capture groups in the rescue and fallback passes.
pub fn parse_float(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace(',', ".");
    cleaned
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a chat-completion response into a `RawExtraction`.
///
/// Accepts a bare JSON object, a ```json fenced block, or JSON embedded in
/// prose (first `{` to last `}`). Anything else is a malformed response.
pub fn parse_extraction_response(response: &str) -> Result<RawExtraction, ExtractionError> {
    let json_str = extract_json_object(response)?;

    #[derive(Deserialize)]
    struct Wire {
        lab_name: Option<String>,
        analysis_date: Option<String>,
        biomarkers: Option<Vec<serde_json::Value>>,
    }

    let wire: Wire = serde_json::from_str(&json_str)
        .map_err(|e| ExtractionError::JsonParsing(e.to_string()))?;

    Ok(RawExtraction {
        lab_name: wire.lab_name.filter(|s| !s.trim().is_empty()),
        analysis_date: wire.analysis_date.filter(|s| !s.trim().is_empty()),
        biomarkers: parse_array_lenient(wire.biomarkers.as_deref()),
    })
}

/// Locate the JSON object inside a possibly-fenced, possibly-prosy response.
fn extract_json_object(response: &str) -> Result<String, ExtractionError> {
    if let Some(fence_start) = response.find("```json") {
        let content_start = fence_start + 7;
        if let Some(fence_len) = response[content_start..].find("```") {
            return Ok(response[content_start..content_start + fence_len]
                .trim()
                .to_string());
        }
    }

    // Widest brace span — the model wraps JSON in explanatory text.
    let start = response
        .find('{')
        .ok_or_else(|| ExtractionError::MalformedResponse("No JSON object found".into()))?;
    let end = response
        .rfind('}')
        .filter(|&e| e > start)
        .ok_or_else(|| ExtractionError::MalformedResponse("Unclosed JSON object".into()))?;

    Ok(response[start..=end].to_string())
}

/// Parse an array leniently — skip items that fail to deserialize.
fn parse_array_lenient<T: for<'de> Deserialize<'de>>(items: Option<&[serde_json::Value]>) -> Vec<T> {
    match items {
        None => vec![],
        Some(arr) => arr
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> &'static str {
        r#"Вот извлечённые данные:

```json
{
    "lab_name": "Инвитро",
    "analysis_date": "2024-03-12",
    "biomarkers": [
        {"code": "HGB", "raw_name": "Гемоглобин", "value": 140, "unit": "г/л", "ref_min": 120, "ref_max": 160},
        {"code": "FE", "raw_name": "Железо", "value": "5,2", "unit": "мкмоль/л", "ref_min": "11.6", "ref_max": "31.3"}
    ]
}
```"#
    }

    #[test]
    fn parses_fenced_response() {
        let result = parse_extraction_response(sample_response()).unwrap();
        assert_eq!(result.lab_name.as_deref(), Some("Инвитро"));
        assert_eq!(result.analysis_date.as_deref(), Some("2024-03-12"));
        assert_eq!(result.biomarkers.len(), 2);
        assert_eq!(result.biomarkers[0].numeric_value(), Some(140.0));
    }

    #[test]
    fn parses_bare_json() {
        let result =
            parse_extraction_response(r#"{"lab_name": null, "analysis_date": null, "biomarkers": []}"#)
                .unwrap();
        assert!(result.lab_name.is_none());
        assert!(result.biomarkers.is_empty());
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let response = r#"Sure! Here is the data: {"biomarkers": [{"code": "TSH", "value": 2.1}]} Hope this helps."#;
        let result = parse_extraction_response(response).unwrap();
        assert_eq!(result.biomarkers.len(), 1);
        assert_eq!(result.biomarkers[0].code.as_deref(), Some("TSH"));
    }

    #[test]
    fn missing_json_is_malformed() {
        let result = parse_extraction_response("No structured data in this text.");
        assert!(matches!(result, Err(ExtractionError::MalformedResponse(_))));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let result = parse_extraction_response("{broken json here}");
        assert!(matches!(result, Err(ExtractionError::JsonParsing(_))));
    }

    #[test]
    fn comma_decimal_strings_coerced() {
        let candidate = RawCandidate {
            value: Some(serde_json::json!("5,2")),
            ref_min: Some(serde_json::json!("11,6.")),
            ..Default::default()
        };
        assert_eq!(candidate.numeric_value(), Some(5.2));
        assert_eq!(candidate.numeric_ref_min(), Some(11.6));
    }

    #[test]
    fn non_numeric_values_rejected() {
        assert_eq!(coerce_float(&serde_json::json!("not a number")), None);
        assert_eq!(coerce_float(&serde_json::json!(true)), None);
        assert_eq!(coerce_float(&serde_json::json!(null)), None);
    }

    #[test]
    fn malformed_entries_dropped_not_fatal() {
        let response = r#"{"biomarkers": [
            {"code": "HGB", "value": 140},
            {"code": 42, "value": "oops"},
            "just a string",
            {"code": "TSH", "value": 2.0}
        ]}"#;
        let result = parse_extraction_response(response).unwrap();
        // The numeric code fails Option<String>, the string entry fails the
        // struct shape; both are dropped silently.
        assert_eq!(result.biomarkers.len(), 2);
    }
}
