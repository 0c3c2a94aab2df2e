//! Top-level extraction pipeline: one call from source text (or image) to
//! a clean candidate list plus lab metadata.
//!
//! Composes the primary extractor with the reference store: candidates
//! that arrive without a range get one from the store, scoped to the
//! patient's gender and age when known. Status is deliberately not
//! assigned here; records derive it at persistence time.

use chrono::NaiveDate;

use crate::models::{BiomarkerCandidate, Gender, LabProvider};

use super::extractor::{ExtractionMethod, ExtractionOutcome, PrimaryExtractor};
use super::llm::LlmClient;
use super::reference::ReferenceStore;

/// What the pipeline is asked to process.
pub enum PipelineInput<'a> {
    Text(&'a str),
    Image { bytes: &'a [u8], content_type: &'a str },
}

/// Patient attributes for reference-range scoping. Both optional; unknown
/// attributes simply restrict lookups to broader store entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatientContext {
    pub gender: Option<Gender>,
    pub age: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub lab_name: Option<String>,
    pub analysis_date: Option<NaiveDate>,
    pub biomarkers: Vec<BiomarkerCandidate>,
    pub method: ExtractionMethod,
}

pub struct ExtractionPipeline<L: LlmClient> {
    extractor: PrimaryExtractor<L>,
    reference: ReferenceStore,
}

impl<L: LlmClient> ExtractionPipeline<L> {
    pub fn new(llm: L) -> Self {
        Self {
            extractor: PrimaryExtractor::new(llm),
            reference: ReferenceStore::builtin(),
        }
    }

    pub fn with_reference_store(llm: L, reference: ReferenceStore) -> Self {
        Self {
            extractor: PrimaryExtractor::new(llm),
            reference,
        }
    }

    pub fn reference_store(&self) -> &ReferenceStore {
        &self.reference
    }

    /// Run the full pipeline. Infallible by design: extraction degrades
    /// internally and the worst case is an empty biomarker list.
    pub fn run(
        &self,
        input: PipelineInput<'_>,
        lab_hint: Option<LabProvider>,
        patient: PatientContext,
    ) -> PipelineResult {
        let outcome = match input {
            PipelineInput::Text(text) => self.extractor.extract_from_text(text, lab_hint),
            PipelineInput::Image { bytes, content_type } => {
                self.extractor.extract_from_image(bytes, content_type)
            }
        };

        let ExtractionOutcome {
            lab_name,
            analysis_date,
            mut biomarkers,
            method,
        } = outcome;

        self.fill_missing_ranges(&mut biomarkers, patient);

        PipelineResult {
            lab_name,
            analysis_date: analysis_date.as_deref().and_then(parse_analysis_date),
            biomarkers,
            method,
        }
    }

    /// Supply store ranges to candidates whose source text had none. A
    /// range stated in the report wins over the store unconditionally.
    fn fill_missing_ranges(&self, biomarkers: &mut [BiomarkerCandidate], patient: PatientContext) {
        for candidate in biomarkers {
            if candidate.ref_min.is_some() || candidate.ref_max.is_some() {
                continue;
            }
            if let Some(range) = self.reference.lookup(&candidate.code, patient.gender, patient.age)
            {
                tracing::debug!(code = %candidate.code, "reference range filled from store");
                candidate.ref_min = range.ref_min;
                candidate.ref_max = range.ref_max;
            }
        }
    }
}

/// Lab reports state dates as YYYY-MM-DD per the prompt contract; anything
/// else is dropped rather than guessed at.
fn parse_analysis_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BiomarkerStatus;
    use crate::pipeline::llm::MockLlmClient;
    use crate::pipeline::status;

    #[test]
    fn end_to_end_regex_path_with_classification() {
        let pipeline = ExtractionPipeline::new(MockLlmClient::unconfigured());
        let result = pipeline.run(
            PipelineInput::Text("HGB 154 г/л 135-169\nFE 5 мкмоль/л 11.6-31.3"),
            None,
            PatientContext::default(),
        );

        assert_eq!(result.biomarkers.len(), 2);
        let hgb = result.biomarkers.iter().find(|c| c.code == "HGB").unwrap();
        let fe = result.biomarkers.iter().find(|c| c.code == "FE").unwrap();
        assert_eq!(
            status::classify(hgb.value, hgb.ref_min, hgb.ref_max, None, None),
            BiomarkerStatus::Normal
        );
        assert_eq!(
            status::classify(fe.value, fe.ref_min, fe.ref_max, None, None),
            BiomarkerStatus::Low
        );
    }

    #[test]
    fn analysis_date_parsed() {
        let response = r#"{"lab_name": "КДЛ", "analysis_date": "2024-03-12", "biomarkers": []}"#;
        let pipeline = ExtractionPipeline::new(MockLlmClient::new(response));
        let result = pipeline.run(PipelineInput::Text("текст"), None, PatientContext::default());
        assert_eq!(
            result.analysis_date,
            NaiveDate::from_ymd_opt(2024, 3, 12)
        );
        assert_eq!(result.lab_name.as_deref(), Some("КДЛ"));
    }

    #[test]
    fn unparseable_date_dropped() {
        let response = r#"{"analysis_date": "12 марта 2024", "biomarkers": []}"#;
        let pipeline = ExtractionPipeline::new(MockLlmClient::new(response));
        let result = pipeline.run(PipelineInput::Text("текст"), None, PatientContext::default());
        assert!(result.analysis_date.is_none());
    }

    #[test]
    fn store_range_fills_missing() {
        let response = r#"{"biomarkers": [
            {"code": "TSH", "raw_name": "ТТГ", "value": 2.1, "unit": "мкМЕ/мл"}
        ]}"#;
        let pipeline = ExtractionPipeline::new(MockLlmClient::new(response));
        let result = pipeline.run(PipelineInput::Text("т"), None, PatientContext::default());
        assert_eq!(result.biomarkers[0].ref_min, Some(0.4));
        assert_eq!(result.biomarkers[0].ref_max, Some(4.0));
    }

    #[test]
    fn extracted_range_wins_over_store() {
        let response = r#"{"biomarkers": [
            {"code": "TSH", "raw_name": "ТТГ", "value": 2.1, "unit": "мкМЕ/мл", "ref_min": 0.3, "ref_max": 3.5}
        ]}"#;
        let pipeline = ExtractionPipeline::new(MockLlmClient::new(response));
        let result = pipeline.run(PipelineInput::Text("т"), None, PatientContext::default());
        assert_eq!(result.biomarkers[0].ref_min, Some(0.3));
        assert_eq!(result.biomarkers[0].ref_max, Some(3.5));
    }

    #[test]
    fn gendered_store_lookup_honored() {
        let response = r#"{"biomarkers": [
            {"code": "HGB", "raw_name": "Гемоглобин", "value": 125, "unit": "г/л"}
        ]}"#;
        let pipeline = ExtractionPipeline::new(MockLlmClient::new(response));
        let patient = PatientContext {
            gender: Some(Gender::Female),
            age: Some(30),
        };
        let result = pipeline.run(PipelineInput::Text("т"), None, patient);
        assert_eq!(result.biomarkers[0].ref_min, Some(120.0));
        assert_eq!(result.biomarkers[0].ref_max, Some(150.0));
    }

    #[test]
    fn image_input_routed_to_vision() {
        let pipeline = ExtractionPipeline::new(MockLlmClient::failing());
        let result = pipeline.run(
            PipelineInput::Image { bytes: b"img", content_type: "image/png" },
            None,
            PatientContext::default(),
        );
        assert_eq!(result.method, ExtractionMethod::LlmVision);
        assert!(result.biomarkers.is_empty());
    }
}
