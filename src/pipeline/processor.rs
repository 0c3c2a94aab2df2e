//! Analysis processing: drives one uploaded file through OCR, extraction
//! and record building, advancing the owning `AnalysisRecord` through its
//! lifecycle.
//!
//! Invoked once per upload by the background runner. Every path leaves the
//! record in a terminal state; `Processing` never survives this call.

use chrono::Utc;

use crate::models::{AnalysisRecord, AnalysisStatus, BiomarkerRecord, LabProvider};

use super::llm::LlmClient;
use super::ocr::OcrEngine;
use super::orchestrator::{ExtractionPipeline, PatientContext, PipelineInput};
use super::ExtractionError;

pub struct AnalysisProcessor<L: LlmClient> {
    ocr: Box<dyn OcrEngine + Send + Sync>,
    pipeline: ExtractionPipeline<L>,
}

impl<L: LlmClient> AnalysisProcessor<L> {
    pub fn new(ocr: Box<dyn OcrEngine + Send + Sync>, pipeline: ExtractionPipeline<L>) -> Self {
        Self { ocr, pipeline }
    }

    /// Process one uploaded file. On return the record is `Completed` (with
    /// zero or more biomarkers) or `Failed` with an error message; extraction
    /// itself cannot fail, only the OCR collaborator can.
    pub fn process(
        &self,
        analysis: &mut AnalysisRecord,
        file_bytes: &[u8],
        content_type: &str,
        lab_hint: Option<LabProvider>,
        patient: PatientContext,
    ) {
        analysis.status = AnalysisStatus::Processing;
        tracing::info!(analysis_id = %analysis.id, content_type, "processing analysis");

        match self.run_stages(analysis, file_bytes, content_type, lab_hint, patient) {
            Ok(()) => {
                analysis.status = AnalysisStatus::Completed;
                analysis.processed_at = Some(Utc::now());
                tracing::info!(
                    analysis_id = %analysis.id,
                    biomarkers = analysis.biomarkers.len(),
                    out_of_range = analysis.out_of_range_count(),
                    "analysis completed"
                );
            }
            Err(e) => {
                analysis.status = AnalysisStatus::Failed;
                analysis.error_message = Some(e.to_string());
                analysis.processed_at = Some(Utc::now());
                tracing::error!(analysis_id = %analysis.id, error = %e, "analysis failed");
            }
        }
    }

    fn run_stages(
        &self,
        analysis: &mut AnalysisRecord,
        file_bytes: &[u8],
        content_type: &str,
        lab_hint: Option<LabProvider>,
        patient: PatientContext,
    ) -> Result<(), ExtractionError> {
        let ocr_result = self.ocr.extract_text(file_bytes, content_type)?;
        tracing::debug!(
            confidence = ocr_result.confidence,
            chars = ocr_result.text.len(),
            "OCR complete"
        );

        analysis.raw_text = Some(match analysis.raw_text.take() {
            Some(existing) => format!("{existing}\n\n{}", ocr_result.text),
            None => ocr_result.text.clone(),
        });

        let result = self
            .pipeline
            .run(PipelineInput::Text(&ocr_result.text), lab_hint, patient);

        // Extracted metadata fills gaps but never overwrites what the user
        // already supplied at upload time.
        if analysis.lab_name.is_none() {
            analysis.lab_name = result.lab_name;
        }
        if analysis.analysis_date.is_none() {
            analysis.analysis_date = result.analysis_date;
        }

        for candidate in &result.biomarkers {
            let mut record =
                BiomarkerRecord::from_candidate(candidate, Some(analysis.id), analysis.analysis_date);
            self.apply_critical_thresholds(&mut record, patient);
            analysis.biomarkers.push(record);
        }

        Ok(())
    }

    /// Create a record for a manually entered value, outside any analysis.
    pub fn manual_entry(
        &self,
        candidate: &crate::models::BiomarkerCandidate,
        measured_at: Option<chrono::NaiveDate>,
        patient: PatientContext,
    ) -> BiomarkerRecord {
        let mut record = BiomarkerRecord::from_candidate(candidate, None, measured_at);
        if record.ref_min.is_none() && record.ref_max.is_none() {
            if let Some(range) =
                self.pipeline
                    .reference_store()
                    .lookup(&record.code, patient.gender, patient.age)
            {
                record.ref_min = range.ref_min;
                record.ref_max = range.ref_max;
            }
        }
        self.apply_critical_thresholds(&mut record, patient);
        record
    }

    fn apply_critical_thresholds(&self, record: &mut BiomarkerRecord, patient: PatientContext) {
        if let Some(range) =
            self.pipeline
                .reference_store()
                .lookup(&record.code, patient.gender, patient.age)
        {
            record.critical_low = range.critical_low;
            record.critical_high = range.critical_high;
            record.recalculate_status();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BiomarkerCandidate, BiomarkerStatus, Gender};
    use crate::pipeline::llm::MockLlmClient;
    use crate::pipeline::ocr::MockOcrEngine;

    fn processor(ocr: MockOcrEngine, llm: MockLlmClient) -> AnalysisProcessor<MockLlmClient> {
        AnalysisProcessor::new(Box::new(ocr), ExtractionPipeline::new(llm))
    }

    #[test]
    fn completes_with_extracted_biomarkers() {
        let ocr = MockOcrEngine::new("HGB 154 г/л 135-169\nFE 5 мкмоль/л 11.6-31.3");
        let p = processor(ocr, MockLlmClient::unconfigured());

        let mut analysis = AnalysisRecord::new();
        p.process(&mut analysis, b"pdf", "application/pdf", None, PatientContext::default());

        assert_eq!(analysis.status, AnalysisStatus::Completed);
        assert!(analysis.processed_at.is_some());
        assert_eq!(analysis.biomarkers.len(), 2);
        assert!(analysis.raw_text.as_deref().unwrap().contains("HGB 154"));

        let fe = analysis.biomarkers.iter().find(|b| b.code == "FE").unwrap();
        assert_eq!(fe.status, BiomarkerStatus::Low);
        assert_eq!(fe.analysis_id, Some(analysis.id));
    }

    #[test]
    fn ocr_failure_is_terminal() {
        let p = processor(MockOcrEngine::failing(), MockLlmClient::unconfigured());

        let mut analysis = AnalysisRecord::new();
        p.process(&mut analysis, b"img", "image/jpeg", None, PatientContext::default());

        assert_eq!(analysis.status, AnalysisStatus::Failed);
        assert!(analysis.error_message.as_deref().unwrap().contains("OCR"));
        assert!(analysis.biomarkers.is_empty());
    }

    #[test]
    fn unsupported_type_is_terminal() {
        let p = processor(MockOcrEngine::new("text"), MockLlmClient::unconfigured());

        let mut analysis = AnalysisRecord::new();
        p.process(&mut analysis, b"data", "text/csv", None, PatientContext::default());

        assert_eq!(analysis.status, AnalysisStatus::Failed);
    }

    #[test]
    fn empty_report_completes_with_zero_biomarkers() {
        let p = processor(
            MockOcrEngine::new("ничего похожего на анализ"),
            MockLlmClient::unconfigured(),
        );

        let mut analysis = AnalysisRecord::new();
        p.process(&mut analysis, b"pdf", "application/pdf", None, PatientContext::default());

        assert_eq!(analysis.status, AnalysisStatus::Completed);
        assert!(analysis.biomarkers.is_empty());
    }

    #[test]
    fn user_supplied_metadata_not_overwritten() {
        let response = r#"{"lab_name": "Инвитро", "analysis_date": "2024-03-12", "biomarkers": []}"#;
        let p = processor(MockOcrEngine::new("текст отчета"), MockLlmClient::new(response));

        let mut analysis = AnalysisRecord::new();
        analysis.lab_name = Some("КДЛ".to_string());
        p.process(&mut analysis, b"pdf", "application/pdf", None, PatientContext::default());

        assert_eq!(analysis.lab_name.as_deref(), Some("КДЛ"));
        // Date was empty, so the extracted one lands.
        assert!(analysis.analysis_date.is_some());
    }

    #[test]
    fn manual_entry_gets_store_range_and_status() {
        let p = processor(MockOcrEngine::new(""), MockLlmClient::unconfigured());
        let candidate = BiomarkerCandidate {
            code: "HGB".into(),
            raw_name: "Гемоглобин".into(),
            value: 110.0,
            unit: "г/л".into(),
            ref_min: None,
            ref_max: None,
        };
        let patient = PatientContext { gender: Some(Gender::Female), age: Some(30) };
        let record = p.manual_entry(&candidate, None, patient);

        assert!(record.is_manual_entry());
        assert_eq!(record.ref_min, Some(120.0));
        assert_eq!(record.status, BiomarkerStatus::Low);
    }
}
