//! Primary extraction: staged LLM-first, regex-always strategy.
//!
//! Stages run in order and each either produces a raw extraction or yields
//! to the next. The final regex stage always produces, so extraction as a
//! whole never fails: a missing credential, a dead endpoint or model
//! gibberish all degrade to the offline parser. Whatever stage produced
//! the raw result, it then flows through validation and the rescue pass.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::models::{BiomarkerCandidate, LabProvider};

use super::fallback;
use super::llm::LlmClient;
use super::parser::{self, RawExtraction};
use super::prompt;
use super::rescue;
use super::validate;

/// Which stage produced the result. Surfaced in logs and useful when
/// judging extraction quality downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    Llm,
    LlmVision,
    RegexFallback,
}

/// Final extractor output: validated, rescued candidate list plus any lab
/// metadata the model reported.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub lab_name: Option<String>,
    pub analysis_date: Option<String>,
    pub biomarkers: Vec<BiomarkerCandidate>,
    pub method: ExtractionMethod,
}

/// One stage either yields a raw extraction or defers to the next stage.
enum StageOutcome {
    Produced(RawExtraction),
    Continue,
}

pub struct PrimaryExtractor<L: LlmClient> {
    llm: L,
}

impl<L: LlmClient> PrimaryExtractor<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    /// Extract biomarkers from OCR text. Never fails; worst case is an
    /// empty candidate list from the regex stage.
    pub fn extract_from_text(
        &self,
        raw_text: &str,
        lab_hint: Option<LabProvider>,
    ) -> ExtractionOutcome {
        let (raw, method) = match self.llm_text_stage(raw_text, lab_hint) {
            StageOutcome::Produced(raw) => (raw, ExtractionMethod::Llm),
            StageOutcome::Continue => (fallback::parse(raw_text), ExtractionMethod::RegexFallback),
        };

        let candidates = validate::validate(&raw.biomarkers);
        let candidates = rescue::rescue(candidates, raw_text);

        tracing::info!(
            method = ?method,
            count = candidates.len(),
            "text extraction complete"
        );

        ExtractionOutcome {
            lab_name: raw.lab_name,
            analysis_date: raw.analysis_date,
            biomarkers: candidates,
            method,
        }
    }

    /// Extract biomarkers straight from an image via the vision endpoint.
    /// With no OCR text there is nothing for the regex stages to chew on,
    /// so a failed call yields an empty outcome rather than an error.
    pub fn extract_from_image(&self, image_bytes: &[u8], content_type: &str) -> ExtractionOutcome {
        let image_base64 = BASE64.encode(image_bytes);

        let raw = match self
            .llm
            .complete_with_image(
                prompt::EXTRACTION_SYSTEM_PROMPT,
                &prompt::build_vision_prompt(),
                &image_base64,
                content_type,
            )
            .and_then(|response| parser::parse_extraction_response(&response))
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "vision extraction failed, returning empty result");
                RawExtraction::default()
            }
        };

        let candidates = validate::validate(&raw.biomarkers);

        tracing::info!(count = candidates.len(), "vision extraction complete");

        ExtractionOutcome {
            lab_name: raw.lab_name,
            analysis_date: raw.analysis_date,
            biomarkers: candidates,
            method: ExtractionMethod::LlmVision,
        }
    }

    fn llm_text_stage(&self, raw_text: &str, lab_hint: Option<LabProvider>) -> StageOutcome {
        if !self.llm.is_configured() {
            tracing::warn!("no chat-completion credential, skipping LLM stage");
            return StageOutcome::Continue;
        }

        let user_prompt = prompt::build_text_prompt(raw_text, lab_hint);
        let result = self
            .llm
            .complete(prompt::EXTRACTION_SYSTEM_PROMPT, &user_prompt)
            .and_then(|response| parser::parse_extraction_response(&response));

        match result {
            Ok(raw) => StageOutcome::Produced(raw),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "LLM stage failed, degrading to regex parser");
                StageOutcome::Continue
            }
            Err(e) => {
                // Nothing in the LLM stage should be terminal, but if it is,
                // degrading still beats failing the whole analysis.
                tracing::error!(error = %e, "unexpected LLM stage error, degrading to regex parser");
                StageOutcome::Continue
            }
        }
    }
}
