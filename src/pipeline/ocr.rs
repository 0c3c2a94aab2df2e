//! OCR collaborator boundary.
//!
//! Actual text recognition runs in an external service; the pipeline only
//! depends on this trait. Mock implementations stand in for the engine in
//! processor and orchestrator tests.

use super::ExtractionError;

/// Content types the pipeline accepts for upload.
pub const SUPPORTED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "application/pdf",
];

pub fn is_supported_content_type(content_type: &str) -> bool {
    SUPPORTED_CONTENT_TYPES.contains(&content_type)
}

/// Image uploads can skip OCR entirely and go through the vision LLM path.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// Raw OCR output for one file.
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    /// Engine-reported recognition confidence in [0, 1].
    pub confidence: f32,
}

/// OCR engine abstraction (allows mocking for tests).
pub trait OcrEngine {
    fn extract_text(
        &self,
        file_bytes: &[u8],
        content_type: &str,
    ) -> Result<OcrResult, ExtractionError>;
}

/// Mock OCR engine returning fixed text, or a configured failure.
pub struct MockOcrEngine {
    text: String,
    confidence: f32,
    fail: bool,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            confidence: 0.95,
            fail: false,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn failing() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            fail: true,
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn extract_text(
        &self,
        _file_bytes: &[u8],
        content_type: &str,
    ) -> Result<OcrResult, ExtractionError> {
        if !is_supported_content_type(content_type) {
            return Err(ExtractionError::UnsupportedFileType(content_type.to_string()));
        }
        if self.fail {
            return Err(ExtractionError::OcrProcessing("mock engine failure".into()));
        }
        Ok(OcrResult {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}
