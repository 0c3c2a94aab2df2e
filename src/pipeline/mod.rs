pub mod background;
pub mod extractor;
pub mod fallback;
pub mod llm;
pub mod numeric;
pub mod ocr;
pub mod orchestrator;
pub mod parser;
pub mod processor;
pub mod prompt;
pub mod reference;
pub mod rescue;
pub mod status;
pub mod validate;
pub mod vocabulary;

pub use extractor::*;
pub use llm::*;
pub use ocr::*;
pub use orchestrator::*;
pub use processor::*;
pub use reference::*;
pub use status::*;

use thiserror::Error;

/// Pipeline error taxonomy.
///
/// LLM-side variants are recoverable: the extractor catches them and
/// degrades to the regex path. OCR variants are terminal for the owning
/// analysis and propagate to the processor.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No API credential configured for chat completion")]
    LlmUnavailable,

    #[error("Chat completion endpoint unreachable at {0}")]
    LlmConnection(String),

    #[error("Chat completion returned error (status {status}): {body}")]
    LlmStatus { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed chat-completion response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Unsupported file type for OCR: {0}")]
    UnsupportedFileType(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Whether the extractor may fall through to the regex path
    /// instead of surfacing this error to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LlmUnavailable
                | Self::LlmConnection(_)
                | Self::LlmStatus { .. }
                | Self::HttpClient(_)
                | Self::MalformedResponse(_)
                | Self::JsonParsing(_)
        )
    }
}
