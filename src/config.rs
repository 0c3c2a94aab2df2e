use std::env;

/// Crate-level constants
pub const CRATE_NAME: &str = "labtrack";
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    "info,labtrack=debug".to_string()
}

/// Raw OCR text is truncated to this many characters before being sent to
/// the chat-completion endpoint. Matches the context budget of the cheapest
/// supported models.
pub const MAX_PROMPT_CHARS: usize = 8000;

/// Extraction calls use a low temperature for reproducible output.
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Token ceiling for an extraction response.
pub const EXTRACTION_MAX_TOKENS: u32 = 4000;

/// HTTP timeout for a single chat-completion call, in seconds.
pub const LLM_TIMEOUT_SECS: u64 = 120;

/// Settings for the OpenAI-compatible chat-completion endpoint
/// (OpenRouter by default). A missing API key means the LLM path is
/// unavailable and extraction runs on the regex fallback only.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl LlmSettings {
    /// Load settings from environment variables.
    /// OPENAI_API_KEY, OPENAI_BASE_URL, OPENAI_MODEL.
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "openai/gpt-4o-mini".to_string()),
        }
    }

    /// Settings with no credential — forces the regex fallback path.
    pub fn unconfigured() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_has_no_key() {
        let settings = LlmSettings::unconfigured();
        assert!(!settings.is_configured());
        assert!(settings.base_url.starts_with("https://"));
    }

    #[test]
    fn crate_version_matches_cargo() {
        assert_eq!(CRATE_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn prompt_budget_is_sane() {
        assert!(MAX_PROMPT_CHARS >= 1000);
        assert!(EXTRACTION_TEMPERATURE < 0.5);
    }
}
