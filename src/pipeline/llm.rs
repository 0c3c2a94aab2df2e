//! OpenAI-compatible chat-completion client.
//!
//! Talks to any endpoint speaking the `/chat/completions` protocol
//! (OpenRouter in production). The trait seam exists so the extractor and
//! orchestrator tests run against a mock instead of a network service.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::config::{
    EXTRACTION_MAX_TOKENS, EXTRACTION_TEMPERATURE, LLM_TIMEOUT_SECS, LlmSettings,
};

use super::ExtractionError;

/// Transport errors get one retry before the extractor degrades to regex.
const TRANSPORT_RETRIES: u32 = 1;

/// Chat-completion abstraction (allows mocking).
pub trait LlmClient {
    /// Text-only completion. Returns the assistant message content.
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ExtractionError>;

    /// Vision completion: the user message carries an inline base64 image.
    fn complete_with_image(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        image_base64: &str,
        content_type: &str,
    ) -> Result<String, ExtractionError>;

    /// Whether a credential is present. When false, `complete` fails fast
    /// with `LlmUnavailable` and no network traffic happens.
    fn is_configured(&self) -> bool;
}

/// Blocking HTTP client for an OpenAI-compatible endpoint.
pub struct OpenAiClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings, timeout_secs: u64) -> Self {
        // OpenRouter requires attribution headers.
        let mut headers = HeaderMap::new();
        headers.insert("HTTP-Referer", HeaderValue::from_static("https://labtrack.app"));
        headers.insert("X-Title", HeaderValue::from_static("LabTrack Medical Analysis"));

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            client,
            timeout_secs,
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::new(settings, LLM_TIMEOUT_SECS)
    }

    fn request_body(&self, messages: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": EXTRACTION_TEMPERATURE,
            "max_tokens": EXTRACTION_MAX_TOKENS,
            "response_format": {"type": "json_object"},
        })
    }

    fn post_chat(&self, body: &serde_json::Value) -> Result<String, ExtractionError> {
        let api_key = self.api_key.as_ref().ok_or(ExtractionError::LlmUnavailable)?;
        let url = format!("{}/chat/completions", self.base_url);

        let mut attempt = 0;
        loop {
            let result = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(body)
                .send();

            match result {
                Ok(response) => return self.read_response(response),
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < TRANSPORT_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "chat completion transport error, retrying");
                }
                Err(e) => return Err(self.map_transport_error(e)),
            }
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_connect() {
            ExtractionError::LlmConnection(self.base_url.clone())
        } else if e.is_timeout() {
            ExtractionError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            ExtractionError::HttpClient(e.to_string())
        }
    }

    fn read_response(
        &self,
        response: reqwest::blocking::Response,
    ) -> Result<String, ExtractionError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::LlmStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ExtractionError::MalformedResponse("Empty choices in response".into()))
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl LlmClient for OpenAiClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ExtractionError> {
        let body = self.request_body(serde_json::json!([
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": user_prompt},
        ]));
        self.post_chat(&body)
    }

    fn complete_with_image(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        image_base64: &str,
        content_type: &str,
    ) -> Result<String, ExtractionError> {
        let body = self.request_body(serde_json::json!([
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": [
                {"type": "text", "text": user_prompt},
                {"type": "image_url", "image_url": {
                    "url": format!("data:{content_type};base64,{image_base64}"),
                    "detail": "high",
                }},
            ]},
        ]));
        self.post_chat(&body)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Mock chat-completion client for testing — returns a configurable
/// response or a configurable failure.
pub struct MockLlmClient {
    response: String,
    configured: bool,
    fail_connect: bool,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            configured: true,
            fail_connect: false,
        }
    }

    /// No credential: every call fails with `LlmUnavailable`.
    pub fn unconfigured() -> Self {
        Self {
            response: String::new(),
            configured: false,
            fail_connect: false,
        }
    }

    /// Simulate an unreachable endpoint.
    pub fn failing() -> Self {
        Self {
            response: String::new(),
            configured: true,
            fail_connect: true,
        }
    }

    fn respond(&self) -> Result<String, ExtractionError> {
        if !self.configured {
            return Err(ExtractionError::LlmUnavailable);
        }
        if self.fail_connect {
            return Err(ExtractionError::LlmConnection("http://mock".into()));
        }
        Ok(self.response.clone())
    }
}

impl LlmClient for MockLlmClient {
    fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, ExtractionError> {
        self.respond()
    }

    fn complete_with_image(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _image_base64: &str,
        _content_type: &str,
    ) -> Result<String, ExtractionError> {
        self.respond()
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
