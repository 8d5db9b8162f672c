//! Text-in, text-out LLM access.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 600;
const EMPTY_RESPONSE: &str = "No response text returned.";

const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;
const TOP_K: u32 = 40;

/// A completion backend.
pub trait LlmClient {
    /// Sends one system/user exchange and returns the model's text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Llm`] if the request fails or the response carries
    /// no usable text.
    fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, trimmed.
    fn into_text(self) -> String {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            EMPTY_RESPONSE.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Creates a client for `model`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Creates a client with the key taken from `GOOGLE_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the variable is unset or empty.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Self::new(key, model),
            _ => Err(Error::config(format!(
                "{API_KEY_ENV} environment variable is required"
            ))),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl LlmClient for GeminiClient {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = GenerateRequest {
            system_instruction: Content {
                parts: [Part { text: system }],
            },
            contents: [Content {
                parts: [Part { text: user }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                top_k: TOP_K,
            },
        };

        debug!("Sending {} bytes to model {}", user.len(), self.model);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::llm(format!(
                "{} returned {}: {}",
                self.model,
                status,
                body.trim()
            )));
        }

        let body: GenerateResponse = response.json()?;
        Ok(body.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> String {
        serde_json::from_str::<GenerateResponse>(json)
            .unwrap()
            .into_text()
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            system_instruction: Content {
                parts: [Part { text: "sys" }],
            },
            contents: [Content {
                parts: [Part { text: "user" }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                top_k: TOP_K,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "user");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert!(json["generationConfig"]["topP"].is_number());
    }

    #[test]
    fn test_response_text_joined_and_trimmed() {
        let text = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"  # Title\n"},{"text":"body  "}]}}]}"#,
        );
        assert_eq!(text, "# Title\nbody");
    }

    #[test]
    fn test_empty_response_placeholder() {
        assert_eq!(parse(r#"{"candidates":[]}"#), EMPTY_RESPONSE);
        assert_eq!(parse(r#"{}"#), EMPTY_RESPONSE);
        assert_eq!(parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#), EMPTY_RESPONSE);
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("k", "gemini-test")
            .unwrap()
            .with_base_url("http://localhost:9/v1/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1/models/gemini-test:generateContent"
        );
        assert_eq!(client.model(), "gemini-test");
    }

    #[test]
    fn test_unreachable_server_is_llm_error() {
        let client = GeminiClient::new("k", "m")
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let result = client.complete("sys", "user");
        assert!(matches!(result, Err(Error::Llm { .. })));
    }
}
