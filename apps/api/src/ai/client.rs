//! HTTP client for the AI provider connectivity check.
//!
//! Sends a single fixed prompt to the provider and returns the text it
//! answers with. Errors carry the provider's own message where it sends one.
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::provider::AiProvider;

const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const GOOGLE_TEST_MODEL: &str = "gemini-2.5-flash";
const OPENAI_TEST_MODEL: &str = "gpt-4o-mini";
const TEST_PROMPT: &str = "Say this is a test!";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("API testing not implemented for {0}")]
    Unsupported(&'static str),

    #[error("Provider returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

impl GeminiResponse {
    fn text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn text(self) -> Option<String> {
        self.choices.into_iter().find_map(|c| c.message.content)
    }
}

/// Both providers wrap failures as `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn api_error(status: u16, body: String) -> ProviderError {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    ProviderError::Api { status, message }
}

#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    google_base: String,
    openai_base: String,
}

impl ProviderClient {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_endpoints(GOOGLE_API_BASE, OPENAI_API_BASE)
    }

    pub fn with_endpoints(google_base: &str, openai_base: &str) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            google_base: google_base.trim_end_matches('/').to_string(),
            openai_base: openai_base.trim_end_matches('/').to_string(),
        })
    }

    /// Sends the test prompt with `api_key` and returns the answer text.
    pub async fn send_test_prompt(
        &self,
        provider: AiProvider,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let text = match provider {
            AiProvider::Google => self.ask_google(api_key).await?,
            AiProvider::OpenAi => self.ask_openai(api_key).await?,
            other => return Err(ProviderError::Unsupported(other.service())),
        };
        debug!(provider = provider.service(), "Provider test prompt succeeded");
        Ok(text)
    }

    async fn ask_google(&self, api_key: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.google_base, GOOGLE_TEST_MODEL
        );
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: TEST_PROMPT }],
            }],
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), body));
        }

        let parsed: GeminiResponse = response.json().await?;
        parsed.text().ok_or(ProviderError::EmptyContent)
    }

    async fn ask_openai(&self, api_key: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.openai_base);
        let body = ChatRequest {
            model: OPENAI_TEST_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: TEST_PROMPT,
            }],
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), body));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed.text().ok_or(ProviderError::EmptyContent)
    }
}
