//! Generation backends: one prompt in, one raw text payload out.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    error::{GenerationError, ProviderError, Result},
    prompt::GenerationPrompt,
    provider::{ClientConfig, Dialect},
};

/// A service that answers a prompt with text constrained by its schema.
///
/// Implementations return the text exactly as the service produced it;
/// validation against the schema happens in the caller.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

const ERROR_BODY_LIMIT: usize = 512;

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// HTTP backend for Gemini and OpenAI-compatible providers.
pub struct HttpBackend {
    config: ClientConfig,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send_once(&self, prompt: &GenerationPrompt) -> Result<String> {
        let url = self.config.endpoint();
        let request = self.client.post(&url);

        let request = match self.config.dialect() {
            Dialect::GeminiGenerateContent => request
                .header("x-goog-api-key", &self.config.api_key)
                .json(&GeminiRequest {
                    contents: vec![Content {
                        parts: vec![Part { text: &prompt.text }],
                    }],
                    generation_config: GenerationConfig {
                        response_mime_type: "application/json",
                        response_schema: prompt.schema.to_gemini(),
                    },
                }),
            Dialect::ChatCompletions => request.bearer_auth(&self.config.api_key).json(&json!({
                "model": self.config.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt.text,
                    },
                ],
                "response_format": {
                    "type": "json_schema",
                    "json_schema": {
                        "name": "repost_kit",
                        "strict": true,
                        "schema": prompt.schema.to_json_schema(),
                    },
                },
            })),
        };

        debug!(url = %url, model = %self.config.model, "Sending generation request");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::transport(
                Some(status.as_u16()),
                format!("{} returned {}: {}", self.config.provider.name(), status, truncate(&body)),
            ));
        }

        let body = response.text().await?;
        match self.config.dialect() {
            Dialect::GeminiGenerateContent => extract_gemini_text(&body),
            Dialect::ChatCompletions => extract_chat_text(&body),
        }
    }
}

fn extract_gemini_text(body: &str) -> Result<String> {
    let response: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::malformed(format!("failed to parse Gemini response: {e}"))
    })?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| GenerationError::malformed("no content in Gemini response"))
}

fn extract_chat_text(body: &str) -> Result<String> {
    let response: Value = serde_json::from_str(body).map_err(|e| {
        GenerationError::malformed(format!("failed to parse chat completion response: {e}"))
    })?;

    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| GenerationError::malformed("no content in chat completion response"))
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.send_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_backoff * attempt;
                    warn!(
                        error = %e,
                        attempt,
                        max_retries = self.config.max_retries,
                        "Transient transport failure, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
