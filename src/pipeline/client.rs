//! Completion client: send one prompt, get the model's raw text back.
//!
//! [`CompletionClient`] is the seam between the session and the hosted model.
//! [`ChatCompletionsClient`] speaks the OpenAI-compatible
//! `POST {base_url}/chat/completions` protocol that Groq exposes.
//!
//! One request per call: no retries, no streaming, no `max_tokens`, and no
//! request timeout beyond what `reqwest` applies by default. The response
//! text is returned untouched; deciding whether it is JSON is the caller's job.

use crate::config::GenerationConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Longest API error body echoed back into an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Everything one completion call needs.
#[derive(Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub api_key: String,
    pub prompt: String,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(config: &GenerationConfig, prompt: impl Into<String>) -> Self {
        Self {
            model: config.model.as_str().to_string(),
            api_key: config.api_key.clone(),
            prompt: prompt.into(),
            temperature: config.temperature,
        }
    }
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("prompt_chars", &self.prompt.chars().count())
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// A language-model backend that turns a prompt into text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion and return the response content verbatim.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClientError>;

    /// Name of this backend (for diagnostics).
    fn name(&self) -> &str;
}

// ── OpenAI-compatible chat completions ───────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for Groq (or any OpenAI-compatible) chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    base_url: String,
    http: reqwest::Client,
}

impl ChatCompletionsClient {
    /// Create a client rooted at `base_url` (e.g. `https://api.groq.com/openai/v1`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .user_agent(concat!("doc2json/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport {
                endpoint: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { base_url, http })
    }

    /// Create a client for the endpoint configured in `config`.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ClientError> {
        Self::new(config.base_url.clone())
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClientError> {
        let endpoint = self.endpoint();
        let body = ChatRequest {
            model: &request.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            stream: false,
        };

        debug!("POST {} (model {})", endpoint, request.model);
        let transport = |e: reqwest::Error| ClientError::Transport {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        };

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), retry_after, &text));
        }
        parse_completion(&text)
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

/// Map a non-success HTTP status to a [`ClientError`].
fn classify_status(status: u16, retry_after_secs: Option<u64>, body: &str) -> ClientError {
    let message = api_error_message(body);
    match status {
        401 | 403 => ClientError::Auth {
            status,
            detail: message,
        },
        429 => ClientError::RateLimited { retry_after_secs },
        _ => ClientError::Api { status, message },
    }
}

/// Prefer the API's own `error.message`; fall back to a truncated body.
fn api_error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return parsed.error.message;
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{cut}…")
    } else if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Pull `choices[0].message.content` out of a success body.
fn parse_completion(body: &str) -> Result<String, ClientError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::InvalidResponse(format!("not a chat completion: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ClientError::InvalidResponse("response has no message content".into()))
}
