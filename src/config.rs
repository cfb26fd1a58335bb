//! Configuration for the generation step.
//!
//! Everything the orchestrator needs besides the session's own data lives in
//! [`GenerationConfig`], built via [`GenerationConfigBuilder`]. The API key is
//! carried here and nowhere else; the hand-written `Debug` impl redacts it so
//! the config can be logged freely.

use crate::error::Doc2JsonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Groq's OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Configuration for one generation request.
///
/// # Example
/// ```rust
/// use doc2json::{GenerationConfig, ModelId};
///
/// let config = GenerationConfig::builder()
///     .api_key("gsk_example")
///     .model(ModelId::Llama3_70b)
///     .build()
///     .unwrap();
/// assert_eq!(config.model.as_str(), "llama3-70b-8192");
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Hosted model to call. Default: [`ModelId::Llama3_8b`].
    pub model: ModelId,

    /// Secret API key. May be empty here; the session refuses to call the
    /// model with an empty key and reports
    /// [`Doc2JsonError::MissingCredential`] instead.
    pub api_key: String,

    /// Root of the chat-completions API. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field(
                "api_key",
                &if self.api_key.is_empty() {
                    "<empty>"
                } else {
                    "<redacted>"
                },
            )
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether a non-empty API key is present.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: ModelId) -> Self {
        self.config.model = model;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, Doc2JsonError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Doc2JsonError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                c.base_url
            )));
        }
        if let Some(t) = c.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Doc2JsonError::InvalidConfig(format!(
                    "temperature must be 0.0–2.0, got {t}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Model selection ──────────────────────────────────────────────────────

/// The fixed set of models offered for generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    /// `llama3-8b-8192` (default)
    #[default]
    #[serde(rename = "llama3-8b-8192")]
    Llama3_8b,
    /// `llama3-70b-8192`
    #[serde(rename = "llama3-70b-8192")]
    Llama3_70b,
    /// `mixtral-8x7b-32768`
    #[serde(rename = "mixtral-8x7b-32768")]
    Mixtral8x7b,
    /// `gemma-7b-it`
    #[serde(rename = "gemma-7b-it")]
    Gemma7b,
}

impl ModelId {
    /// Every selectable model, in menu order.
    pub const ALL: [ModelId; 4] = [
        ModelId::Llama3_8b,
        ModelId::Llama3_70b,
        ModelId::Mixtral8x7b,
        ModelId::Gemma7b,
    ];

    /// Identifier sent to the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Llama3_8b => "llama3-8b-8192",
            ModelId::Llama3_70b => "llama3-70b-8192",
            ModelId::Mixtral8x7b => "mixtral-8x7b-32768",
            ModelId::Gemma7b => "gemma-7b-it",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = Doc2JsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = ModelId::ALL.iter().map(|m| m.as_str()).collect();
                Doc2JsonError::InvalidConfig(format!(
                    "unknown model '{s}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}
