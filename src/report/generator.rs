use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::config::AiConfig;

/// Errors from a generative-text backend.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// No API key configured
    NotConfigured,
    /// The API key was rejected (401/403)
    Unauthorized,
    /// Quota or rate limit reached (429)
    RateLimited,
    /// Any other non-success status
    Http(u16),
    /// The request never got a response
    Network(String),
    /// The response was not a chat completion
    Decode(String),
    /// The completion had no text
    EmptyCompletion,
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::NotConfigured => {
                write!(f, "AI not configured. Add ai.api_key to config.")
            }
            GenerationError::Unauthorized => write!(f, "AI backend rejected the API key"),
            GenerationError::RateLimited => write!(f, "AI backend rate limit reached"),
            GenerationError::Http(status) => write!(f, "AI backend returned HTTP {}", status),
            GenerationError::Network(e) => write!(f, "Network error: {}", e),
            GenerationError::Decode(e) => write!(f, "Invalid AI response: {}", e),
            GenerationError::EmptyCompletion => write!(f, "AI returned an empty completion"),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Anything that turns a conversation into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model name recorded on generated reports.
    fn model(&self) -> &str;

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
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
    #[serde(default)]
    content: Option<String>,
}

/// Client for chat-completions endpoints.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatClient {
    /// Creates a client from config.
    ///
    /// Returns an error if no API key is configured.
    pub fn from_config(config: &AiConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GenerationError::NotConfigured)?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GenerationError::Unauthorized)
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(GenerationError::RateLimited),
            status => return Err(GenerationError::Http(status.as_u16())),
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }
        tracing::debug!("Received {} characters from {}", text.len(), self.model);
        Ok(text)
    }
}
