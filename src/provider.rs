//! Text-Generation Provider
//!
//! The opaque, fallible request/response collaborator behind every generation chunk.
//! Hosted APIs (OpenAI, Anthropic), local models via Ollama and custom
//! OpenAI-compatible servers share one trait; tests drive the engine through
//! [`ScriptedProvider`].

use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod clients;
pub mod profile;
pub mod scripted;

pub use clients::{AnthropicClient, OpenAICompatibleClient};
pub use profile::{ModelProvider, ProviderConfig, ProviderType};
pub use scripted::ScriptedProvider;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionOptions {
    /// 0.0-2.0
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: Some(4096),
            top_p: None,
            stop: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// One request/response round trip. Errors map onto the transport /
    /// irrecoverable split of [`ApiError`].
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    async fn list_models(&self) -> Result<Vec<String>, ApiError>;
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        let provider = config.to_model_provider()?;
        Self::from_model_provider(&provider)
    }

    pub fn from_model_provider(
        provider: &ModelProvider,
    ) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => Ok(Arc::new(OpenAICompatibleClient::new(
                "openai",
                model.clone(),
                base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                Some(api_key.clone()),
            )?)),
            ModelProvider::Anthropic { model, api_key } => Ok(Arc::new(AnthropicClient::new(
                model.clone(),
                api_key.clone(),
            )?)),
            ModelProvider::Ollama { model, base_url } => {
                let base = base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());
                Ok(Arc::new(OpenAICompatibleClient::new(
                    "ollama",
                    model.clone(),
                    format!("{}/v1", base.trim_end_matches('/')),
                    None,
                )?))
            }
            ModelProvider::LocalCustom {
                model,
                endpoint,
                api_key,
            } => Ok(Arc::new(OpenAICompatibleClient::new(
                "local",
                model.clone(),
                endpoint.clone(),
                api_key.clone(),
            )?)),
        }
    }
}
