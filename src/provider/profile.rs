//! Provider configuration as written in `[provider]`, and its resolved form.

use super::CompletionOptions;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

impl ProviderType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Ollama => "ollama",
            ProviderType::LocalCustom => "local",
        }
    }

    /// Environment variable consulted when the config carries no key.
    pub fn api_key_env_var(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderType::Ollama | ProviderType::LocalCustom => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub default_options: CompletionOptions,
}

/// Fully resolved provider: keys looked up, required endpoints present.
#[derive(Debug, Clone)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>,
    },
    Anthropic {
        model: String,
        api_key: String,
    },
    Ollama {
        model: String,
        base_url: Option<String>,
    },
    LocalCustom {
        model: String,
        endpoint: String,
        api_key: Option<String>,
    },
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("endpoint must be an http(s) URL (got {})", endpoint));
            }
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("local provider requires an endpoint".to_string());
        }
        if let Some(temperature) = self.default_options.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!(
                    "temperature must be between 0.0 and 2.0 (got {})",
                    temperature
                ));
            }
        }
        Ok(())
    }

    /// Config key first, then the provider's conventional environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.provider_type
                    .api_key_env_var()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty())
            })
    }

    pub fn to_model_provider(&self) -> Result<ModelProvider, ApiError> {
        self.validate().map_err(ApiError::ConfigError)?;
        let model = self.model.clone();
        let missing_key = || {
            ApiError::ConfigError(format!(
                "{} provider requires an api_key (or {})",
                self.provider_type.as_str(),
                self.provider_type.api_key_env_var().unwrap_or("an API key")
            ))
        };
        Ok(match self.provider_type {
            ProviderType::OpenAI => ModelProvider::OpenAI {
                model,
                api_key: self.resolve_api_key().ok_or_else(missing_key)?,
                base_url: self.endpoint.clone(),
            },
            ProviderType::Anthropic => ModelProvider::Anthropic {
                model,
                api_key: self.resolve_api_key().ok_or_else(missing_key)?,
            },
            ProviderType::Ollama => ModelProvider::Ollama {
                model,
                base_url: self.endpoint.clone(),
            },
            ProviderType::LocalCustom => ModelProvider::LocalCustom {
                model,
                endpoint: self
                    .endpoint
                    .clone()
                    .ok_or_else(|| ApiError::ConfigError("local provider requires an endpoint".to_string()))?,
                api_key: self.resolve_api_key(),
            },
        })
    }
}
