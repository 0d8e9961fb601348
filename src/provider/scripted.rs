//! Deterministic provider for tests and dry runs: replies come from a queue of
//! scripted outcomes, then from an optional responder function.

use super::{ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, TokenUsage};
use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<String, ApiError> + Send + Sync>;

pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ApiError>>>,
    responder: Option<Responder>,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::new();
        for response in responses {
            provider.push_response(response);
        }
        provider
    }

    /// Answer every call the script does not cover.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String, ApiError> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Hold every call open for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.script.lock().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: ApiError) {
        self.script.lock().push_back(Err(error));
    }

    /// Inject a failure ahead of everything already scripted.
    pub fn fail_next(&self, error: ApiError) {
        self.script.lock().push_front(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    /// User-role prompt of every call so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProviderClient for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .iter()
            .filter(|m| m.role == super::MessageRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().push(prompt);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.script.lock().pop_front();
        let content = match scripted {
            Some(outcome) => outcome?,
            None => match &self.responder {
                Some(responder) => responder(&messages)?,
                None => {
                    return Err(ApiError::ProviderError(
                        "scripted provider has no response left".to_string(),
                    ))
                }
            },
        };

        Ok(CompletionResponse {
            usage: TokenUsage {
                prompt_tokens: 0,
                completion_tokens: content.split_whitespace().count() as u32,
                total_tokens: content.split_whitespace().count() as u32,
            },
            content,
            model: "scripted".to_string(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(vec!["scripted".to_string()])
    }
}
