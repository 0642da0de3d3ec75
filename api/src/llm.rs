//! OpenAI-compatible chat completions client.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use stride_core::coach::CompletionProvider;
use stride_core::conversation::{ChatTurn, Role};
use stride_core::error::LlmError;

use crate::config::LlmConfig;

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Build the provider for the configured key, or one that always reports
/// [`LlmError::NotConfigured`].
pub fn provider_from_config(config: &LlmConfig) -> Result<Arc<dyn CompletionProvider>, LlmError> {
    match &config.api_key {
        Some(key) => {
            let provider = OpenAiProvider::new(config, key.clone())?;
            let model = provider.model().to_string();
            Ok(Arc::new(LoggingProvider::new(Arc::new(provider), model)))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY is not set; chat turns will return 503");
            Ok(Arc::new(UnconfiguredProvider))
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn build_messages<'a>(system_prompt: &'a str, history: &'a [ChatTurn]) -> Vec<ChatMessage<'a>> {
    std::iter::once(ChatMessage {
        role: "system",
        content: system_prompt,
    })
    .chain(history.iter().map(|turn| ChatMessage {
        role: match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        },
        content: &turn.content,
    }))
    .collect()
}

fn extract_reply(response: ChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| LlmError::InvalidResponse("response contained no message content".to_string()))
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, system_prompt: &str, history: &[ChatTurn]) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(system_prompt, history),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Transport(format!("request timed out: {e}"))
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        extract_reply(parsed)
    }
}

/// Stand-in used when no API key is configured.
pub struct UnconfiguredProvider;

#[async_trait]
impl CompletionProvider for UnconfiguredProvider {
    async fn complete(&self, _system_prompt: &str, _history: &[ChatTurn]) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

/// Logs duration and outcome of every completion.
pub struct LoggingProvider {
    inner: Arc<dyn CompletionProvider>,
    model: String,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn CompletionProvider>, model: String) -> Self {
        Self { inner, model }
    }
}

#[async_trait]
impl CompletionProvider for LoggingProvider {
    async fn complete(&self, system_prompt: &str, history: &[ChatTurn]) -> Result<String, LlmError> {
        let start = Instant::now();
        let result = self.inner.complete(system_prompt, history).await;
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(reply) => tracing::info!(
                model = %self.model,
                duration_ms = %duration_ms,
                history_len = history.len(),
                reply_chars = reply.len(),
                "LLM request completed"
            ),
            Err(e) => tracing::error!(
                model = %self.model,
                duration_ms = %duration_ms,
                error = %e,
                "LLM request failed"
            ),
        }
        result
    }
}
