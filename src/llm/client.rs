//! LLM Client abstractions and provider selection
//!
//! This module provides a unified interface over the supported LLM backends:
//! - **OpenAI**: the OpenAI chat completions API and any compatible server
//!   (OpenRouter, vLLM, LM Studio, ...), with streaming and tool calling
//! - **Ollama**: local inference through Ollama's native chat API, with
//!   streaming and tool calling

use crate::types::{AppError, ChatMessage, Result, ToolCall, ToolDefinition};
use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::time::Duration;

/// Stream of text chunks produced by a model
pub type TextStream = Box<dyn Stream<Item = Result<String>> + Send + Unpin>;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_history(&[ChatMessage::user(prompt)])
            .await
    }

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_with_history(&[ChatMessage::system(system), ChatMessage::user(prompt)])
            .await
    }

    /// Generate with conversation history
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Generate with tool calling support
    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Stream a completion of the conversation as text chunks
    async fn stream_with_history(&self, messages: &[ChatMessage]) -> Result<TextStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM generation request
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
}

impl LLMResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Sampling and transport parameters shared by all providers
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Time allowed to open a connection to a provider
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a provider.
///
/// `params.timeout` limits each read, not the whole request, so a long stream
/// is never cut off while tokens keep arriving. One-shot calls add it as a
/// total per-request timeout.
pub(crate) fn http_client(params: &GenerationParams) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(params.timeout)
        .build()
        .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including any OpenAI-compatible API)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    ///     params: GenerationParams::default(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        params: GenerationParams,
    },

    /// Ollama local LLM provider
    ///
    /// Research subagents rely on tool calling, so pick a model that
    /// supports it (`llama3.1`, `qwen2.5`, ...).
    Ollama {
        base_url: String,
        model: String,
        params: GenerationParams,
    },
}

impl Provider {
    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                params.clone(),
            )?)),

            Provider::Ollama {
                base_url,
                model,
                params,
            } => Ok(Box::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
                params.clone(),
            )?)),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Split a streaming HTTP body into complete, non-empty lines
pub(crate) fn response_lines(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    stream! {
        let mut bytes = Box::pin(response.bytes_stream());
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(AppError::LLM(format!("Stream error: {}", e)));
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8_lossy(&line).trim().to_string();
                if !line.is_empty() {
                    yield Ok(line);
                }
            }
        }

        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
        if !rest.is_empty() {
            yield Ok(rest);
        }
    }
}

/// Turn a non-success response into an LLM error carrying its body
pub(crate) async fn ensure_success(response: reqwest::Response, provider: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(AppError::LLM(format!(
        "{} request failed ({}): {}",
        provider, status, text
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let openai = Provider::OpenAI {
            api_key: "".to_string(),
            api_base: "".to_string(),
            model: "gpt-4o-mini".to_string(),
            params: GenerationParams::default(),
        };
        assert_eq!(openai.name(), "OpenAI");
        assert_eq!(openai.model(), "gpt-4o-mini");

        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "llama3.1".to_string(),
            params: GenerationParams::default(),
        };
        assert_eq!(ollama.name(), "Ollama");
    }

    #[test]
    fn test_create_client_keeps_model_name() {
        let provider = Provider::Ollama {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            params: GenerationParams::default(),
        };

        let client = match provider.create_client() {
            Ok(client) => client,
            Err(e) => panic!("client creation failed: {}", e),
        };
        assert_eq!(client.model_name(), "llama3.1");
    }

    #[test]
    fn test_response_tool_call_detection() {
        let response = LLMResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "1".to_string(),
                name: "web_search".to_string(),
                arguments: serde_json::json!({"query": "x"}),
            }],
            finish_reason: "tool_calls".to_string(),
        };
        assert!(response.has_tool_calls());
        assert!(!LLMResponse::default().has_tool_calls());
    }
}
