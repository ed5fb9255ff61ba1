//! OpenAI chat completions client
//!
//! Speaks the `/chat/completions` protocol directly, so it also works against
//! OpenAI-compatible servers. Streaming uses server-sent events terminated by
//! `data: [DONE]`.

use crate::llm::client::{ensure_success, http_client, response_lines, GenerationParams, LLMClient, LLMResponse, TextStream};
use crate::types::{AppError, ChatMessage, MessageRole, Result, ToolCall, ToolDefinition};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    params: GenerationParams,
}

impl OpenAIClient {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        params: GenerationParams,
    ) -> Result<Self> {
        let http = http_client(&params)?;

        Ok(Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            params,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDefinition], stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages.iter().map(to_openai_message).collect::<Vec<_>>(),
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
            "stream": stream,
        });

        if !tools.is_empty() {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            }
                        })
                    })
                    .collect(),
            );
            body["tool_choice"] = json!("auto");
        }

        body
    }

    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<LLMResponse> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages, tools, false))
            .timeout(self.params.timeout)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("OpenAI request failed: {}", e)))?;

        let response: Value = ensure_success(response, "OpenAI")
            .await?
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Failed to parse OpenAI response: {}", e)))?;

        parse_completion(&response)
    }
}

fn to_openai_message(message: &ChatMessage) -> Value {
    let mut value = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });

    if message.role == MessageRole::Assistant && !message.tool_calls.is_empty() {
        value["tool_calls"] = Value::Array(
            message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect(),
        );
    }

    if let Some(id) = &message.tool_call_id {
        value["tool_call_id"] = json!(id);
    }

    value
}

fn parse_completion(response: &Value) -> Result<LLMResponse> {
    let choice = response
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| AppError::LLM("No choices in OpenAI response".to_string()))?;

    let message = choice
        .get("message")
        .ok_or_else(|| AppError::LLM("No message in OpenAI response".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(|t| t.as_array())
        .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
        .unwrap_or_default();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|f| f.as_str())
        .unwrap_or("stop")
        .to_string();

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let function = call.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();

    // arguments arrive as a JSON-encoded string
    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or_else(|_| json!({})),
        Some(other) => other.clone(),
        None => json!({}),
    };

    let id = call
        .get("id")
        .and_then(|i| i.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    Some(ToolCall {
        id,
        name,
        arguments,
    })
}

/// Text carried by one `data:` line of a streamed completion.
///
/// Returns `None` once the terminal `[DONE]` marker is seen.
fn parse_stream_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return None;
    }

    let chunk: Value = serde_json::from_str(data).ok()?;
    Some(
        chunk
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
    )
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(self.complete(messages, &[]).await?.content)
    }

    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        self.complete(messages, tools).await
    }

    async fn stream_with_history(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages, &[], true))
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("OpenAI request failed: {}", e)))?;
        let response = ensure_success(response, "OpenAI").await?;

        let output = stream! {
            let mut lines = Box::pin(response_lines(response));
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                if line.strip_prefix("data:").map(str::trim) == Some("[DONE]") {
                    return;
                }
                if let Some(text) = parse_stream_line(&line) {
                    if !text.is_empty() {
                        yield Ok(text);
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(output)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
