use crate::llm::client::{ensure_success, http_client, response_lines, GenerationParams, LLMClient, LLMResponse, TextStream};
use crate::types::{AppError, ChatMessage, MessageRole, Result, ToolCall, ToolDefinition};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

/// Client for Ollama's native `/api/chat` endpoint
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    params: GenerationParams,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, params: GenerationParams) -> Result<Self> {
        let http = http_client(&params)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            params,
        })
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDefinition], stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages.iter().map(to_ollama_message).collect::<Vec<_>>(),
            "stream": stream,
            "options": {
                "temperature": self.params.temperature,
                "num_predict": self.params.max_tokens,
            }
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
        }

        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let mut request = self.http.post(format!("{}/api/chat", self.base_url)).json(body);
        if body["stream"] != Value::Bool(true) {
            request = request.timeout(self.params.timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("Ollama request failed: {}", e)))?;

        ensure_success(response, "Ollama").await
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<LLMResponse> {
        let response: Value = self
            .send(&self.request_body(messages, tools, false))
            .await?
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Failed to parse Ollama response: {}", e)))?;

        parse_chat_response(&response)
    }
}

fn to_ollama_message(message: &ChatMessage) -> Value {
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
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        }
                    })
                })
                .collect(),
        );
    }

    value
}

fn parse_chat_response(response: &Value) -> Result<LLMResponse> {
    let message = response
        .get("message")
        .ok_or_else(|| AppError::LLM("No message in Ollama response".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();

    let tool_calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(|t| t.as_array())
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    Some(ToolCall {
                        // Ollama does not assign call ids
                        id: uuid::Uuid::new_v4().to_string(),
                        name: function.get("name")?.as_str()?.to_string(),
                        arguments: function.get("arguments").cloned().unwrap_or(json!({})),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let finish_reason = if tool_calls.is_empty() {
        response
            .get("done_reason")
            .and_then(|r| r.as_str())
            .unwrap_or("stop")
            .to_string()
    } else {
        "tool_calls".to_string()
    };

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(self.chat(messages, &[]).await?.content)
    }

    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        self.chat(messages, tools).await
    }

    async fn stream_with_history(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        let response = self.send(&self.request_body(messages, &[], true)).await?;

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

                let chunk: Value = match serde_json::from_str(&line) {
                    Ok(chunk) => chunk,
                    Err(_) => continue,
                };

                if let Some(error) = chunk.get("error").and_then(|e| e.as_str()) {
                    yield Err(AppError::LLM(format!("Ollama stream error: {}", error)));
                    return;
                }

                if let Some(text) = chunk
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .and_then(|c| c.as_str())
                {
                    if !text.is_empty() {
                        yield Ok(text.to_string());
                    }
                }

                if chunk.get("done").and_then(|d| d.as_bool()).unwrap_or(false) {
                    return;
                }
            }
        };

        Ok(Box::new(Box::pin(output)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
