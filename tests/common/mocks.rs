//! Mock implementations for testing.
//!
//! This module provides a scripted LLM client and canned research answers that
//! can be used across different test files without duplication.

#![allow(dead_code)]

use async_trait::async_trait;
use deep_research::llm::{LLMClient, LLMResponse, TextStream};
use deep_research::types::{AppError, ChatMessage, MessageRole, Result, ToolCall, ToolDefinition};
use futures::stream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock LLM client answering by the content of the last user message.
///
/// Rules are checked in order; the first rule whose needle appears in the
/// prompt wins, otherwise the fallback answer is used. Streaming splits the
/// answer into small chunks so partial parsing is exercised.
///
/// # Examples
///
/// ```ignore
/// let client = MockLLMClient::new("default answer")
///     .on("Research Task:", r#"{"summary": "..."}"#);
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    rules: Vec<(String, String)>,
    fallback: String,
    tool_calls: Vec<ToolCall>,
    should_fail: bool,
    delay: Option<Duration>,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(fallback: &str) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.to_string(),
            tool_calls: Vec::new(),
            should_fail: false,
            delay: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer `response` whenever the prompt contains `needle`.
    pub fn on(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), response.to_string()));
        self
    }

    /// Request these tool calls the first time tools are offered.
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    /// Wait this long before a streamed answer starts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every user prompt seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of prompts containing `needle`.
    pub fn count_prompts(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }

    /// Non-system messages of every call, in call order, as `(role, content)`.
    pub fn conversations(&self) -> Vec<Vec<(MessageRole, String)>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.role != MessageRole::System)
                    .map(|m| (m.role, m.content.clone()))
                    .collect()
            })
            .collect()
    }

    pub fn into_client(self) -> Arc<dyn LLMClient> {
        Arc::new(self)
    }

    fn answer(&self, messages: &[ChatMessage]) -> Result<String> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());
        self.calls.lock().unwrap().push(messages.to_vec());

        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        self.answer(messages)
    }

    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let already_called = messages.iter().any(|m| m.role == MessageRole::Tool);
        if !self.tool_calls.is_empty() && !already_called {
            return Ok(LLMResponse {
                content: String::new(),
                tool_calls: self.tool_calls.clone(),
                finish_reason: "tool_calls".to_string(),
            });
        }

        Ok(LLMResponse {
            content: self.answer(messages)?,
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
        })
    }

    async fn stream_with_history(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let answer = self.answer(messages)?;
        let chars: Vec<char> = answer.chars().collect();
        let chunks: Vec<Result<String>> = chars
            .chunks(7)
            .map(|chunk| Ok(chunk.iter().collect()))
            .collect();
        Ok(Box::new(stream::iter(chunks)))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

// ============= Canned Answers =============

pub const PLAN: &str = r#"{"tasks": [
    {"description": "Current solid-state battery chemistries", "focus_area": "technology"},
    {"description": "Manufacturers and production timelines", "focus_area": "industry"}
]}"#;

pub const FINDINGS: &str = r#"Here is what I found:
```json
{
    "task_description": "",
    "summary": "Sulfide electrolytes lead current prototypes.",
    "key_insights": ["Toyota targets 2027", "Dendrites remain a risk"],
    "sources_found": 5,
    "confidence_level": "High"
}
```"#;

pub const SUFFICIENT: &str =
    r#"{"sufficient": true, "gaps": [], "follow_up_tasks": []}"#;

pub const INSUFFICIENT: &str = r#"{"sufficient": false, "gaps": ["pricing"], "follow_up_tasks": [
    {"description": "Projected cost per kWh", "focus_area": "pricing"}
]}"#;

pub const REPORT: &str = r#"{
    "title": "Solid-State Batteries in 2025",
    "executive_summary": "Solid-state cells are nearing pilot production.",
    "sections": [
        {"title": "Technology", "content": "Sulfide and oxide electrolytes compete.", "subsections": [
            {"title": "Sulfides", "content": "Highest conductivity.", "subsections": []}
        ]}
    ],
    "key_takeaways": ["Pilot lines exist", "Cost is the open question"]
}"#;

/// Needles matching the prompts each research stage receives.
pub const EVALUATION_NEEDLE: &str = "Research rounds completed";
pub const SYNTHESIS_NEEDLE: &str = "Findings from all subagents";
pub const TASK_NEEDLE: &str = "Research Task:";

/// Mock answering every research stage, judging findings sufficient or not.
pub fn research_llm(sufficient: bool) -> MockLLMClient {
    MockLLMClient::new(PLAN)
        .on(EVALUATION_NEEDLE, if sufficient { SUFFICIENT } else { INSUFFICIENT })
        .on(SYNTHESIS_NEEDLE, REPORT)
        .on(TASK_NEEDLE, FINDINGS)
}
