//! Agents whose final answer is a typed, schema-validated value
//!
//! A [`StructuredAgent<T>`] prompts a model with its instructions, the JSON
//! schema of `T` and the conversation so far. When it has tools, it drives the
//! model's tool calls until the model answers in text. The answer is then
//! parsed and validated; on failure the model is shown the problem and asked
//! again, up to `output_retries` times.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_stream::stream;
use futures::future::join_all;
use futures::{Stream, StreamExt};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::agents::prompts::render_instructions;
use crate::llm::LLMClient;
use crate::streaming::parse_partial_json;
use crate::tools::ToolRegistry;
use crate::types::{AppError, ChatMessage, Result, ToolCall};
use crate::utils::toml_config::AgentConfig;

const FINAL_ANSWER_PROMPT: &str =
    "You have used all available tool calls. Using the information gathered so far, give your final answer now.";

/// A value an agent can be asked to produce
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Checks beyond the schema; the message is shown to the model on failure
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Per-request context shared by every agent working on the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchDeps {
    pub current_date: String,
}

impl ResearchDeps {
    pub fn new(current_date: impl Into<String>) -> Self {
        Self {
            current_date: current_date.into(),
        }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().format("%Y-%m-%d").to_string())
    }
}

/// One step of a streamed structured run
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredSnapshot<T> {
    /// Fields of the answer received so far
    Partial(Map<String, Value>),
    /// The final, validated answer
    Complete(T),
}

pub struct StructuredAgent<T> {
    name: String,
    llm: Arc<dyn LLMClient>,
    instructions: String,
    tools: Option<ToolRegistry>,
    max_tool_iterations: usize,
    output_retries: usize,
    _output: PhantomData<fn() -> T>,
}

impl<T: StructuredOutput> StructuredAgent<T> {
    pub fn new(name: impl Into<String>, llm: Arc<dyn LLMClient>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            llm,
            instructions: instructions.into(),
            tools: None,
            max_tool_iterations: 10,
            output_retries: 2,
            _output: PhantomData,
        }
    }

    /// Build an agent for a configured role.
    ///
    /// `default_instructions` apply unless the role overrides them, and only
    /// the tools the role lists are taken from `tools`.
    pub fn from_config(
        name: &str,
        config: &AgentConfig,
        llm: Arc<dyn LLMClient>,
        default_instructions: &str,
        tools: Option<&ToolRegistry>,
    ) -> Self {
        let instructions = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| default_instructions.to_string());

        let mut agent = Self::new(name, llm, instructions)
            .with_max_tool_iterations(config.max_tool_iterations)
            .with_output_retries(config.output_retries);

        if let Some(registry) = tools {
            let allowed = registry.restricted_to(&config.tools);
            if !allowed.is_empty() {
                agent = agent.with_tools(allowed);
            }
        }

        agent
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn with_output_retries(mut self, retries: usize) -> Self {
        self.output_retries = retries;
        self
    }

    /// System prompt for a request: instructions plus the output contract
    pub fn system_prompt(&self, deps: &ResearchDeps) -> String {
        let schema = schemars::schema_for!(T);
        let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();

        format!(
            "{}\n\nWhen you give your final answer, respond with a single JSON object that \
             matches this JSON schema, and nothing else:\n```json\n{}\n```",
            render_instructions(&self.instructions, &deps.current_date).trim_end(),
            schema
        )
    }

    fn initial_messages(&self, prompt: &str, history: &[ChatMessage], deps: &ResearchDeps) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt(deps)));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(prompt));
        messages
    }

    /// Run to completion and return the validated answer
    pub async fn run(&self, prompt: &str, history: &[ChatMessage], deps: &ResearchDeps) -> Result<T> {
        let mut messages = self.initial_messages(prompt, history, deps);

        let mut text = match &self.tools {
            Some(registry) => self.tool_loop(registry, &mut messages).await?,
            None => self.llm.generate_with_history(&messages).await?,
        };

        let mut retries = 0;
        loop {
            match parse_output::<T>(&text) {
                Ok(output) => return Ok(output),
                Err(reason) => {
                    if retries >= self.output_retries {
                        return Err(AppError::OutputValidation(format!(
                            "{} gave up after {} retries: {}",
                            self.name, retries, reason
                        )));
                    }
                    retries += 1;
                    tracing::warn!(agent = %self.name, retry = retries, %reason, "Output failed validation, re-prompting");

                    messages.push(ChatMessage::assistant(text));
                    messages.push(ChatMessage::user(retry_prompt(&reason)));
                    text = self.llm.generate_with_history(&messages).await?;
                }
            }
        }
    }

    /// Drive tool calls until the model answers in text
    async fn tool_loop(&self, registry: &ToolRegistry, messages: &mut Vec<ChatMessage>) -> Result<String> {
        let definitions = registry.get_tool_definitions();
        // consecutive retryable failures per (tool, arguments)
        let mut failures: HashMap<String, u32> = HashMap::new();

        for iteration in 0..self.max_tool_iterations {
            let response = self.llm.generate_with_tools(messages, &definitions).await?;

            if !response.has_tool_calls() {
                return Ok(response.content);
            }

            tracing::debug!(
                agent = %self.name,
                iteration,
                calls = response.tool_calls.len(),
                "Executing tool calls"
            );

            messages.push(ChatMessage::assistant_with_tools(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            let calls: Vec<(&ToolCall, String, u32)> = response
                .tool_calls
                .iter()
                .map(|call| {
                    let key = format!("{}:{}", call.name, call.arguments);
                    let attempt = failures.get(&key).copied().unwrap_or(0) + 1;
                    (call, key, attempt)
                })
                .collect();

            let outcomes = join_all(
                calls
                    .iter()
                    .map(|(call, _, attempt)| execute_tool_call(registry, call, *attempt)),
            )
            .await;

            for ((call, key, attempt), outcome) in calls.into_iter().zip(outcomes) {
                if outcome.retryable {
                    failures.insert(key, attempt);
                } else {
                    failures.remove(&key);
                }
                messages.push(ChatMessage::tool(call.id.clone(), outcome.content));
            }
        }

        tracing::warn!(agent = %self.name, max = self.max_tool_iterations, "Tool iteration budget exhausted");
        messages.push(ChatMessage::user(FINAL_ANSWER_PROMPT));
        self.llm.generate_with_history(messages).await
    }

    /// Stream the answer as it is generated.
    ///
    /// Yields a `Partial` snapshot whenever the recoverable part of the answer
    /// changes, then exactly one `Complete` value. Tools are not offered.
    pub fn run_stream<'a>(
        &'a self,
        prompt: String,
        history: Vec<ChatMessage>,
        deps: ResearchDeps,
    ) -> impl Stream<Item = Result<StructuredSnapshot<T>>> + Send + 'a {
        stream! {
            let mut messages = self.initial_messages(&prompt, &history, &deps);
            let mut retries = 0;

            loop {
                let mut chunks = match self.llm.stream_with_history(&messages).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut text = String::new();
                let mut last: Option<Map<String, Value>> = None;

                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(chunk) => text.push_str(&chunk),
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }

                    if let Some(Value::Object(map)) = parse_partial_json(&text) {
                        if last.as_ref() != Some(&map) {
                            last = Some(map.clone());
                            yield Ok(StructuredSnapshot::Partial(map));
                        }
                    }
                }

                match parse_output::<T>(&text) {
                    Ok(output) => {
                        yield Ok(StructuredSnapshot::Complete(output));
                        return;
                    }
                    Err(reason) => {
                        if retries >= self.output_retries {
                            yield Err(AppError::OutputValidation(format!(
                                "{} gave up after {} retries: {}",
                                self.name, retries, reason
                            )));
                            return;
                        }
                        retries += 1;
                        tracing::warn!(agent = %self.name, retry = retries, %reason, "Streamed output failed validation, re-prompting");

                        messages.push(ChatMessage::assistant(text));
                        messages.push(ChatMessage::user(retry_prompt(&reason)));
                    }
                }
            }
        }
    }
}

struct ToolOutcome {
    content: String,
    retryable: bool,
}

async fn execute_tool_call(registry: &ToolRegistry, call: &ToolCall, attempt: u32) -> ToolOutcome {
    tracing::debug!(tool = %call.name, attempt, "Calling tool");

    match registry.execute(&call.name, call.arguments.clone(), attempt).await {
        Ok(value) => ToolOutcome {
            content: value.to_string(),
            retryable: false,
        },
        Err(e) if registry.policy().retryable(&e) => {
            let content = if registry.policy().allows_another(attempt) {
                format!("Ran into an error: {}. Please try again!", e)
            } else {
                format!(
                    "Ran into an error: {}. This call has now failed {} times; \
                     do not repeat it, try a different query or source instead.",
                    e, attempt
                )
            };
            ToolOutcome {
                content,
                retryable: true,
            }
        }
        Err(e) => ToolOutcome {
            content: format!("Ran into an error: {}. Please try again!", e),
            retryable: false,
        },
    }
}

fn retry_prompt(reason: &str) -> String {
    format!(
        "Your previous answer could not be accepted: {}\n\
         Respond again with only a JSON object that matches the schema.",
        reason
    )
}

/// Locate the JSON object in a model answer.
///
/// Handles bare JSON, fenced code blocks and objects wrapped in prose.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    let body = if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let after_lang = after_fence
            .find('\n')
            .map(|i| &after_fence[i + 1..])
            .unwrap_or(after_fence);
        match after_lang.find("```") {
            Some(end) => &after_lang[..end],
            None => after_lang,
        }
    } else {
        trimmed
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&body[start..=end])
}

/// Parse and validate a model answer as `T`
pub fn parse_output<T: StructuredOutput>(text: &str) -> std::result::Result<T, String> {
    let json = extract_json(text).ok_or_else(|| "the answer did not contain a JSON object".to_string())?;

    let output: T = serde_json::from_str(json)
        .map_err(|e| format!("the JSON does not match the schema: {}", e))?;

    output.validate()?;
    Ok(output)
}
