//! Plain conversational replies, streamed as free text.

use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};

use crate::agents::prompts::{render_instructions, CHAT_PROMPT};
use crate::agents::structured::ResearchDeps;
use crate::llm::LLMClient;
use crate::streaming::PartialReport;
use crate::types::{ChatMessage, ConversationMessage, Result};
use crate::utils::toml_config::AgentConfig;

pub struct ChatAgent {
    llm: Arc<dyn LLMClient>,
    instructions: String,
}

impl ChatAgent {
    pub fn new(llm: Arc<dyn LLMClient>, instructions: impl Into<String>) -> Self {
        Self {
            llm,
            instructions: instructions.into(),
        }
    }

    pub fn from_config(config: &AgentConfig, llm: Arc<dyn LLMClient>) -> Self {
        let instructions = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| CHAT_PROMPT.to_string());
        Self::new(llm, instructions)
    }

    /// Stream a reply; each item is the full text generated so far
    pub fn reply(
        &self,
        prompt: String,
        history: Vec<ConversationMessage>,
        deps: ResearchDeps,
    ) -> impl Stream<Item = Result<PartialReport>> + Send + '_ {
        stream! {
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(ChatMessage::system(render_instructions(&self.instructions, &deps.current_date)));
            messages.extend(history.iter().map(ChatMessage::from));
            messages.push(ChatMessage::user(prompt));

            let mut chunks = match self.llm.stream_with_history(&messages).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut text = String::new();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(chunk) if chunk.is_empty() => {}
                    Ok(chunk) => {
                        text.push_str(&chunk);
                        yield Ok(PartialReport::RawText(text.clone()));
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    }
}
