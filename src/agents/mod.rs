//! Agents built on top of an [`LLMClient`](crate::llm::LLMClient)
//!
//! - [`StructuredAgent`] - schema-validated output with an optional tool loop
//! - [`Subagent`] - researches one task with web tools
//! - [`ChatAgent`] - free-text conversational replies
//!
//! Agents are plain values built once from configuration at startup and
//! shared read-only between requests.

pub mod chat;
pub mod prompts;
pub mod structured;
pub mod subagent;

pub use chat::ChatAgent;
pub use structured::{ResearchDeps, StructuredAgent, StructuredOutput, StructuredSnapshot};
pub use subagent::Subagent;
