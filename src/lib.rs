//! # Deep Research Server
//!
//! A lead/sub-agent research server: a lead agent breaks a research query into
//! focused tasks, runs one web-searching subagent per task concurrently, and
//! streams the synthesized report back as incremental markdown.
//!
//! ## Overview
//!
//! The crate can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `deep-research-server` binary
//! 2. **As a library** - Embed the research pipeline in your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use deep_research::{AppState, ResearchConfig};
//! use deep_research::agents::ResearchDeps;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ResearchConfig::load("research.toml")?;
//!     let state = AppState::from_config(config)?;
//!
//!     let mut report = Box::pin(state.research_agent.research(
//!         "State of solid-state batteries".to_string(),
//!         Vec::new(),
//!         ResearchDeps::today(),
//!     ));
//!     while let Some(snapshot) = report.next().await {
//!         println!("{}", snapshot?.render());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Streaming as markdown deltas
//!
//! ```rust,ignore
//! use deep_research::streaming::stream_events;
//!
//! let events = stream_events(message_id, snapshots);
//! // text-start, text-delta*, text-end, [DONE]
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - Structured-output agents, the research subagent and chat
//! - [`api`] - REST API handlers and routes
//! - [`llm`] - LLM client implementations
//! - [`research`] - Lead agent, task dispatch and the research data model
//! - [`streaming`] - Partial JSON, markdown rendering and the delta streamer
//! - [`tools`] - Web search and page fetch tools, retry policy
//! - [`types`] - Common types and error handling
//!
//! ## Configuration
//!
//! Everything is configured through a single TOML file (`research.toml`),
//! loaded once at startup. Run `deep-research-server init` to scaffold one.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Structured-output agents, subagents and chat.
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Multi-agent research coordination.
pub mod research;
/// Incremental markdown streaming.
pub mod streaming;
/// Built-in web tools (search, fetch).
pub mod tools;
/// Core types (requests, messages, errors).
pub mod types;
/// Configuration and logging utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{ChatAgent, StructuredAgent, Subagent};
pub use llm::{LLMClient, LLMResponse, Provider, ProviderRegistry};
pub use research::ResearchCoordinator;
pub use tools::registry::ToolRegistry;
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigError, ResearchConfig};

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded at startup
    pub config: Arc<ResearchConfig>,
    /// Lead agent used when `webSearch` is requested
    pub research_agent: Arc<ResearchCoordinator>,
    /// Plain conversational agent
    pub chat_agent: Arc<ChatAgent>,
}

impl AppState {
    /// Build every agent from configuration, with real provider clients and
    /// the web tools
    pub fn from_config(config: ResearchConfig) -> Result<Self> {
        let providers = ProviderRegistry::from_config(&config);
        let tools = ToolRegistry::for_research(&config)?;
        Self::build(config, tools, |model| providers.create_client_for_model(model))
    }

    /// Build the agents with a caller-provided client factory, keyed by model
    /// name
    pub fn build<F>(config: ResearchConfig, tools: ToolRegistry, client_for: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<Arc<dyn LLMClient>>,
    {
        let agents = &config.agents;

        let subagent = Subagent::from_config(&agents.subagent, client_for(&agents.subagent.model)?, &tools);
        let research_agent =
            ResearchCoordinator::from_config(&agents.lead, client_for(&agents.lead.model)?, Arc::new(subagent))
                .with_max_followup_rounds(config.research.followup_rounds());
        let chat_agent = ChatAgent::from_config(&agents.chat, client_for(&agents.chat.model)?);

        tracing::info!(
            lead = %agents.lead.model,
            subagent = %agents.subagent.model,
            chat = %agents.chat.model,
            tools = ?tools.tool_names(),
            "Agents ready"
        );

        Ok(Self {
            config: Arc::new(config),
            research_agent: Arc::new(research_agent),
            chat_agent: Arc::new(chat_agent),
        })
    }
}
