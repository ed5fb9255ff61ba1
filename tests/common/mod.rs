//! Shared test helpers.

#![allow(dead_code)]

pub mod mocks;

use deep_research::types::Result;
use deep_research::{AppState, LLMClient, ResearchConfig, ToolRegistry};
use std::sync::Arc;

/// Minimal configuration: one model shared by every agent role, no tools.
pub const TEST_CONFIG: &str = r#"
[providers.mock]
type = "ollama"
default_model = "mock"

[models.default]
provider = "mock"
model = "mock"

[agents.lead]
model = "default"

[agents.subagent]
model = "default"

[agents.chat]
model = "default"
"#;

pub fn test_config() -> ResearchConfig {
    ResearchConfig::from_toml_str(TEST_CONFIG).unwrap()
}

/// Application state whose agents all talk to `client`.
pub fn state_with(client: Arc<dyn LLMClient>) -> Result<AppState> {
    AppState::build(test_config(), ToolRegistry::new(), |_| Ok(client.clone()))
}
