//! TOML-based configuration for the research server
//!
//! This module provides declarative configuration for providers, models, the
//! three agent roles (lead, subagent, chat), the web tools and their retry
//! policy via a TOML file (`research.toml`).
//!
//! The configuration is loaded once at startup and shared read-only through
//! [`crate::AppState`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tools::{FETCH_TOOL_NAME, SEARCH_TOOL_NAME};

/// Follow-up rounds allowed after the initial dispatch, whatever the config says.
pub const MAX_FOLLOWUP_ROUNDS: u8 = 2;

/// Root configuration structure loaded from research.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Agent role configurations
    pub agents: AgentsConfig,

    /// Web tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Retry policy applied at the tool boundary
    #[serde(default)]
    pub retry: RetryConfig,

    /// Lead agent iteration limits
    #[serde(default)]
    pub research: ResearchLimits,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Origins allowed by the CORS layer
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            cors_origins: default_cors_origins(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// OpenAI or any API speaking the OpenAI chat completions protocol
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        default_model: String,
        #[serde(default = "default_provider_timeout")]
        timeout_secs: u64,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        default_model: String,
        #[serde(default = "default_provider_timeout")]
        timeout_secs: u64,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_provider_timeout() -> u64 {
    120
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_model_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_model_max_tokens() -> u32 {
    4096
}

// ============= Agent Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    pub lead: AgentConfig,
    pub subagent: AgentConfig,
    pub chat: AgentConfig,
}

impl AgentsConfig {
    /// Iterate over `(role, config)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AgentConfig)> {
        [
            ("lead", &self.lead),
            ("subagent", &self.subagent),
            ("chat", &self.chat),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Reference to a model name defined in [models]
    pub model: String,

    /// Overrides the built-in instructions for this role. Not accepted on the
    /// lead, whose stages are overridden one by one in `stage_prompts`.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Per-stage instruction overrides, lead only
    #[serde(default)]
    pub stage_prompts: StagePrompts,

    /// List of tool names this agent can use
    #[serde(default)]
    pub tools: Vec<String>,

    /// Maximum tool calling iterations
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Re-prompts allowed when the output does not match its schema
    #[serde(default = "default_output_retries")]
    pub output_retries: usize,
}

/// Instructions for the planning, evaluation and synthesis stages of the lead.
/// Unset stages keep their built-in prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagePrompts {
    #[serde(default)]
    pub planning: Option<String>,
    #[serde(default)]
    pub evaluation: Option<String>,
    #[serde(default)]
    pub synthesis: Option<String>,
}

impl StagePrompts {
    pub fn is_empty(&self) -> bool {
        self.planning.is_none() && self.evaluation.is_none() && self.synthesis.is_none()
    }
}

fn default_max_tool_iterations() -> usize {
    10
}

fn default_output_retries() -> usize {
    2
}

// ============= Tool Configuration =============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub web_search: SearchToolConfig,

    #[serde(default)]
    pub web_fetch: FetchToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchToolConfig {
    /// Environment variable containing the search API token
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_search_count")]
    pub count: u32,

    #[serde(default = "default_country")]
    pub country: String,

    #[serde(default = "default_search_lang")]
    pub search_lang: String,
}

fn default_search_key_env() -> String {
    "BRAVE_API_KEY".to_string()
}

fn default_search_endpoint() -> String {
    "https://api.search.brave.com/res/v1/web/search".to_string()
}

fn default_search_timeout() -> u64 {
    20
}

fn default_search_count() -> u32 {
    10
}

fn default_country() -> String {
    "us".to_string()
}

fn default_search_lang() -> String {
    "en".to_string()
}

impl Default for SearchToolConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            endpoint: default_search_endpoint(),
            timeout_secs: default_search_timeout(),
            count: default_search_count(),
            country: default_country(),
            search_lang: default_search_lang(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchToolConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extracted page text is cut to this many characters
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("deep-research-server/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_content_chars() -> usize {
    40_000
}

impl Default for FetchToolConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

// ============= Retry & Research Limits =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_ms: u64,

    #[serde(default = "default_server_error_backoff")]
    pub server_error_backoff_ms: u64,

    #[serde(default = "default_network_backoff")]
    pub network_backoff_ms: u64,

    /// Growth factor applied per repeated attempt (1.0 keeps the backoff fixed)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_rate_limit_backoff() -> u64 {
    2000
}

fn default_server_error_backoff() -> u64 {
    3000
}

fn default_network_backoff() -> u64 {
    2000
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            rate_limit_backoff_ms: default_rate_limit_backoff(),
            server_error_backoff_ms: default_server_error_backoff(),
            network_backoff_ms: default_network_backoff(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchLimits {
    #[serde(default = "default_followup_rounds")]
    pub max_followup_rounds: u8,
}

fn default_followup_rounds() -> u8 {
    MAX_FOLLOWUP_ROUNDS
}

impl Default for ResearchLimits {
    fn default() -> Self {
        Self {
            max_followup_rounds: default_followup_rounds(),
        }
    }
}

impl ResearchLimits {
    /// Configured follow-up rounds, clamped to [`MAX_FOLLOWUP_ROUNDS`]
    pub fn followup_rounds(&self) -> u8 {
        self.max_followup_rounds.min(MAX_FOLLOWUP_ROUNDS)
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by agent '{1}' does not exist")]
    MissingModel(String, String),

    #[error("Tool '{0}' referenced by agent '{1}' does not exist")]
    MissingTool(String, String),
}

impl ResearchConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file without validating it
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration without validating references or environment
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_references()?;

        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        let search_enabled = self
            .agents
            .iter()
            .any(|(_, agent)| agent.tools.iter().any(|t| t == SEARCH_TOOL_NAME));
        if search_enabled {
            self.validate_env_var(&self.tools.web_search.api_key_env)?;
        }

        Ok(())
    }

    /// Check model/provider/tool references without touching the environment
    pub fn validate_references(&self) -> Result<(), ConfigError> {
        for (name, model) in &self.models {
            if !self.providers.contains_key(&model.provider) {
                return Err(ConfigError::MissingProvider(
                    model.provider.clone(),
                    name.clone(),
                ));
            }
            if !(0.0..=2.0).contains(&model.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "Model '{}' has temperature {} outside 0.0..=2.0",
                    name, model.temperature
                )));
            }
        }

        for (role, agent) in self.agents.iter() {
            if !self.models.contains_key(&agent.model) {
                return Err(ConfigError::MissingModel(
                    agent.model.clone(),
                    role.to_string(),
                ));
            }
            for tool in &agent.tools {
                if tool != SEARCH_TOOL_NAME && tool != FETCH_TOOL_NAME {
                    return Err(ConfigError::MissingTool(tool.clone(), role.to_string()));
                }
            }
            if role != "lead" && !agent.stage_prompts.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "agents.{}.stage_prompts is only read for the lead",
                    role
                )));
            }
        }

        if self.agents.lead.system_prompt.is_some() {
            return Err(ConfigError::ValidationError(
                "agents.lead.system_prompt would apply to every stage; set \
                 agents.lead.stage_prompts.planning, .evaluation or .synthesis instead"
                    .to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "retry.multiplier must be >= 1.0".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Search API token, if the configured env var is set
    pub fn search_api_key(&self) -> Option<String> {
        self.resolve_env(&self.tools.web_search.api_key_env)
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.web_fetch.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_config() -> String {
        r#"
[server]
host = "127.0.0.1"
port = 8000

[providers.local]
type = "ollama"
default_model = "llama3.1"

[models.default]
provider = "local"
model = "llama3.1"
temperature = 0.2

[agents.lead]
model = "default"

[agents.subagent]
model = "default"
tools = ["web_fetch"]
max_tool_iterations = 8

[agents.chat]
model = "default"
system_prompt = "You are terse."
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        let config = ResearchConfig::from_toml_str(&create_test_config()).unwrap();

        assert_eq!(config.server.port, 8000);
        assert!(config.providers.contains_key("local"));
        assert_eq!(config.agents.subagent.max_tool_iterations, 8);
        assert_eq!(config.agents.lead.output_retries, 2);
        assert_eq!(
            config.agents.chat.system_prompt.as_deref(),
            Some("You are terse.")
        );
    }

    #[test]
    fn test_defaults_applied() {
        let config = ResearchConfig::from_toml_str(&create_test_config()).unwrap();

        assert_eq!(config.tools.web_fetch.timeout_secs, 30);
        assert_eq!(config.tools.web_search.timeout_secs, 20);
        assert_eq!(config.tools.web_search.count, 10);
        assert_eq!(config.retry.rate_limit_backoff_ms, 2000);
        assert_eq!(config.retry.server_error_backoff_ms, 3000);
        assert_eq!(config.research.followup_rounds(), 2);
        assert_eq!(config.server.cors_origins.len(), 2);
    }

    #[test]
    fn test_followup_rounds_clamped() {
        let limits = ResearchLimits {
            max_followup_rounds: 9,
        };
        assert_eq!(limits.followup_rounds(), MAX_FOLLOWUP_ROUNDS);

        let limits = ResearchLimits {
            max_followup_rounds: 1,
        };
        assert_eq!(limits.followup_rounds(), 1);
    }

    #[test]
    fn test_validation_passes_without_env() {
        let config = ResearchConfig::from_toml_str(&create_test_config()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_provider() {
        let content = r#"
[models.test]
provider = "nonexistent"
model = "test"
[agents.lead]
model = "test"
[agents.subagent]
model = "test"
[agents.chat]
model = "test"
"#;

        let config = ResearchConfig::from_toml_str(content).unwrap();
        let result = config.validate_references();

        assert!(matches!(result, Err(ConfigError::MissingProvider(_, _))));
    }

    #[test]
    fn test_validation_missing_model() {
        let content = create_test_config().replace(
            "[agents.chat]\nmodel = \"default\"",
            "[agents.chat]\nmodel = \"missing\"",
        );

        let config = ResearchConfig::from_toml_str(&content).unwrap();
        let result = config.validate_references();

        assert!(
            matches!(result, Err(ConfigError::MissingModel(ref model, ref role)) if model == "missing" && role == "chat")
        );
    }

    #[test]
    fn test_validation_missing_tool() {
        let content = create_test_config().replace("tools = [\"web_fetch\"]", "tools = [\"shell\"]");

        let config = ResearchConfig::from_toml_str(&content).unwrap();
        let result = config.validate_references();

        assert!(matches!(result, Err(ConfigError::MissingTool(_, _))));
    }

    #[test]
    fn test_lead_stage_prompts() {
        let content = create_test_config().replace(
            "[agents.lead]\nmodel = \"default\"",
            "[agents.lead]\nmodel = \"default\"\n\n[agents.lead.stage_prompts]\nplanning = \"Plan briefly.\"",
        );

        let config = ResearchConfig::from_toml_str(&content).unwrap();

        let stages = &config.agents.lead.stage_prompts;
        assert_eq!(stages.planning.as_deref(), Some("Plan briefly."));
        assert!(stages.evaluation.is_none());
        assert!(config.agents.chat.stage_prompts.is_empty());
        assert!(config.validate_references().is_ok());
    }

    #[test]
    fn test_lead_system_prompt_rejected() {
        let content = create_test_config().replace(
            "[agents.lead]\nmodel = \"default\"",
            "[agents.lead]\nmodel = \"default\"\nsystem_prompt = \"Be thorough.\"",
        );

        let config = ResearchConfig::from_toml_str(&content).unwrap();
        let result = config.validate_references();

        assert!(matches!(result, Err(ConfigError::ValidationError(ref msg)) if msg.contains("stage_prompts")));
    }

    #[test]
    fn test_stage_prompts_outside_lead_rejected() {
        let content = create_test_config() + "\n[agents.chat.stage_prompts]\nsynthesis = \"x\"\n";

        let config = ResearchConfig::from_toml_str(&content).unwrap();
        let result = config.validate_references();

        assert!(matches!(result, Err(ConfigError::ValidationError(ref msg)) if msg.contains("agents.chat")));
    }

    #[test]
    fn test_validation_missing_search_key() {
        let content = create_test_config()
            .replace("tools = [\"web_fetch\"]", "tools = [\"web_search\"]")
            + "\n[tools.web_search]\napi_key_env = \"DEEP_RESEARCH_TEST_UNSET_KEY\"\n";

        let config = ResearchConfig::from_toml_str(&content).unwrap();
        let result = config.validate();

        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref name)) if name == "DEEP_RESEARCH_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ResearchConfig::load("/definitely/not/here/research.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(create_test_config().as_bytes()).unwrap();

        let config = ResearchConfig::load(file.path()).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
    }
}
