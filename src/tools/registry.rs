use crate::tools::fetch::FetchTool;
use crate::tools::search::SearchTool;
use crate::tools::RetryPolicy;
use crate::types::{AppError, Result, ToolDefinition};
use crate::utils::toml_config::ResearchConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value>;
}

#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    policy: RetryPolicy,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            policy: RetryPolicy::default(),
        }
    }

    /// Create a registry holding web_search and web_fetch as configured
    pub fn for_research(config: &ResearchConfig) -> Result<Self> {
        let mut registry = Self::new().with_policy(RetryPolicy::from_config(&config.retry));

        registry.register(Arc::new(SearchTool::from_config(
            &config.tools.web_search,
            config.search_api_key(),
        )?));
        registry.register(Arc::new(FetchTool::from_config(&config.tools.web_fetch)?));

        Ok(registry)
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// A registry sharing this one's tools and policy, limited to `names`
    pub fn restricted_to(&self, names: &[String]) -> Self {
        Self {
            tools: self
                .tools
                .iter()
                .filter(|(name, _)| names.contains(name))
                .map(|(name, tool)| (name.clone(), Arc::clone(tool)))
                .collect(),
            policy: self.policy.clone(),
        }
    }

    /// Tool definitions sorted by name
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute one tool call.
    ///
    /// `attempt` counts how many times this same call has been made (starting
    /// at 1). A retryable failure sleeps for the policy's backoff before the
    /// error is returned as the retry signal.
    pub async fn execute(&self, name: &str, args: Value, attempt: u32) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Tool not found: {}", name)))?;

        match tool.execute(args).await {
            Ok(value) => Ok(value),
            Err(e) if self.policy.retryable(&e) => {
                let delay = self.policy.backoff(&e, attempt);
                tracing::warn!(tool = name, attempt, ?delay, error = %e, "Retryable tool failure");
                tokio::time::sleep(delay).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Get a list of all registered tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Check if a tool is registered
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
