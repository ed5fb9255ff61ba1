//! Research subagent: one focused task in, structured findings out.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::prompts::SUBAGENT_PROMPT;
use crate::agents::structured::{ResearchDeps, StructuredAgent};
use crate::llm::LLMClient;
use crate::research::dispatch::TaskRunner;
use crate::research::models::{SubagentFindings, Task};
use crate::tools::ToolRegistry;
use crate::types::Result;
use crate::utils::toml_config::AgentConfig;

pub struct Subagent {
    agent: StructuredAgent<SubagentFindings>,
}

impl Subagent {
    pub fn new(agent: StructuredAgent<SubagentFindings>) -> Self {
        Self { agent }
    }

    pub fn from_config(config: &AgentConfig, llm: Arc<dyn LLMClient>, tools: &ToolRegistry) -> Self {
        Self::new(StructuredAgent::from_config(
            "subagent",
            config,
            llm,
            SUBAGENT_PROMPT,
            Some(tools),
        ))
    }

    pub fn task_prompt(task: &Task) -> String {
        format!(
            "Research Task: {}\nFocus Area: {}",
            task.description, task.focus_area
        )
    }
}

#[async_trait]
impl TaskRunner for Subagent {
    async fn run(&self, task: &Task, deps: &ResearchDeps) -> Result<SubagentFindings> {
        tracing::debug!(task = %task.description, focus = %task.focus_area, "Subagent starting");

        let mut findings = self.agent.run(&Self::task_prompt(task), &[], deps).await?;
        if findings.task_description.trim().is_empty() {
            findings.task_description = task.description.clone();
        }

        tracing::debug!(
            task = %task.description,
            sources = findings.sources_found,
            insights = findings.key_insights.len(),
            "Subagent finished"
        );
        Ok(findings)
    }
}
