//! Structured values exchanged between the lead agent, its subagents and the client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::agents::StructuredOutput;

/// One focused unit of research handed to a subagent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    /// What the subagent should find out
    pub description: String,
    /// The angle or domain to concentrate on
    pub focus_area: String,
}

impl Task {
    pub fn new(description: impl Into<String>, focus_area: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            focus_area: focus_area.into(),
        }
    }
}

/// Tasks dispatched together in one round, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskBatch {
    /// Two to four focused research tasks
    pub tasks: Vec<Task>,
}

impl TaskBatch {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl StructuredOutput for TaskBatch {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.tasks.is_empty() {
            return Err("`tasks` must contain at least one task".to_string());
        }
        if let Some(task) = self
            .tasks
            .iter()
            .find(|t| t.description.trim().is_empty())
        {
            return Err(format!(
                "every task needs a non-empty `description` (focus area: {:?})",
                task.focus_area
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

/// What one subagent learned about its task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubagentFindings {
    pub task_description: String,
    pub summary: String,
    pub key_insights: Vec<String>,
    /// Number of distinct sources consulted
    pub sources_found: u32,
    pub confidence_level: ConfidenceLevel,
    /// Set when the subagent failed; the lead agent sees this instead of findings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub error: Option<String>,
}

impl SubagentFindings {
    /// Findings record standing in for a task that failed
    pub fn failed(task: &Task, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            task_description: task.description.clone(),
            summary: format!("Research on this task failed: {}", error),
            key_insights: Vec::new(),
            sources_found: 0,
            confidence_level: ConfidenceLevel::Low,
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl StructuredOutput for SubagentFindings {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("`summary` must not be empty".to_string());
        }
        Ok(())
    }
}

/// One titled part of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub title: String,
    pub content: String,
    /// Nested sections, one level deep
    #[serde(default)]
    pub subsections: Vec<Section>,
}

/// Final research report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResearchReport {
    pub title: String,
    pub executive_summary: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
}

impl StructuredOutput for ResearchReport {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("`title` must not be empty".to_string());
        }
        if self.executive_summary.trim().is_empty() {
            return Err("`executive_summary` must not be empty".to_string());
        }
        Ok(())
    }
}

/// Lead agent's judgement of whether the findings so far answer the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SufficiencyAssessment {
    pub sufficient: bool,
    /// Open questions the findings leave unanswered
    #[serde(default)]
    pub gaps: Vec<String>,
    /// Tasks that would close the gaps; empty when sufficient
    #[serde(default)]
    pub follow_up_tasks: Vec<Task>,
}

impl SufficiencyAssessment {
    /// Follow-up work worth dispatching, if any
    pub fn follow_up(&self) -> Option<TaskBatch> {
        if self.sufficient || self.follow_up_tasks.is_empty() {
            None
        } else {
            Some(TaskBatch {
                tasks: self.follow_up_tasks.clone(),
            })
        }
    }
}

impl StructuredOutput for SufficiencyAssessment {}
