//! Multi-Agent Research Coordination
//!
//! This module coordinates a lead agent and its subagents to answer research
//! queries that need information gathered from several angles.
//!
//! # Architecture
//!
//! The research system uses a coordinator pattern:
//! - [`coordinator::ResearchCoordinator`] - Plans, dispatches and synthesizes
//! - [`dispatch`] - Runs a batch of tasks concurrently and joins the findings
//! - [`models`] - Tasks, findings and the final report
//!
//! # Usage
//!
//! ```ignore
//! use deep_research::research::ResearchCoordinator;
//!
//! let coordinator = ResearchCoordinator::from_config(&config.agents.lead, llm, subagent);
//!
//! let mut report = Box::pin(coordinator.research(query, history, ResearchDeps::today()));
//! while let Some(snapshot) = report.next().await {
//!     println!("{}", snapshot?.render());
//! }
//! ```
//!
//! # Research Workflow
//!
//! 1. **Planning** - Break the query into 2-4 focused tasks
//! 2. **Dispatch** - Run one subagent per task, all at once, and wait for every one
//! 3. **Evaluation** - Look for gaps and dispatch up to two follow-up rounds
//! 4. **Synthesis** - Stream a structured report built from all findings

/// Research task coordination.
pub mod coordinator;
/// Concurrent task dispatch.
pub mod dispatch;
/// Research data model.
pub mod models;

pub use coordinator::{ResearchCoordinator, ResearchRun};
pub use dispatch::{dispatch_batch, TaskRunner};
pub use models::{
    ConfidenceLevel, ResearchReport, Section, SubagentFindings, SufficiencyAssessment, Task,
    TaskBatch,
};
