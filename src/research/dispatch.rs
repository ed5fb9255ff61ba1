//! Fan-out / fan-in of research tasks
//!
//! Every task in a batch is started at once and the round completes only when
//! all of them have resolved. Findings come back in submission order whatever
//! order the tasks finish in, and a failed task is reported as a findings
//! record carrying the error rather than failing the round.

use async_trait::async_trait;
use futures::future::join_all;

use crate::agents::ResearchDeps;
use crate::research::models::{SubagentFindings, Task, TaskBatch};
use crate::types::Result;

/// Something that can carry out one research task
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: &Task, deps: &ResearchDeps) -> Result<SubagentFindings>;
}

/// Run every task of `batch` concurrently and collect the findings in order
pub async fn dispatch_batch(
    runner: &dyn TaskRunner,
    batch: &TaskBatch,
    deps: &ResearchDeps,
) -> Vec<SubagentFindings> {
    tracing::info!(tasks = batch.len(), "Dispatching subagents");

    let results = join_all(batch.tasks.iter().map(|task| runner.run(task, deps))).await;

    let findings: Vec<SubagentFindings> = batch
        .tasks
        .iter()
        .zip(results)
        .map(|(task, result)| match result {
            Ok(findings) => findings,
            Err(e) => {
                tracing::warn!(task = %task.description, error = %e, "Subagent failed");
                SubagentFindings::failed(task, e.to_string())
            }
        })
        .collect();

    tracing::info!(
        completed = findings.len(),
        failed = findings.iter().filter(|f| f.is_failure()).count(),
        "Subagents finished"
    );

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::models::ConfidenceLevel;
    use crate::types::AppError;
    use std::time::Duration;

    /// Finishes each task after the delay encoded in its focus area
    struct DelayedRunner;

    #[async_trait]
    impl TaskRunner for DelayedRunner {
        async fn run(&self, task: &Task, _deps: &ResearchDeps) -> Result<SubagentFindings> {
            let delay: u64 = task.focus_area.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if task.description == "explode" {
                return Err(AppError::LLM("model unavailable".to_string()));
            }

            Ok(SubagentFindings {
                task_description: task.description.clone(),
                summary: format!("done after {}ms", delay),
                key_insights: Vec::new(),
                sources_found: 1,
                confidence_level: ConfidenceLevel::High,
                error: None,
            })
        }
    }

    #[tokio::test]
    async fn test_findings_follow_submission_order() {
        let batch = TaskBatch {
            tasks: vec![
                Task::new("T1", "90"),
                Task::new("T2", "45"),
                Task::new("T3", "0"),
            ],
        };

        let findings = dispatch_batch(&DelayedRunner, &batch, &ResearchDeps::new("2025-01-01")).await;

        let order: Vec<&str> = findings.iter().map(|f| f.task_description.as_str()).collect();
        assert_eq!(order, vec!["T1", "T2", "T3"]);
    }

    #[tokio::test]
    async fn test_tasks_run_concurrently() {
        let batch = TaskBatch {
            tasks: vec![Task::new("a", "100"), Task::new("b", "100"), Task::new("c", "100")],
        };

        let started = std::time::Instant::now();
        dispatch_batch(&DelayedRunner, &batch, &ResearchDeps::new("2025-01-01")).await;

        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_failure_is_contained() {
        let batch = TaskBatch {
            tasks: vec![Task::new("explode", "10"), Task::new("fine", "0")],
        };

        let findings = dispatch_batch(&DelayedRunner, &batch, &ResearchDeps::new("2025-01-01")).await;

        assert_eq!(findings.len(), 2);
        assert!(findings[0].is_failure());
        assert_eq!(findings[0].task_description, "explode");
        assert!(findings[0].error.as_deref().unwrap().contains("model unavailable"));
        assert!(!findings[1].is_failure());
    }
}
