use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};

use crate::agents::prompts::{LEAD_EVALUATION_PROMPT, LEAD_PLANNING_PROMPT, LEAD_SYNTHESIS_PROMPT};
use crate::agents::{ResearchDeps, StructuredAgent, StructuredOutput, StructuredSnapshot};
use crate::llm::LLMClient;
use crate::research::dispatch::{dispatch_batch, TaskRunner};
use crate::research::models::{ResearchReport, SubagentFindings, SufficiencyAssessment, TaskBatch};
use crate::streaming::PartialReport;
use crate::types::{ChatMessage, ConversationMessage, Result};
use crate::utils::toml_config::{AgentConfig, MAX_FOLLOWUP_ROUNDS};

/// Findings gathered for one query
#[derive(Debug, Clone)]
pub struct ResearchRun {
    /// Dispatch rounds performed, including the initial one
    pub rounds: usize,
    /// Findings of every round, in dispatch order
    pub findings: Vec<SubagentFindings>,
}

/// Lead agent: plans the research, dispatches subagents, judges coverage and
/// writes the final report.
pub struct ResearchCoordinator {
    planner: StructuredAgent<TaskBatch>,
    evaluator: StructuredAgent<SufficiencyAssessment>,
    synthesizer: StructuredAgent<ResearchReport>,
    runner: Arc<dyn TaskRunner>,
    max_followup_rounds: u8,
}

impl ResearchCoordinator {
    pub fn new(
        planner: StructuredAgent<TaskBatch>,
        evaluator: StructuredAgent<SufficiencyAssessment>,
        synthesizer: StructuredAgent<ResearchReport>,
        runner: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            planner,
            evaluator,
            synthesizer,
            runner,
            max_followup_rounds: MAX_FOLLOWUP_ROUNDS,
        }
    }

    /// Build all three lead stages from the `[agents.lead]` role.
    ///
    /// Each stage keeps its built-in instructions unless `stage_prompts`
    /// overrides that stage.
    pub fn from_config(config: &AgentConfig, llm: Arc<dyn LLMClient>, runner: Arc<dyn TaskRunner>) -> Self {
        let stages = &config.stage_prompts;
        Self::new(
            lead_stage("lead-planner", config, llm.clone(), stages.planning.as_deref(), LEAD_PLANNING_PROMPT),
            lead_stage("lead-evaluator", config, llm.clone(), stages.evaluation.as_deref(), LEAD_EVALUATION_PROMPT),
            lead_stage("lead-synthesizer", config, llm, stages.synthesis.as_deref(), LEAD_SYNTHESIS_PROMPT),
            runner,
        )
    }

    /// Follow-up rounds allowed after the first dispatch, capped at two
    pub fn with_max_followup_rounds(mut self, rounds: u8) -> Self {
        self.max_followup_rounds = rounds.min(MAX_FOLLOWUP_ROUNDS);
        self
    }

    pub fn max_followup_rounds(&self) -> u8 {
        self.max_followup_rounds
    }

    /// Plan, dispatch and iterate until the findings suffice or the round
    /// cap is reached
    pub async fn gather(&self, query: &str, history: &[ChatMessage], deps: &ResearchDeps) -> Result<ResearchRun> {
        let plan = self.planner.run(query, history, deps).await?;
        tracing::info!(tasks = plan.len(), "Research plan ready");

        let mut findings = dispatch_batch(self.runner.as_ref(), &plan, deps).await;
        let mut rounds = 1;

        for followup in 1..=self.max_followup_rounds {
            let prompt = evaluation_prompt(query, &findings, rounds);
            let assessment = match self.evaluator.run(&prompt, history, deps).await {
                Ok(assessment) => assessment,
                Err(e) => {
                    tracing::warn!(error = %e, "Sufficiency evaluation failed, synthesizing current findings");
                    break;
                }
            };

            let batch = match assessment.follow_up() {
                Some(batch) => batch,
                None => {
                    tracing::info!(rounds, "Findings judged sufficient");
                    break;
                }
            };

            tracing::info!(
                followup,
                max = self.max_followup_rounds,
                gaps = ?assessment.gaps,
                "Dispatching follow-up round"
            );
            findings.extend(dispatch_batch(self.runner.as_ref(), &batch, deps).await);
            rounds += 1;
        }

        Ok(ResearchRun { rounds, findings })
    }

    /// Research `query` and stream the report as it is written.
    ///
    /// Yields `RawDict` snapshots while the report is generated and ends with
    /// the validated report as `Full`.
    pub fn research(
        &self,
        query: String,
        history: Vec<ConversationMessage>,
        deps: ResearchDeps,
    ) -> impl Stream<Item = Result<PartialReport>> + Send + '_ {
        stream! {
            let history: Vec<ChatMessage> = history.iter().map(ChatMessage::from).collect();

            let run = match self.gather(&query, &history, &deps).await {
                Ok(run) => run,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            tracing::info!(rounds = run.rounds, findings = run.findings.len(), "Synthesizing report");

            let prompt = synthesis_prompt(&query, &run.findings);
            let mut snapshots = Box::pin(self.synthesizer.run_stream(prompt, history, deps));

            while let Some(snapshot) = snapshots.next().await {
                match snapshot {
                    Ok(StructuredSnapshot::Partial(map)) => yield Ok(PartialReport::RawDict(map)),
                    Ok(StructuredSnapshot::Complete(report)) => yield Ok(PartialReport::Full(report)),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    }
}

fn findings_json(findings: &[SubagentFindings]) -> String {
    serde_json::to_string_pretty(findings).unwrap_or_default()
}

fn evaluation_prompt(query: &str, findings: &[SubagentFindings], rounds: usize) -> String {
    format!(
        "Research query: {}\n\nResearch rounds completed: {}\n\nFindings so far:\n{}\n\n\
         Assess whether these findings are sufficient to write a comprehensive report.",
        query,
        rounds,
        findings_json(findings)
    )
}

fn synthesis_prompt(query: &str, findings: &[SubagentFindings]) -> String {
    format!(
        "Research query: {}\n\nFindings from all subagents:\n{}\n\n\
         Write the final research report. Do not include citations or references.",
        query,
        findings_json(findings)
    )
}

fn lead_stage<T: StructuredOutput>(
    name: &str,
    config: &AgentConfig,
    llm: Arc<dyn LLMClient>,
    instructions: Option<&str>,
    default_instructions: &str,
) -> StructuredAgent<T> {
    StructuredAgent::new(name, llm, instructions.unwrap_or(default_instructions))
        .with_output_retries(config.output_retries)
}
