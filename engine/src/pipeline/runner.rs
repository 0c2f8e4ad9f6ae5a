//! Pipeline runners
//!
//! Wires the nodes and routers into the two executable graphs: the full
//! supervised pipeline (intent → supervision → decomposition, with a bounded
//! feedback loop) and the plain decomposition pipeline (goal → task).
//! Nodes are built lazily on first run and reused afterwards.

use crate::config::{Config, PlannerConfig};
use crate::llm::registry::ProviderRegistry;
use crate::pipeline::nodes::PlannerNodes;
use crate::pipeline::router::{route_intent, route_supervisor, Next};
use crate::pipeline::state::PlannerState;
use sdk::errors::EngineError;
use sdk::plan::{FeedbackResult, QuestionAnswer, TaskPlan};
use std::sync::Arc;
use tracing::info;

/// What a pipeline run produced for the user
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// An executable plan
    Plan(TaskPlan),

    /// An answer to a question
    Answer(QuestionAnswer),

    /// An explanation of why the command could not be planned
    Feedback(FeedbackResult),
}

/// A completed run: the final state plus the user-facing outcome
#[derive(Debug)]
pub struct PipelineRun {
    pub state: PlannerState,
    pub outcome: PipelineOutcome,
}

/// The full supervised planning graph
pub struct SupervisedPipeline {
    registry: Arc<ProviderRegistry>,
    planner: PlannerConfig,
    allowed_skills: Vec<String>,
    nodes: Option<PlannerNodes>,
}

impl SupervisedPipeline {
    pub fn new(registry: Arc<ProviderRegistry>, config: &Config) -> Self {
        Self {
            registry,
            planner: config.planner.clone(),
            allowed_skills: config.all_skill_names(),
            nodes: None,
        }
    }

    fn ensure_nodes(&mut self) -> &PlannerNodes {
        if self.nodes.is_none() {
            self.nodes = Some(PlannerNodes::new(
                &self.registry,
                &self.planner,
                self.allowed_skills.clone(),
            ));
        }
        self.nodes.as_ref().expect("nodes built above")
    }

    /// Drive the graph to completion.
    ///
    /// Bounded: intent and question answering run at most once, supervision
    /// at most `1 + max_feedback_rounds` times.
    pub async fn run(&mut self, mut state: PlannerState) -> Result<PipelineRun, EngineError> {
        let max_feedback_rounds = self.planner.max_feedback_rounds;
        let nodes = self.ensure_nodes();

        state.intent = Some(nodes.classify_intent(&state).await?);

        match route_intent(&state) {
            Next::QuestionAnswer => {
                let answer = nodes.answer_question(&state).await?;
                state.answers.push(answer.clone());
                return Ok(PipelineRun {
                    state,
                    outcome: PipelineOutcome::Answer(answer),
                });
            }
            Next::Supervisor => {}
            other => {
                return Err(EngineError::Pipeline(format!(
                    "Intent router produced unexpected edge {:?}",
                    other
                )))
            }
        }

        loop {
            state.verdict = Some(nodes.supervise(&state).await?);

            match route_supervisor(&state) {
                Next::GoalDecomp => {
                    state.subgoals = nodes.decompose_goal(&state).await?;
                    let plan = nodes.decompose_tasks(&state).await?;
                    state.plan = Some(plan.clone());
                    return Ok(PipelineRun {
                        state,
                        outcome: PipelineOutcome::Plan(plan),
                    });
                }
                Next::Feedback => {
                    let feedback = nodes.generate_feedback(&state).await?;

                    let may_retry =
                        feedback.wants_retry() && state.feedback_rounds < max_feedback_rounds;

                    if may_retry {
                        if let Some(revised) = feedback.revised_query.clone() {
                            info!(
                                "Feedback round {}: retrying with revised command",
                                state.feedback_rounds + 1
                            );
                            state.feedback_rounds += 1;
                            state.user_queries.push(revised);
                            state.feedback = Some(feedback);
                            continue;
                        }
                    }

                    info!("Planning ended with feedback after {} rounds", state.feedback_rounds);
                    state.feedback = Some(feedback.clone());
                    return Ok(PipelineRun {
                        state,
                        outcome: PipelineOutcome::Feedback(feedback),
                    });
                }
                other => {
                    return Err(EngineError::Pipeline(format!(
                        "Supervisor router produced unexpected edge {:?}",
                        other
                    )))
                }
            }
        }
    }
}

/// The plain decomposition graph: goal decomposer → task decomposer
pub struct DecompPipeline {
    registry: Arc<ProviderRegistry>,
    planner: PlannerConfig,
    allowed_skills: Vec<String>,
    nodes: Option<PlannerNodes>,
}

impl DecompPipeline {
    pub fn new(registry: Arc<ProviderRegistry>, config: &Config) -> Self {
        Self {
            registry,
            planner: config.planner.clone(),
            allowed_skills: config.all_skill_names(),
            nodes: None,
        }
    }

    fn ensure_nodes(&mut self) -> &PlannerNodes {
        if self.nodes.is_none() {
            self.nodes = Some(PlannerNodes::new(
                &self.registry,
                &self.planner,
                self.allowed_skills.clone(),
            ));
        }
        self.nodes.as_ref().expect("nodes built above")
    }

    /// Run goal decomposition then task decomposition, linearly.
    pub async fn run(&mut self, mut state: PlannerState) -> Result<PipelineRun, EngineError> {
        let nodes = self.ensure_nodes();

        state.subgoals = nodes.decompose_goal(&state).await?;
        let plan = nodes.decompose_tasks(&state).await?;
        state.plan = Some(plan.clone());

        Ok(PipelineRun {
            state,
            outcome: PipelineOutcome::Plan(plan),
        })
    }
}
