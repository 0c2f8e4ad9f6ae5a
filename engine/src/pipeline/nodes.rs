//! Pipeline nodes
//!
//! Each node is a single structured LLM call: render the prompt, run the
//! chat completion, extract the JSON payload from the raw completion, parse
//! it into a typed result, validate, and hand the result back to the runner.
//! The question answerer is the one free-text exception.

use crate::config::PlannerConfig;
use crate::llm::registry::{ChatClient, ProviderRegistry};
use crate::llm::{extract_json, Message};
use crate::pipeline::prompts;
use crate::pipeline::state::PlannerState;
use sdk::errors::EngineError;
use sdk::plan::{
    FeedbackResult, IntentKind, IntentResult, QuestionAnswer, SupervisorResult, TaskPlan,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str =
    "You are one stage of a robot task-planning pipeline. Follow the instructions \
     and the output format exactly.";

/// Wire format of the intent classifier output
#[derive(Debug, Deserialize)]
struct IntentWire {
    intent: String,
    #[serde(default)]
    rationale: String,
}

/// Wire format of the supervisor output
#[derive(Debug, Deserialize)]
struct SupervisorWire {
    feasible: bool,
    #[serde(default)]
    reason: String,
}

/// Wire format of the feedback generator output
#[derive(Debug, Deserialize)]
struct FeedbackWire {
    explanation: String,
    #[serde(default)]
    revised_query: Option<String>,
}

/// Wire format of the goal decomposer output
#[derive(Debug, Deserialize)]
struct GoalDecompWire {
    subgoals: Vec<String>,
}

/// The six planner nodes, each bound to its configured chat client.
pub struct PlannerNodes {
    intent: Arc<ChatClient>,
    supervisor: Arc<ChatClient>,
    feedback: Arc<ChatClient>,
    question_answer: Arc<ChatClient>,
    goal_decomp: Arc<ChatClient>,
    task_decomp: Arc<ChatClient>,
    allowed_skills: Vec<String>,
}

impl PlannerNodes {
    /// Build all nodes from the registry; nodes sharing model parameters
    /// share one client.
    pub fn new(
        registry: &ProviderRegistry,
        planner: &PlannerConfig,
        allowed_skills: Vec<String>,
    ) -> Self {
        Self {
            intent: registry.client(&planner.intent),
            supervisor: registry.client(&planner.supervisor),
            feedback: registry.client(&planner.feedback),
            question_answer: registry.client(&planner.question_answer),
            goal_decomp: registry.client(&planner.goal_decomp),
            task_decomp: registry.client(&planner.task_decomp),
            allowed_skills,
        }
    }

    /// Classify the latest user query.
    pub async fn classify_intent(&self, state: &PlannerState) -> Result<IntentResult, EngineError> {
        info!("Intent node: classifying query");

        let prompt = prompts::render_intent(state.latest_query());
        let content = self.complete(&self.intent, prompt).await?;
        let wire: IntentWire = parse_structured(&content, "intent")?;

        let result = IntentResult {
            kind: IntentKind::parse_lenient(&wire.intent),
            rationale: wire.rationale,
        };
        debug!("Intent: {} ({})", result.kind.as_str(), result.rationale);
        Ok(result)
    }

    /// Judge feasibility of the latest user query.
    pub async fn supervise(&self, state: &PlannerState) -> Result<SupervisorResult, EngineError> {
        info!("Supervisor node: checking feasibility");

        let prompt = prompts::render_supervisor(
            &state.world.skill_text,
            &state.world.object_text,
            state.latest_query(),
        );
        let content = self.complete(&self.supervisor, prompt).await?;
        let wire: SupervisorWire = parse_structured(&content, "supervisor")?;

        debug!("Supervisor: feasible={} ({})", wire.feasible, wire.reason);
        Ok(SupervisorResult {
            feasible: wire.feasible,
            reason: wire.reason,
        })
    }

    /// Explain an infeasible command and maybe propose a revision.
    pub async fn generate_feedback(
        &self,
        state: &PlannerState,
    ) -> Result<FeedbackResult, EngineError> {
        info!("Feedback node: generating feedback");

        let reason = state
            .verdict
            .as_ref()
            .map(|v| v.reason.as_str())
            .unwrap_or("the command was judged infeasible");

        let prompt = prompts::render_feedback(
            &state.world.skill_text,
            &state.world.object_text,
            state.latest_query(),
            reason,
        );
        let content = self.complete(&self.feedback, prompt).await?;
        let wire: FeedbackWire = parse_structured(&content, "feedback")?;

        Ok(FeedbackResult {
            explanation: wire.explanation,
            revised_query: wire
                .revised_query
                .filter(|q| !q.trim().is_empty()),
        })
    }

    /// Answer a question about the environment or the robot's abilities.
    pub async fn answer_question(
        &self,
        state: &PlannerState,
    ) -> Result<QuestionAnswer, EngineError> {
        info!("Question node: answering");

        let prompt = prompts::render_question_answer(
            &state.world.skill_text,
            &state.world.object_text,
            state.latest_query(),
        );
        // Free-text node: the raw completion is the answer
        let content = self.complete(&self.question_answer, prompt).await?;

        Ok(QuestionAnswer {
            query: state.latest_query().to_string(),
            answer: content.trim().to_string(),
        })
    }

    /// Decompose the command into independent high-level subgoals.
    pub async fn decompose_goal(&self, state: &PlannerState) -> Result<Vec<String>, EngineError> {
        info!("Goal decomposition node: splitting into subgoals");

        let prompt = prompts::render_goal_decomp(&state.world.object_text, state.latest_query());
        let content = self.complete(&self.goal_decomp, prompt).await?;
        let wire: GoalDecompWire = parse_structured(&content, "goal_decomp")?;

        if wire.subgoals.is_empty() {
            return Err(EngineError::Parse(
                "Goal decomposition produced no subgoals".to_string(),
            ));
        }

        debug!("Subgoals: {:?}", wire.subgoals);
        Ok(wire.subgoals)
    }

    /// Convert the subgoals into ordered skill invocations.
    pub async fn decompose_tasks(&self, state: &PlannerState) -> Result<TaskPlan, EngineError> {
        info!("Task decomposition node: planning skill sequences");

        let prompt = prompts::render_task_decomp(
            &state.world.skill_text,
            &state.world.object_text,
            &state.subgoals_text(),
        );
        let content = self.complete(&self.task_decomp, prompt).await?;
        let plan: TaskPlan = parse_structured(&content, "task_decomp")?;

        self.validate_plan(&plan)?;

        debug!(
            "Plan: {} subgoals, {} steps",
            plan.subgoal_plans.len(),
            plan.step_count()
        );
        Ok(plan)
    }

    /// Reject plans that use skills the robot does not have or contain
    /// empty sequences.
    fn validate_plan(&self, plan: &TaskPlan) -> Result<(), EngineError> {
        if plan.is_empty() {
            return Err(EngineError::Parse(
                "Task decomposition produced no subgoal plans".to_string(),
            ));
        }

        for subgoal_plan in &plan.subgoal_plans {
            if subgoal_plan.tasks.is_empty() {
                return Err(EngineError::Parse(format!(
                    "Subgoal '{}' has no skill invocations",
                    subgoal_plan.subgoal
                )));
            }
            for invocation in &subgoal_plan.tasks {
                if !self.allowed_skills.iter().any(|s| s == &invocation.skill) {
                    return Err(EngineError::Parse(format!(
                        "Plan uses unknown skill '{}' (allowed: {})",
                        invocation.skill,
                        self.allowed_skills.join(", ")
                    )));
                }
                if invocation.target.trim().is_empty() {
                    return Err(EngineError::Parse(format!(
                        "Skill '{}' has an empty target",
                        invocation.skill
                    )));
                }
            }
        }

        Ok(())
    }

    async fn complete(
        &self,
        client: &Arc<ChatClient>,
        prompt: String,
    ) -> Result<String, EngineError> {
        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let outcome = client.chat(messages).await?;

        if let Some(tokens) = outcome.total_tokens {
            debug!("Model {} used {} tokens", outcome.model, tokens);
        }
        if let Some(remaining) = outcome.rate_limit.remaining_requests {
            debug!("Model {}: {} requests remaining", outcome.model, remaining);
        }

        Ok(outcome.content)
    }
}

/// Extract and deserialize the JSON payload of a structured node.
fn parse_structured<T: DeserializeOwned>(content: &str, node: &str) -> Result<T, EngineError> {
    let payload = extract_json(content).ok_or_else(|| {
        EngineError::Parse(format!("Node '{}' returned no JSON payload", node))
    })?;

    serde_json::from_str(payload)
        .map_err(|e| EngineError::Parse(format!("Node '{}' output invalid: {}", node, e)))
}
