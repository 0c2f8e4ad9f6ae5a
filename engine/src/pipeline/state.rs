//! Planner state
//!
//! The state object threaded through every pipeline node. It accumulates the
//! query history, the rendered world context the prompts are grounded in,
//! each node's intermediate result, and the final outputs.

use crate::config::RobotSkillSet;
use crate::sim::SimClient;
use sdk::errors::EngineError;
use sdk::plan::{FeedbackResult, IntentResult, QuestionAnswer, SupervisorResult, TaskPlan};
use serde::{Deserialize, Serialize};

/// Rendered environment context shared by all prompts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldContext {
    /// Object inventory rendered as the block the prompts expect
    pub object_text: String,

    /// Robot skill imports, one line per robot
    pub skill_text: String,
}

/// Render the simulator's object list into prompt text.
///
/// One `"object_name": "…",` line per object, brace-wrapped, matching the
/// few-shot examples in the decomposition prompts.
pub fn render_object_text(objects: &[String]) -> String {
    let mut text = String::from("{\n");
    for object in objects {
        text.push_str(&format!("    \"object_name\": \"{}\",\n", object));
    }
    text.push('}');
    text
}

/// Render configured skill sets into prompt text.
///
/// One line per robot: `from <robot>.skills import A, B, C`.
pub fn render_skill_text(skill_sets: &[RobotSkillSet]) -> String {
    skill_sets
        .iter()
        .map(|set| format!("from {}.skills import {}", set.name, set.skills.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// State threaded through the planning pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerState {
    /// Original command plus any feedback-revised commands, newest last
    pub user_queries: Vec<String>,

    /// Rendered world context
    pub world: WorldContext,

    /// Intent classification, once the intent node has run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentResult>,

    /// Feasibility verdict, once the supervisor has run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<SupervisorResult>,

    /// Latest feedback, when the supervisor judged the command infeasible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackResult>,

    /// How many feedback-revision rounds have run
    pub feedback_rounds: u32,

    /// High-level subgoals from the goal decomposer
    pub subgoals: Vec<String>,

    /// Final plan from the task decomposer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<TaskPlan>,

    /// Answers produced by the question answerer
    pub answers: Vec<QuestionAnswer>,
}

impl PlannerState {
    /// Fresh state for a user query against a rendered world
    pub fn new(user_query: impl Into<String>, world: WorldContext) -> Self {
        Self {
            user_queries: vec![user_query.into()],
            world,
            intent: None,
            verdict: None,
            feedback: None,
            feedback_rounds: 0,
            subgoals: Vec::new(),
            plan: None,
            answers: Vec::new(),
        }
    }

    /// The query the pipeline is currently working on
    pub fn latest_query(&self) -> &str {
        self.user_queries
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Subgoals rendered for the task-decomposition prompt
    pub fn subgoals_text(&self) -> String {
        let mut text = String::from("[\n");
        for subgoal in &self.subgoals {
            text.push_str(subgoal);
            text.push('\n');
        }
        text.push(']');
        text
    }
}

/// Builds fresh planner states: fetches the environment from the simulator
/// and renders the world context from configuration.
pub struct StateBuilder {
    sim: SimClient,
    skill_sets: Vec<RobotSkillSet>,
}

impl StateBuilder {
    pub fn new(sim: SimClient, skill_sets: Vec<RobotSkillSet>) -> Self {
        Self { sim, skill_sets }
    }

    /// Create a fresh state for a user query.
    pub async fn build(&self, user_query: &str) -> Result<PlannerState, EngineError> {
        let environment = self.sim.environment().await?;

        let world = WorldContext {
            object_text: render_object_text(&environment.objects),
            skill_text: render_skill_text(&self.skill_sets),
        };

        tracing::debug!(
            "Built state: {} objects, {} skill sets",
            environment.objects.len(),
            self.skill_sets.len()
        );

        Ok(PlannerState::new(user_query, world))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill_sets() -> Vec<RobotSkillSet> {
        vec![RobotSkillSet {
            name: "robot1".to_string(),
            skills: vec![
                "GoToObject".to_string(),
                "PickObject".to_string(),
                "PlaceObject".to_string(),
            ],
        }]
    }

    #[test]
    fn test_render_object_text() {
        let objects = vec!["object_red_0".to_string(), "object_red_bowl_0".to_string()];
        let text = render_object_text(&objects);

        assert!(text.starts_with("{\n"));
        assert!(text.ends_with('}'));
        assert!(text.contains("\"object_name\": \"object_red_0\","));
        assert!(text.contains("\"object_name\": \"object_red_bowl_0\","));
    }

    #[test]
    fn test_render_object_text_empty() {
        assert_eq!(render_object_text(&[]), "{\n}");
    }

    #[test]
    fn test_render_skill_text_single_robot() {
        let text = render_skill_text(&skill_sets());
        assert_eq!(
            text,
            "from robot1.skills import GoToObject, PickObject, PlaceObject"
        );
    }

    #[test]
    fn test_render_skill_text_multiple_robots() {
        let mut sets = skill_sets();
        sets.push(RobotSkillSet {
            name: "robot2".to_string(),
            skills: vec!["OpenDrawer".to_string()],
        });

        let text = render_skill_text(&sets);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "from robot2.skills import OpenDrawer");
    }

    #[test]
    fn test_latest_query_follows_revisions() {
        let mut state = PlannerState::new("sort the objects", WorldContext::default());
        assert_eq!(state.latest_query(), "sort the objects");

        state
            .user_queries
            .push("sort the red objects".to_string());
        assert_eq!(state.latest_query(), "sort the red objects");
    }

    #[test]
    fn test_subgoals_text() {
        let mut state = PlannerState::new("q", WorldContext::default());
        state.subgoals = vec![
            "Organize the red objects to the red bowls".to_string(),
            "Organize the yellow objects to the yellow bowls".to_string(),
        ];

        let text = state.subgoals_text();
        assert!(text.starts_with("[\n"));
        assert!(text.ends_with(']'));
        assert!(text.contains("Organize the red objects to the red bowls\n"));
    }

    #[test]
    fn test_state_serializes_without_empty_options() {
        let state = PlannerState::new("q", WorldContext::default());
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("intent"));
        assert!(!json.contains("verdict"));
        assert!(json.contains("feedback_rounds"));
    }
}
