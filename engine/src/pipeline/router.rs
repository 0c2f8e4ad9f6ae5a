//! Routing functions
//!
//! The two conditional edges of the planning graph. Routers are pure
//! functions over the state so they can be tested without any LLM.

use crate::pipeline::state::PlannerState;
use sdk::plan::IntentKind;

/// Where the graph goes after intent classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Continue into feasibility supervision
    Supervisor,

    /// Answer directly, no planning
    QuestionAnswer,

    /// Decompose the feasible command into subgoals
    GoalDecomp,

    /// Explain an infeasible command
    Feedback,
}

/// Route after the intent node.
///
/// Tasks go to the supervisor; questions and smalltalk go to the question
/// answerer. A missing classification also routes to the question answerer
/// so the agent always responds.
pub fn route_intent(state: &PlannerState) -> Next {
    match state.intent.as_ref().map(|i| i.kind) {
        Some(IntentKind::Task) => Next::Supervisor,
        Some(IntentKind::Question) | Some(IntentKind::Smalltalk) | None => Next::QuestionAnswer,
    }
}

/// Route after the supervisor node.
///
/// Feasible commands go to goal decomposition; infeasible ones (or a missing
/// verdict) go to the feedback generator.
pub fn route_supervisor(state: &PlannerState) -> Next {
    match state.verdict.as_ref() {
        Some(verdict) if verdict.feasible => Next::GoalDecomp,
        _ => Next::Feedback,
    }
}
