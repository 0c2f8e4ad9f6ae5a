//! Waypoint SDK
//!
//! Shared library providing the error types and the plan data model used
//! across the Waypoint workspace. This crate is used by the engine and by
//! anything that consumes plans it produces.

/// Error types and handling
pub mod errors;

/// Plan data model: intents, verdicts, subgoals, skill invocations
pub mod plan;

// Re-export commonly used types
pub use errors::{EngineError, WaypointErrorExt};
pub use plan::{
    ExecutionReport, FeedbackResult, IntentKind, IntentResult, QuestionAnswer, SkillInvocation,
    SubgoalPlan, SubgoalReport, SupervisorResult, TaskPlan,
};
