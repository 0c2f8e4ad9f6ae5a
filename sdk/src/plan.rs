//! Plan data model
//!
//! The types that flow through the planning pipeline and out of it: intent
//! classifications, feasibility verdicts, feedback, subgoals, and the final
//! ordered skill invocations a robot can execute. Everything here serializes
//! with serde so plans can be stored, replayed, and printed as JSON.

use serde::{Deserialize, Serialize};

/// Classification of a user query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    /// A command the robot should plan and execute
    Task,

    /// A question about the environment or the robot's capabilities
    Question,

    /// Social chatter with no actionable content
    Smalltalk,
}

impl IntentKind {
    /// Parse a classifier label, degrading to `Question` on anything
    /// unrecognized so noisy classifier output never aborts the run.
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "task" | "command" => Self::Task,
            "smalltalk" | "chitchat" => Self::Smalltalk,
            _ => Self::Question,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Question => "question",
            Self::Smalltalk => "smalltalk",
        }
    }
}

/// Output of the intent classifier node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    /// What kind of query this is
    pub kind: IntentKind,

    /// One-line rationale from the classifier
    pub rationale: String,
}

/// Output of the feasibility supervisor node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorResult {
    /// Whether the commanded task is achievable with the available
    /// skills and observed objects
    pub feasible: bool,

    /// Why the supervisor decided this way
    pub reason: String,
}

/// Output of the feedback generator node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResult {
    /// User-readable explanation of why the command is infeasible
    pub explanation: String,

    /// A revised command to retry with, when the generator found one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_query: Option<String>,
}

impl FeedbackResult {
    /// Whether this feedback requests another supervision round
    pub fn wants_retry(&self) -> bool {
        self.revised_query
            .as_deref()
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A question together with the answer the agent produced for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub query: String,
    pub answer: String,
}

/// A single executable robot skill invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInvocation {
    /// The skill name, e.g. "PickObject"
    pub skill: String,

    /// The target object or location, e.g. "object_red_0"
    pub target: String,
}

impl SkillInvocation {
    pub fn new(skill: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            target: target.into(),
        }
    }
}

/// One subgoal decomposed into an ordered skill sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgoalPlan {
    /// The subgoal this sequence achieves
    pub subgoal: String,

    /// Ordered skill invocations
    pub tasks: Vec<SkillInvocation>,
}

/// The final plan: every subgoal with its skill sequence, in query order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    #[serde(rename = "task_outputs")]
    pub subgoal_plans: Vec<SubgoalPlan>,
}

impl TaskPlan {
    /// Total number of skill invocations across all subgoals
    pub fn step_count(&self) -> usize {
        self.subgoal_plans.iter().map(|s| s.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.subgoal_plans.is_empty()
    }
}

/// Execution outcome for one subgoal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgoalReport {
    pub subgoal: String,

    /// How many invocations completed before stopping
    pub completed: usize,

    /// Total invocations in the subgoal
    pub total: usize,

    /// The first failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl SubgoalReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.completed == self.total
    }
}

/// Execution outcome for a whole plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub subgoal_reports: Vec<SubgoalReport>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.subgoal_reports.iter().all(SubgoalReport::succeeded)
    }

    /// Completed and total invocation counts across all subgoals
    pub fn totals(&self) -> (usize, usize) {
        self.subgoal_reports
            .iter()
            .fold((0, 0), |(done, all), r| (done + r.completed, all + r.total))
    }
}
