//! Plan execution
//!
//! Walks a finished plan subgoal by subgoal and dispatches each skill
//! invocation to the simulator. A failed invocation stops the rest of its
//! subgoal; later subgoals still run so independent objectives are not lost
//! to an unrelated failure.

use crate::sim::SimClient;
use sdk::errors::EngineError;
use sdk::plan::{ExecutionReport, SubgoalReport, TaskPlan};
use tracing::{info, warn};

/// Executes plans against the simulator
pub struct PlanExecutor {
    sim: SimClient,
}

impl PlanExecutor {
    pub fn new(sim: SimClient) -> Self {
        Self { sim }
    }

    /// Execute every subgoal's skill sequence in order.
    pub async fn execute(&self, plan: &TaskPlan) -> Result<ExecutionReport, EngineError> {
        if plan.is_empty() {
            return Err(EngineError::Pipeline(
                "Cannot execute an empty plan".to_string(),
            ));
        }

        let mut subgoal_reports = Vec::with_capacity(plan.subgoal_plans.len());

        for subgoal_plan in &plan.subgoal_plans {
            info!(
                "Executing subgoal '{}' ({} steps)",
                subgoal_plan.subgoal,
                subgoal_plan.tasks.len()
            );

            let mut completed = 0;
            let mut failure = None;

            for invocation in &subgoal_plan.tasks {
                match self.sim.run_skill(invocation).await {
                    Ok(()) => {
                        completed += 1;
                        info!("  {} -> {} ok", invocation.skill, invocation.target);
                    }
                    Err(e) => {
                        warn!(
                            "  {} -> {} failed: {}",
                            invocation.skill, invocation.target, e
                        );
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }

            subgoal_reports.push(SubgoalReport {
                subgoal: subgoal_plan.subgoal.clone(),
                completed,
                total: subgoal_plan.tasks.len(),
                failure,
            });
        }

        let report = ExecutionReport { subgoal_reports };
        let (done, total) = report.totals();
        info!("Execution finished: {}/{} steps completed", done, total);

        Ok(report)
    }
}
