//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Plan a command through the full supervised pipeline
//! - plan: Plan a command through decomposition only
//! - execute: Plan, then run the plan against the simulator
//! - history: Show recent run records
//! - doctor: Validate configuration and check dependencies
//! - skills: Show the configured robot skill sets

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::executor::PlanExecutor;
use crate::llm::provider_from_config;
use crate::llm::registry::ProviderRegistry;
use crate::pipeline::runner::{DecompPipeline, PipelineOutcome, PipelineRun, SupervisedPipeline};
use crate::pipeline::state::StateBuilder;
use crate::sim::SimClient;
use crate::store::{RunRecord, RunStore};
use sdk::plan::TaskPlan;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Everything the planning handlers need, built once from config
struct PlanningContext {
    registry: Arc<ProviderRegistry>,
    sim: SimClient,
    state_builder: StateBuilder,
    store: RunStore,
}

fn build_context(config: &Config) -> Result<PlanningContext> {
    let provider = provider_from_config(&config.llm).context("Failed to build LLM provider")?;
    let registry = Arc::new(ProviderRegistry::new(provider));

    let sim = SimClient::new(&config.simulator);
    let state_builder = StateBuilder::new(sim.clone(), config.skills.clone());
    let store = RunStore::new(config.core.output_dir.clone());

    Ok(PlanningContext {
        registry,
        sim,
        state_builder,
        store,
    })
}

/// Plan a command through the full supervised pipeline
pub async fn handle_run(command: String, config: &Config, format: OutputFormat) -> Result<()> {
    let ctx = build_context(config)?;

    let state = ctx
        .state_builder
        .build(&command)
        .await
        .context("Failed to build planner state")?;

    let mut pipeline = SupervisedPipeline::new(Arc::clone(&ctx.registry), config);
    let run = pipeline.run(state).await.context("Planning failed")?;

    let record = RunRecord::from_state(run.state.clone());
    ctx.store
        .save(&record)
        .context("Failed to save run record")?;

    print_outcome(&run, format);
    Ok(())
}

/// Plan a command through decomposition only (no supervision)
pub async fn handle_plan(command: String, config: &Config, format: OutputFormat) -> Result<()> {
    let ctx = build_context(config)?;

    let state = ctx
        .state_builder
        .build(&command)
        .await
        .context("Failed to build planner state")?;

    let mut pipeline = DecompPipeline::new(Arc::clone(&ctx.registry), config);
    let run = pipeline.run(state).await.context("Planning failed")?;

    let record = RunRecord::from_state(run.state.clone());
    ctx.store
        .save(&record)
        .context("Failed to save run record")?;

    print_outcome(&run, format);
    Ok(())
}

/// Plan a command, then execute the resulting plan against the simulator
pub async fn handle_execute(command: String, config: &Config, format: OutputFormat) -> Result<()> {
    let ctx = build_context(config)?;

    let state = ctx
        .state_builder
        .build(&command)
        .await
        .context("Failed to build planner state")?;

    let mut pipeline = SupervisedPipeline::new(Arc::clone(&ctx.registry), config);
    let run = pipeline.run(state).await.context("Planning failed")?;

    let record = RunRecord::from_state(run.state.clone());
    ctx.store
        .save(&record)
        .context("Failed to save run record")?;

    match &run.outcome {
        PipelineOutcome::Plan(plan) => {
            print_outcome(&run, format);

            let executor = PlanExecutor::new(ctx.sim.clone());
            let report = executor.execute(plan).await.context("Execution failed")?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Text => {
                    let (done, total) = report.totals();
                    println!();
                    println!("Execution: {}/{} steps completed", done, total);
                    for sub in &report.subgoal_reports {
                        match &sub.failure {
                            None => println!("  [ok]   {}", sub.subgoal),
                            Some(failure) => println!(
                                "  [fail] {} (step {}/{}): {}",
                                sub.subgoal,
                                sub.completed + 1,
                                sub.total,
                                failure
                            ),
                        }
                    }
                }
            }
        }
        _ => {
            // Nothing to execute; the outcome explains why
            print_outcome(&run, format);
        }
    }

    Ok(())
}

/// Show recent run records
pub async fn handle_history(limit: usize, config: &Config, format: OutputFormat) -> Result<()> {
    let store = RunStore::new(config.core.output_dir.clone());
    let records = store.recent(limit).context("Failed to list run records")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No runs recorded yet.");
                return Ok(());
            }
            println!("Recent runs ({}):", records.len());
            for record in &records {
                let summary = match (&record.state.plan, record.state.answers.last()) {
                    (Some(plan), _) => format!("plan with {} steps", plan.step_count()),
                    (None, Some(_)) => "answered".to_string(),
                    (None, None) => "feedback".to_string(),
                };
                println!("  {}  {}  ({})", record.created_at, record.query, summary);
            }
        }
    }

    Ok(())
}

/// Run system diagnostics
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let provider = provider_from_config(&config.llm).context("Failed to build LLM provider")?;
    let provider_healthy = provider.check_health().await;

    let sim = SimClient::with_base_url(
        &config.simulator.base_url,
        Duration::from_secs(config.simulator.timeout_secs.min(3)),
    );
    let sim_healthy = sim.check_health().await;

    let skill_count: usize = config.skills.iter().map(|s| s.skills.len()).sum();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "provider": config.llm.default_provider,
                    "provider_healthy": provider_healthy,
                    "simulator": config.simulator.base_url,
                    "simulator_healthy": sim_healthy,
                    "skill_sets": config.skills.len(),
                    "skills": skill_count,
                    "output_dir": config.core.output_dir,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("Waypoint diagnostics:");
            println!(
                "  LLM provider ({}):  {}",
                config.llm.default_provider,
                if provider_healthy { "ok" } else { "unavailable" }
            );
            println!(
                "  Simulator ({}):  {}",
                config.simulator.base_url,
                if sim_healthy { "ok" } else { "unreachable" }
            );
            println!(
                "  Skills: {} across {} robot(s)",
                skill_count,
                config.skills.len()
            );
            println!("  Output dir: {}", config.core.output_dir.display());
        }
    }

    Ok(())
}

/// Show the configured robot skill sets
pub async fn handle_skills(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config.skills)?);
        }
        OutputFormat::Text => {
            for set in &config.skills {
                println!("{}:", set.name);
                for skill in &set.skills {
                    println!("  - {}", skill);
                }
            }
        }
    }

    Ok(())
}

/// Print a pipeline outcome in the requested format
fn print_outcome(run: &PipelineRun, format: OutputFormat) {
    match format {
        OutputFormat::Json => match &run.outcome {
            PipelineOutcome::Plan(plan) => print_json(&json!({ "plan": plan })),
            PipelineOutcome::Answer(answer) => print_json(&json!({ "answer": answer })),
            PipelineOutcome::Feedback(feedback) => print_json(&json!({ "feedback": feedback })),
        },
        OutputFormat::Text => match &run.outcome {
            PipelineOutcome::Plan(plan) => print_plan_text(plan),
            PipelineOutcome::Answer(answer) => println!("{}", answer.answer),
            PipelineOutcome::Feedback(feedback) => {
                println!("{}", feedback.explanation);
                if let Some(revised) = &feedback.revised_query {
                    println!("Suggested command: {}", revised);
                }
            }
        },
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render JSON output: {}", e),
    }
}

fn print_plan_text(plan: &TaskPlan) {
    println!("Plan ({} steps):", plan.step_count());
    for sub in &plan.subgoal_plans {
        println!("  {}", sub.subgoal);
        for invocation in &sub.tasks {
            println!("    {}({})", invocation.skill, invocation.target);
        }
    }
}
