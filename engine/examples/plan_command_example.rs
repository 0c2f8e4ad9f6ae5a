//! Example demonstrating goal and task decomposition with a local model
//!
//! This example shows how to:
//! - Build a planner state from a hand-written world (no simulator needed)
//! - Run the decomposition pipeline
//! - Print the resulting skill sequence
//!
//! Prerequisites:
//! - Ollama must be installed and running
//! - A model must be available (e.g., llama3.1:8b)

use std::sync::Arc;
use waypoint_engine::config::Config;
use waypoint_engine::llm::ollama::OllamaProvider;
use waypoint_engine::llm::registry::ProviderRegistry;
use waypoint_engine::pipeline::runner::{DecompPipeline, PipelineOutcome};
use waypoint_engine::pipeline::state::{render_object_text, render_skill_text, PlannerState, WorldContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Decomposition Pipeline Example ===\n");

    // Point every planner node at a local model
    let mut config = Config::default_config();
    config.llm.default_provider = "ollama".to_string();
    config.planner.goal_decomp.model = "llama3.1:8b".to_string();
    config.planner.task_decomp.model = "llama3.1:8b".to_string();

    let provider = OllamaProvider::new("http://localhost:11434");
    let registry = Arc::new(ProviderRegistry::new(Arc::new(provider)));
    println!("✓ LLM Provider: ollama");

    // A hand-written world instead of a live simulator
    let objects = vec![
        "object_red_0".to_string(),
        "object_yellow_0".to_string(),
        "object_red_bowl_0".to_string(),
        "object_yellow_bowl_1".to_string(),
    ];
    let world = WorldContext {
        object_text: render_object_text(&objects),
        skill_text: render_skill_text(&config.skills),
    };
    println!("✓ World: {} objects", objects.len());

    let command = "Organize the objects to the bowls according to their colors";
    let state = PlannerState::new(command, world);
    println!("✓ Command: {}\n", command);

    let mut pipeline = DecompPipeline::new(registry, &config);
    let run = pipeline.run(state).await?;

    match run.outcome {
        PipelineOutcome::Plan(plan) => {
            println!("Plan ({} steps):", plan.step_count());
            for subgoal_plan in &plan.subgoal_plans {
                println!("  {}", subgoal_plan.subgoal);
                for invocation in &subgoal_plan.tasks {
                    println!("    {}({})", invocation.skill, invocation.target);
                }
            }
        }
        other => println!("Unexpected outcome: {:?}", other),
    }

    Ok(())
}
