//! Integration tests for configuration loading
//!
//! Validates TOML round-trips, defaults, and validation errors using
//! temporary files.

use tempfile::TempDir;
use waypoint_engine::config::Config;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_minimal_config_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let output_dir = dir.path().join("runs");
    let path = write_config(
        &dir,
        &format!(
            r#"
[core]
output_dir = "{}"

[[skills]]
name = "robot1"
skills = ["GoToObject", "PickObject", "PlaceObject"]
"#,
            output_dir.display()
        ),
    );

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.llm.default_provider, "openai");
    assert_eq!(config.llm.openai.base_url, "https://api.openai.com/v1");
    assert_eq!(config.planner.max_feedback_rounds, 2);
    assert_eq!(config.planner.goal_decomp.model, "gpt-4.1-mini");
    assert_eq!(config.simulator.base_url, "http://127.0.0.1:8800");
    assert_eq!(config.simulator.timeout_secs, 10);

    // The output directory was created during validation
    assert!(output_dir.is_dir());
}

#[test]
fn test_load_full_config_overrides() {
    let dir = TempDir::new().unwrap();
    let output_dir = dir.path().join("records");
    let path = write_config(
        &dir,
        &format!(
            r#"
[core]
output_dir = "{}"
log_level = "debug"

[llm]
default_provider = "ollama"

[llm.ollama]
base_url = "http://10.0.0.5:11434"

[planner]
max_feedback_rounds = 1

[planner.goal_decomp]
model = "gpt-4.1"
temperature = 0.3
prompt_cache_key = "goal-decomp-v2"

[planner.task_decomp]
model = "gpt-4.1"

[simulator]
base_url = "http://192.168.1.20:8800"
timeout_secs = 30

[[skills]]
name = "arm"
skills = ["PickObject", "PlaceObject"]

[[skills]]
name = "base"
skills = ["GoToObject"]
"#,
            output_dir.display()
        ),
    );

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "ollama");
    assert_eq!(config.llm.ollama.base_url, "http://10.0.0.5:11434");
    assert_eq!(config.planner.max_feedback_rounds, 1);
    assert_eq!(config.planner.goal_decomp.model, "gpt-4.1");
    assert_eq!(config.planner.goal_decomp.temperature, Some(0.3));
    assert_eq!(
        config.planner.goal_decomp.prompt_cache_key.as_deref(),
        Some("goal-decomp-v2")
    );
    // Unconfigured nodes keep their defaults
    assert_eq!(config.planner.intent.model, "gpt-4.1-mini");
    assert_eq!(config.simulator.timeout_secs, 30);
    assert_eq!(
        config.all_skill_names(),
        vec!["PickObject", "PlaceObject", "GoToObject"]
    );
}

#[test]
fn test_invalid_provider_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[llm]
default_provider = "smoke-signals"

[[skills]]
name = "robot1"
skills = ["GoToObject"]
"#,
    );

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("smoke-signals"));
}

#[test]
fn test_invalid_temperature_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[planner.intent]
model = "gpt-4.1-mini"
temperature = 9.0

[[skills]]
name = "robot1"
skills = ["GoToObject"]
"#,
    );

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("temperature"));
}

#[test]
fn test_empty_skill_set_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[[skills]]
name = "robot1"
skills = []
"#,
    );

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("robot1"));
}

#[test]
fn test_zero_timeout_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[simulator]
timeout_secs = 0

[[skills]]
name = "robot1"
skills = ["GoToObject"]
"#,
    );

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("timeout_secs"));
}

#[test]
fn test_malformed_toml_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "this is not [ toml");

    assert!(Config::load_from_path(&path).is_err());
}
