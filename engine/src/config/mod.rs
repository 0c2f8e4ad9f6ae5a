//! Configuration management
//!
//! This module handles loading, validation, and management of the Waypoint
//! configuration. Configuration is stored in TOML format at
//! ~/.waypoint/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Output directory for run records, log level
//! - **llm**: Provider selection and per-provider endpoints
//! - **planner**: Per-node model parameters and the feedback-loop bound
//! - **simulator**: Simulator endpoint and timeout
//! - **skills**: Robot skill sets the task decomposer may use
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Creates the output directory if it doesn't exist

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// This structure represents the complete Waypoint configuration loaded from
/// ~/.waypoint/config.toml. All sections have defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Planner node configuration
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Simulator endpoint configuration
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Robot skill sets
    #[serde(default = "default_skill_sets")]
    pub skills: Vec<RobotSkillSet>,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Directory for run records (supports ~ expansion)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_level: default_log_level(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Default LLM provider (openai, ollama)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// OpenAI-compatible provider settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL for the chat-completions API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    // Note: API key comes from the OPENAI_API_KEY environment variable
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
        }
    }
}

/// Model parameters for a single planner node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Model identifier
    #[serde(default = "default_node_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0); omitted means 0.0
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Server-side prompt cache key
    #[serde(default)]
    pub prompt_cache_key: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            model: default_node_model(),
            temperature: None,
            prompt_cache_key: None,
        }
    }
}

/// Planner configuration: one node table per pipeline node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Maximum feedback-revision rounds before giving up
    #[serde(default = "default_max_feedback_rounds")]
    pub max_feedback_rounds: u32,

    #[serde(default)]
    pub intent: NodeConfig,

    #[serde(default)]
    pub supervisor: NodeConfig,

    #[serde(default)]
    pub feedback: NodeConfig,

    #[serde(default)]
    pub question_answer: NodeConfig,

    #[serde(default)]
    pub goal_decomp: NodeConfig,

    #[serde(default)]
    pub task_decomp: NodeConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_feedback_rounds: default_max_feedback_rounds(),
            intent: NodeConfig::default(),
            supervisor: NodeConfig::default(),
            feedback: NodeConfig::default(),
            question_answer: NodeConfig::default(),
            goal_decomp: NodeConfig::default(),
            task_decomp: NodeConfig::default(),
        }
    }
}

/// Simulator endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Base URL of the robot simulator
    #[serde(default = "default_simulator_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_simulator_timeout")]
    pub timeout_secs: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_simulator_base_url(),
            timeout_secs: default_simulator_timeout(),
        }
    }
}

/// A named robot and the skills it exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotSkillSet {
    /// Robot name, e.g. "robot1"
    pub name: String,

    /// Skill names, e.g. ["GoToObject", "PickObject", "PlaceObject"]
    pub skills: Vec<String>,
}

// Default value functions
fn default_output_dir() -> PathBuf {
    PathBuf::from("~/.waypoint/runs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_node_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_max_feedback_rounds() -> u32 {
    2
}

fn default_simulator_base_url() -> String {
    "http://127.0.0.1:8800".to_string()
}

fn default_simulator_timeout() -> u64 {
    10
}

fn default_skill_sets() -> Vec<RobotSkillSet> {
    vec![RobotSkillSet {
        name: "robot1".to_string(),
        skills: vec![
            "GoToObject".to_string(),
            "PickObject".to_string(),
            "PlaceObject".to_string(),
        ],
    }]
}

impl Config {
    /// Load configuration from the default location (~/.waypoint/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration. Validates the configuration after loading and returns
    /// descriptive errors if validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.waypoint/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".waypoint").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LlmConfig::default(),
            planner: PlannerConfig::default(),
            simulator: SimulatorConfig::default(),
            skills: default_skill_sets(),
        }
    }

    /// Every configured skill name, across all robots
    pub fn all_skill_names(&self) -> Vec<String> {
        self.skills
            .iter()
            .flat_map(|set| set.skills.iter().cloned())
            .collect()
    }

    /// Validate and process configuration
    ///
    /// This method validates required fields, expands ~ in the output
    /// directory, and creates it if it doesn't exist.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        // Validate default provider
        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                valid_providers.join(", ")
            )));
        }

        // Validate per-node temperatures
        for (name, node) in self.planner.nodes() {
            if let Some(t) = node.temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(EngineError::Config(format!(
                        "planner.{}.temperature must be between 0.0 and 2.0",
                        name
                    )));
                }
            }
            if node.model.trim().is_empty() {
                return Err(EngineError::Config(format!(
                    "planner.{}.model must not be empty",
                    name
                )));
            }
        }

        // Validate skills
        if self.skills.is_empty() {
            return Err(EngineError::Config(
                "At least one [[skills]] set is required".to_string(),
            ));
        }
        for set in &self.skills {
            if set.skills.is_empty() {
                return Err(EngineError::Config(format!(
                    "Skill set '{}' declares no skills",
                    set.name
                )));
            }
        }

        // Validate simulator timeout
        if self.simulator.timeout_secs == 0 {
            return Err(EngineError::Config(
                "simulator.timeout_secs must be greater than zero".to_string(),
            ));
        }

        // Expand the output directory and create it if needed
        self.core.output_dir = expand_path(&self.core.output_dir)?;
        if !self.core.output_dir.exists() {
            fs::create_dir_all(&self.core.output_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create output directory: {}", e))
            })?;
        }

        Ok(())
    }
}

impl PlannerConfig {
    /// Iterate the node tables with their config names
    pub fn nodes(&self) -> [(&'static str, &NodeConfig); 6] {
        [
            ("intent", &self.intent),
            ("supervisor", &self.supervisor),
            ("feedback", &self.feedback),
            ("question_answer", &self.question_answer),
            ("goal_decomp", &self.goal_decomp),
            ("task_decomp", &self.task_decomp),
        ]
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.planner.max_feedback_rounds, 2);
        assert_eq!(config.simulator.base_url, "http://127.0.0.1:8800");
        assert_eq!(config.skills.len(), 1);
        assert_eq!(config.skills[0].name, "robot1");
    }

    #[test]
    fn test_all_skill_names_flattens() {
        let mut config = Config::default_config();
        config.skills.push(RobotSkillSet {
            name: "robot2".to_string(),
            skills: vec!["OpenDrawer".to_string()],
        });

        let names = config.all_skill_names();
        assert_eq!(
            names,
            vec!["GoToObject", "PickObject", "PlaceObject", "OpenDrawer"]
        );
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = Config::default_config();
        config.core.log_level = "loud".to_string();
        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_provider() {
        let mut config = Config::default_config();
        config.llm.default_provider = "carrier-pigeon".to_string();
        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default_config();
        config.planner.goal_decomp.temperature = Some(3.5);
        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_skills() {
        let mut config = Config::default_config();
        config.skills.clear();
        assert!(config.validate_and_process().is_err());

        let mut config = Config::default_config();
        config.skills[0].skills.clear();
        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.llm.default_provider,
            deserialized.llm.default_provider
        );
        assert_eq!(
            config.planner.task_decomp.model,
            deserialized.planner.task_decomp.model
        );
    }
}
