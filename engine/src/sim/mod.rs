//! Simulator client
//!
//! HTTP client for the robot simulator. The simulator exposes the world the
//! planner grounds its prompts in (`GET /env` lists object names) and the
//! surface plans execute against (`POST /skill` runs one skill invocation).

use crate::config::SimulatorConfig;
use reqwest::Client;
use sdk::errors::EngineError;
use sdk::plan::SkillInvocation;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Environment snapshot returned by `GET /env`
#[derive(Debug, Clone, Deserialize)]
pub struct Environment {
    /// Object names currently present, e.g. "object_red_0"
    pub objects: Vec<String>,
}

/// Result of one skill invocation, returned by `POST /skill`
#[derive(Debug, Clone, Deserialize)]
pub struct SkillOutcome {
    pub ok: bool,

    #[serde(default)]
    pub detail: Option<String>,
}

/// HTTP client for the robot simulator
#[derive(Debug, Clone)]
pub struct SimClient {
    base_url: String,
    client: Client,
}

impl SimClient {
    pub fn new(config: &SimulatorConfig) -> Self {
        Self::with_base_url(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current environment object list.
    pub async fn environment(&self) -> Result<Environment, EngineError> {
        let url = format!("{}/env", self.base_url);
        debug!("Fetching environment from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Simulator(format!("GET /env failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Simulator(format!(
                "GET /env returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Environment>()
            .await
            .map_err(|e| EngineError::Simulator(format!("Invalid /env payload: {}", e)))
    }

    /// Run one skill invocation on the simulator.
    pub async fn run_skill(&self, invocation: &SkillInvocation) -> Result<(), EngineError> {
        let url = format!("{}/skill", self.base_url);
        debug!(
            "Dispatching skill {} -> {} to {}",
            invocation.skill, invocation.target, url
        );

        let response = self
            .client
            .post(&url)
            .json(invocation)
            .send()
            .await
            .map_err(|e| EngineError::Simulator(format!("POST /skill failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Simulator(format!(
                "POST /skill returned HTTP {}",
                response.status()
            )));
        }

        let outcome: SkillOutcome = response
            .json()
            .await
            .map_err(|e| EngineError::Simulator(format!("Invalid /skill payload: {}", e)))?;

        if !outcome.ok {
            return Err(EngineError::SkillRejected {
                skill: invocation.skill.clone(),
                target: invocation.target.clone(),
                detail: outcome.detail.unwrap_or_else(|| "no detail".to_string()),
            });
        }

        Ok(())
    }

    /// Whether the simulator answers on `/env`.
    pub async fn check_health(&self) -> bool {
        self.environment().await.is_ok()
    }
}
