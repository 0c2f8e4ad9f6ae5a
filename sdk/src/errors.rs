//! Error types and handling
//!
//! This module provides the error types used throughout the Waypoint engine.
//! All errors implement the `WaypointErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! All error messages are scrubbed to ensure:
//! - No secrets (API keys) are included
//! - All messages are safe to display to end users

use thiserror::Error;

/// Trait for Waypoint error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait WaypointErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets (API keys, tokens) or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require configuration changes or manual intervention.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// This enum represents all possible errors that can occur in the Waypoint
/// engine. Each variant includes context-specific information while ensuring
/// no sensitive data is exposed in error messages.
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **LLM**: Chat completion failures, authentication, rate limiting
/// - **Parsing**: Structured output that cannot be extracted or validated
/// - **Simulator**: Environment fetch or skill dispatch failures
/// - **Pipeline**: Planning graph execution failures
/// - **Store**: Run record persistence failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, WaypointErrorExt};
///
/// let error = EngineError::Simulator("connection refused".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::RateLimitExhausted {
///     model: "gpt-4.1".to_string(),
///     attempts: 5,
/// };
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // LLM errors
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Authentication failed for provider: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exhausted for model {model} after {attempts} attempts")]
    RateLimitExhausted { model: String, attempts: u32 },

    // Structured output errors
    #[error("Parse error: {0}")]
    Parse(String),

    // Simulator errors
    #[error("Simulator error: {0}")]
    Simulator(String),

    #[error("Skill rejected by simulator: {skill} -> {target}: {detail}")]
    SkillRejected {
        skill: String,
        target: String,
        detail: String,
    },

    // Pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Feedback rounds exhausted after {0} attempts")]
    FeedbackRoundsExhausted(u32),

    // Run record store errors
    #[error("Store error: {0}")]
    Store(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WaypointErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "Check your config.toml file for errors",

            // LLM errors
            Self::Llm(_) => "LLM provider unavailable. Check your API keys and network",
            Self::AuthenticationFailed(_) => {
                "Authentication failed. Check the provider API key environment variable"
            }
            Self::RateLimitExhausted { .. } => {
                "Rate limit exhausted. Reduce request rate or verify quota and billing"
            }

            // Structured output errors
            Self::Parse(_) => "The model returned output the planner could not parse. Try again",

            // Simulator errors
            Self::Simulator(_) => "Simulator unreachable. Check that it is running",
            Self::SkillRejected { .. } => "The simulator rejected a skill invocation",

            // Pipeline errors
            Self::Pipeline(_) => "Planning failed. Try rephrasing the command",
            Self::FeedbackRoundsExhausted(_) => {
                "The command could not be made feasible. Try a different command"
            }

            // Run record store errors
            Self::Store(_) => "Failed to persist the run record. Check the output directory",

            // Generic IO error
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::RateLimitExhausted { .. }
            | Self::AuthenticationFailed(_)
            | Self::FeedbackRoundsExhausted(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
