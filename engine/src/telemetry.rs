//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for structured logging. The effective level
//! comes from `RUST_LOG` when set, otherwise from the `--log` flag or the
//! configured `core.log_level`. Debug builds get pretty terminal output;
//! release builds emit JSON with span context.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the default filter directive for a level: the level globally, plus
/// explicitly for the engine crate so library consumers stay quiet.
fn filter_for(log_level: &str) -> EnvFilter {
    let directives = format!("{level},waypoint_engine={level}", level = log_level);
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Initialize the tracing subscriber with the given log level.
///
/// Safe to call more than once: the first initialization wins, so the early
/// pre-config call and the later config-driven call do not conflict.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = filter_for(log_level);

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    }
}

/// Initialize the tracing subscriber at "info" before the config is loaded.
pub fn init_telemetry() {
    init_telemetry_with_level("info");
}
