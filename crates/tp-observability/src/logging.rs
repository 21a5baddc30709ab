//! Logging infrastructure.
//!
//! Structured logging using the tracing ecosystem.

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    /// Verbose configuration for interactive debugging.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            json_format: false,
            include_target: true,
        }
    }
}

/// Initializes the logging system with default configuration.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::default());
}

/// Initializes the logging system with the given configuration.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tp_core={level},tp_aws={level},tp_cli={level},tp_observability={level}",
            level = config.level
        ))
    });

    if config.json_format {
        let fmt_layer = fmt::layer().json().with_target(config.include_target);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(config.include_target)
            .without_time();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}
