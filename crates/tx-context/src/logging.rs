//! Tracing subscriber setup for hosts embedding the transaction context.
//!
//! `RUST_LOG` overrides the caller-supplied level when it is set.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ContextError;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines for local development.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

impl FromStr for LogFormat {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(ContextError::Config(format!(
                "unknown log format {other:?}, expected \"human\" or \"json\""
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Human => f.write_str("human"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Fails with [`ContextError::Config`] if a global subscriber is already set.
pub fn init_logging(format: LogFormat, level: &str) -> Result<(), ContextError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let installed = match format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer::layer().with_target(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer::layer().json().with_target(true))
            .try_init(),
    };
    installed.map_err(|e| ContextError::Config(format!("logging already initialised: {e}")))
}
