//! Logging infrastructure for Sledgehammer.
//!
//! The library only emits `tracing` events; installing a subscriber is up to the
//! application. With the `tracing-subscriber` feature, [`init_with`] installs one
//! from a [`LogOptions`], built from the `[debug]` section of `sledge.toml`
//! (see [`SledgeConfig::log_options`](crate::config::SledgeConfig::log_options))
//! or from environment variables.
//!
//! # Environment Variables
//!
//! - `SLEDGE_DEBUG=true|1|yes` - Enable debug logging
//! - `SLEDGE_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `SLEDGE_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//! - `SLEDGE_LOG_STATEMENTS=true|1|yes` - Show executed SQL whatever the level
//!
//! Environment variables win over the configuration file.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sledge_query::logging;
//!
//! // Initialize logging from the environment (call once at startup)
//! logging::init();
//! ```
//!
//! # Internal Logging
//!
//! - `warn!` for type mismatches and missing keys while reading paths, slow and failed queries
//! - `info!` for notices such as overwritten builder state or implied `AND` between conditions
//! - `debug!` for executed statements (target `sledge_query::database`) and pushed-down conditions
//! - `trace!` for materialization

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use tracing::Level;

use crate::error::{QueryError, QueryResult};

static INIT: Once = Once::new();

/// Crates whose events the installed filter lets through.
const CRATES: [&str; 3] = ["sledgehammer", "sledge_query", "sledge_sqlite"];

/// Target of the executed-statement events.
pub const STATEMENT_TARGET: &str = "sledge_query::database";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl FromStr for LogFormat {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(QueryError::configuration(format!("Unknown log format: {}", other))
                .with_suggestion("Use json, pretty or compact")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        })
    }
}

/// What the installed subscriber lets through and how it prints it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogOptions {
    /// Level for every Sledgehammer crate. `None` installs nothing unless
    /// statements are requested.
    pub level: Option<Level>,
    /// Output format.
    pub format: LogFormat,
    /// Show executed SQL at `debug` even when `level` is stricter.
    pub log_statements: bool,
}

impl LogOptions {
    /// Options taken from the environment alone.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Set the level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Show or hide executed statements.
    pub fn with_statements(mut self, log_statements: bool) -> Self {
        self.log_statements = log_statements;
        self
    }

    /// Replace settings with any `SLEDGE_*` variables that are set.
    ///
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if is_debug_enabled() {
            self.level = Some(Level::DEBUG);
        }
        if let Some(level) = env::var("SLEDGE_LOG_LEVEL")
            .ok()
            .and_then(|l| Level::from_str(&l).ok())
        {
            self.level = Some(level);
        }
        if let Some(format) = env::var("SLEDGE_LOG_FORMAT")
            .ok()
            .and_then(|f| LogFormat::from_str(&f).ok())
        {
            self.format = format;
        }
        if env_flag("SLEDGE_LOG_STATEMENTS") {
            self.log_statements = true;
        }
        self
    }

    /// The filter directives to install, or `None` when logging stays off.
    pub fn directives(&self) -> Option<String> {
        if self.level.is_none() && !self.log_statements {
            return None;
        }

        let level = self.level.unwrap_or(Level::WARN).as_str().to_lowercase();
        let mut directives: Vec<String> = CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .collect();
        if self.log_statements && self.level.is_none_or(|l| l < Level::DEBUG) {
            directives.push(format!("{}=debug", STATEMENT_TARGET));
        }
        Some(directives.join(","))
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Check if debug logging is enabled via the `SLEDGE_DEBUG` environment variable.
#[inline]
pub fn is_debug_enabled() -> bool {
    env_flag("SLEDGE_DEBUG")
}

/// Initialize logging from the environment.
///
/// Does nothing unless `SLEDGE_DEBUG`, `SLEDGE_LOG_LEVEL` or `SLEDGE_LOG_STATEMENTS`
/// is set. Subsequent calls are no-ops.
pub fn init() {
    init_with(LogOptions::from_env());
}

/// Initialize logging with explicit options.
///
/// Only the first call of [`init`] or [`init_with`] has any effect. Without the
/// `tracing-subscriber` feature nothing is installed.
pub fn init_with(options: LogOptions) {
    INIT.call_once(|| {
        let Some(directives) = options.directives() else {
            return;
        };

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter =
                EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match options.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    filter = %directives,
                    format = %options.format,
                    "Sledgehammer logging initialized"
                );
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = directives;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_off_by_default() {
        assert_eq!(LogOptions::default().directives(), None);
        assert_eq!(LogOptions::default().format, LogFormat::Json);
    }

    #[test]
    fn test_level_applies_to_every_crate() {
        let options = LogOptions::default().with_level(Level::INFO);
        assert_eq!(
            options.directives().unwrap(),
            "sledgehammer=info,sledge_query=info,sledge_sqlite=info"
        );
    }

    #[test]
    fn test_statements_raise_the_database_target() {
        let alone = LogOptions::default().with_statements(true);
        assert_eq!(
            alone.directives().unwrap(),
            "sledgehammer=warn,sledge_query=warn,sledge_sqlite=warn,sledge_query::database=debug"
        );

        let verbose = LogOptions::default()
            .with_level(Level::TRACE)
            .with_statements(true);
        assert_eq!(
            verbose.directives().unwrap(),
            "sledgehammer=trace,sledge_query=trace,sledge_sqlite=trace"
        );
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("Compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");

        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::InvalidConfiguration);
    }
}
