//! Configuration file parsing for `sledge.toml`.
//!
//! ```toml
//! [databases.default]
//! url = "sqlite::memory:"
//! log_limit = 100
//!
//! [databases.reports]
//! url = "sqlite://${REPORTS_DB}"
//!
//! [debug]
//! log_queries = true
//! slow_query_threshold = 1000   # milliseconds
//! log_level = "info"            # installs a subscriber, see `logging`
//! log_format = "compact"
//! log_statements = true
//!
//! [environments.test.databases.default]
//! url = "sqlite::memory:"
//! ```
//!
//! `${VAR}` references are replaced with environment variables before parsing.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use indexmap::IndexMap;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::database::{DEFAULT_LOG_LIMIT, LogSettings};
use crate::error::{QueryError, QueryResult};
use crate::logging::{LogFormat, LogOptions};

/// Main configuration structure for `sledge.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SledgeConfig {
    /// Database links by name.
    #[serde(default)]
    pub databases: IndexMap<String, DatabaseConfig>,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl SledgeConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("Can't read {}", path.display())).with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| {
            QueryError::configuration(format!("Invalid configuration: {}", e.message()))
                .with_source(e)
        })
    }

    /// The configuration of a database link.
    pub fn database(&self, link: &str) -> QueryResult<&DatabaseConfig> {
        self.databases.get(link).ok_or_else(|| {
            QueryError::connection_not_found(link)
                .with_suggestion(format!("Add a [databases.{}] section", link))
        })
    }

    /// Log settings for a database link.
    pub fn log_settings(&self, link: &str) -> QueryResult<LogSettings> {
        let database = self.database(link)?;
        Ok(LogSettings {
            log_queries: self.debug.log_queries,
            log_limit: database.log_limit,
            slow_query_threshold: Duration::from_millis(self.debug.slow_query_threshold),
        })
    }

    /// Subscriber options from the `[debug]` section.
    ///
    /// `SLEDGE_*` environment variables are not consulted here; see
    /// [`LogOptions::with_env_overrides`].
    pub fn log_options(&self) -> QueryResult<LogOptions> {
        let mut options = LogOptions::default().with_statements(self.debug.log_statements);
        if let Some(level) = &self.debug.log_level {
            let level = tracing::Level::from_str(level).map_err(|e| {
                QueryError::configuration(format!("Unknown log level: {}", level))
                    .with_source(e)
                    .with_suggestion("Use trace, debug, info, warn or error")
            })?;
            options = options.with_level(level);
        }
        if let Some(format) = &self.debug.log_format {
            options = options.with_format(LogFormat::from_str(format)?);
        }
        Ok(options)
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            for (link, db) in overrides.databases {
                match self.databases.get_mut(&link) {
                    Some(existing) => {
                        if let Some(url) = db.url {
                            existing.url = url;
                        }
                        if let Some(limit) = db.log_limit {
                            existing.log_limit = limit;
                        }
                    }
                    None => {
                        if let Some(url) = db.url {
                            self.databases.insert(
                                link,
                                DatabaseConfig {
                                    url,
                                    log_limit: db.log_limit.unwrap_or(DEFAULT_LOG_LIMIT),
                                },
                            );
                        }
                    }
                }
            }
            if let Some(debug) = overrides.debug {
                if let Some(log_queries) = debug.log_queries {
                    self.debug.log_queries = log_queries;
                }
                if let Some(threshold) = debug.slow_query_threshold {
                    self.debug.slow_query_threshold = threshold;
                }
            }
        }
        self
    }
}

/// One database link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL (supports `${ENV_VAR}` interpolation).
    pub url: String,

    /// Number of statements kept in the query log.
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,
}

fn default_log_limit() -> usize {
    DEFAULT_LOG_LIMIT
}

/// Debug/logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Record executed statements in the query log.
    #[serde(default = "default_true")]
    pub log_queries: bool,

    /// Slow query threshold in milliseconds.
    #[serde(default = "default_slow_query_threshold")]
    pub slow_query_threshold: u64,

    /// Level of the subscriber installed by `sledgehammer::init_logging`.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Subscriber output format: json, pretty or compact.
    #[serde(default)]
    pub log_format: Option<String>,

    /// Print executed statements whatever `log_level` is.
    #[serde(default)]
    pub log_statements: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_queries: true,
            slow_query_threshold: default_slow_query_threshold(),
            log_level: None,
            log_format: None,
            log_statements: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_slow_query_threshold() -> u64 {
    1000
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Database overrides by link.
    #[serde(default)]
    pub databases: IndexMap<String, DatabaseOverride>,

    /// Debug overrides.
    pub debug: Option<DebugOverride>,
}

/// Database configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseOverride {
    /// Override connection URL.
    pub url: Option<String>,

    /// Override the log limit.
    pub log_limit: Option<usize>,
}

/// Debug configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOverride {
    /// Override log_queries.
    pub log_queries: Option<bool>,

    /// Override slow_query_threshold.
    pub slow_query_threshold: Option<u64>,
}

fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"))
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    env_var_regex()
        .replace_all(content, |caps: &regex_lite::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = SledgeConfig::default();
        assert!(config.databases.is_empty());
        assert!(config.debug.log_queries);
        assert_eq!(config.debug.slow_query_threshold, 1000);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [databases.default]
            url = "sqlite::memory:"

            [databases.reports]
            url = "sqlite://reports.db"
            log_limit = 10

            [debug]
            slow_query_threshold = 250
        "#;

        let config = SledgeConfig::from_str(toml).unwrap();
        assert_eq!(config.database("default").unwrap().url, "sqlite::memory:");
        assert_eq!(config.database("default").unwrap().log_limit, DEFAULT_LOG_LIMIT);

        let settings = config.log_settings("reports").unwrap();
        assert_eq!(settings.log_limit, 10);
        assert_eq!(settings.slow_query_threshold, Duration::from_millis(250));

        assert_eq!(
            config.database("missing").unwrap_err().code,
            ErrorCode::ConnectionNotFound
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = SledgeConfig::from_str("[debug]\nverbose = true\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_environment_overrides() {
        let toml = r#"
            [databases.default]
            url = "sqlite://app.db"

            [environments.test.databases.default]
            url = "sqlite::memory:"

            [environments.test.databases.audit]
            url = "sqlite::memory:"

            [environments.test.debug]
            log_queries = false
        "#;

        let config = SledgeConfig::from_str(toml).unwrap().with_environment("test");
        assert_eq!(config.database("default").unwrap().url, "sqlite::memory:");
        assert!(config.database("audit").is_ok());
        assert!(!config.debug.log_queries);

        let untouched = SledgeConfig::from_str(toml).unwrap().with_environment("prod");
        assert_eq!(untouched.database("default").unwrap().url, "sqlite://app.db");
    }

    #[test]
    fn test_log_options() {
        assert_eq!(SledgeConfig::default().log_options().unwrap().directives(), None);

        let config = SledgeConfig::from_str(
            "[debug]\nlog_level = \"info\"\nlog_format = \"compact\"\nlog_statements = true\n",
        )
        .unwrap();
        let options = config.log_options().unwrap();
        assert_eq!(options.level, Some(tracing::Level::INFO));
        assert_eq!(options.format, LogFormat::Compact);
        assert_eq!(
            options.directives().unwrap(),
            "sledgehammer=info,sledge_query=info,sledge_sqlite=info,sledge_query::database=debug"
        );

        let bad = SledgeConfig::from_str("[debug]\nlog_level = \"loud\"\n").unwrap();
        assert_eq!(
            bad.log_options().unwrap_err().code,
            ErrorCode::InvalidConfiguration
        );
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: This test uses a variable no other test touches
        unsafe {
            std::env::set_var("SLEDGE_TEST_DB_PATH", "/tmp/sledge.db");
        }
        let expanded = expand_env_vars("url = \"sqlite://${SLEDGE_TEST_DB_PATH}\"");
        assert_eq!(expanded, "url = \"sqlite:///tmp/sledge.db\"");
        assert_eq!(expand_env_vars("${SLEDGE_UNSET_VARIABLE}"), "${SLEDGE_UNSET_VARIABLE}");
        unsafe {
            std::env::remove_var("SLEDGE_TEST_DB_PATH");
        }
    }
}
