//! Bounded log of executed statements.

use std::collections::VecDeque;
use std::time::Duration;

/// Default number of statements kept by a [`QueryLog`].
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Default threshold above which a statement is reported as slow.
pub const DEFAULT_SLOW_QUERY_THRESHOLD: Duration = Duration::from_secs(1);

/// Settings controlling how a database logs its statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Record statements in the [`QueryLog`].
    pub log_queries: bool,
    /// Maximum number of statements kept.
    pub log_limit: usize,
    /// Statements taking at least this long are logged at `warn` level.
    pub slow_query_threshold: Duration,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            log_queries: true,
            log_limit: DEFAULT_LOG_LIMIT,
            slow_query_threshold: DEFAULT_SLOW_QUERY_THRESHOLD,
        }
    }
}

impl LogSettings {
    /// Set the log limit.
    pub fn with_log_limit(mut self, limit: usize) -> Self {
        self.log_limit = limit;
        self
    }

    /// Set the slow query threshold.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Enable or disable recording.
    pub fn with_log_queries(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }
}

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedQuery {
    /// The SQL text.
    pub sql: String,
    /// Time spent in the driver.
    pub duration: Duration,
    /// Number of rows returned.
    pub rows: usize,
}

/// The most recent statements, plus running totals over every statement.
#[derive(Debug, Clone)]
pub struct QueryLog {
    entries: VecDeque<LoggedQuery>,
    limit: usize,
    total_count: u64,
    total_duration: Duration,
}

impl Default for QueryLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_LIMIT)
    }
}

impl QueryLog {
    /// Create a log keeping at most `limit` statements.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(DEFAULT_LOG_LIMIT)),
            limit,
            total_count: 0,
            total_duration: Duration::ZERO,
        }
    }

    /// Record a statement, dropping the oldest one when full.
    pub fn record(&mut self, query: LoggedQuery) {
        self.total_count += 1;
        self.total_duration += query.duration;
        if self.limit == 0 {
            return;
        }
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(query);
    }

    /// The kept statements, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LoggedQuery> {
        self.entries.iter()
    }

    /// The most recent statement.
    pub fn last(&self) -> Option<&LoggedQuery> {
        self.entries.back()
    }

    /// Number of kept statements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is kept.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The maximum number of kept statements.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of statements ever recorded.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Time spent in every statement ever recorded.
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Drop the kept statements. Totals are preserved.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(sql: &str, ms: u64) -> LoggedQuery {
        LoggedQuery {
            sql: sql.to_string(),
            duration: Duration::from_millis(ms),
            rows: 1,
        }
    }

    #[test]
    fn test_oldest_entry_is_dropped() {
        let mut log = QueryLog::new(2);
        log.record(query("SELECT 1", 1));
        log.record(query("SELECT 2", 2));
        log.record(query("SELECT 3", 3));

        let kept: Vec<_> = log.entries().map(|q| q.sql.as_str()).collect();
        assert_eq!(kept, vec!["SELECT 2", "SELECT 3"]);
        assert_eq!(log.total_count(), 3);
        assert_eq!(log.total_duration(), Duration::from_millis(6));
    }

    #[test]
    fn test_zero_limit_keeps_totals_only() {
        let mut log = QueryLog::new(0);
        log.record(query("SELECT 1", 5));
        assert!(log.is_empty());
        assert_eq!(log.total_count(), 1);
    }

    #[test]
    fn test_clear_keeps_totals() {
        let mut log = QueryLog::default();
        log.record(query("SELECT 1", 1));
        log.clear();
        assert!(log.last().is_none());
        assert_eq!(log.total_count(), 1);
        assert_eq!(log.limit(), DEFAULT_LOG_LIMIT);
    }
}
