use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Base URL of the user resource under test.
pub(crate) const BASE_URL: &str = "http://localhost:3000/api/users";

/// The record every scenario contends on.
pub(crate) const TARGET_ID: u32 = 1;

/// Name of the file results are appended to.
pub(crate) const RESULTS_NAME: &str = "results.txt";

/// Transaction isolation levels the target API accepts through its `iso` parameter.
///
/// The harness never interprets these; they are forwarded as labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum IsolationLevel {
    #[serde(rename = "READ UNCOMMITTED")]
    ReadUncommitted,
    #[serde(rename = "READ COMMITTED")]
    ReadCommitted,
    #[serde(rename = "REPEATABLE READ")]
    RepeatableRead,
    #[serde(rename = "SERIALIZABLE")]
    Serializable,
}

impl IsolationLevel {
    /// Every level, in the order they are exercised.
    pub(crate) const ALL: [IsolationLevel; 4] = [
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Settings for a harness run.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct HarnessConfig {
    /// Base URL of the user resource, without a trailing slash.
    pub(crate) base_url: String,
    /// Id of the user record every request targets.
    pub(crate) target_id: u32,
    /// Upper bound on a single request, including reading the body.
    pub(crate) request_timeout_ms: u64,
    /// Pause after the concurrent reads scenario.
    pub(crate) reads_cooldown_ms: u64,
    /// Pause after the write vs read scenario.
    pub(crate) write_read_cooldown_ms: u64,
    /// Pause after the concurrent writes scenario.
    pub(crate) writes_cooldown_ms: u64,
    /// Levels to exercise, in order.
    pub(crate) isolation_levels: Vec<IsolationLevel>,
    /// Level used by the reset and final state requests.
    pub(crate) maintenance_level: IsolationLevel,
    /// File results are appended to.
    pub(crate) results_file: String,
    pub(crate) user_agent: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            target_id: TARGET_ID,
            request_timeout_ms: 10_000,
            reads_cooldown_ms: 2_000,
            write_read_cooldown_ms: 2_000,
            writes_cooldown_ms: 3_000,
            isolation_levels: IsolationLevel::ALL.to_vec(),
            maintenance_level: IsolationLevel::ReadCommitted,
            results_file: RESULTS_NAME.to_string(),
            user_agent: format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl HarnessConfig {
    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub(crate) fn reads_cooldown(&self) -> Duration {
        Duration::from_millis(self.reads_cooldown_ms)
    }

    pub(crate) fn write_read_cooldown(&self) -> Duration {
        Duration::from_millis(self.write_read_cooldown_ms)
    }

    pub(crate) fn writes_cooldown(&self) -> Duration {
        Duration::from_millis(self.writes_cooldown_ms)
    }

    /// Renders the configuration for the trace log.
    pub(crate) fn describe(&self) -> String {
        match toml::to_string_pretty(self) {
            Ok(text) => text,
            Err(e) => format!("<unable to render configuration: {}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_fixed_run() {
        let config = HarnessConfig::default();

        assert_eq!(config.base_url, "http://localhost:3000/api/users");
        assert_eq!(config.target_id, 1);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.reads_cooldown(), Duration::from_secs(2));
        assert_eq!(config.write_read_cooldown(), Duration::from_secs(2));
        assert_eq!(config.writes_cooldown(), Duration::from_secs(3));
        assert_eq!(config.isolation_levels, IsolationLevel::ALL.to_vec());
        assert_eq!(config.maintenance_level, IsolationLevel::ReadCommitted);
        assert_eq!(config.results_file, "results.txt");
    }

    #[test]
    fn test_describe_uses_level_labels() {
        let text = HarnessConfig::default().describe();

        assert!(text.contains("base_url = \"http://localhost:3000/api/users\""));
        assert!(text.contains("\"REPEATABLE READ\""));
        assert!(text.contains("maintenance_level = \"READ COMMITTED\""));
    }

    #[test]
    fn test_labels() {
        let labels: Vec<_> = IsolationLevel::ALL.iter().map(|level| level.to_string()).collect();
        assert_eq!(
            labels,
            ["READ UNCOMMITTED", "READ COMMITTED", "REPEATABLE READ", "SERIALIZABLE"]
        );
    }
}
