use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// When the bridge re-instantiates the guest before an `execute`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Before every `execute`.
    #[default]
    Always,
    /// Only when the live instance has already executed a program or has faulted.
    WhenTainted,
}

/// Configuration for the guest bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Linear memory pages grown after each instantiation.
    pub memory_pages: u64,
    /// Delay between readiness probes, in milliseconds.
    pub ready_poll_interval_ms: u64,
    /// Readiness probes before giving up.
    pub ready_poll_attempts: u32,
    /// Restart policy for `execute`.
    pub restart_policy: RestartPolicy,
    /// Guest console lines kept for trap diagnostics.
    pub console_lines: usize,
    /// Capacity in bytes of each captured WASI output stream.
    pub output_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            memory_pages: 40,
            ready_poll_interval_ms: 100,
            ready_poll_attempts: 50,
            restart_policy: RestartPolicy::Always,
            console_lines: 256,
            output_capacity: 1024 * 1024,
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Delay between readiness probes.
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let config = BridgeConfig::default();
        assert_eq!(config.memory_pages, 40);
        assert_eq!(config.ready_poll_interval(), Duration::from_millis(100));
        assert_eq!(config.restart_policy, RestartPolicy::Always);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BridgeConfig::from_toml(
            r#"
restart_policy = "when-tainted"
console_lines = 8
"#,
        )
        .unwrap();
        assert_eq!(config.restart_policy, RestartPolicy::WhenTainted);
        assert_eq!(config.console_lines, 8);
        assert_eq!(config.ready_poll_attempts, 50);
    }

    #[test]
    fn unknown_policy_is_a_config_error() {
        let err = BridgeConfig::from_toml("restart_policy = \"never\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
