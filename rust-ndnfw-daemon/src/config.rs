//! Forwarder configuration.
//!
//! Options are read from an optional config file with `NDNFW_`-prefixed
//! environment variables layered on top; every option has a default, so the
//! forwarder also runs with no configuration at all.

use log::warn;
use rust_ndnfw_common::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// What to do with Data that matched no PIT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsolicitedDataPolicy {
    DropAll,
    AdmitAll,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// CS size limit, in packets.
    pub cs_max_packets: usize,
    /// CS eviction policy name.
    pub cs_policy: String,
    /// Admittance of unsolicited Data: "drop-all" or "admit-all".
    pub cs_unsolicited_policy: String,
    /// LP reassembly timeout, in milliseconds.
    pub reassembly_timeout_ms: u64,
    /// Upper bound on fragments per LP message.
    pub reassembly_max_fragments: u64,
    /// How long a satisfied PIT entry is held for stragglers, in milliseconds.
    pub pit_straggler_timeout_ms: u64,
    /// Strategy installed on the root prefix.
    pub strategy_choice_default: String,
    /// Send queue depth (bytes) above which packets are congestion-marked.
    pub congestion_threshold: usize,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            cs_max_packets: 65536,
            cs_policy: "lru".to_string(),
            cs_unsolicited_policy: "drop-all".to_string(),
            reassembly_timeout_ms: 500,
            reassembly_max_fragments: 400,
            pit_straggler_timeout_ms: 100,
            strategy_choice_default: "/localhost/nfd/strategy/best-route".to_string(),
            congestion_threshold: 65536,
        }
    }
}

impl ForwarderConfig {
    /// Loads configuration from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("NDNFW"));

        let settings = builder
            .build()
            .map_err(|e| Error::Other(format!("failed to load configuration: {}", e)))?;
        settings
            .try_deserialize()
            .map_err(|e| Error::Other(format!("invalid configuration: {}", e)))
    }

    pub fn reassembly_timeout(&self) -> Duration {
        Duration::from_millis(self.reassembly_timeout_ms)
    }

    pub fn pit_straggler_timeout(&self) -> Duration {
        Duration::from_millis(self.pit_straggler_timeout_ms)
    }

    pub fn unsolicited_data_policy(&self) -> UnsolicitedDataPolicy {
        match self.cs_unsolicited_policy.as_str() {
            "admit-all" => UnsolicitedDataPolicy::AdmitAll,
            "drop-all" => UnsolicitedDataPolicy::DropAll,
            other => {
                warn!("unknown unsolicited data policy {:?}, using drop-all", other);
                UnsolicitedDataPolicy::DropAll
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForwarderConfig::default();
        assert_eq!(config.cs_max_packets, 65536);
        assert_eq!(config.cs_policy, "lru");
        assert_eq!(config.reassembly_timeout(), Duration::from_millis(500));
        assert_eq!(config.reassembly_max_fragments, 400);
        assert_eq!(config.pit_straggler_timeout(), Duration::from_millis(100));
        assert_eq!(
            config.strategy_choice_default,
            "/localhost/nfd/strategy/best-route"
        );
        assert_eq!(config.unsolicited_data_policy(), UnsolicitedDataPolicy::DropAll);
    }

    #[test]
    fn test_unknown_unsolicited_policy_falls_back() {
        let config = ForwarderConfig {
            cs_unsolicited_policy: "bogus".to_string(),
            ..Default::default()
        };
        assert_eq!(config.unsolicited_data_policy(), UnsolicitedDataPolicy::DropAll);
    }
}
