//! Send configuration
//!
//! Loaded from JSON; unset policy fields fall back to the network defaults.

use crate::fees::SizeModel;
use crate::selection::AuthoringPolicy;
use crate::{Error, Result};
use bulletin_params::{Network, NetworkType, RelayPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default minimum confirmations for eligible credits
pub const DEFAULT_MIN_CONFIRMATIONS: u32 = 1;

/// Configuration for sending bulletins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// Network profile
    pub network: NetworkType,
    /// Confirmations a credit needs to be spent
    pub min_confirmations: u32,
    /// Authoring credit choice when several match
    pub authoring_policy: AuthoringPolicy,
    /// Value of each message output
    pub dust_floor: Option<u64>,
    /// Fee-rate increment
    pub fee_increment: Option<u64>,
    /// Allow free relay for high-priority transactions
    pub allow_free: Option<bool>,
    /// Ceiling on negotiated fees
    pub max_fee: Option<u64>,
    /// Transaction size model
    pub size_model: SizeModel,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            min_confirmations: DEFAULT_MIN_CONFIRMATIONS,
            authoring_policy: AuthoringPolicy::default(),
            dust_floor: None,
            fee_increment: None,
            allow_free: None,
            max_fee: None,
            size_model: SizeModel::default(),
        }
    }
}

impl SendConfig {
    /// Defaults for a network
    pub fn for_network(network: NetworkType) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Parse from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded send config from {}", path.as_ref().display());
        Self::from_json_str(&contents)
    }

    /// Reject settings the builder cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.fee_increment == Some(0) {
            return Err(Error::Config("fee_increment must be positive".to_string()));
        }
        if self.dust_floor == Some(0) {
            return Err(Error::Config("dust_floor must be positive".to_string()));
        }
        if self.size_model.per_input == 0 {
            return Err(Error::Config("size_model.per_input must be positive".to_string()));
        }
        Ok(())
    }

    /// Network parameters
    pub fn network_params(&self) -> Network {
        Network::from_type(self.network)
    }

    /// Relay policy with overrides applied over the network defaults
    pub fn relay_policy(&self) -> RelayPolicy {
        let mut policy = RelayPolicy::for_network(self.network);
        if let Some(dust_floor) = self.dust_floor {
            policy.dust_floor = dust_floor;
        }
        if let Some(fee_increment) = self.fee_increment {
            policy.fee_increment = fee_increment;
        }
        if let Some(allow_free) = self.allow_free {
            policy.allow_free = allow_free;
        }
        if let Some(max_fee) = self.max_fee {
            policy.max_fee = max_fee;
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SendConfig::default();
        assert_eq!(config.min_confirmations, 1);
        assert_eq!(config.authoring_policy, AuthoringPolicy::FirstMatch);
        assert_eq!(config.relay_policy(), RelayPolicy::for_network(NetworkType::Mainnet));
    }

    #[test]
    fn test_overrides_from_json() {
        let config = SendConfig::from_json_str(
            r#"{
                "network": "regtest",
                "authoring_policy": "largest_amount",
                "fee_increment": 10,
                "dust_floor": 1000
            }"#,
        )
        .unwrap();

        assert_eq!(config.network, NetworkType::Regtest);
        assert_eq!(config.authoring_policy, AuthoringPolicy::LargestAmount);
        let policy = config.relay_policy();
        assert_eq!(policy.fee_increment, 10);
        assert_eq!(policy.dust_floor, 1000);
        assert_eq!(config.size_model, SizeModel::default());
    }

    #[test]
    fn test_rejects_zero_increment() {
        let err = SendConfig::from_json_str(r#"{"fee_increment": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = SendConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"network": "testnet", "min_confirmations": 3}}"#).unwrap();

        let config = SendConfig::load(file.path()).unwrap();
        assert_eq!(config.network, NetworkType::Testnet);
        assert_eq!(config.min_confirmations, 3);
        assert_eq!(config.network_params(), Network::testnet());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SendConfig::load("/nonexistent/bulletin.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
