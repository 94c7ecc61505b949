//! Consensus bounds

use crate::network::{Network, NetworkType};

/// Units per coin
pub const COIN: u64 = 100_000_000;

/// Maximum amount that can exist on the ledger (21M coins)
pub const MAX_MONEY: u64 = 21_000_000 * COIN;

/// Consensus parameters
#[derive(Debug, Clone)]
pub struct ConsensusParams {
    /// Network configuration
    pub network: Network,
    /// Maximum supply (minor units)
    pub max_money: u64,
}

impl ConsensusParams {
    /// Get consensus params by network type
    pub fn from_network(network_type: NetworkType) -> Self {
        Self {
            network: Network::from_type(network_type),
            max_money: MAX_MONEY,
        }
    }

    /// Check if amount is valid (within max supply)
    pub fn is_valid_amount(&self, amount: u64) -> bool {
        amount <= self.max_money
    }
}
