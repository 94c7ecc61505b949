//! Relay policy constants
//!
//! Values a node applies when deciding whether to relay a transaction. They
//! are configured, never derived from fee markets.

use crate::consensus::{COIN, MAX_MONEY};
use crate::network::NetworkType;
use serde::{Deserialize, Serialize};

/// Default dust floor (minor units) for P2PKH outputs
pub const DEFAULT_DUST_FLOOR: u64 = 546;

/// Default fee-rate increment (minor units per 1000 bytes)
pub const DEFAULT_FEE_INCREMENT: u64 = 10_000;

/// Transactions smaller than this many bytes may relay for free
pub const FREE_TX_SIZE_LIMIT: usize = 1_000;

/// Outputs below one bitcent force at least one fee increment
pub const LOW_VALUE_THRESHOLD: u64 = COIN / 100;

/// Priority above which a small transaction may relay for free
/// (one coin, one day of blocks, a 250 byte transaction)
pub const PRIORITY_THRESHOLD: f64 = COIN as f64 * 144.0 / 250.0;

/// Upper bound on any fee this wallet will negotiate (0.01 coin)
pub const DEFAULT_MAX_FEE: u64 = 1_000_000;

/// Relay policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayPolicy {
    /// Minimum value of a relayable output
    pub dust_floor: u64,
    /// Fee-rate increment, also the renegotiation step
    pub fee_increment: u64,
    /// Whether high-priority small transactions may skip the fee
    pub allow_free: bool,
    /// Size bound for free relay
    pub free_tx_size_limit: usize,
    /// Priority bound for free relay
    pub priority_threshold: f64,
    /// Output value under which the fee is raised to one increment
    pub low_value_threshold: u64,
    /// Clamp for computed fees
    pub max_money: u64,
    /// Ceiling on the negotiated fee
    pub max_fee: u64,
}

impl RelayPolicy {
    /// Policy defaults for a network
    pub fn for_network(network_type: NetworkType) -> Self {
        let fee_increment = match network_type {
            NetworkType::Mainnet | NetworkType::Testnet | NetworkType::Signet => {
                DEFAULT_FEE_INCREMENT
            }
            // Regtest nodes usually run with a relaxed relay fee
            NetworkType::Regtest => 1_000,
        };

        Self {
            dust_floor: DEFAULT_DUST_FLOOR,
            fee_increment,
            allow_free: false,
            free_tx_size_limit: FREE_TX_SIZE_LIMIT,
            priority_threshold: PRIORITY_THRESHOLD,
            low_value_threshold: LOW_VALUE_THRESHOLD,
            max_money: MAX_MONEY,
            max_fee: DEFAULT_MAX_FEE,
        }
    }
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self::for_network(NetworkType::Mainnet)
    }
}
