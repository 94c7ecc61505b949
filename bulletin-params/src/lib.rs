//! Bulletin wallet network parameters and relay policy
//!
//! This crate provides network profiles, consensus bounds and the relay
//! policy constants (dust floor, fee-rate increment, free relay thresholds)
//! used when funding a bulletin transaction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod consensus;
pub mod network;
pub mod policy;

pub use consensus::{ConsensusParams, COIN, MAX_MONEY};
pub use network::{Network, NetworkType};
pub use policy::RelayPolicy;

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
