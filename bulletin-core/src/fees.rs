//! Transaction size estimation and fee negotiation
//!
//! Fees are charged per started kilobyte of serialized transaction, in steps
//! of the configured fee-rate increment.

use crate::credit::Credit;
use crate::{Error, Result};
use bitcoin::{Amount, TxOut};
use bulletin_params::RelayPolicy;
use serde::{Deserialize, Serialize};

/// Version, lock time and the two count varints
pub const TX_OVERHEAD_ESTIMATE: usize = 4 + 4 + 1 + 1;

/// Best case P2PKH signature script: DER signature with hash type, compressed
/// pubkey and both push opcodes
pub const SIG_SCRIPT_ESTIMATE: usize = 1 + 70 + 1 + 33 + 1;

/// Outpoint, sequence and the signature script
pub const TX_IN_ESTIMATE: usize = 32 + 4 + 4 + SIG_SCRIPT_ESTIMATE;

/// OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
pub const PK_SCRIPT_ESTIMATE: usize = 1 + 1 + 1 + 20 + 1 + 1;

/// Value, script length varint and a P2PKH script
pub const TX_OUT_ESTIMATE: usize = 8 + 1 + PK_SCRIPT_ESTIMATE;

/// Linear model of a transaction's serialized size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeModel {
    /// Bytes present regardless of inputs and outputs
    pub overhead: usize,
    /// Bytes added by each input
    pub per_input: usize,
    /// Bytes added by each output
    pub per_output: usize,
}

impl SizeModel {
    /// Estimated serialized size for the given counts
    pub fn estimate(&self, num_inputs: usize, num_outputs: usize) -> usize {
        self.overhead + self.per_input * num_inputs + self.per_output * num_outputs
    }
}

impl Default for SizeModel {
    fn default() -> Self {
        Self {
            overhead: TX_OVERHEAD_ESTIMATE,
            per_input: TX_IN_ESTIMATE,
            per_output: TX_OUT_ESTIMATE,
        }
    }
}

/// Fee policy evaluated against estimated and actual transaction sizes
#[derive(Debug, Clone)]
pub struct FeePolicy {
    relay: RelayPolicy,
}

impl FeePolicy {
    /// Create a fee policy from relay settings
    pub fn new(relay: RelayPolicy) -> Self {
        Self { relay }
    }

    /// Fee-rate increment
    pub fn increment(&self) -> Amount {
        Amount::from_sat(self.relay.fee_increment)
    }

    /// Relay settings backing this policy
    pub fn relay(&self) -> &RelayPolicy {
        &self.relay
    }

    /// Fee for a transaction of `size` bytes: one increment per started
    /// kilobyte.
    pub fn fee_for_size(&self, size: usize) -> Amount {
        let kilobytes = 1 + (size / 1000) as u64;
        let fee = kilobytes.saturating_mul(self.relay.fee_increment);
        Amount::from_sat(fee.min(self.relay.max_money))
    }

    /// Minimum fee required to relay a transaction of (estimated) `size`
    /// bytes spending `inputs` into `outputs`.
    ///
    /// Non-decreasing in `size` unless free relay is enabled.
    pub fn minimum_fee(
        &self,
        size: usize,
        outputs: &[TxOut],
        inputs: &[Credit],
        reference_height: u32,
    ) -> Amount {
        let increment = self.increment();
        let mut fee = self.fee_for_size(size);

        if self.relay.allow_free
            && size < self.relay.free_tx_size_limit
            && self.allows_free_relay(inputs, size, reference_height)
        {
            fee = Amount::ZERO;
        }

        // Low value outputs still pay one increment
        if fee < increment
            && outputs
                .iter()
                .any(|out| out.value.to_sat() < self.relay.low_value_threshold)
        {
            return increment;
        }

        fee.min(Amount::from_sat(self.relay.max_money))
    }

    /// Input priority: value-weighted confirmation depth per byte
    pub fn priority(inputs: &[Credit], size: usize, reference_height: u32) -> f64 {
        if size == 0 {
            return 0.0;
        }
        let weighted: f64 = inputs
            .iter()
            .map(|c| c.amount.to_sat() as f64 * c.confirmations(reference_height) as f64)
            .sum();
        weighted / size as f64
    }

    fn allows_free_relay(&self, inputs: &[Credit], size: usize, reference_height: u32) -> bool {
        Self::priority(inputs, size, reference_height) > self.relay.priority_threshold
    }

    /// Reject fees beyond the configured ceiling
    pub fn validate_fee(&self, fee: Amount) -> Result<()> {
        if fee.to_sat() > self.relay.max_fee {
            tracing::warn!(
                "Negotiated fee {} sat is above the {} sat ceiling",
                fee.to_sat(),
                self.relay.max_fee
            );
            return Err(Error::FeeTooHigh(format!(
                "Fee {} sat exceeds maximum {} sat",
                fee.to_sat(),
                self.relay.max_fee
            )));
        }
        Ok(())
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::new(RelayPolicy::default())
    }
}
