//! Structural and policy checks on a signed transaction before it is
//! recorded or broadcast. Script execution is left to the node.

use crate::credit::{total_value, Credit};
use crate::{Error, Result};
use bitcoin::{Amount, Transaction};
use bulletin_params::{ConsensusParams, Network};
use std::collections::HashSet;

/// Checks a finished transaction against the credits it spends
pub trait TransactionValidator {
    /// Reject `tx` with [`Error::ValidationFailed`] if it is unfit to relay
    fn validate(&self, tx: &Transaction, inputs: &[Credit]) -> Result<()>;
}

/// Default validator
#[derive(Debug, Clone)]
pub struct StandardValidator {
    consensus: ConsensusParams,
}

impl StandardValidator {
    /// Validator bounded by the consensus limits of `network`
    pub fn new(network: &Network) -> Self {
        Self {
            consensus: ConsensusParams::from_network(network.network_type),
        }
    }

    fn fail(reason: impl Into<String>) -> Error {
        Error::ValidationFailed(reason.into())
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new(&Network::default())
    }
}

impl TransactionValidator for StandardValidator {
    fn validate(&self, tx: &Transaction, inputs: &[Credit]) -> Result<()> {
        if tx.input.is_empty() {
            return Err(Self::fail("transaction has no inputs"));
        }
        if tx.output.is_empty() {
            return Err(Self::fail("transaction has no outputs"));
        }
        if tx.input.len() != inputs.len() {
            return Err(Self::fail(format!(
                "{} inputs but {} credits",
                tx.input.len(),
                inputs.len()
            )));
        }

        let mut seen = HashSet::with_capacity(tx.input.len());
        for (idx, (txin, credit)) in tx.input.iter().zip(inputs).enumerate() {
            if txin.previous_output != credit.outpoint {
                return Err(Self::fail(format!(
                    "input {} spends {} but credit is {}",
                    idx, txin.previous_output, credit.outpoint
                )));
            }
            if !seen.insert(txin.previous_output) {
                return Err(Self::fail(format!(
                    "input {} double spends {}",
                    idx, txin.previous_output
                )));
            }
            if txin.script_sig.is_empty() && txin.witness.is_empty() {
                return Err(Self::fail(format!("input {} is not signed", idx)));
            }
        }

        let mut total_out = Amount::ZERO;
        for (idx, out) in tx.output.iter().enumerate() {
            if !self.consensus.is_valid_amount(out.value.to_sat()) {
                return Err(Self::fail(format!(
                    "output {} value out of range on {}",
                    idx, self.consensus.network.name
                )));
            }
            total_out = total_out
                .checked_add(out.value)
                .filter(|total| self.consensus.is_valid_amount(total.to_sat()))
                .ok_or_else(|| Self::fail("total output value out of range"))?;
        }

        let total_in = total_value(inputs)
            .ok()
            .filter(|total| self.consensus.is_valid_amount(total.to_sat()))
            .ok_or_else(|| Self::fail("total input value out of range"))?;
        if total_out > total_in {
            return Err(Self::fail(format!(
                "outputs ({} sat) exceed inputs ({} sat)",
                total_out.to_sat(),
                total_in.to_sat()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::hashes::Hash;
    use bitcoin::transaction::Version;
    use bitcoin::{OutPoint, ScriptBuf, TxOut, Txid};

    fn credit(tag: u8, sats: u64) -> Credit {
        Credit::new(
            OutPoint::new(Txid::from_byte_array([tag; 32]), 0),
            Amount::from_sat(sats),
            ScriptBuf::new(),
        )
    }

    fn validator() -> StandardValidator {
        StandardValidator::new(&Network::regtest())
    }

    fn signed_tx(inputs: &[Credit], outputs: &[u64]) -> Transaction {
        Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: inputs
                .iter()
                .map(|c| {
                    let mut txin = c.to_txin();
                    txin.script_sig = ScriptBuf::from_bytes(vec![1; 10]);
                    txin
                })
                .collect(),
            output: outputs
                .iter()
                .map(|v| TxOut {
                    value: Amount::from_sat(*v),
                    script_pubkey: ScriptBuf::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_valid_transaction() {
        let inputs = vec![credit(1, 10_000), credit(2, 5_000)];
        let tx = signed_tx(&inputs, &[1_000, 13_000]);
        assert!(validator().validate(&tx, &inputs).is_ok());
    }

    #[test]
    fn test_overspend_rejected() {
        let inputs = vec![credit(1, 10_000)];
        let tx = signed_tx(&inputs, &[10_001]);
        assert!(matches!(
            validator().validate(&tx, &inputs),
            Err(Error::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_unsigned_input_rejected() {
        let inputs = vec![credit(1, 10_000)];
        let mut tx = signed_tx(&inputs, &[1_000]);
        tx.input[0].script_sig = ScriptBuf::new();
        let err = validator().validate(&tx, &inputs).unwrap_err();
        assert!(err.to_string().contains("not signed"));
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let inputs = vec![credit(1, 10_000), credit(1, 10_000)];
        let tx = signed_tx(&inputs, &[1_000]);
        let err = validator().validate(&tx, &inputs).unwrap_err();
        assert!(err.to_string().contains("double spends"));
    }

    #[test]
    fn test_mismatched_credits_rejected() {
        let inputs = vec![credit(1, 10_000)];
        let tx = signed_tx(&inputs, &[1_000]);
        let other = vec![credit(2, 10_000)];
        assert!(validator().validate(&tx, &other).is_err());
        assert!(validator().validate(&tx, &[]).is_err());
    }

    #[test]
    fn test_empty_outputs_rejected() {
        let inputs = vec![credit(1, 10_000)];
        let tx = signed_tx(&inputs, &[]);
        assert!(validator().validate(&tx, &inputs).is_err());
    }

    #[test]
    fn test_output_above_max_money_rejected() {
        let inputs = vec![credit(1, 10_000)];
        let tx = signed_tx(&inputs, &[bulletin_params::MAX_MONEY + 1]);
        let err = validator().validate(&tx, &inputs).unwrap_err();
        assert!(err.to_string().contains("out of range on regtest"));
    }
}
