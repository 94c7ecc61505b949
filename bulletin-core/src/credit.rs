//! Spendable outputs ("credits") owned by the account

use crate::address::{script_addresses, ScriptClass};
use crate::{Error, Result};
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Sequence, TxIn, Witness};
use bulletin_params::Network;

/// A previously received, currently unspent output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    /// Outpoint identifying the output
    pub outpoint: OutPoint,
    /// Output value
    pub amount: Amount,
    /// Locking script
    pub script_pubkey: ScriptBuf,
    /// Height of the block that mined it, `None` while unconfirmed
    pub height: Option<u32>,
}

impl Credit {
    /// Create an unconfirmed credit
    pub fn new(outpoint: OutPoint, amount: Amount, script_pubkey: ScriptBuf) -> Self {
        Self {
            outpoint,
            amount,
            script_pubkey,
            height: None,
        }
    }

    /// Set the height of the mining block
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Script template of the locking script
    pub fn script_class(&self) -> ScriptClass {
        ScriptClass::classify(&self.script_pubkey)
    }

    /// Addresses the locking script pays to
    pub fn addresses(&self, network: &Network) -> Vec<Address> {
        script_addresses(&self.script_pubkey, network)
    }

    /// Confirmation depth relative to a reference height
    pub fn confirmations(&self, reference_height: u32) -> u32 {
        match self.height {
            Some(height) if height <= reference_height => reference_height - height + 1,
            _ => 0,
        }
    }

    /// Unsigned input spending this credit
    pub fn to_txin(&self) -> TxIn {
        TxIn {
            previous_output: self.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }
    }
}

/// Remove exactly one credit (matched by outpoint), keeping the order of the
/// rest. The sequence is returned unchanged if no credit matches.
pub fn remove_credit(mut credits: Vec<Credit>, outpoint: &OutPoint) -> Vec<Credit> {
    if let Some(idx) = credits.iter().position(|c| c.outpoint == *outpoint) {
        credits.remove(idx);
    }
    credits
}

/// Stable sort, largest amount first; equal amounts keep their relative order.
pub fn sort_descending_by_amount(credits: &mut [Credit]) {
    credits.sort_by(|a, b| b.amount.cmp(&a.amount));
}

/// Sum of credit amounts
pub fn total_value(credits: &[Credit]) -> Result<Amount> {
    credits.iter().try_fold(Amount::ZERO, |acc, c| {
        acc.checked_add(c.amount)
            .ok_or_else(|| Error::AmountOverflow("Credit total overflow".to_string()))
    })
}
