//! Bulletin transaction assembly
//!
//! Funds the message outputs from the authoring credit plus the largest
//! remaining credits, then negotiates a fee until the fee required for the
//! signed transaction's real size fits within the estimate. Signing is not
//! size-neutral, so the estimate is only a lower bound until checked.

use crate::bulletin::total_burn;
use crate::credit::Credit;
use crate::fees::{FeePolicy, SizeModel};
use crate::selection::{AuthoringPolicy, AuthoringSelector, CreditPool};
use crate::{Error, Result};
use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, ScriptBuf, Transaction, TxOut, Txid};
use bulletin_params::Network;

/// Signs every input of a transaction.
///
/// Implementations overwrite any existing signature scripts and report
/// failures as [`Error::SignFailed`].
pub trait TransactionSigner {
    /// Sign `tx`, whose inputs spend `inputs` in order
    fn sign_transaction(&self, tx: &mut Transaction, inputs: &[Credit]) -> Result<()>;
}

/// Mutable build state
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    /// Transaction under construction
    pub tx: Transaction,
    /// Credits spent, in input order
    pub inputs: Vec<Credit>,
    /// Position of the change output, if one exists
    pub change_index: Option<usize>,
    /// Estimated serialized size
    pub size_estimate: usize,
    /// Negotiated fee
    pub fee_estimate: Amount,
    /// Value committed to message outputs
    pub total_burn: Amount,
    collected: Amount,
}

impl PendingTransaction {
    /// Start from the message outputs
    pub fn new(message_outputs: Vec<TxOut>) -> Result<Self> {
        let total_burn = total_burn(&message_outputs)?;
        Ok(Self {
            tx: Transaction {
                version: Version::ONE,
                lock_time: LockTime::ZERO,
                input: Vec::new(),
                output: message_outputs,
            },
            inputs: Vec::new(),
            change_index: None,
            size_estimate: 0,
            fee_estimate: Amount::ZERO,
            total_burn,
            collected: Amount::ZERO,
        })
    }

    /// Total value of the inputs added so far
    pub fn collected(&self) -> Amount {
        self.collected
    }

    /// Append a credit as the next input
    pub fn push_input(&mut self, credit: Credit) -> Result<()> {
        self.collected = self
            .collected
            .checked_add(credit.amount)
            .ok_or_else(|| Error::AmountOverflow("Input total overflow".to_string()))?;
        self.tx.input.push(credit.to_txin());
        self.inputs.push(credit);
        Ok(())
    }

    /// Leftover value after burn and fee; zero when there is none
    pub fn change_amount(&self) -> Amount {
        self.collected
            .checked_sub(self.total_burn)
            .and_then(|rest| rest.checked_sub(self.fee_estimate))
            .unwrap_or(Amount::ZERO)
    }

    /// Append the change output and record its position
    pub fn push_change(&mut self, value: Amount, script_pubkey: ScriptBuf) {
        self.remove_change();
        self.tx.output.push(TxOut {
            value,
            script_pubkey,
        });
        self.change_index = Some(self.tx.output.len() - 1);
    }

    /// Drop the change output, if any
    pub fn remove_change(&mut self) {
        if let Some(idx) = self.change_index.take() {
            self.tx.output.remove(idx);
        }
    }

    fn clear_signatures(&mut self) {
        for txin in &mut self.tx.input {
            txin.script_sig = ScriptBuf::new();
            txin.witness.clear();
        }
    }

    fn shortfall(&self, required_fee: Amount) -> Error {
        Error::InsufficientFunds {
            collected: self.collected,
            required_burn: self.total_burn,
            required_fee,
        }
    }
}

/// A signed bulletin transaction whose fee has converged
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    /// Signed transaction
    pub transaction: Transaction,
    /// Credits spent, in input order; the authoring credit is first
    pub inputs: Vec<Credit>,
    /// Value committed to message outputs
    pub total_burn: Amount,
    /// Fee paid
    pub fee: Amount,
    /// Position of the change output, if any
    pub change_index: Option<usize>,
    /// Final size estimate
    pub size_estimate: usize,
    /// Number of assemble/sign/check rounds
    pub iterations: u32,
}

impl BuiltTransaction {
    /// Transaction identifier
    pub fn txid(&self) -> Txid {
        self.transaction.compute_txid()
    }

    /// Value returned to the author, if any
    pub fn change(&self) -> Option<Amount> {
        self.change_index
            .and_then(|idx| self.transaction.output.get(idx))
            .map(|out| out.value)
    }

    /// Sum of input values
    pub fn input_value(&self) -> Amount {
        self.inputs.iter().map(|c| c.amount).sum()
    }

    /// Sum of output values
    pub fn output_value(&self) -> Amount {
        self.transaction.output.iter().map(|o| o.value).sum()
    }
}

/// Builds a funded, signed bulletin transaction
#[derive(Debug)]
pub struct BulletinTransactionBuilder<'a> {
    author: &'a Address,
    network: &'a Network,
    fee_policy: &'a FeePolicy,
    size_model: SizeModel,
    selector: AuthoringSelector,
}

impl<'a> BulletinTransactionBuilder<'a> {
    /// Create a builder paying change to `author`
    pub fn new(author: &'a Address, network: &'a Network, fee_policy: &'a FeePolicy) -> Self {
        Self {
            author,
            network,
            fee_policy,
            size_model: SizeModel::default(),
            selector: AuthoringSelector::default(),
        }
    }

    /// Override the size model
    pub fn with_size_model(mut self, size_model: SizeModel) -> Self {
        self.size_model = size_model;
        self
    }

    /// Override the authoring credit policy
    pub fn with_authoring_policy(mut self, policy: AuthoringPolicy) -> Self {
        self.selector = AuthoringSelector::new(policy);
        self
    }

    /// Fund, sign and fee-balance a transaction carrying `message_outputs`.
    ///
    /// `eligible` is the spendable credit snapshot; it must contain a P2PKH
    /// credit paying the author.
    pub fn build<S>(
        &self,
        message_outputs: Vec<TxOut>,
        eligible: Vec<Credit>,
        reference_height: u32,
        signer: &S,
    ) -> Result<BuiltTransaction>
    where
        S: TransactionSigner + ?Sized,
    {
        let mut pending = PendingTransaction::new(message_outputs)?;
        let total_burn = pending.total_burn;

        tracing::trace!("Searching for a UTXO with target address {}", self.author);
        let (authoring, mut pool) = self.selector.select(eligible, self.author, self.network)?;
        pending.push_input(authoring)?;

        while pending.collected() < total_burn {
            let credit = pool
                .take_largest()
                .ok_or_else(|| pending.shortfall(Amount::ZERO))?;
            pending.push_input(credit)?;
        }

        tracing::trace!("Estimating fee");
        pending.size_estimate = self
            .size_model
            .estimate(pending.inputs.len(), pending.tx.output.len());
        pending.fee_estimate = self.fee_policy.minimum_fee(
            pending.size_estimate,
            &pending.tx.output,
            &pending.inputs,
            reference_height,
        );
        self.fund_fee(&mut pending, &mut pool, reference_height)?;

        let mut iterations = 0u32;
        loop {
            iterations += 1;
            self.fee_policy.validate_fee(pending.fee_estimate)?;

            let change = pending.change_amount();
            if change > Amount::ZERO {
                pending.push_change(change, self.author.script_pubkey());
            }

            tracing::trace!("Signing the transaction");
            pending.clear_signatures();
            signer
                .sign_transaction(&mut pending.tx, &pending.inputs)
                .map_err(|e| match e {
                    Error::SignFailed(_) => e,
                    other => Error::SignFailed(other.to_string()),
                })?;

            let actual_size = pending.tx.total_size();
            let required = self.fee_policy.fee_for_size(actual_size);
            if required <= pending.fee_estimate {
                tracing::debug!(
                    "Fee converged after {} rounds: size {} (estimated {}), fee {} sat",
                    iterations,
                    actual_size,
                    pending.size_estimate,
                    pending.fee_estimate.to_sat()
                );
                break;
            }

            tracing::warn!(
                "Signed size {} needs fee {} sat, estimate was {} sat; renegotiating",
                actual_size,
                required.to_sat(),
                pending.fee_estimate.to_sat()
            );

            // Change is re-added with a new amount on the next round
            pending.remove_change();
            pending.fee_estimate = pending
                .fee_estimate
                .checked_add(self.fee_policy.increment())
                .ok_or_else(|| Error::AmountOverflow("Fee estimate overflow".to_string()))?;
            self.fund_fee(&mut pending, &mut pool, reference_height)?;
        }

        Ok(BuiltTransaction {
            transaction: pending.tx,
            inputs: pending.inputs,
            total_burn,
            fee: pending.fee_estimate,
            change_index: pending.change_index,
            size_estimate: pending.size_estimate,
            iterations,
        })
    }

    /// Add inputs until they cover the burn plus the fee estimate.
    ///
    /// The estimate is recomputed after each input but never decreases, so a
    /// renegotiation bump survives the recomputation.
    fn fund_fee(
        &self,
        pending: &mut PendingTransaction,
        pool: &mut CreditPool,
        reference_height: u32,
    ) -> Result<()> {
        loop {
            let required = pending
                .total_burn
                .checked_add(pending.fee_estimate)
                .ok_or_else(|| Error::AmountOverflow("Burn plus fee overflow".to_string()))?;
            if pending.collected() >= required {
                return Ok(());
            }

            let credit = pool
                .take_largest()
                .ok_or_else(|| pending.shortfall(pending.fee_estimate))?;
            pending.push_input(credit)?;
            pending.size_estimate += self.size_model.per_input;

            let minimum = self.fee_policy.minimum_fee(
                pending.size_estimate,
                &pending.tx.output,
                &pending.inputs,
                reference_height,
            );
            // Monotonic: never below the current estimate
            pending.fee_estimate = pending.fee_estimate.max(minimum);

            tracing::debug!(
                "Added input for fee: {} inputs, size estimate {}, fee estimate {} sat",
                pending.inputs.len(),
                pending.size_estimate,
                pending.fee_estimate.to_sat()
            );
        }
    }
}
