//! Input selection for bulletin transactions
//!
//! The authoring credit is chosen by address; every other input is taken
//! greedily, largest amount first.

use crate::address::ScriptClass;
use crate::credit::{remove_credit, sort_descending_by_amount, Credit};
use crate::{Error, Result};
use bitcoin::{Address, Amount};
use bulletin_params::Network;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Which credit authors the bulletin when several pay the same address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthoringPolicy {
    /// First matching credit in scan order
    #[default]
    FirstMatch,
    /// Largest matching credit; equal amounts resolve to scan order
    LargestAmount,
}

/// Locates the credit that anchors authorship of a bulletin
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthoringSelector {
    policy: AuthoringPolicy,
}

impl AuthoringSelector {
    /// Create selector with policy
    pub fn new(policy: AuthoringPolicy) -> Self {
        Self { policy }
    }

    /// Index of the authoring credit for `target`.
    ///
    /// Only pay-to-public-key-hash credits are eligible.
    pub fn find(&self, credits: &[Credit], target: &Address, network: &Network) -> Result<usize> {
        let mut found: Option<usize> = None;

        for (idx, credit) in credits.iter().enumerate() {
            if credit.script_class() != ScriptClass::PubKeyHash {
                continue;
            }
            let pays_target = credit
                .addresses(network)
                .first()
                .is_some_and(|addr| addr == target);
            if !pays_target {
                continue;
            }

            match self.policy {
                AuthoringPolicy::FirstMatch => return Ok(idx),
                AuthoringPolicy::LargestAmount => {
                    if found.map_or(true, |best| credit.amount > credits[best].amount) {
                        found = Some(idx);
                    }
                }
            }
        }

        found.ok_or_else(|| {
            tracing::debug!("No eligible credits found for addr: {}", target);
            Error::NoEligibleCredit(target.to_string())
        })
    }

    /// Split the eligible credits into the authoring credit and a pool of the
    /// remainder ordered for greedy selection.
    pub fn select(
        &self,
        eligible: Vec<Credit>,
        target: &Address,
        network: &Network,
    ) -> Result<(Credit, CreditPool)> {
        let idx = self.find(&eligible, target, network)?;
        let authoring = eligible[idx].clone();
        let eligible = remove_credit(eligible, &authoring.outpoint);

        tracing::debug!(
            "Authoring credit {} ({} sat), {} credits left in pool",
            authoring.outpoint,
            authoring.amount.to_sat(),
            eligible.len()
        );

        Ok((authoring, CreditPool::new(eligible)))
    }
}

/// Remaining spendable credits, largest first
#[derive(Debug, Clone, Default)]
pub struct CreditPool {
    remaining: VecDeque<Credit>,
}

impl CreditPool {
    /// Build a pool; credits are stably sorted by descending amount
    pub fn new(mut credits: Vec<Credit>) -> Self {
        sort_descending_by_amount(&mut credits);
        Self {
            remaining: credits.into(),
        }
    }

    /// Take the largest remaining credit
    pub fn take_largest(&mut self) -> Option<Credit> {
        self.remaining.pop_front()
    }

    /// Number of credits left
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    /// Whether the pool is exhausted
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Get total available value
    pub fn total_available(&self) -> Amount {
        self.remaining.iter().map(|c| c.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::{OutPoint, PubkeyHash, ScriptBuf, Txid, WScriptHash};

    fn author() -> Address {
        Address::p2pkh(PubkeyHash::from_byte_array([7; 20]), bitcoin::Network::Bitcoin)
    }

    fn credit(tag: u8, sats: u64, script: ScriptBuf) -> Credit {
        Credit::new(
            OutPoint::new(Txid::from_byte_array([tag; 32]), 0),
            Amount::from_sat(sats),
            script,
        )
    }

    fn other_p2pkh() -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([9; 20]))
    }

    fn create_test_credits() -> Vec<Credit> {
        vec![
            credit(1, 50_000, other_p2pkh()),
            credit(2, 20_000, author().script_pubkey()),
            credit(3, 90_000, ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array([7; 32]))),
            credit(4, 80_000, author().script_pubkey()),
        ]
    }

    #[test]
    fn test_first_match() {
        let credits = create_test_credits();
        let selector = AuthoringSelector::default();

        let idx = selector.find(&credits, &author(), &Network::mainnet()).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn test_largest_amount_policy() {
        let credits = create_test_credits();
        let selector = AuthoringSelector::new(AuthoringPolicy::LargestAmount);

        let idx = selector.find(&credits, &author(), &Network::mainnet()).unwrap();
        assert_eq!(idx, 3);
    }

    #[test]
    fn test_largest_amount_tie_keeps_scan_order() {
        let credits = vec![
            credit(1, 10_000, author().script_pubkey()),
            credit(2, 10_000, author().script_pubkey()),
        ];
        let selector = AuthoringSelector::new(AuthoringPolicy::LargestAmount);

        let idx = selector.find(&credits, &author(), &Network::mainnet()).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn test_no_eligible_credit() {
        let credits = vec![credit(1, 50_000, other_p2pkh())];
        let selector = AuthoringSelector::default();

        let err = selector
            .find(&credits, &author(), &Network::mainnet())
            .unwrap_err();
        assert!(matches!(err, Error::NoEligibleCredit(_)));
    }

    #[test]
    fn test_non_p2pkh_credit_is_ignored() {
        let witness_author =
            ScriptBuf::new_p2wpkh(&bitcoin::WPubkeyHash::from_byte_array([7; 20]));
        let credits = vec![credit(1, 50_000, witness_author)];

        let err = AuthoringSelector::default()
            .find(&credits, &author(), &Network::mainnet())
            .unwrap_err();
        assert!(matches!(err, Error::NoEligibleCredit(_)));
    }

    #[test]
    fn test_select_builds_sorted_pool() {
        let credits = create_test_credits();
        let (authoring, mut pool) = AuthoringSelector::default()
            .select(credits, &author(), &Network::mainnet())
            .unwrap();

        assert_eq!(authoring.amount, Amount::from_sat(20_000));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.total_available(), Amount::from_sat(220_000));

        let order: Vec<u64> = std::iter::from_fn(|| pool.take_largest())
            .map(|c| c.amount.to_sat())
            .collect();
        assert_eq!(order, vec![90_000, 80_000, 50_000]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_select_removes_only_the_authoring_outpoint() {
        let credits = create_test_credits();
        let (authoring, mut pool) = AuthoringSelector::new(AuthoringPolicy::LargestAmount)
            .select(credits, &author(), &Network::mainnet())
            .unwrap();

        assert_eq!(authoring.outpoint.txid, Txid::from_byte_array([4; 32]));
        let rest: Vec<OutPoint> = std::iter::from_fn(|| pool.take_largest())
            .map(|c| c.outpoint)
            .collect();
        assert_eq!(rest.len(), 3);
        assert!(!rest.contains(&authoring.outpoint));
        // The smaller authoring-address credit stays available for top-up
        assert!(rest.contains(&OutPoint::new(Txid::from_byte_array([2; 32]), 0)));
    }
}
