//! Property-based tests for bulletin transaction funding
//!
//! Uses proptest to check conservation and selection-order invariants over
//! random credit sets, burn values and signature sizes.

use bitcoin::hashes::Hash;
use bitcoin::{Amount, PubkeyHash, ScriptBuf, TxOut};
use bulletin_core::testing::{credit_at, p2pkh_address, MemoryKeychain};
use bulletin_core::{BulletinTransactionBuilder, Credit, Error, FeePolicy};
use bulletin_params::{Network, RelayPolicy};
use proptest::prelude::*;

const HEIGHT: u32 = 500;

fn burn_outputs(values: &[u64]) -> Vec<TxOut> {
    values
        .iter()
        .map(|&sats| TxOut {
            value: Amount::from_sat(sats),
            script_pubkey: ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([0xbe; 20])),
        })
        .collect()
}

fn scenario_credits(authoring: u64, others: &[u64], network: &Network) -> Vec<Credit> {
    let author = p2pkh_address(1, network);
    let stranger = p2pkh_address(2, network);
    let mut credits = vec![credit_at(1, 0, authoring, &author, 100)];
    credits.extend(
        others
            .iter()
            .enumerate()
            .map(|(i, &sats)| credit_at(10 + i as u8, 0, sats, &stranger, 100)),
    );
    credits
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Successful builds conserve value, keep the authoring credit first and
    /// add the rest largest first.
    #[test]
    fn prop_built_transaction_invariants(
        authoring in 1u64..200_000,
        others in prop::collection::vec(1u64..100_000, 0..8),
        burns in prop::collection::vec(546u64..5_000, 1..6),
        increment in 1u64..2_000,
        sig_len in 60usize..400,
    ) {
        let network = Network::regtest();
        let author = p2pkh_address(1, &network);
        let policy = FeePolicy::new(RelayPolicy {
            fee_increment: increment,
            ..RelayPolicy::for_network(network.network_type)
        });
        let credits = scenario_credits(authoring, &others, &network);
        let signer = MemoryKeychain::new([]).with_sig_script_len(sig_len);

        let result = BulletinTransactionBuilder::new(&author, &network, &policy)
            .build(burn_outputs(&burns), credits.clone(), HEIGHT, &signer);

        match result {
            Ok(built) => {
                prop_assert_eq!(built.input_value(), built.output_value() + built.fee);
                prop_assert_eq!(&built.inputs[0], &credits[0]);

                let rest: Vec<u64> = built.inputs[1..].iter().map(|c| c.amount.to_sat()).collect();
                prop_assert!(rest.windows(2).all(|w| w[0] >= w[1]));

                let change = built.input_value() - built.total_burn - built.fee;
                match built.change_index {
                    Some(idx) => {
                        prop_assert!(change > Amount::ZERO);
                        prop_assert_eq!(built.transaction.output[idx].value, change);
                        prop_assert_eq!(
                            &built.transaction.output[idx].script_pubkey,
                            &author.script_pubkey()
                        );
                    }
                    None => prop_assert_eq!(change, Amount::ZERO),
                }

                let actual = built.transaction.total_size();
                prop_assert!(policy.fee_for_size(actual) <= built.fee);
                prop_assert!(built.fee >= policy.increment() * u64::from(built.iterations));
                prop_assert_eq!(built.transaction.input.len(), built.inputs.len());
            }
            Err(Error::InsufficientFunds { collected, required_burn, .. }) => {
                let available: u64 = credits.iter().map(|c| c.amount.to_sat()).sum();
                prop_assert_eq!(collected, Amount::from_sat(available));
                prop_assert_eq!(required_burn, Amount::from_sat(burns.iter().sum()));
            }
            Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
        }
    }

    /// A sufficiently funded authoring credit is spent alone.
    #[test]
    fn prop_rich_authoring_credit_needs_no_top_up(
        others in prop::collection::vec(1u64..100_000, 0..8),
        burn in 546u64..10_000,
    ) {
        let network = Network::regtest();
        let author = p2pkh_address(1, &network);
        let policy = FeePolicy::new(RelayPolicy {
            fee_increment: 10,
            ..RelayPolicy::for_network(network.network_type)
        });
        let credits = scenario_credits(1_000_000, &others, &network);
        let signer = MemoryKeychain::new([]);

        let built = BulletinTransactionBuilder::new(&author, &network, &policy)
            .build(burn_outputs(&[burn]), credits, HEIGHT, &signer)
            .unwrap();

        prop_assert_eq!(built.inputs.len(), 1);
        prop_assert_eq!(built.iterations, 1);
        prop_assert_eq!(built.change(), Some(Amount::from_sat(1_000_000 - burn - 10)));
    }
}
