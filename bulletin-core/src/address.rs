//! Address decoding and script classification
//!
//! Every function takes the network explicitly; nothing here reads a
//! process-wide network setting.

use crate::{Error, Result};
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Script};
use bulletin_params::{Network, NetworkType};
use std::fmt;

/// Map a network profile onto the ledger library's network.
pub fn bitcoin_network(network: &Network) -> bitcoin::Network {
    match network.network_type {
        NetworkType::Mainnet => bitcoin::Network::Bitcoin,
        NetworkType::Testnet => bitcoin::Network::Testnet,
        NetworkType::Signet => bitcoin::Network::Signet,
        NetworkType::Regtest => bitcoin::Network::Regtest,
    }
}

/// Decode an address string and require it to belong to `network`.
pub fn decode_address(address: &str, network: &Network) -> Result<Address> {
    let unchecked: Address<NetworkUnchecked> = address
        .trim()
        .parse()
        .map_err(|e| Error::AddressDecode(format!("{}: {}", address, e)))?;

    unchecked
        .require_network(bitcoin_network(network))
        .map_err(|e| Error::AddressDecode(format!("{}: {}", address, e)))
}

/// Standard script template of an output script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptClass {
    /// Pay-to-public-key-hash
    PubKeyHash,
    /// Pay-to-script-hash
    ScriptHash,
    /// Version 0 witness public key hash
    WitnessPubKeyHash,
    /// Version 0 witness script hash
    WitnessScriptHash,
    /// Taproot
    Taproot,
    /// Provably unspendable data carrier
    NullData,
    /// Anything else
    NonStandard,
}

impl ScriptClass {
    /// Classify an output script
    pub fn classify(script: &Script) -> Self {
        if script.is_p2pkh() {
            ScriptClass::PubKeyHash
        } else if script.is_p2sh() {
            ScriptClass::ScriptHash
        } else if script.is_p2wpkh() {
            ScriptClass::WitnessPubKeyHash
        } else if script.is_p2wsh() {
            ScriptClass::WitnessScriptHash
        } else if script.is_p2tr() {
            ScriptClass::Taproot
        } else if script.is_op_return() {
            ScriptClass::NullData
        } else {
            ScriptClass::NonStandard
        }
    }
}

impl fmt::Display for ScriptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptClass::PubKeyHash => "pubkeyhash",
            ScriptClass::ScriptHash => "scripthash",
            ScriptClass::WitnessPubKeyHash => "witness_v0_keyhash",
            ScriptClass::WitnessScriptHash => "witness_v0_scripthash",
            ScriptClass::Taproot => "witness_v1_taproot",
            ScriptClass::NullData => "nulldata",
            ScriptClass::NonStandard => "nonstandard",
        };
        f.write_str(name)
    }
}

/// Addresses an output script pays to under `network` (empty if none).
pub fn script_addresses(script: &Script, network: &Network) -> Vec<Address> {
    Address::from_script(script, bitcoin_network(network))
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::ScriptBuf;

    const MAINNET_P2PKH: &str = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";

    fn testnet_p2pkh() -> String {
        use bitcoin::hashes::Hash;
        Address::p2pkh(
            bitcoin::PubkeyHash::from_byte_array([0x42; 20]),
            bitcoin::Network::Testnet,
        )
        .to_string()
    }

    #[test]
    fn test_decode_mainnet_address() {
        let addr = decode_address(MAINNET_P2PKH, &Network::mainnet()).unwrap();
        assert_eq!(addr.to_string(), MAINNET_P2PKH);
        assert_eq!(
            ScriptClass::classify(&addr.script_pubkey()),
            ScriptClass::PubKeyHash
        );
    }

    #[test]
    fn test_decode_rejects_wrong_network() {
        let err = decode_address(MAINNET_P2PKH, &Network::testnet()).unwrap_err();
        assert!(matches!(err, Error::AddressDecode(_)));

        let testnet = testnet_p2pkh();
        assert!(decode_address(&testnet, &Network::testnet()).is_ok());
        assert!(decode_address(&testnet, &Network::regtest()).is_ok());
        assert!(decode_address(&testnet, &Network::mainnet()).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_address("not-an-address", &Network::mainnet()).unwrap_err();
        assert!(matches!(err, Error::AddressDecode(_)));
    }

    #[test]
    fn test_script_addresses_round_trip() {
        let addr = decode_address(MAINNET_P2PKH, &Network::mainnet()).unwrap();
        let addrs = script_addresses(&addr.script_pubkey(), &Network::mainnet());
        assert_eq!(addrs, vec![addr]);
    }

    #[test]
    fn test_classify_null_data() {
        let script = ScriptBuf::from_bytes(vec![0x6a, 0x03, 1, 2, 3]);
        assert_eq!(ScriptClass::classify(&script), ScriptClass::NullData);
        assert!(script_addresses(&script, &Network::mainnet()).is_empty());
        assert_eq!(ScriptClass::NullData.to_string(), "nulldata");
    }
}
