//! In-memory collaborators for tests

use crate::bulletin::{Bulletin, BulletinEncoder};
use crate::credit::Credit;
use crate::error::StoreError;
use crate::transaction::TransactionSigner;
use crate::wallet::{BlockStamp, ChainClient, CreditStore, Keychain};
use crate::{Error, Result};
use bitcoin::hashes::Hash;
use bitcoin::{
    Address, Amount, BlockHash, OutPoint, PubkeyHash, ScriptBuf, Transaction, TxOut, Txid,
};
use bulletin_params::Network;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Length of a best-case P2PKH signature script
pub const P2PKH_SIG_SCRIPT_LEN: usize = 107;

/// Deterministic P2PKH address for `tag`
pub fn p2pkh_address(tag: u8, network: &Network) -> Address {
    Address::p2pkh(
        PubkeyHash::from_byte_array([tag; 20]),
        crate::address::bitcoin_network(network),
    )
}

/// Credit of `sats` paying `address`, mined at `height`
pub fn credit_at(tag: u8, vout: u32, sats: u64, address: &Address, height: u32) -> Credit {
    Credit::new(
        OutPoint::new(Txid::from_byte_array([tag; 32]), vout),
        Amount::from_sat(sats),
        address.script_pubkey(),
    )
    .with_height(height)
}

/// Block stamp at `height`
pub fn block_stamp(height: u32) -> BlockStamp {
    BlockStamp {
        height,
        hash: BlockHash::from_byte_array([0xbb; 32]),
    }
}

/// Keychain that owns a fixed set of addresses and writes filler
/// signature scripts of a configurable length
#[derive(Debug, Clone)]
pub struct MemoryKeychain {
    owned: HashSet<Address>,
    unlocked: bool,
    sig_script_len: usize,
    fail_signing: bool,
}

impl MemoryKeychain {
    /// Unlocked keychain owning `addresses`
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            owned: addresses.into_iter().collect(),
            unlocked: true,
            sig_script_len: P2PKH_SIG_SCRIPT_LEN,
            fail_signing: false,
        }
    }

    /// Signature script length written per input
    pub fn with_sig_script_len(mut self, len: usize) -> Self {
        self.sig_script_len = len;
        self
    }

    /// Lock the keychain
    pub fn locked(mut self) -> Self {
        self.unlocked = false;
        self
    }

    /// Make every signing attempt fail
    pub fn failing(mut self) -> Self {
        self.fail_signing = true;
        self
    }
}

impl TransactionSigner for MemoryKeychain {
    fn sign_transaction(&self, tx: &mut Transaction, inputs: &[Credit]) -> Result<()> {
        if self.fail_signing {
            return Err(Error::SignFailed("signing disabled".to_string()));
        }
        if tx.input.len() != inputs.len() {
            return Err(Error::SignFailed("input count mismatch".to_string()));
        }
        for txin in &mut tx.input {
            txin.script_sig = ScriptBuf::from_bytes(vec![0x30; self.sig_script_len]);
        }
        Ok(())
    }
}

impl Keychain for MemoryKeychain {
    fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn owns_address(&self, address: &Address) -> Result<bool> {
        Ok(self.owned.contains(address))
    }
}

/// Credit store backed by vectors
#[derive(Debug, Clone, Default)]
pub struct MemoryCreditStore {
    /// Credits known to the store
    pub credits: Vec<Credit>,
    /// Recorded transactions
    pub transactions: Vec<Transaction>,
    /// Number of `mark_dirty` calls
    pub dirty_marks: usize,
    /// Fail inserts
    pub fail_insert: bool,
    /// Fail removals
    pub fail_remove: bool,
}

impl MemoryCreditStore {
    /// Store holding `credits`
    pub fn new(credits: Vec<Credit>) -> Self {
        Self {
            credits,
            ..Self::default()
        }
    }

    fn spent(&self) -> HashSet<OutPoint> {
        self.transactions
            .iter()
            .flat_map(|tx| tx.input.iter().map(|txin| txin.previous_output))
            .collect()
    }
}

impl CreditStore for MemoryCreditStore {
    fn eligible_credits(
        &self,
        min_confirmations: u32,
        stamp: &BlockStamp,
    ) -> std::result::Result<Vec<Credit>, StoreError> {
        let spent = self.spent();
        Ok(self
            .credits
            .iter()
            .filter(|c| !spent.contains(&c.outpoint))
            .filter(|c| c.confirmations(stamp.height) >= min_confirmations)
            .cloned()
            .collect())
    }

    fn insert_transaction(&mut self, tx: &Transaction) -> std::result::Result<(), StoreError> {
        if self.fail_insert {
            return Err(StoreError::InsertFailed("disk full at page 7".to_string()));
        }
        self.transactions.push(tx.clone());
        Ok(())
    }

    fn remove_transaction(&mut self, txid: &Txid) -> std::result::Result<(), StoreError> {
        if self.fail_remove {
            return Err(StoreError::RemoveFailed(txid.to_string()));
        }
        self.transactions.retain(|tx| tx.compute_txid() != *txid);
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.dirty_marks += 1;
    }
}

/// Chain client with a fixed tip that records broadcasts
#[derive(Debug, Default)]
pub struct MockChain {
    tip: u32,
    fail_broadcast: bool,
    broadcasts: Mutex<Vec<Transaction>>,
}

impl MockChain {
    /// Chain at height `tip`
    pub fn at_height(tip: u32) -> Self {
        Self {
            tip,
            ..Self::default()
        }
    }

    /// Reject every broadcast
    pub fn rejecting(mut self) -> Self {
        self.fail_broadcast = true;
        self
    }

    /// Transactions relayed so far
    pub fn broadcasts(&self) -> Vec<Transaction> {
        self.broadcasts.lock().clone()
    }
}

impl ChainClient for MockChain {
    fn block_stamp(&self) -> Result<BlockStamp> {
        Ok(block_stamp(self.tip))
    }

    fn send_raw_transaction(&self, tx: &Transaction) -> Result<Txid> {
        if self.fail_broadcast {
            return Err(Error::Network("connection refused".to_string()));
        }
        self.broadcasts.lock().push(tx.clone());
        Ok(tx.compute_txid())
    }
}

/// Encoder producing one P2PKH output of a fixed burn value
#[derive(Debug, Clone, Copy)]
pub struct FixedBurnEncoder(pub Amount);

impl BulletinEncoder for FixedBurnEncoder {
    fn encode(&self, bulletin: &Bulletin, _dust_floor: Amount, network: &Network) -> Result<Vec<TxOut>> {
        bulletin.validate()?;
        crate::address::decode_address(&bulletin.author, network)?;
        Ok(vec![TxOut {
            value: self.0,
            script_pubkey: ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([0xee; 20])),
        }])
    }
}
