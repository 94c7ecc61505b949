//! Bulletin sending
//!
//! `BulletinWallet` owns the account state (keychain and credit store)
//! behind one mutex. Each send holds it for the whole build so two sends can
//! never pick the same credit.

use crate::address::decode_address;
use crate::bulletin::{Bulletin, BulletinCodec, BulletinEncoder};
use crate::config::SendConfig;
use crate::credit::Credit;
use crate::error::StoreError;
use crate::fees::FeePolicy;
use crate::transaction::{BuiltTransaction, BulletinTransactionBuilder, TransactionSigner};
use crate::validation::{StandardValidator, TransactionValidator};
use crate::{Error, Result};
use bitcoin::{Address, Amount, BlockHash, Transaction, Txid};
use bulletin_params::Network;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Chain tip used as the reference height of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStamp {
    /// Block height
    pub height: u32,
    /// Block hash
    pub hash: BlockHash,
}

/// Key custody for the account
pub trait Keychain: TransactionSigner {
    /// Whether private keys are available for signing
    fn is_unlocked(&self) -> bool;

    /// Whether the account controls `address`
    fn owns_address(&self, address: &Address) -> Result<bool>;
}

/// The account's view of its unspent outputs and transaction history
pub trait CreditStore {
    /// Credits with at least `min_confirmations` at `stamp`
    fn eligible_credits(
        &self,
        min_confirmations: u32,
        stamp: &BlockStamp,
    ) -> std::result::Result<Vec<Credit>, StoreError>;

    /// Record a sent transaction, adding its debits
    fn insert_transaction(&mut self, tx: &Transaction) -> std::result::Result<(), StoreError>;

    /// Forget a recorded transaction
    fn remove_transaction(&mut self, txid: &Txid) -> std::result::Result<(), StoreError>;

    /// Flag cached balances for recomputation
    fn mark_dirty(&mut self);
}

/// Connection to a node
pub trait ChainClient {
    /// Current chain tip
    fn block_stamp(&self) -> Result<BlockStamp>;

    /// Relay a transaction, returning its id
    fn send_raw_transaction(&self, tx: &Transaction) -> Result<Txid>;
}

/// Request to publish a bulletin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBulletinRequest {
    /// Authoring address
    pub address: String,
    /// Board identifier
    pub board: String,
    /// Message text
    pub message: String,
}

/// Result of publishing a bulletin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBulletinResponse {
    /// Transaction id (hex)
    pub txid: String,
}

struct Account<K, S> {
    keychain: K,
    store: S,
}

/// Wallet that builds and publishes bulletin transactions
pub struct BulletinWallet<K, S, C> {
    account: Mutex<Account<K, S>>,
    chain: C,
    config: SendConfig,
    network: Network,
    fee_policy: FeePolicy,
    encoder: Box<dyn BulletinEncoder + Send + Sync>,
    validator: Box<dyn TransactionValidator + Send + Sync>,
}

impl<K, S, C> BulletinWallet<K, S, C>
where
    K: Keychain,
    S: CreditStore,
    C: ChainClient,
{
    /// Create a wallet over the given collaborators
    pub fn new(keychain: K, store: S, chain: C, config: SendConfig) -> Result<Self> {
        config.validate()?;
        let network = config.network_params();
        let fee_policy = FeePolicy::new(config.relay_policy());
        let validator = StandardValidator::new(&network);

        Ok(Self {
            account: Mutex::new(Account { keychain, store }),
            chain,
            config,
            network,
            fee_policy,
            encoder: Box::new(BulletinCodec::new()),
            validator: Box::new(validator),
        })
    }

    /// Replace the bulletin encoder
    pub fn with_encoder(mut self, encoder: impl BulletinEncoder + Send + Sync + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Replace the transaction validator
    pub fn with_validator(
        mut self,
        validator: impl TransactionValidator + Send + Sync + 'static,
    ) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Network profile
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Fee policy in force
    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fee_policy
    }

    /// Run `f` with the account locked
    pub fn with_account<R>(&self, f: impl FnOnce(&K, &S) -> R) -> R {
        let account = self.account.lock();
        f(&account.keychain, &account.store)
    }

    /// Build, sign and validate a bulletin transaction without recording or
    /// broadcasting it.
    pub fn create_bulletin_transaction(
        &self,
        request: &SendBulletinRequest,
    ) -> Result<BuiltTransaction> {
        let account = self.account.lock();
        self.build_locked(&account, request)
    }

    /// Publish a bulletin: build, sign, validate, record, broadcast.
    pub fn send_bulletin(&self, request: &SendBulletinRequest) -> Result<SendBulletinResponse> {
        tracing::trace!("Starting send");
        // Rapid requests serialize here
        let mut account = self.account.lock();
        tracing::trace!("Grabbed wallet lock");

        let built = self.build_locked(&account, request)?;
        let tx = &built.transaction;
        let txid = tx.compute_txid();

        tracing::trace!("Inserting new tx {} into the store", txid);
        if let Err(e) = account.store.insert_transaction(tx) {
            tracing::error!("Error adding sent tx history: {}", e);
            return Err(Error::Internal);
        }
        account.store.mark_dirty();

        match self.chain.send_raw_transaction(tx) {
            Ok(sent) => {
                tracing::info!("Successfully sent bulletin {}", sent);
                Ok(SendBulletinResponse {
                    txid: sent.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!("Broadcast of {} failed, rolling back: {}", txid, e);
                if let Err(rollback) = account.store.remove_transaction(&txid) {
                    tracing::error!(
                        "Failed to roll back unbroadcast tx {}: {}; store needs reconciliation",
                        txid,
                        rollback
                    );
                }
                account.store.mark_dirty();

                Err(match e {
                    Error::BroadcastFailed(_) => e,
                    other => Error::BroadcastFailed(other.to_string()),
                })
            }
        }
    }

    fn build_locked(
        &self,
        account: &Account<K, S>,
        request: &SendBulletinRequest,
    ) -> Result<BuiltTransaction> {
        if !account.keychain.is_unlocked() {
            return Err(Error::WalletLocked);
        }

        let author = decode_address(&request.address, &self.network)?;
        if !account.keychain.owns_address(&author)? {
            tracing::trace!("The address is not in the keychain");
            return Err(Error::AddressNotOwned(author.to_string()));
        }

        let stamp = self.chain.block_stamp()?;

        tracing::trace!("Looking into eligible outputs at height {}", stamp.height);
        let eligible = account
            .store
            .eligible_credits(self.config.min_confirmations, &stamp)
            .map_err(|e| {
                tracing::error!("Error reading eligible credits: {}", e);
                Error::Internal
            })?;

        let bulletin = Bulletin::new(
            request.address.clone(),
            request.board.clone(),
            request.message.clone(),
        )?;
        let dust_floor = Amount::from_sat(self.fee_policy.relay().dust_floor);
        let message_outputs = self.encoder.encode(&bulletin, dust_floor, &self.network)?;

        let built = BulletinTransactionBuilder::new(&author, &self.network, &self.fee_policy)
            .with_size_model(self.config.size_model)
            .with_authoring_policy(self.config.authoring_policy)
            .build(message_outputs, eligible, stamp.height, &account.keychain)?;

        self.validator.validate(&built.transaction, &built.inputs)?;

        tracing::debug!(
            "Built bulletin tx {}: {} inputs, burn {} sat, fee {} sat",
            built.txid(),
            built.inputs.len(),
            built.total_burn.to_sat(),
            built.fee.to_sat()
        );

        Ok(built)
    }
}
