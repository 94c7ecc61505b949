//! Bulletin wallet core
//!
//! Builds, funds, fee-balances and publishes a transaction that embeds a
//! short message ("bulletin") in its outputs. The authoring credit is always
//! the first input; further inputs are chosen largest first, and the fee is
//! renegotiated until it covers the real signed size.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod bulletin;
pub mod config;
pub mod credit;
pub mod error;
pub mod fees;
pub mod selection;
pub mod transaction;
pub mod validation;
pub mod wallet;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use address::{bitcoin_network, decode_address, ScriptClass};
pub use bulletin::{decode_bulletin, Bulletin, BulletinCodec, BulletinEncoder, WireBulletin};
pub use config::SendConfig;
pub use credit::Credit;
pub use error::{Error, ErrorCategory, Result, StoreError};
pub use fees::{FeePolicy, SizeModel};
pub use selection::{AuthoringPolicy, AuthoringSelector, CreditPool};
pub use transaction::{
    BuiltTransaction, BulletinTransactionBuilder, PendingTransaction, TransactionSigner,
};
pub use validation::{StandardValidator, TransactionValidator};
pub use wallet::{
    BlockStamp, BulletinWallet, ChainClient, CreditStore, Keychain, SendBulletinRequest,
    SendBulletinResponse,
};
