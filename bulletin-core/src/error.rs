//! Error types for Bulletin Core
//!
//! Closed error taxonomy for building, funding and publishing a bulletin
//! transaction.

use bitcoin::Amount;
use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Bulletin Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address string could not be decoded for the configured network
    #[error("Invalid address: {0}")]
    AddressDecode(String),

    /// Address decoded but is not controlled by this wallet
    #[error("Address not owned by wallet: {0}")]
    AddressNotOwned(String),

    /// Keychain must be unlocked to sign
    #[error("Wallet is locked")]
    WalletLocked,

    /// No spendable P2PKH credit pays the authoring address
    #[error("No unspent outputs for address {0}")]
    NoEligibleCredit(String),

    /// Not enough value to cover the burn and fee
    #[error(
        "Insufficient funds: collected {} sat, required burn {} sat, required fee {} sat",
        .collected.to_sat(),
        .required_burn.to_sat(),
        .required_fee.to_sat()
    )]
    InsufficientFunds {
        /// Value of all inputs selected so far
        collected: Amount,
        /// Value committed to message outputs
        required_burn: Amount,
        /// Fee estimate at the time of failure (zero during burn funding)
        required_fee: Amount,
    },

    /// Bulletin payload rejected by the codec
    #[error("Invalid bulletin: {0}")]
    InvalidBulletin(String),

    /// Bulletin payload exceeds a length limit
    #[error("Bulletin too long: {0}")]
    BulletinTooLong(String),

    /// Negotiated fee exceeds the configured ceiling
    #[error("Fee too high: {0}")]
    FeeTooHigh(String),

    /// Amount overflow
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Transaction signing error
    #[error("Transaction signing error: {0}")]
    SignFailed(String),

    /// Transaction rejected by validation
    #[error("Invalid transaction: {0}")]
    ValidationFailed(String),

    /// Chain backend query failed
    #[error("Network error: {0}")]
    Network(String),

    /// Transaction broadcast failed
    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),

    /// Internal bookkeeping failure; details are logged, never returned
    #[error("Internal error")]
    Internal,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::AddressDecode(_)
                | Error::AddressNotOwned(_)
                | Error::WalletLocked
                | Error::NoEligibleCredit(_)
                | Error::InsufficientFunds { .. }
                | Error::InvalidBulletin(_)
                | Error::BulletinTooLong(_)
                | Error::FeeTooHigh(_)
                | Error::BroadcastFailed(_)
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::InsufficientFunds {
                collected,
                required_burn,
                required_fee,
            } => format!(
                "Not enough funds to send this bulletin: have {} sat, need {} sat to burn plus {} sat in fees.",
                collected.to_sat(),
                required_burn.to_sat(),
                required_fee.to_sat()
            ),
            Error::AddressDecode(_) => {
                "The authoring address is invalid. Please check and try again.".to_string()
            }
            Error::AddressNotOwned(addr) => {
                format!("The address {} does not belong to this wallet.", addr)
            }
            Error::WalletLocked => "Unlock the wallet before sending a bulletin.".to_string(),
            Error::NoEligibleCredit(addr) => format!(
                "The address {} has no confirmed outputs to author a bulletin from.",
                addr
            ),
            Error::BulletinTooLong(_) => "Your bulletin is too long.".to_string(),
            Error::BroadcastFailed(_) => {
                "Failed to broadcast transaction. Please try again.".to_string()
            }
            Error::Internal => "An internal wallet error occurred.".to_string(),
            _ => self.to_string(),
        }
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InsufficientFunds { .. } | Error::AmountOverflow(_) => ErrorCategory::Amount,
            Error::AddressDecode(_) | Error::AddressNotOwned(_) | Error::NoEligibleCredit(_) => {
                ErrorCategory::Address
            }
            Error::InvalidBulletin(_) | Error::BulletinTooLong(_) => ErrorCategory::Bulletin,
            Error::FeeTooHigh(_) => ErrorCategory::Fee,
            Error::SignFailed(_) | Error::ValidationFailed(_) => ErrorCategory::Transaction,
            Error::WalletLocked => ErrorCategory::Wallet,
            Error::Network(_) | Error::BroadcastFailed(_) => ErrorCategory::Network,
            Error::Config(_) => ErrorCategory::Config,
            Error::Internal | Error::Io(_) | Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Amount-related errors
    Amount,
    /// Address-related errors
    Address,
    /// Bulletin payload errors
    Bulletin,
    /// Fee-related errors
    Fee,
    /// Transaction-related errors
    Transaction,
    /// Wallet state errors
    Wallet,
    /// Network-related errors
    Network,
    /// Configuration errors
    Config,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Amount => write!(f, "Amount"),
            ErrorCategory::Address => write!(f, "Address"),
            ErrorCategory::Bulletin => write!(f, "Bulletin"),
            ErrorCategory::Fee => write!(f, "Fee"),
            ErrorCategory::Transaction => write!(f, "Transaction"),
            ErrorCategory::Wallet => write!(f, "Wallet"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

/// Failures reported by a credit store.
///
/// These never cross the public wallet boundary; the wallet logs them and
/// returns [`Error::Internal`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Inserting a transaction (credits/debits) failed
    #[error("Insert failed: {0}")]
    InsertFailed(String),

    /// Removing a previously inserted transaction failed
    #[error("Remove failed: {0}")]
    RemoveFailed(String),

    /// Reading credits failed
    #[error("Query failed: {0}")]
    Query(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shortfall() -> Error {
        Error::InsufficientFunds {
            collected: Amount::from_sat(500),
            required_burn: Amount::from_sat(1_000),
            required_fee: Amount::ZERO,
        }
    }

    #[test]
    fn test_user_error_detection() {
        assert!(shortfall().is_user_error());
        assert!(Error::AddressNotOwned("addr".to_string()).is_user_error());
        assert!(!Error::Internal.is_user_error());
        assert!(!Error::Network("test".to_string()).is_user_error());
    }

    #[test]
    fn test_insufficient_funds_message_carries_shortfall() {
        let msg = shortfall().to_string();
        assert!(msg.contains("collected 500 sat"));
        assert!(msg.contains("required burn 1000 sat"));
        assert!(msg.contains("required fee 0 sat"));

        let friendly = shortfall().user_message();
        assert!(friendly.contains("Not enough funds"));
    }

    #[test]
    fn test_internal_error_is_opaque() {
        assert_eq!(Error::Internal.to_string(), "Internal error");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(shortfall().category(), ErrorCategory::Amount);
        assert_eq!(
            Error::NoEligibleCredit("a".to_string()).category(),
            ErrorCategory::Address
        );
        assert_eq!(
            Error::BulletinTooLong("b".to_string()).category(),
            ErrorCategory::Bulletin
        );
        assert_eq!(
            Error::SignFailed("c".to_string()).category(),
            ErrorCategory::Transaction
        );
        assert_eq!(Error::Internal.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Amount.to_string(), "Amount");
        assert_eq!(ErrorCategory::Bulletin.to_string(), "Bulletin");
    }
}
