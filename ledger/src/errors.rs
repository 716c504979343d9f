//! Ledger error types

use thiserror::Error;

use crate::Address;

/// Ledger result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur when interacting with the ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Account balance too low for the requested debit
    #[error("Insufficient balance for {address}: have {available}, need {required}")]
    InsufficientBalance {
        address: Address,
        available: u64,
        required: u64,
    },

    /// No account exists at the address
    #[error("Unknown address: {0}")]
    UnknownAddress(Address),

    /// Transaction could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
