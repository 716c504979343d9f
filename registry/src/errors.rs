//! Registry error types

use thiserror::Error;

use motion_ledger::{Address, LedgerError};

/// Registry result type
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised by the dictionary registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// An entry already exists for the creator address
    #[error("Duplicate entry for creator {0}")]
    DuplicateEntry(Address),

    /// Fuel below the configured publication minimum
    #[error("Insufficient fuel: provided {provided}, minimum {minimum}")]
    InsufficientFuel { provided: u64, minimum: u64 },

    /// No entry registered at the address
    #[error("Entry not found: {0}")]
    EntryNotFound(Address),

    /// Redistribution percent outside 0..=100
    #[error("Invalid redistribution percent: {0}")]
    InvalidRedistribution(u8),

    /// Essence debit larger than the remaining reserve
    #[error("Essence underflow for {entry}: have {available}, need {required}")]
    EssenceUnderflow {
        entry: Address,
        available: u64,
        required: u64,
    },

    /// Underlying ledger failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
