//! Participation-round error types

use thiserror::Error;

use motion_ledger::{Address, LedgerError};
use motion_registry::RegistryError;

/// Errors raised during a participation round's lifecycle
///
/// Everything here except `ConsensusDivergence` is a local, recoverable
/// condition reported to the transaction submitter; none of them halts
/// the round lifecycle itself.
#[derive(Error, Debug)]
pub enum RoundError {
    /// Registration attempted outside the open window
    #[error("Round {round} is not open for registration (state: {state})")]
    RoundNotOpen { round: u64, state: &'static str },

    /// Address already registered for this round
    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(Address),

    /// Quorum already locked; registration window closed
    #[error("Registration closed for round {0}")]
    RegistrationClosed(u64),

    /// Report arrived at or after the round's close height
    #[error("Stale report for round {round} at height {height}")]
    StaleReport { round: u64, height: u64 },

    /// Reporter is not a member of the round's quorum
    #[error("Not a quorum member: {0}")]
    NotQuorumMember(Address),

    /// Quorum member already reported for this round
    #[error("Duplicate report from {0}")]
    DuplicateReport(Address),

    /// Report carries a point total above the per-report maximum
    #[error("Invalid report: {participant} scored {points}, maximum {max}")]
    InvalidReport {
        participant: Address,
        points: u32,
        max: u32,
    },

    /// Fewer eligible actors than the configured quorum size
    ///
    /// Non-fatal: the round closes with an empty active set instead of
    /// blocking progress.
    #[error("Insufficient actor pool: {available} available, {required} required")]
    InsufficientActorPool { available: usize, required: usize },

    /// Computed coinbase total exceeds the entry's remaining essence
    ///
    /// Non-fatal: the round closes with zero distribution (all or
    /// nothing, never a partial payment).
    #[error("Essence exhausted: need {required}, have {available}")]
    EssenceExhausted { required: u64, available: u64 },

    /// Illegal state-machine transition
    #[error("Invalid transition for round {round}: {from} -> {to} at height {height}")]
    InvalidTransition {
        round: u64,
        from: &'static str,
        to: &'static str,
        height: u64,
    },

    /// No round tracked for the entry
    #[error("No active round for entry {0}")]
    UnknownEntry(Address),

    /// Validators computed different active sets from the same report set
    ///
    /// Protocol-fatal: indicates a non-deterministic implementation, not
    /// a recoverable runtime condition. Must block finalization.
    #[error("Consensus divergence on active set for round {round} of entry {entry}")]
    ConsensusDivergence { entry: Address, round: u64 },

    /// Registry failure
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Ledger failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Participation-round result type
pub type RoundResult<T> = Result<T, RoundError>;
