//! MOTION: a master protocol for side-protocol cryptocurrencies
//!
//! The master ledger maintains a dictionary of published side-protocols.
//! Each entry reserves a fuel budget ("essence") that the network
//! redistributes to demonstrably active actors through fixed 59-block
//! participation rounds: a deterministically selected quorum probes the
//! round's participants, validators aggregate the quorum reports into a
//! canonical active set with integer-only arithmetic, and the coinbase
//! is credited to its members.
//!
//! ## Crate Organization
//!
//! - `motion-ledger`: base-ledger abstraction, addresses and transactions
//! - `motion-registry`: the side-protocol dictionary and essence bookkeeping
//! - `motion-round`: participation rounds, quorum liveness checks,
//!   activity aggregation and coinbase distribution

// Re-export all crates for integration testing
pub use motion_ledger as ledger;
pub use motion_registry as registry;
pub use motion_round as round;

/// MOTION protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol-level constants
pub mod config {
    /// Blocks per participation round (one block per minute)
    pub const ROUND_LENGTH: u64 = motion_registry::ROUND_LENGTH;

    /// Maximum points per participant on a single quorum report
    pub const MAX_POINTS_PER_REPORT: u32 = 59;

    /// Activity threshold: a participant must answer strictly more than
    /// 80% of probes, averaged over the received reports
    pub const ACTIVITY_THRESHOLD_PERCENT: u32 = 80;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use motion_ledger::{Address, Ledger, MemoryLedger, Transaction};
    pub use motion_registry::{DictionaryEntry, DictionaryRegistry, RegistryConfig};
    pub use motion_round::{
        aggregate, ActiveSet, ActivityVerifier, Participant, ParticipationRound, Quorum,
        RoundConfig, RoundManager, RoundState,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_round_constants_align() {
        // One probe slot per block of the window.
        assert_eq!(config::ROUND_LENGTH, config::MAX_POINTS_PER_REPORT as u64);
    }
}
