//! Participation-round consensus
//!
//! For every published dictionary entry, the network runs one
//! participation round per 59-block window. A deterministically selected
//! quorum probes the round's registered participants once per minute and
//! reports a point tally; validators merge the reports into a canonical
//! active set and distribute the entry's coinbase to its members.
//!
//! The single safety-critical property is cross-validator agreement:
//! given the same report set, every node must compute a bit-identical
//! active set. All aggregation and reward arithmetic is therefore
//! integer-only.

pub mod aggregate;
pub mod coinbase;
pub mod errors;
pub mod manager;
pub mod quorum;
pub mod round;
pub mod verifier;

pub use aggregate::{aggregate, verify_agreement, ActiveSet};
pub use coinbase::{compute_coinbase, CoinbaseDistributor, CoinbaseSplit};
pub use errors::{RoundError, RoundResult};
pub use manager::{RoundEvent, RoundManager};
pub use quorum::{derive_seed, select_quorum, Quorum};
pub use round::{Participant, ParticipationRound, RoundState};
pub use verifier::{ActivityVerifier, Prober, ReportBuilder};

use std::time::Duration;

/// Participation-round configuration
#[derive(Clone, Debug)]
pub struct RoundConfig {
    /// Round length in blocks (one block per minute on the base ledger)
    pub round_length: u64,
    /// Maximum points one quorum member can award one participant,
    /// i.e. the number of probe slots in a window
    pub points_per_report: u32,
    /// Number of quorum members selected per round
    pub quorum_size: usize,
    /// Blocks after round open during which registration stays accepted;
    /// the quorum locks once this window elapses
    pub registration_window: u64,
    /// Cadence between probe slots
    pub probe_interval: Duration,
    /// Recent finalized headers mixed into the quorum seed
    pub seed_header_count: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            round_length: 59,
            points_per_report: 59,
            quorum_size: 5,
            registration_window: 1,
            probe_interval: Duration::from_secs(60),
            seed_header_count: 8,
        }
    }
}

impl RoundConfig {
    /// Set the quorum size
    pub fn with_quorum_size(mut self, size: usize) -> Self {
        self.quorum_size = size;
        self
    }

    /// Set the probe cadence (tests shrink this to milliseconds)
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Set the registration window
    pub fn with_registration_window(mut self, blocks: u64) -> Self {
        self.registration_window = blocks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RoundConfig::default();
        assert_eq!(config.round_length, 59);
        assert_eq!(config.points_per_report, 59);
        assert!(config.registration_window < config.round_length);
    }
}
