//! Coinbase distribution
//!
//! Once a round's active set is agreed, the entry's essence funds one
//! coinbase credit per active participant:
//!
//! ```text
//! total           = essence * redistribution_percent / 100
//! per_participant = total / n
//! ```
//!
//! Integer truncation in that fixed order (multiply before divide, u128
//! intermediates) keeps the amounts reproducible on every node. The
//! distributed total is debited from the entry's essence exactly once
//! per round; payment is all-or-nothing.

use tracing::{info, warn};

use motion_ledger::{Address, CoinbaseTx, Ledger, Transaction};
use motion_registry::DictionaryRegistry;

use crate::aggregate::ActiveSet;
use crate::{RoundError, RoundResult};

/// Result of the coinbase computation for one round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoinbaseSplit {
    /// Amount credited to each active participant
    pub per_participant: u64,
    /// Total debited from essence (`per_participant * n`)
    pub distributed: u64,
}

/// Compute the per-participant coinbase for a round
///
/// Returns a zero split when the active set is empty or the
/// redistribution rounds down to nothing; the reserved amount then
/// stays in essence.
pub fn compute_coinbase(essence: u64, redistribution_percent: u8, active_count: usize) -> CoinbaseSplit {
    if active_count == 0 {
        return CoinbaseSplit {
            per_participant: 0,
            distributed: 0,
        };
    }

    let total = u128::from(essence) * u128::from(redistribution_percent) / 100;
    let per = total / active_count as u128;
    let distributed = per * active_count as u128;

    // essence and percent <= 100 bound the result within u64.
    CoinbaseSplit {
        per_participant: per as u64,
        distributed: distributed as u64,
    }
}

/// Emits a round's coinbase transactions and settles the entry's essence
pub struct CoinbaseDistributor {
    ledger: std::sync::Arc<dyn Ledger>,
    registry: std::sync::Arc<DictionaryRegistry>,
}

impl CoinbaseDistributor {
    /// Create a distributor over ledger and registry handles
    pub fn new(
        ledger: std::sync::Arc<dyn Ledger>,
        registry: std::sync::Arc<DictionaryRegistry>,
    ) -> Self {
        Self { ledger, registry }
    }

    /// Distribute one round's coinbase to the active set
    ///
    /// `essence_at_open` is the value recorded when the round opened;
    /// the remaining essence is re-read at distribution time and the
    /// whole payment is refused (`EssenceExhausted`) if it cannot cover
    /// the computed total. An empty active set distributes nothing and
    /// leaves essence untouched.
    pub fn distribute(
        &self,
        entry: &Address,
        round: u64,
        essence_at_open: u64,
        redistribution_percent: u8,
        active_set: &ActiveSet,
    ) -> RoundResult<CoinbaseSplit> {
        let split = compute_coinbase(essence_at_open, redistribution_percent, active_set.len());
        if split.distributed == 0 {
            return Ok(split);
        }

        let available = self.registry.essence(entry)?;
        if split.distributed > available {
            warn!(
                entry = %entry.short(),
                round,
                required = split.distributed,
                available,
                "essence exhausted, closing round without distribution"
            );
            return Err(RoundError::EssenceExhausted {
                required: split.distributed,
                available,
            });
        }

        // Single essence debit per round, before any credit is emitted.
        self.registry.debit_essence(entry, split.distributed)?;

        for beneficiary in active_set.addresses() {
            self.ledger.append(Transaction::Coinbase(CoinbaseTx {
                entry: *entry,
                round,
                beneficiary: *beneficiary,
                amount: split.per_participant,
            }))?;
        }

        info!(
            entry = %entry.short(),
            round,
            active = active_set.len(),
            per_participant = split.per_participant,
            distributed = split.distributed,
            "coinbase distributed"
        );
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_active_set_distributes_nothing() {
        let split = compute_coinbase(1000, 10, 0);
        assert_eq!(split.distributed, 0);
    }

    #[test]
    fn test_whitepaper_formula() {
        // essence 1000, 10%, one active participant -> 100
        let split = compute_coinbase(1000, 10, 1);
        assert_eq!(split.per_participant, 100);
        assert_eq!(split.distributed, 100);
    }

    #[test]
    fn test_truncation_direction() {
        // essence 50, 100%, three actives: floor(50/3) = 16 each,
        // 48 distributed, 2 left in essence.
        let split = compute_coinbase(50, 100, 3);
        assert_eq!(split.per_participant, 16);
        assert_eq!(split.distributed, 48);
    }

    #[test]
    fn test_multiply_before_divide() {
        // 7 * 50 / 100 = 3 (not 7 * 0 after truncating the percent).
        let split = compute_coinbase(7, 50, 1);
        assert_eq!(split.per_participant, 3);
    }

    #[test]
    fn test_no_overflow_at_extremes() {
        let split = compute_coinbase(u64::MAX, 100, 1);
        assert_eq!(split.per_participant, u64::MAX);
    }

    #[test]
    fn test_distributed_never_exceeds_reserve() {
        for essence in [0u64, 1, 49, 50, 999, 1000] {
            for percent in [0u8, 1, 10, 99, 100] {
                for n in [1usize, 2, 3, 7] {
                    let split = compute_coinbase(essence, percent, n);
                    assert!(split.distributed <= essence);
                    assert_eq!(split.distributed, split.per_participant * n as u64);
                }
            }
        }
    }
}
