//! Activity aggregation
//!
//! Merges the independent quorum reports of one round into the canonical
//! active set. Every validating node must compute a bit-identical result
//! from the same report set, so the threshold test uses integer
//! cross-multiplication only: a participant with summed points `P` over
//! `nb_R` reports is active iff
//!
//! ```text
//! P / nb_R > 0.8 * B      <=>      P * 10 > 8 * B * nb_R
//! ```
//!
//! with `B` the per-report point maximum (59). The comparison is strict:
//! a ratio of exactly 0.8 is excluded. Floating point is forbidden here;
//! platform rounding differences would break cross-validator agreement.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use motion_ledger::{ActivityReportTx, Address};

use crate::{RoundError, RoundResult};

/// Numerator of the fixed activity threshold (8/10 = 80%)
const THRESHOLD_NUM: u128 = 8;
/// Denominator of the fixed activity threshold
const THRESHOLD_DEN: u128 = 10;

/// The participants judged sufficiently active for one round
///
/// Always ordered by address; equality of two active sets is equality
/// of the consensus result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSet {
    addresses: Vec<Address>,
}

impl ActiveSet {
    /// The empty active set
    pub fn empty() -> Self {
        Self { addresses: Vec::new() }
    }

    /// Member addresses in address order
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Whether an address qualified
    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.binary_search(address).is_ok()
    }

    /// Number of active participants
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether no participant qualified
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Aggregate a frozen report set into the active set
///
/// Single deterministic pass: sums points per participant across all
/// reports, then applies the strict 80% threshold against
/// `max_points * nb_R`. An absent quorum member contributes no report
/// and simply reduces `nb_R`; it is never treated as an all-zero
/// report. With zero reports the active set is empty.
pub fn aggregate(reports: &[ActivityReportTx], max_points: u32) -> ActiveSet {
    let nb_reports = reports.len() as u128;
    if nb_reports == 0 {
        return ActiveSet::empty();
    }

    let mut totals: BTreeMap<Address, u128> = BTreeMap::new();
    for report in reports {
        for (address, points) in &report.points {
            *totals.entry(*address).or_insert(0) += u128::from(*points);
        }
    }

    let bar = THRESHOLD_NUM * u128::from(max_points) * nb_reports;
    let addresses = totals
        .into_iter()
        .filter(|(_, total)| total * THRESHOLD_DEN > bar)
        .map(|(address, _)| address)
        .collect();

    ActiveSet { addresses }
}

/// Check agreement between the locally computed active set and one
/// observed from a peer validator for the same report set
///
/// Divergence is protocol-fatal: it means an implementation aggregated
/// non-deterministically. It must be surfaced and block finalization,
/// never be resolved silently.
pub fn verify_agreement(
    entry: &Address,
    round: u64,
    local: &ActiveSet,
    observed: &ActiveSet,
) -> RoundResult<()> {
    if local != observed {
        return Err(RoundError::ConsensusDivergence {
            entry: *entry,
            round,
        });
    }
    Ok(())
}
