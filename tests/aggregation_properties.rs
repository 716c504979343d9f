//! Property tests for activity aggregation and coinbase arithmetic
//!
//! The aggregation pass is the consensus-critical code path: these
//! properties pin determinism, threshold monotonicity and the strict
//! 80% boundary.

use std::collections::BTreeMap;

use proptest::prelude::*;

use motion_ledger::{ActivityReportTx, Address};
use motion_round::{aggregate, compute_coinbase};

const MAX_POINTS: u32 = 59;

fn report_from(reporter: u8, scores: Vec<(u8, u32)>) -> ActivityReportTx {
    let mut points = BTreeMap::new();
    for (addr, pts) in scores {
        points.insert(Address::from_byte(addr), pts);
    }
    ActivityReportTx {
        entry: Address::from_byte(0xEE),
        round: 0,
        reporter: Address::from_byte(reporter),
        points,
    }
}

/// Strategy: a report set of up to 7 quorum members scoring up to 10
/// participants with 0..=59 points each.
fn report_sets() -> impl Strategy<Value = Vec<ActivityReportTx>> {
    prop::collection::vec(
        prop::collection::vec((0u8..10, 0u32..=MAX_POINTS), 0..10),
        0..7,
    )
    .prop_map(|sets| {
        sets.into_iter()
            .enumerate()
            .map(|(i, scores)| report_from(100 + i as u8, scores))
            .collect()
    })
}

proptest! {
    /// Repeated aggregation of the same report set is bit-identical.
    #[test]
    fn aggregation_is_deterministic(reports in report_sets()) {
        let a = aggregate(&reports, MAX_POINTS);
        let b = aggregate(&reports, MAX_POINTS);
        prop_assert_eq!(a, b);
    }

    /// Report order never changes the result.
    #[test]
    fn aggregation_ignores_report_order(reports in report_sets()) {
        let forward = aggregate(&reports, MAX_POINTS);
        let mut reversed = reports.clone();
        reversed.reverse();
        prop_assert_eq!(forward, aggregate(&reversed, MAX_POINTS));
    }

    /// The active set only contains addresses that appear in a report.
    #[test]
    fn active_members_were_observed(reports in report_sets()) {
        let active = aggregate(&reports, MAX_POINTS);
        for address in active.addresses() {
            prop_assert!(reports.iter().any(|r| r.points.contains_key(address)));
        }
    }

    /// Raising one participant's points can move it into the set, never
    /// out of it, and never ejects anyone else.
    #[test]
    fn threshold_is_monotonic(
        reports in report_sets().prop_filter("needs a report", |r| !r.is_empty()),
        target in 0u8..10,
        boost in 1u32..=MAX_POINTS,
    ) {
        let before = aggregate(&reports, MAX_POINTS);

        let mut boosted = reports.clone();
        let addr = Address::from_byte(target);
        let entry = boosted[0].points.entry(addr).or_insert(0);
        *entry = (*entry + boost).min(MAX_POINTS);
        let after = aggregate(&boosted, MAX_POINTS);

        for address in before.addresses() {
            prop_assert!(after.contains(address));
        }
    }

    /// An exact 80% ratio is excluded; one point above qualifies.
    #[test]
    fn boundary_is_strict(nb_reports in 1usize..6) {
        // B = 10 keeps 0.8 * B * nb_R integral.
        let max = 10u32;
        let bar = 8 * nb_reports as u32;

        let spread = |total: u32| -> Vec<ActivityReportTx> {
            (0..nb_reports)
                .map(|i| {
                    let share = total / nb_reports as u32
                        + if i < (total as usize % nb_reports) { 1 } else { 0 };
                    report_from(100 + i as u8, vec![(1, share)])
                })
                .collect()
        };

        let at_bar = aggregate(&spread(bar), max);
        prop_assert!(!at_bar.contains(&Address::from_byte(1)));

        let above_bar = aggregate(&spread(bar + 1), max);
        prop_assert!(above_bar.contains(&Address::from_byte(1)));
    }

    /// The distributed coinbase never exceeds the essence and splits
    /// evenly with truncation.
    #[test]
    fn coinbase_within_reserve(
        essence in 0u64..1_000_000_000,
        percent in 0u8..=100,
        actives in 0usize..50,
    ) {
        let split = compute_coinbase(essence, percent, actives);
        prop_assert!(split.distributed <= essence);
        prop_assert_eq!(split.distributed, split.per_participant * actives as u64);
        if actives > 0 {
            // Truncation: paying one more unit each would overshoot the
            // redistribution budget.
            let budget = (u128::from(essence) * u128::from(percent)) / 100;
            let overshoot = (u128::from(split.per_participant) + 1) * actives as u128;
            prop_assert!(overshoot > budget);
        }
    }
}
