//! Activity verification
//!
//! Each quorum member independently probes every registered participant
//! once per slot (one minute nominal) for the whole window. A response
//! inside the probe timeout scores one point; a timeout or malformed
//! reply scores zero. There is no partial credit and no coordination
//! between quorum members while probing; their loops run as independent
//! tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use motion_ledger::{ActivityReportTx, Address};

use crate::round::Participant;
use crate::RoundConfig;

/// Issues one liveness probe against a participant
///
/// Implementations own the transport and its timeout; `probe` returns
/// whether a well-formed response arrived in time.
pub trait Prober: Send + Sync {
    /// Probe one participant once
    fn probe(&self, target: &Participant) -> bool;
}

/// Accumulates one quorum member's point tally for a round
#[derive(Clone, Debug)]
pub struct ReportBuilder {
    entry: Address,
    round: u64,
    reporter: Address,
    max_points: u32,
    points: BTreeMap<Address, u32>,
}

impl ReportBuilder {
    /// Start an empty tally
    pub fn new(entry: Address, round: u64, reporter: Address, max_points: u32) -> Self {
        Self {
            entry,
            round,
            reporter,
            max_points,
            points: BTreeMap::new(),
        }
    }

    /// Record one probe outcome for a participant
    ///
    /// A response adds one point up to the per-report maximum; a missed
    /// probe still records the participant as observed with its current
    /// tally.
    pub fn record(&mut self, participant: Address, responded: bool) {
        let entry = self.points.entry(participant).or_insert(0);
        if responded && *entry < self.max_points {
            *entry += 1;
        }
    }

    /// Current points for a participant
    pub fn points_for(&self, participant: &Address) -> u32 {
        self.points.get(participant).copied().unwrap_or(0)
    }

    /// Finish the tally as a report transaction
    pub fn build(self) -> ActivityReportTx {
        ActivityReportTx {
            entry: self.entry,
            round: self.round,
            reporter: self.reporter,
            points: self.points,
        }
    }
}

/// Drives probe windows for quorum members
#[derive(Clone)]
pub struct ActivityVerifier {
    config: RoundConfig,
}

impl ActivityVerifier {
    /// Create a verifier with the given round configuration
    pub fn new(config: RoundConfig) -> Self {
        Self { config }
    }

    /// Run one quorum member's probe window over the participants
    ///
    /// Issues `points_per_report` probe slots on the configured cadence,
    /// probing every participant once per slot, and returns the member's
    /// report. Probe order within a slot is unspecified; only the
    /// cadence and the window length are contractual.
    pub async fn run_probe_window(
        &self,
        reporter: Address,
        entry: Address,
        round: u64,
        participants: Vec<Participant>,
        prober: Arc<dyn Prober>,
    ) -> ActivityReportTx {
        let slots = self.config.points_per_report;
        let mut builder = ReportBuilder::new(entry, round, reporter, slots);
        let mut ticker = tokio::time::interval(self.config.probe_interval);

        for slot in 0..slots {
            ticker.tick().await;
            for participant in &participants {
                let responded = prober.probe(participant);
                builder.record(participant.address, responded);
            }
            debug!(
                reporter = %reporter.short(),
                round,
                slot,
                "probe slot complete"
            );
        }

        builder.build()
    }

    /// Run the full quorum concurrently, one independent task per member
    ///
    /// Returns the reports of the members whose windows completed. A
    /// member whose task fails submits nothing; its absence reduces the
    /// report count used by aggregation.
    pub async fn run_quorum(
        &self,
        members: Vec<(Address, Arc<dyn Prober>)>,
        entry: Address,
        round: u64,
        participants: Vec<Participant>,
    ) -> Vec<ActivityReportTx> {
        let mut tasks = JoinSet::new();
        for (reporter, prober) in members {
            let verifier = self.clone();
            let participants = participants.clone();
            tasks.spawn(async move {
                verifier
                    .run_probe_window(reporter, entry, round, participants, prober)
                    .await
            });
        }

        let mut reports = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => warn!(round, error = %e, "quorum member probe window failed"),
            }
        }
        reports
    }
}
