//! Per-entry participation round state machine
//!
//! One round covers exactly 59 blocks. Its lifecycle is
//! `Scheduled -> Open -> QuorumLocked -> Closed`; the quorum locks
//! strictly before any probing starts so a participant cannot collude
//! with a quorum member it predicted, and the round closes never early.
//! Transitions tolerate a delayed driver: opening and closing are legal
//! at any height at or past their scheduled one, while report staleness
//! stays keyed to the fixed end height.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use motion_ledger::{ActivityReportTx, Address};

use crate::aggregate::{aggregate, ActiveSet};
use crate::quorum::Quorum;
use crate::{RoundError, RoundResult};

/// Lifecycle state of a participation round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    /// Created, waiting for its start height
    Scheduled,
    /// Accepting participant registrations
    Open,
    /// Quorum fixed, probing in progress, reports accepted
    QuorumLocked,
    /// Closed at end height; immutable apart from archival
    Closed,
}

impl RoundState {
    /// State name for errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            RoundState::Scheduled => "scheduled",
            RoundState::Open => "open",
            RoundState::QuorumLocked => "quorum_locked",
            RoundState::Closed => "closed",
        }
    }
}

/// An actor registered for one round of one entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Public address on the base ledger
    pub address: Address,
    /// Reachable IP for liveness probes
    pub ip: IpAddr,
}

/// One participation round of one dictionary entry
#[derive(Clone, Debug)]
pub struct ParticipationRound {
    /// Entry the round belongs to
    pub entry: Address,
    /// Sequence number, contiguous from 0 per entry
    pub sequence: u64,
    /// First block of the window
    pub start_height: u64,
    /// Close height: start + round length
    pub end_height: u64,
    state: RoundState,
    /// Registered participants, keyed by address for deterministic order
    participants: BTreeMap<Address, Participant>,
    quorum: Option<Quorum>,
    reports: Vec<ActivityReportTx>,
    active_set: Option<ActiveSet>,
    /// Total coinbase paid out at close
    pub distributed: u64,
}

impl ParticipationRound {
    /// Schedule a round starting at `start_height`
    pub fn scheduled(entry: Address, sequence: u64, start_height: u64, round_length: u64) -> Self {
        Self {
            entry,
            sequence,
            start_height,
            end_height: start_height + round_length,
            state: RoundState::Scheduled,
            participants: BTreeMap::new(),
            quorum: None,
            reports: Vec::new(),
            active_set: None,
            distributed: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Registered participants in address order
    pub fn participants(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    /// Registered participant addresses in address order
    pub fn participant_addresses(&self) -> Vec<Address> {
        self.participants.keys().copied().collect()
    }

    /// The locked quorum, if selection has happened
    pub fn quorum(&self) -> Option<&Quorum> {
        self.quorum.as_ref()
    }

    /// Reports received so far
    pub fn reports(&self) -> &[ActivityReportTx] {
        &self.reports
    }

    /// The final active set, present once closed
    pub fn active_set(&self) -> Option<&ActiveSet> {
        self.active_set.as_ref()
    }

    /// `Scheduled -> Open` at or after the round's start height
    pub fn open(&mut self, height: u64) -> RoundResult<()> {
        if self.state != RoundState::Scheduled || height < self.start_height {
            return Err(RoundError::InvalidTransition {
                round: self.sequence,
                from: self.state.name(),
                to: "open",
                height,
            });
        }
        self.state = RoundState::Open;
        debug!(
            entry = %self.entry.short(),
            round = self.sequence,
            height,
            "round open"
        );
        Ok(())
    }

    /// Register a participant while the round is open
    pub fn register(&mut self, participant: Participant) -> RoundResult<()> {
        match self.state {
            RoundState::Open => {}
            RoundState::QuorumLocked => {
                return Err(RoundError::RegistrationClosed(self.sequence));
            }
            _ => {
                return Err(RoundError::RoundNotOpen {
                    round: self.sequence,
                    state: self.state.name(),
                });
            }
        }

        if self.participants.contains_key(&participant.address) {
            return Err(RoundError::DuplicateRegistration(participant.address));
        }

        debug!(
            entry = %self.entry.short(),
            round = self.sequence,
            participant = %participant.address.short(),
            "participant registered"
        );
        self.participants.insert(participant.address, participant);
        Ok(())
    }

    /// `Open -> QuorumLocked`: fix the quorum before probing starts
    pub fn lock_quorum(&mut self, quorum: Quorum, height: u64) -> RoundResult<()> {
        if self.state != RoundState::Open {
            return Err(RoundError::InvalidTransition {
                round: self.sequence,
                from: self.state.name(),
                to: "quorum_locked",
                height,
            });
        }
        debug!(
            entry = %self.entry.short(),
            round = self.sequence,
            quorum_size = quorum.len(),
            "quorum locked"
        );
        self.quorum = Some(quorum);
        self.state = RoundState::QuorumLocked;
        Ok(())
    }

    /// Accept one quorum member's activity report
    ///
    /// Rejected once the close height is reached (`StaleReport`), from
    /// non-members, from members reporting twice, and when any tally
    /// exceeds the per-report maximum.
    pub fn submit_report(
        &mut self,
        report: ActivityReportTx,
        height: u64,
        max_points: u32,
    ) -> RoundResult<()> {
        if self.state == RoundState::Closed || height >= self.end_height {
            return Err(RoundError::StaleReport {
                round: self.sequence,
                height,
            });
        }

        let quorum = self.quorum.as_ref().ok_or(RoundError::NotQuorumMember(report.reporter))?;
        if !quorum.contains(&report.reporter) {
            return Err(RoundError::NotQuorumMember(report.reporter));
        }

        if self.reports.iter().any(|r| r.reporter == report.reporter) {
            return Err(RoundError::DuplicateReport(report.reporter));
        }

        for (participant, points) in &report.points {
            if *points > max_points {
                return Err(RoundError::InvalidReport {
                    participant: *participant,
                    points: *points,
                    max: max_points,
                });
            }
        }

        debug!(
            entry = %self.entry.short(),
            round = self.sequence,
            reporter = %report.reporter.short(),
            observed = report.points.len(),
            "activity report accepted"
        );
        self.reports.push(report);
        Ok(())
    }

    /// `-> Closed` at or after the end height, never before
    ///
    /// Freezes the report set and runs the deterministic aggregation
    /// pass. Legal from any prior state: a round whose quorum never
    /// locked (insufficient pool) still closes on time with an empty
    /// report set. Returns the computed active set.
    pub fn close(&mut self, height: u64, max_points: u32) -> RoundResult<ActiveSet> {
        if self.state == RoundState::Closed || height < self.end_height {
            return Err(RoundError::InvalidTransition {
                round: self.sequence,
                from: self.state.name(),
                to: "closed",
                height,
            });
        }

        let active = aggregate(&self.reports, max_points);
        self.active_set = Some(active.clone());
        self.state = RoundState::Closed;
        debug!(
            entry = %self.entry.short(),
            round = self.sequence,
            reports = self.reports.len(),
            active = active.len(),
            "round closed"
        );
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use std::net::Ipv4Addr;

    fn participant(b: u8) -> Participant {
        Participant {
            address: Address::from_byte(b),
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, b)),
        }
    }

    fn quorum_of(entry: Address, members: &[u8]) -> Quorum {
        Quorum {
            entry,
            sequence: 0,
            members: members.iter().copied().map(Address::from_byte).collect(),
            seed: [0u8; 32],
        }
    }

    fn report(reporter: u8, scores: &[(u8, u32)]) -> ActivityReportTx {
        let mut points = Map::new();
        for (addr, pts) in scores {
            points.insert(Address::from_byte(*addr), *pts);
        }
        ActivityReportTx {
            entry: Address::from_byte(0xEE),
            round: 0,
            reporter: Address::from_byte(reporter),
            points,
        }
    }

    fn open_round() -> ParticipationRound {
        let mut round = ParticipationRound::scheduled(Address::from_byte(0xEE), 0, 100, 59);
        round.open(100).unwrap();
        round
    }

    #[test]
    fn test_window_is_59_blocks() {
        let round = ParticipationRound::scheduled(Address::from_byte(1), 0, 100, 59);
        assert_eq!(round.end_height, 159);
        assert_eq!(round.state(), RoundState::Scheduled);
    }

    #[test]
    fn test_open_not_before_start_height() {
        let mut round = ParticipationRound::scheduled(Address::from_byte(1), 0, 100, 59);
        assert!(round.open(99).is_err());
        round.open(100).unwrap();
        assert_eq!(round.state(), RoundState::Open);
    }

    #[test]
    fn test_open_after_start_height_catches_up() {
        let mut round = ParticipationRound::scheduled(Address::from_byte(1), 0, 100, 59);
        round.open(130).unwrap();
        assert_eq!(round.state(), RoundState::Open);
    }

    #[test]
    fn test_register_before_open_fails() {
        let mut round = ParticipationRound::scheduled(Address::from_byte(1), 0, 100, 59);
        let err = round.register(participant(1)).unwrap_err();
        assert!(matches!(err, RoundError::RoundNotOpen { .. }));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut round = open_round();
        round.register(participant(1)).unwrap();
        let err = round.register(participant(1)).unwrap_err();
        assert!(matches!(err, RoundError::DuplicateRegistration(_)));
    }

    #[test]
    fn test_registration_closed_after_quorum_lock() {
        let mut round = open_round();
        round.register(participant(1)).unwrap();
        round.lock_quorum(quorum_of(round.entry, &[1]), 101).unwrap();

        let err = round.register(participant(2)).unwrap_err();
        assert!(matches!(err, RoundError::RegistrationClosed(0)));
    }

    #[test]
    fn test_quorum_locks_once() {
        let mut round = open_round();
        round.lock_quorum(quorum_of(round.entry, &[1]), 101).unwrap();
        let err = round.lock_quorum(quorum_of(round.entry, &[2]), 102).unwrap_err();
        assert!(matches!(err, RoundError::InvalidTransition { .. }));
    }

    #[test]
    fn test_report_from_non_member_rejected() {
        let mut round = open_round();
        round.lock_quorum(quorum_of(round.entry, &[1, 2]), 101).unwrap();

        let err = round.submit_report(report(9, &[(5, 10)]), 120, 59).unwrap_err();
        assert!(matches!(err, RoundError::NotQuorumMember(_)));
    }

    #[test]
    fn test_duplicate_report_rejected() {
        let mut round = open_round();
        round.lock_quorum(quorum_of(round.entry, &[1, 2]), 101).unwrap();

        round.submit_report(report(1, &[(5, 10)]), 120, 59).unwrap();
        let err = round.submit_report(report(1, &[(5, 12)]), 121, 59).unwrap_err();
        assert!(matches!(err, RoundError::DuplicateReport(_)));
    }

    #[test]
    fn test_report_at_close_height_is_stale() {
        let mut round = open_round();
        round.lock_quorum(quorum_of(round.entry, &[1]), 101).unwrap();

        let err = round.submit_report(report(1, &[(5, 10)]), 159, 59).unwrap_err();
        assert!(matches!(err, RoundError::StaleReport { .. }));
    }

    #[test]
    fn test_report_points_bounded() {
        let mut round = open_round();
        round.lock_quorum(quorum_of(round.entry, &[1]), 101).unwrap();

        let err = round.submit_report(report(1, &[(5, 60)]), 120, 59).unwrap_err();
        assert!(matches!(err, RoundError::InvalidReport { points: 60, .. }));
    }

    #[test]
    fn test_close_not_before_end_height() {
        let mut round = open_round();
        round.lock_quorum(quorum_of(round.entry, &[1]), 101).unwrap();

        assert!(round.close(158, 59).is_err());
        round.close(159, 59).unwrap();
        assert_eq!(round.state(), RoundState::Closed);
    }

    #[test]
    fn test_close_after_end_height_catches_up() {
        let mut round = open_round();
        round.close(170, 59).unwrap();
        assert_eq!(round.state(), RoundState::Closed);
    }

    #[test]
    fn test_close_without_quorum_yields_empty_set() {
        let mut round = open_round();
        let active = round.close(159, 59).unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn test_close_is_final() {
        let mut round = open_round();
        round.close(159, 59).unwrap();
        assert!(round.close(159, 59).is_err());

        let err = round.submit_report(report(1, &[(5, 10)]), 159, 59).unwrap_err();
        assert!(matches!(err, RoundError::StaleReport { .. }));
    }
}
