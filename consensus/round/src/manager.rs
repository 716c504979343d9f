//! Round lifecycle management
//!
//! The manager owns one live round per dictionary entry and drives its
//! transitions off the finalized block height: open at the start height,
//! quorum lock once the registration window elapses, close exactly at
//! start + 59 with aggregation and coinbase distribution, then the next
//! round scheduled back-to-back. Rounds of different entries are fully
//! independent.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use motion_ledger::{ActivityReportTx, Address, Ledger, RegisterTx, Transaction};
use motion_registry::DictionaryRegistry;

use crate::aggregate::ActiveSet;
use crate::coinbase::CoinbaseDistributor;
use crate::quorum::{derive_seed, select_quorum};
use crate::round::{Participant, ParticipationRound, RoundState};
use crate::{RoundConfig, RoundError, RoundResult};

/// Observable lifecycle events emitted by [`RoundManager::tick`]
#[derive(Clone, Debug)]
pub enum RoundEvent {
    /// A round opened for registration
    Opened {
        entry: Address,
        round: u64,
        end_height: u64,
    },
    /// The round's quorum was locked
    QuorumLocked {
        entry: Address,
        round: u64,
        members: Vec<Address>,
    },
    /// Quorum selection failed; the round will close empty
    QuorumSkipped {
        entry: Address,
        round: u64,
        available: usize,
        required: usize,
    },
    /// A round closed with its agreed active set
    Closed {
        entry: Address,
        round: u64,
        active: ActiveSet,
        distributed: u64,
    },
    /// The entry's essence can no longer fund rounds
    Dormant { entry: Address },
}

struct EntrySlot {
    current: ParticipationRound,
    /// Essence recorded when the round opened; the distribution base
    essence_at_open: u64,
    /// Selection already attempted and failed for this round
    quorum_skipped: bool,
    archive: Vec<ParticipationRound>,
}

/// Drives the participation rounds of all registered entries
pub struct RoundManager {
    config: RoundConfig,
    ledger: Arc<dyn Ledger>,
    registry: Arc<DictionaryRegistry>,
    distributor: CoinbaseDistributor,
    slots: RwLock<HashMap<Address, EntrySlot>>,
}

impl RoundManager {
    /// Create a manager over ledger and registry handles
    pub fn new(
        config: RoundConfig,
        ledger: Arc<dyn Ledger>,
        registry: Arc<DictionaryRegistry>,
    ) -> Self {
        let distributor = CoinbaseDistributor::new(ledger.clone(), registry.clone());
        Self {
            config,
            ledger,
            registry,
            distributor,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Start tracking a freshly published entry
    ///
    /// Schedules round 0 at the height the registry announced
    /// (publish height + 59).
    pub fn track(&self, entry: Address, first_round_height: u64) {
        let round =
            ParticipationRound::scheduled(entry, 0, first_round_height, self.config.round_length);
        info!(
            entry = %entry.short(),
            first_round_height,
            "tracking entry, first round scheduled"
        );
        self.slots.write().insert(
            entry,
            EntrySlot {
                current: round,
                essence_at_open: 0,
                quorum_skipped: false,
                archive: Vec::new(),
            },
        );
    }

    /// Register a participant for an entry's current round
    ///
    /// An accepted registration is appended to the base ledger as a
    /// `Register` transaction.
    pub fn register(&self, entry: &Address, participant: Participant) -> RoundResult<()> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(entry).ok_or(RoundError::UnknownEntry(*entry))?;

        let tx = RegisterTx {
            entry: *entry,
            round: slot.current.sequence,
            participant: participant.address,
            ip: participant.ip,
        };
        slot.current.register(participant)?;
        self.ledger.append(Transaction::Register(tx))?;
        Ok(())
    }

    /// Route a quorum member's activity report to its round
    ///
    /// An accepted report is appended to the base ledger as an
    /// `ActivityReport` transaction.
    pub fn submit_report(&self, report: ActivityReportTx) -> RoundResult<()> {
        let height = self.ledger.current_height();
        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(&report.entry)
            .ok_or(RoundError::UnknownEntry(report.entry))?;

        if report.round != slot.current.sequence {
            return Err(RoundError::StaleReport {
                round: report.round,
                height,
            });
        }

        slot.current
            .submit_report(report.clone(), height, self.config.points_per_report)?;
        self.ledger.append(Transaction::ActivityReport(report))?;
        Ok(())
    }

    /// The current round of an entry, if tracked
    pub fn current_round(&self, entry: &Address) -> Option<ParticipationRound> {
        self.slots.read().get(entry).map(|s| s.current.clone())
    }

    /// Closed rounds of an entry, oldest first
    pub fn archived_rounds(&self, entry: &Address) -> Vec<ParticipationRound> {
        self.slots
            .read()
            .get(entry)
            .map(|s| s.archive.clone())
            .unwrap_or_default()
    }

    /// Apply all transitions due at the given finalized height
    ///
    /// Meant to run once per finalized height, but tolerant of gaps: a
    /// tick past a round's deadlines replays the missed transitions in
    /// order (open, quorum lock, close) before handling the current
    /// window. Entries are processed independently; an error on one
    /// entry's bookkeeping aborts the tick rather than paying out
    /// inconsistently.
    pub fn tick(&self, height: u64) -> RoundResult<Vec<RoundEvent>> {
        let mut events = Vec::new();
        let mut slots = self.slots.write();

        for (entry, slot) in slots.iter_mut() {
            self.tick_entry(*entry, slot, height, &mut events)?;
        }

        Ok(events)
    }

    fn tick_entry(
        &self,
        entry: Address,
        slot: &mut EntrySlot,
        height: u64,
        events: &mut Vec<RoundEvent>,
    ) -> RoundResult<()> {
        // A close at height H schedules the next round with start H, which
        // must open within the same tick; loop until nothing applies.
        loop {
            match slot.current.state() {
                RoundState::Scheduled if height >= slot.current.start_height => {
                    slot.current.open(height)?;
                    slot.essence_at_open = self.registry.essence(&entry)?;
                    slot.quorum_skipped = false;
                    events.push(RoundEvent::Opened {
                        entry,
                        round: slot.current.sequence,
                        end_height: slot.current.end_height,
                    });
                }
                RoundState::Open
                    if height >= slot.current.start_height + self.config.registration_window
                        && height < slot.current.end_height
                        && !slot.quorum_skipped =>
                {
                    self.lock_quorum(entry, slot, height, events)?;
                }
                _ if height >= slot.current.end_height
                    && slot.current.state() != RoundState::Closed =>
                {
                    self.close_round(entry, slot, height, events)?;
                    if slot.current.state() == RoundState::Closed {
                        // Entry went dormant; no further rounds.
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lock_quorum(
        &self,
        entry: Address,
        slot: &mut EntrySlot,
        height: u64,
        events: &mut Vec<RoundEvent>,
    ) -> RoundResult<()> {
        let sequence = slot.current.sequence;
        let pool = slot.current.participant_addresses();
        let headers = self
            .ledger
            .finalized_header_hashes(self.config.seed_header_count);
        let seed = derive_seed(&entry, sequence, &headers);

        match select_quorum(&entry, sequence, &pool, seed, self.config.quorum_size) {
            Ok(quorum) => {
                let members = quorum.members.clone();
                slot.current.lock_quorum(quorum, height)?;
                events.push(RoundEvent::QuorumLocked {
                    entry,
                    round: sequence,
                    members,
                });
            }
            Err(RoundError::InsufficientActorPool {
                available,
                required,
            }) => {
                warn!(
                    entry = %entry.short(),
                    round = sequence,
                    available,
                    required,
                    "insufficient actor pool, round will close empty"
                );
                slot.quorum_skipped = true;
                events.push(RoundEvent::QuorumSkipped {
                    entry,
                    round: sequence,
                    available,
                    required,
                });
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn close_round(
        &self,
        entry: Address,
        slot: &mut EntrySlot,
        height: u64,
        events: &mut Vec<RoundEvent>,
    ) -> RoundResult<()> {
        let sequence = slot.current.sequence;
        let active = slot.current.close(height, self.config.points_per_report)?;

        let dictionary_entry = self
            .registry
            .lookup(&entry)
            .ok_or(RoundError::UnknownEntry(entry))?;

        let distributed = match self.distributor.distribute(
            &entry,
            sequence,
            slot.essence_at_open,
            dictionary_entry.redistribution_percent,
            &active,
        ) {
            Ok(split) => split.distributed,
            // All-or-nothing: an exhausted reserve closes the round with
            // zero distribution, it does not abort the lifecycle.
            Err(RoundError::EssenceExhausted { .. }) => 0,
            Err(e) => return Err(e),
        };

        slot.current.distributed = distributed;
        events.push(RoundEvent::Closed {
            entry,
            round: sequence,
            active,
            distributed,
        });

        if self.registry.is_dormant(&entry)? {
            // The closed round stays current; nothing further is scheduled.
            events.push(RoundEvent::Dormant { entry });
            return Ok(());
        }

        // Archive and schedule the next window back-to-back: round N's
        // close height is round N+1's open height.
        let next = ParticipationRound::scheduled(
            entry,
            sequence + 1,
            slot.current.end_height,
            self.config.round_length,
        );
        let closed = std::mem::replace(&mut slot.current, next);
        slot.archive.push(closed);

        Ok(())
    }
}
