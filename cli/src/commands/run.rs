//! Run command: local participation-round simulation
//!
//! Spins up an in-memory ledger, publishes one demo dictionary entry and
//! drives full participation rounds against scripted participants. The
//! block clock is simulated; probe windows run on the configured cadence
//! as independent tasks, exactly as they would against real actors.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;

use motion_ledger::{ActivityReportTx, Address, Ledger, MemoryLedger, PublishTx};
use motion_registry::DictionaryRegistry;
use motion_round::{ActivityVerifier, Participant, Prober, RoundEvent, RoundManager};

use crate::config::MotionConfig;

/// Run a local simulation node
#[derive(Args)]
pub struct RunCommand {
    /// Path to configuration file (defaults to the local preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of rounds to run before exiting
    #[arg(long, default_value_t = 3)]
    rounds: u64,

    /// Simulated participants per round
    #[arg(long, default_value_t = 8)]
    participants: u8,

    /// How many of them answer probes
    #[arg(long, default_value_t = 6)]
    responsive: u8,

    /// Demo entry essence
    #[arg(long, default_value_t = 10_000)]
    essence: u64,

    /// Demo entry redistribution percent
    #[arg(long, default_value_t = 10)]
    redistribution: u8,
}

/// Probe behaviour for the scripted participants: responsive addresses
/// answer almost always, the rest never do.
struct SimProber {
    responsive: Vec<Address>,
}

impl Prober for SimProber {
    fn probe(&self, target: &Participant) -> bool {
        if !self.responsive.contains(&target.address) {
            return false;
        }
        // Drop a small fraction of answers to exercise the threshold.
        rand::thread_rng().gen_ratio(97, 100)
    }
}

impl RunCommand {
    pub async fn execute(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => MotionConfig::load(path)?,
            None => MotionConfig::local(),
        };

        let ledger = Arc::new(MemoryLedger::new());
        let registry = Arc::new(DictionaryRegistry::new(
            config.registry_config(),
            ledger.clone(),
        ));
        let manager = Arc::new(RoundManager::new(
            config.round_config(),
            ledger.clone(),
            registry.clone(),
        ));
        let verifier = ActivityVerifier::new(config.round_config());

        let creator = Address::from_byte(0xC0);
        ledger.set_balance(creator, self.essence);
        let receipt = registry.publish(PublishTx {
            creator,
            token_name: "demo-token".into(),
            creator_name: "simulator".into(),
            description: Some("local simulation entry".into()),
            essence: self.essence,
            max_actors: self.participants as u32,
            redistribution_percent: self.redistribution,
            block_code: vec![],
            transaction_code: vec![],
            command_code: vec![],
            opcode_code: vec![],
            consensus_code: vec![],
        })?;
        manager.track(receipt.entry, receipt.first_round_height);

        let participants: Vec<Participant> = (1..=self.participants)
            .map(|b| Participant {
                address: Address::from_byte(b),
                ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, b)),
            })
            .collect();
        let responsive: Vec<Address> = participants
            .iter()
            .take(self.responsive as usize)
            .map(|p| p.address)
            .collect();

        // Quorum probe windows run as spawned tasks; reports come back
        // over this channel and are submitted on the next block.
        let (report_tx, mut report_rx) = mpsc::unbounded_channel::<ActivityReportTx>();

        // Nothing happens before the first round; skip ahead.
        while ledger.current_height() + 1 < receipt.first_round_height {
            ledger.advance_height();
        }

        let block_interval = Duration::from_millis(config.node.block_interval_ms);
        let mut closed_rounds = 0u64;

        while closed_rounds < self.rounds {
            tokio::time::sleep(block_interval).await;
            let height = ledger.advance_height();

            while let Ok(report) = report_rx.try_recv() {
                if let Err(e) = manager.submit_report(report) {
                    info!(error = %e, "report rejected");
                }
            }

            for event in manager.tick(height)? {
                match event {
                    RoundEvent::Opened { entry, round, end_height } => {
                        info!(round, end_height, "round open, registering participants");
                        for p in &participants {
                            manager.register(&entry, p.clone())?;
                        }
                    }
                    RoundEvent::QuorumLocked { entry, round, members } => {
                        info!(round, quorum = members.len(), "quorum locked, probing starts");
                        let members: Vec<(Address, Arc<dyn Prober>)> = members
                            .into_iter()
                            .map(|m| {
                                let prober: Arc<dyn Prober> = Arc::new(SimProber {
                                    responsive: responsive.clone(),
                                });
                                (m, prober)
                            })
                            .collect();

                        let verifier = verifier.clone();
                        let participants = participants.clone();
                        let report_tx = report_tx.clone();
                        tokio::spawn(async move {
                            let reports =
                                verifier.run_quorum(members, entry, round, participants).await;
                            for report in reports {
                                let _ = report_tx.send(report);
                            }
                        });
                    }
                    RoundEvent::QuorumSkipped { round, available, required, .. } => {
                        info!(round, available, required, "quorum skipped");
                    }
                    RoundEvent::Closed { entry, round, active, distributed } => {
                        closed_rounds += 1;
                        info!(
                            round,
                            active = active.len(),
                            distributed,
                            essence_left = registry.essence(&entry)?,
                            "round closed"
                        );
                    }
                    RoundEvent::Dormant { entry } => {
                        info!(entry = %entry, "entry dormant, stopping");
                        return Ok(());
                    }
                }
            }
        }

        println!("Simulation complete: {} rounds closed", closed_rounds);
        Ok(())
    }
}
