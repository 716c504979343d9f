//! Transaction types appended to the base ledger
//!
//! The participation core emits and consumes four transaction kinds:
//! dictionary publication, participant registration, quorum activity
//! reports and the per-round coinbase credits.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{Address, LedgerResult};

/// A transaction on the base ledger
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Transaction {
    /// Publish a side-protocol dictionary entry
    Publish(PublishTx),
    /// Register a participant for an open round
    Register(RegisterTx),
    /// A quorum member's activity tally for a round
    ActivityReport(ActivityReportTx),
    /// Reward credit for one active participant
    Coinbase(CoinbaseTx),
}

/// Dictionary entry publication
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublishTx {
    /// Creator public address (entry identity)
    pub creator: Address,
    /// Token name
    pub token_name: String,
    /// Creator display name
    pub creator_name: String,
    /// Optional description
    pub description: Option<String>,
    /// Fuel amount reserved as essence
    pub essence: u64,
    /// Maximum actors desired
    pub max_actors: u32,
    /// Percentage of essence redistributed per round (0-100)
    pub redistribution_percent: u8,
    /// Opaque block definition code
    pub block_code: Vec<u8>,
    /// Opaque transaction definition code
    pub transaction_code: Vec<u8>,
    /// Opaque command definition code
    pub command_code: Vec<u8>,
    /// Opaque opcode definition code
    pub opcode_code: Vec<u8>,
    /// Opaque consensus algorithm code
    pub consensus_code: Vec<u8>,
}

/// Participant registration for a specific round of an entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterTx {
    /// Dictionary entry being joined
    pub entry: Address,
    /// Target round sequence number
    pub round: u64,
    /// Participant public address
    pub participant: Address,
    /// Participant reachable IP address
    pub ip: IpAddr,
}

/// One quorum member's point tally for a round
///
/// The points map uses a BTreeMap so encoding order is stable across nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityReportTx {
    /// Dictionary entry
    pub entry: Address,
    /// Round sequence number
    pub round: u64,
    /// Reporting quorum member
    pub reporter: Address,
    /// Participant address -> points earned (0..=59)
    pub points: BTreeMap<Address, u32>,
}

/// Reward credit emitted at round close
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoinbaseTx {
    /// Dictionary entry funding the reward
    pub entry: Address,
    /// Round sequence number
    pub round: u64,
    /// Active participant receiving the credit
    pub beneficiary: Address,
    /// Credited amount
    pub amount: u64,
}

impl Transaction {
    /// Transaction hash over the canonical JSON encoding
    pub fn hash(&self) -> LedgerResult<[u8; 32]> {
        let encoded = serde_json::to_vec(self)?;
        Ok(*blake3::hash(&encoded).as_bytes())
    }

    /// Kind label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Transaction::Publish(_) => "publish",
            Transaction::Register(_) => "register",
            Transaction::ActivityReport(_) => "activity_report",
            Transaction::Coinbase(_) => "coinbase",
        }
    }
}
