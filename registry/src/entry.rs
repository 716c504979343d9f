//! Dictionary entry: a published side-protocol's metadata and fuel reserve

use serde::{Deserialize, Serialize};

use motion_ledger::{Address, PublishTx};

/// A registered side-protocol entry
///
/// Identity is the creator's public address. Metadata and the opaque code
/// blobs are immutable after publication; only the essence reserve moves,
/// and only downward (round distribution) or back up (rollback of a
/// reserved amount that was never paid out).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Creator public address (unique entry identity)
    pub creator: Address,
    /// Token name
    pub token_name: String,
    /// Creator display name
    pub creator_name: String,
    /// Optional description
    pub description: Option<String>,
    /// Remaining fuel reserve funding coinbase rewards
    pub essence: u64,
    /// Maximum actors desired
    pub max_actors: u32,
    /// Percentage of essence redistributed per round (0-100)
    pub redistribution_percent: u8,
    /// Opaque block definition code, never interpreted here
    pub block_code: Vec<u8>,
    /// Opaque transaction definition code
    pub transaction_code: Vec<u8>,
    /// Opaque command definition code
    pub command_code: Vec<u8>,
    /// Opaque opcode definition code
    pub opcode_code: Vec<u8>,
    /// Opaque consensus algorithm code
    pub consensus_code: Vec<u8>,
    /// Block height of the publish transaction
    pub published_at: u64,
    /// Entry can no longer fund a minimal coinbase
    pub dormant: bool,
}

impl DictionaryEntry {
    /// Build an entry from a validated publish transaction
    pub fn from_publish(tx: &PublishTx, height: u64) -> Self {
        Self {
            creator: tx.creator,
            token_name: tx.token_name.clone(),
            creator_name: tx.creator_name.clone(),
            description: tx.description.clone(),
            essence: tx.essence,
            max_actors: tx.max_actors,
            redistribution_percent: tx.redistribution_percent,
            block_code: tx.block_code.clone(),
            transaction_code: tx.transaction_code.clone(),
            command_code: tx.command_code.clone(),
            opcode_code: tx.opcode_code.clone(),
            consensus_code: tx.consensus_code.clone(),
            published_at: height,
            dormant: false,
        }
    }

    /// Whether the remaining essence can fund at least `min_coinbase`
    pub fn can_fund(&self, min_coinbase: u64) -> bool {
        !self.dormant && self.essence >= min_coinbase
    }
}
