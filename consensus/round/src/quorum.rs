//! Deterministic quorum selection
//!
//! The quorum that audits a round is drawn from the round's registered
//! actors with a seed derived from recent finalized block headers. The
//! seed is unknown to any single actor at round-open time but identical
//! on every node once the headers finalize, so all validators compute
//! the same quorum without communication.

use serde::{Deserialize, Serialize};

use motion_ledger::Address;

use crate::{RoundError, RoundResult};

/// The quorum auditing one round
///
/// Quorum members ping and score participants; they hold no other
/// privilege.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quorum {
    /// Entry the round belongs to
    pub entry: Address,
    /// Round sequence number
    pub sequence: u64,
    /// Selected member addresses, in draw order
    pub members: Vec<Address>,
    /// Seed the selection was computed from
    pub seed: [u8; 32],
}

impl Quorum {
    /// Whether an address is a quorum member
    pub fn contains(&self, address: &Address) -> bool {
        self.members.iter().any(|m| m == address)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the quorum is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Derive the selection seed for one round of one entry
///
/// Mixes the entry address and round sequence with the most recent
/// finalized header hashes under a domain tag.
pub fn derive_seed(entry: &Address, sequence: u64, header_hashes: &[[u8; 32]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"motion-quorum-seed");
    hasher.update(entry.as_bytes());
    hasher.update(&sequence.to_le_bytes());
    for hash in header_hashes {
        hasher.update(hash);
    }
    *hasher.finalize().as_bytes()
}

/// Select a quorum of `size` members from the actor pool
///
/// The pool is sorted by address before drawing, so the result depends
/// only on the pool's membership and the seed, never on insertion order.
/// Draws use a blake3 hash chain over the seed; each draw removes the
/// picked candidate, so members are distinct.
///
/// Fails with `InsufficientActorPool` when fewer eligible actors exist
/// than the requested size; callers close the round with an empty active
/// set in that case rather than blocking progress.
pub fn select_quorum(
    entry: &Address,
    sequence: u64,
    pool: &[Address],
    seed: [u8; 32],
    size: usize,
) -> RoundResult<Quorum> {
    let mut candidates: Vec<Address> = pool.to_vec();
    candidates.sort();
    candidates.dedup();

    if candidates.len() < size {
        return Err(RoundError::InsufficientActorPool {
            available: candidates.len(),
            required: size,
        });
    }

    let mut members = Vec::with_capacity(size);
    let mut rng_state = seed;

    for draw in 0..size as u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&rng_state);
        hasher.update(&draw.to_le_bytes());
        rng_state = *hasher.finalize().as_bytes();

        let rand_value = u64::from_le_bytes(rng_state[0..8].try_into().unwrap());
        let index = (rand_value % candidates.len() as u64) as usize;
        members.push(candidates.remove(index));
    }

    Ok(Quorum {
        entry: *entry,
        sequence,
        members,
        seed,
    })
}
