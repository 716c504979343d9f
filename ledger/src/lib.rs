//! Base-ledger abstraction for the MOTION protocol
//!
//! The participation core does not implement block production or fork
//! choice. It consumes the surrounding ledger through the [`Ledger`]
//! trait: the current finalized height, recent header hashes (seed
//! material for quorum selection), account balances and transaction
//! appends. [`MemoryLedger`] is the in-process implementation used by
//! the CLI simulation and the test suite.

pub mod errors;
pub mod transaction;

pub use errors::{LedgerError, LedgerResult};
pub use transaction::{
    ActivityReportTx, CoinbaseTx, PublishTx, RegisterTx, Transaction,
};

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// A public address on the base ledger
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Address with a single distinguishing byte, for tests and demos
    pub fn from_byte(b: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[0] = b;
        Address(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex form for logging
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

// Hex-string serde so addresses can key JSON maps.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| D::Error::custom("address must be 32 bytes"))?;
        Ok(Address(arr))
    }
}

/// Read/append access to the surrounding base ledger
pub trait Ledger: Send + Sync {
    /// Current finalized block height
    fn current_height(&self) -> u64;

    /// Hashes of the most recent finalized headers, newest first
    ///
    /// Used as seed material for quorum selection: unknown to any single
    /// actor before finalization, identical on every node afterwards.
    fn finalized_header_hashes(&self, count: usize) -> Vec<[u8; 32]>;

    /// Append a transaction, returning its hash
    fn append(&self, tx: Transaction) -> LedgerResult<[u8; 32]>;

    /// Balance of an account (zero for unknown addresses)
    fn balance(&self, address: &Address) -> u64;

    /// Debit an account
    fn debit(&self, address: &Address, amount: u64) -> LedgerResult<()>;

    /// Credit an account, creating it if needed
    fn credit(&self, address: &Address, amount: u64);
}

struct MemoryLedgerInner {
    height: u64,
    header_hashes: Vec<[u8; 32]>,
    balances: HashMap<Address, u64>,
    transactions: Vec<Transaction>,
}

/// In-memory ledger backing simulations and tests
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
}

impl MemoryLedger {
    /// Create a ledger at height 0 with a genesis header hash
    pub fn new() -> Self {
        let genesis = *blake3::hash(b"motion-genesis").as_bytes();
        Self {
            inner: RwLock::new(MemoryLedgerInner {
                height: 0,
                header_hashes: vec![genesis],
                balances: HashMap::new(),
                transactions: Vec::new(),
            }),
        }
    }

    /// Advance the block clock by one height
    ///
    /// Synthesizes a header hash chained from the previous one so the
    /// quorum seed evolves with the chain.
    pub fn advance_height(&self) -> u64 {
        let mut inner = self.inner.write();
        inner.height += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(inner.header_hashes.last().unwrap_or(&[0u8; 32]));
        hasher.update(&inner.height.to_le_bytes());
        let hash = *hasher.finalize().as_bytes();
        inner.header_hashes.push(hash);
        inner.height
    }

    /// Set an account balance directly (genesis allocation)
    pub fn set_balance(&self, address: Address, amount: u64) {
        self.inner.write().balances.insert(address, amount);
    }

    /// All appended transactions, in append order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.inner.read().transactions.clone()
    }

    /// Appended coinbase transactions for one entry and round
    pub fn coinbases_for(&self, entry: &Address, round: u64) -> Vec<CoinbaseTx> {
        self.inner
            .read()
            .transactions
            .iter()
            .filter_map(|tx| match tx {
                Transaction::Coinbase(cb) if &cb.entry == entry && cb.round == round => {
                    Some(cb.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for MemoryLedger {
    fn current_height(&self) -> u64 {
        self.inner.read().height
    }

    fn finalized_header_hashes(&self, count: usize) -> Vec<[u8; 32]> {
        let inner = self.inner.read();
        inner.header_hashes.iter().rev().take(count).copied().collect()
    }

    fn append(&self, tx: Transaction) -> LedgerResult<[u8; 32]> {
        let hash = tx.hash()?;
        let mut inner = self.inner.write();
        debug!(kind = tx.kind(), hash = %hex::encode(&hash[..4]), "appending transaction");

        // Coinbase credits apply on append; other kinds settle balances
        // in the layer that validated them.
        if let Transaction::Coinbase(ref cb) = tx {
            *inner.balances.entry(cb.beneficiary).or_insert(0) += cb.amount;
        }

        inner.transactions.push(tx);
        Ok(hash)
    }

    fn balance(&self, address: &Address) -> u64 {
        self.inner.read().balances.get(address).copied().unwrap_or(0)
    }

    fn debit(&self, address: &Address, amount: u64) -> LedgerResult<()> {
        let mut inner = self.inner.write();
        let balance = inner
            .balances
            .get_mut(address)
            .ok_or(LedgerError::UnknownAddress(*address))?;

        if *balance < amount {
            return Err(LedgerError::InsufficientBalance {
                address: *address,
                available: *balance,
                required: amount,
            });
        }

        *balance -= amount;
        Ok(())
    }

    fn credit(&self, address: &Address, amount: u64) {
        let mut inner = self.inner.write();
        *inner.balances.entry(*address).or_insert(0) += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_advances() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.current_height(), 0);

        ledger.advance_height();
        ledger.advance_height();
        assert_eq!(ledger.current_height(), 2);
    }

    #[test]
    fn test_header_hashes_newest_first() {
        let ledger = MemoryLedger::new();
        ledger.advance_height();
        let newest = ledger.finalized_header_hashes(1)[0];
        ledger.advance_height();

        let hashes = ledger.finalized_header_hashes(3);
        assert_eq!(hashes.len(), 3);
        assert_eq!(hashes[1], newest);
    }

    #[test]
    fn test_debit_requires_balance() {
        let ledger = MemoryLedger::new();
        let addr = Address::from_byte(1);
        ledger.set_balance(addr, 100);

        ledger.debit(&addr, 60).unwrap();
        assert_eq!(ledger.balance(&addr), 40);

        let err = ledger.debit(&addr, 41).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance(&addr), 40);
    }

    #[test]
    fn test_debit_unknown_address() {
        let ledger = MemoryLedger::new();
        let err = ledger.debit(&Address::from_byte(7), 1).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownAddress(_)));
    }

    #[test]
    fn test_coinbase_append_credits_beneficiary() {
        let ledger = MemoryLedger::new();
        let entry = Address::from_byte(1);
        let participant = Address::from_byte(2);

        ledger
            .append(Transaction::Coinbase(CoinbaseTx {
                entry,
                round: 0,
                beneficiary: participant,
                amount: 100,
            }))
            .unwrap();

        assert_eq!(ledger.balance(&participant), 100);
        assert_eq!(ledger.coinbases_for(&entry, 0).len(), 1);
    }

    #[test]
    fn test_address_serde_round_trip() {
        let addr = Address::from_byte(42);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
