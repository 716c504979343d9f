//! Side-protocol dictionary registry
//!
//! The master protocol maintains a dictionary of published side-protocols,
//! keyed by the creator's public address. Publication debits the creator's
//! fuel on the base ledger and freezes it as the entry's essence; the
//! participation rounds then consume that essence through coinbase
//! distribution until the entry goes dormant.

pub mod entry;
pub mod errors;

pub use entry::DictionaryEntry;
pub use errors::{RegistryError, RegistryResult};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use motion_ledger::{Address, Ledger, PublishTx, Transaction};

/// Blocks between publication and the first participation round, and
/// between consecutive rounds. Matches the base ledger's one-minute
/// block target: one round is 59 minutes.
pub const ROUND_LENGTH: u64 = 59;

/// Registry configuration
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Minimum fuel accepted at publication
    pub min_fuel: u64,
    /// Smallest coinbase an entry must still be able to fund; below this
    /// the entry is marked dormant
    pub min_coinbase: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_fuel: 100,
            min_coinbase: 1,
        }
    }
}

/// Receipt returned from a successful publication
#[derive(Clone, Debug)]
pub struct PublishReceipt {
    /// Entry identity (creator address)
    pub entry: Address,
    /// Hash of the appended publish transaction
    pub tx_hash: [u8; 32],
    /// Height at which the first participation round opens
    pub first_round_height: u64,
}

/// The dictionary of published side-protocol entries
pub struct DictionaryRegistry {
    config: RegistryConfig,
    ledger: Arc<dyn Ledger>,
    entries: RwLock<HashMap<Address, DictionaryEntry>>,
}

impl DictionaryRegistry {
    /// Create an empty registry over a ledger handle
    pub fn new(config: RegistryConfig, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            config,
            ledger,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Publish a side-protocol entry
    ///
    /// Fails with `DuplicateEntry` if the creator already has one and
    /// `InsufficientFuel` below the configured minimum. On success the
    /// fuel is debited from the creator, the entry is stored with
    /// essence = fuel, and the receipt carries the height at which the
    /// round manager must open the first round (publish height + 59).
    pub fn publish(&self, tx: PublishTx) -> RegistryResult<PublishReceipt> {
        if tx.redistribution_percent > 100 {
            return Err(RegistryError::InvalidRedistribution(
                tx.redistribution_percent,
            ));
        }

        if tx.essence < self.config.min_fuel {
            return Err(RegistryError::InsufficientFuel {
                provided: tx.essence,
                minimum: self.config.min_fuel,
            });
        }

        let mut entries = self.entries.write();
        if entries.contains_key(&tx.creator) {
            return Err(RegistryError::DuplicateEntry(tx.creator));
        }

        self.ledger.debit(&tx.creator, tx.essence)?;

        let height = self.ledger.current_height();
        let entry = DictionaryEntry::from_publish(&tx, height);
        let tx_hash = match self.ledger.append(Transaction::Publish(tx)) {
            Ok(hash) => hash,
            Err(e) => {
                // Undo the debit so a failed append leaves no trace.
                self.ledger.credit(&entry.creator, entry.essence);
                return Err(e.into());
            }
        };

        let first_round_height = height + ROUND_LENGTH;
        info!(
            entry = %entry.creator.short(),
            essence = entry.essence,
            first_round_height,
            "published dictionary entry"
        );

        let creator = entry.creator;
        entries.insert(creator, entry);

        Ok(PublishReceipt {
            entry: creator,
            tx_hash,
            first_round_height,
        })
    }

    /// Look up an entry by creator address. Pure read, no side effects.
    pub fn lookup(&self, address: &Address) -> Option<DictionaryEntry> {
        self.entries.read().get(address).cloned()
    }

    /// Remaining essence for an entry
    pub fn essence(&self, address: &Address) -> RegistryResult<u64> {
        self.entries
            .read()
            .get(address)
            .map(|e| e.essence)
            .ok_or(RegistryError::EntryNotFound(*address))
    }

    /// Debit essence consumed by a round's coinbase distribution
    ///
    /// Marks the entry dormant when the remainder can no longer fund a
    /// minimal coinbase. Entries are never deleted.
    pub fn debit_essence(&self, address: &Address, amount: u64) -> RegistryResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(address)
            .ok_or(RegistryError::EntryNotFound(*address))?;

        if entry.essence < amount {
            return Err(RegistryError::EssenceUnderflow {
                entry: *address,
                available: entry.essence,
                required: amount,
            });
        }

        entry.essence -= amount;

        if !entry.can_fund(self.config.min_coinbase) {
            entry.dormant = true;
            warn!(entry = %address.short(), "essence exhausted, entry dormant");
        }

        Ok(())
    }

    /// Roll an unspent reserved amount back into essence
    pub fn credit_essence(&self, address: &Address, amount: u64) -> RegistryResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(address)
            .ok_or(RegistryError::EntryNotFound(*address))?;
        entry.essence += amount;
        Ok(())
    }

    /// Whether an entry is dormant
    pub fn is_dormant(&self, address: &Address) -> RegistryResult<bool> {
        self.entries
            .read()
            .get(address)
            .map(|e| e.dormant)
            .ok_or(RegistryError::EntryNotFound(*address))
    }

    /// Number of registered entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_ledger::MemoryLedger;

    fn publish_tx(creator: Address, essence: u64) -> PublishTx {
        PublishTx {
            creator,
            token_name: "demo".into(),
            creator_name: "alice".into(),
            description: Some("a side protocol".into()),
            essence,
            max_actors: 100,
            redistribution_percent: 10,
            block_code: vec![],
            transaction_code: vec![],
            command_code: vec![],
            opcode_code: vec![],
            consensus_code: vec![],
        }
    }

    fn setup() -> (Arc<MemoryLedger>, DictionaryRegistry) {
        let ledger = Arc::new(MemoryLedger::new());
        let registry = DictionaryRegistry::new(RegistryConfig::default(), ledger.clone());
        (ledger, registry)
    }

    #[test]
    fn test_publish_and_lookup() {
        let (ledger, registry) = setup();
        let creator = Address::from_byte(1);
        ledger.set_balance(creator, 5000);

        let receipt = registry.publish(publish_tx(creator, 1000)).unwrap();
        assert_eq!(receipt.first_round_height, ROUND_LENGTH);
        assert_eq!(ledger.balance(&creator), 4000);

        let entry = registry.lookup(&creator).unwrap();
        assert_eq!(entry.essence, 1000);
        assert!(registry.lookup(&Address::from_byte(9)).is_none());
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let (ledger, registry) = setup();
        let creator = Address::from_byte(1);
        ledger.set_balance(creator, 5000);

        registry.publish(publish_tx(creator, 1000)).unwrap();
        let err = registry.publish(publish_tx(creator, 1000)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEntry(_)));
    }

    #[test]
    fn test_insufficient_fuel_rejected() {
        let (ledger, registry) = setup();
        let creator = Address::from_byte(1);
        ledger.set_balance(creator, 5000);

        let err = registry.publish(publish_tx(creator, 10)).unwrap_err();
        assert!(matches!(err, RegistryError::InsufficientFuel { .. }));
        assert_eq!(ledger.balance(&creator), 5000);
    }

    #[test]
    fn test_invalid_redistribution_rejected() {
        let (ledger, registry) = setup();
        let creator = Address::from_byte(1);
        ledger.set_balance(creator, 5000);

        let mut tx = publish_tx(creator, 1000);
        tx.redistribution_percent = 101;
        let err = registry.publish(tx).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidRedistribution(101)));
    }

    #[test]
    fn test_first_round_follows_publish_height() {
        let (ledger, registry) = setup();
        let creator = Address::from_byte(1);
        ledger.set_balance(creator, 5000);
        for _ in 0..7 {
            ledger.advance_height();
        }

        let receipt = registry.publish(publish_tx(creator, 1000)).unwrap();
        assert_eq!(receipt.first_round_height, 7 + ROUND_LENGTH);
    }

    #[test]
    fn test_essence_depletion_and_dormancy() {
        let (ledger, registry) = setup();
        let creator = Address::from_byte(1);
        ledger.set_balance(creator, 5000);
        registry.publish(publish_tx(creator, 1000)).unwrap();

        registry.debit_essence(&creator, 999).unwrap();
        assert_eq!(registry.essence(&creator).unwrap(), 1);
        assert!(!registry.is_dormant(&creator).unwrap());

        registry.debit_essence(&creator, 1).unwrap();
        assert!(registry.is_dormant(&creator).unwrap());
        // Dormant entries stay in the dictionary.
        assert!(registry.lookup(&creator).is_some());
    }

    #[test]
    fn test_essence_never_negative() {
        let (ledger, registry) = setup();
        let creator = Address::from_byte(1);
        ledger.set_balance(creator, 5000);
        registry.publish(publish_tx(creator, 1000)).unwrap();

        let err = registry.debit_essence(&creator, 1001).unwrap_err();
        assert!(matches!(err, RegistryError::EssenceUnderflow { .. }));
        assert_eq!(registry.essence(&creator).unwrap(), 1000);
    }

    #[test]
    fn test_credit_essence_rollback() {
        let (ledger, registry) = setup();
        let creator = Address::from_byte(1);
        ledger.set_balance(creator, 5000);
        registry.publish(publish_tx(creator, 1000)).unwrap();

        registry.debit_essence(&creator, 100).unwrap();
        registry.credit_essence(&creator, 100).unwrap();
        assert_eq!(registry.essence(&creator).unwrap(), 1000);
    }
}
