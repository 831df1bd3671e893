//! Token ledger state bound to the EVM journal.
//!
//! The EVM can revert any frame after the precompile returned, so a call's
//! writes cannot go straight into the [`MemoryLedger`] root. Each committed
//! call is sealed into a layer tagged with a sequence number, and that number
//! is written to [`SEQUENCE_SLOT`] in the service account's storage. The slot
//! lives in the journal: when an enclosing frame reverts, the slot rolls back
//! with it and every layer above the restored value is dropped by the next
//! [`JournaledLedger::rewind`] or by [`JournaledLedger::settle`] at the end of
//! the transaction.

use crate::records::SyntheticRecord;
use alloy_primitives::{Address, U256};
use hts_ledger::{Account, ChangeSet, LedgerView, MemoryLedger, RelKey, Token, TokenRelation, UniqueToken};
use hts_primitives::{AccountId, NftId, TokenId};
use std::{borrow::Cow, collections::BTreeMap};

/// Storage slot of the service account holding the committed sequence.
pub const SEQUENCE_SLOT: U256 = U256::ZERO;

#[derive(Clone, Debug)]
struct Layer {
    sequence: u64,
    changes: ChangeSet,
    records: Vec<SyntheticRecord>,
}

/// Root ledger plus the sealed layers of the transaction in flight.
#[derive(Clone, Debug, Default)]
pub struct JournaledLedger {
    root: MemoryLedger,
    layers: Vec<Layer>,
    staged: ChangeSet,
}

impl JournaledLedger {
    /// State over `root` with nothing in flight.
    pub fn new(root: MemoryLedger) -> Self {
        Self { root, layers: Vec::new(), staged: ChangeSet::default() }
    }

    /// Settled world state.
    pub const fn root(&self) -> &MemoryLedger {
        &self.root
    }

    /// Number of sealed layers not yet settled.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Records of every layer still in flight, oldest first.
    pub fn pending_records(&self) -> impl Iterator<Item = &SyntheticRecord> {
        self.layers.iter().flat_map(|layer| layer.records.iter())
    }

    /// Drops staged writes and every layer sealed above `sequence`.
    pub fn rewind(&mut self, sequence: u64) {
        let before = self.layers.len();
        self.staged = ChangeSet::default();
        self.layers.retain(|layer| layer.sequence <= sequence);
        if self.layers.len() != before {
            tracing::debug!(
                target: "hts::journal",
                sequence,
                dropped = before - self.layers.len(),
                "rewound reverted layers"
            );
        }
    }

    /// Seals the staged writes and `records` on top of `base`.
    ///
    /// Returns the sequence the caller must store in [`SEQUENCE_SLOT`], or
    /// `None` when nothing was written and the slot keeps `base`.
    pub fn seal(&mut self, base: u64, records: Vec<SyntheticRecord>) -> Option<u64> {
        let changes = std::mem::take(&mut self.staged);
        if changes.is_empty() && records.is_empty() {
            return None;
        }
        let bumped = !changes.is_empty();
        let sequence = if bumped { base + 1 } else { base };
        tracing::trace!(target: "hts::journal", sequence, entries = changes.len(), "sealed layer");
        self.layers.push(Layer { sequence, changes, records });
        bumped.then_some(sequence)
    }

    /// Ends the transaction at `sequence`: reverted layers are dropped, the
    /// rest folds into the root. Returns the surviving records in order.
    pub fn settle(&mut self, sequence: u64) -> Vec<SyntheticRecord> {
        self.rewind(sequence);
        let mut records = Vec::new();
        for layer in std::mem::take(&mut self.layers) {
            self.root.apply(layer.changes);
            records.extend(layer.records);
        }
        tracing::debug!(target: "hts::journal", sequence, records = records.len(), "settled");
        records
    }

    fn change_sets(&self) -> impl Iterator<Item = &ChangeSet> {
        std::iter::once(&self.staged).chain(self.layers.iter().rev().map(|layer| &layer.changes))
    }

    fn lookup<'a, K: Ord + 'a, V: 'a>(
        &'a self,
        pick: impl Fn(&'a ChangeSet) -> &'a BTreeMap<K, Option<V>>,
        key: &K,
    ) -> Option<Option<&'a V>> {
        self.change_sets().find_map(|changes| pick(changes).get(key)).map(Option::as_ref)
    }
}

impl LedgerView for JournaledLedger {
    fn account(&self, id: &AccountId) -> Option<Cow<'_, Account>> {
        match self.lookup(|changes| &changes.accounts, id) {
            Some(layered) => layered.map(Cow::Borrowed),
            None => self.root.account(id),
        }
    }

    fn account_by_alias(&self, alias: &Address) -> Option<AccountId> {
        let layered = self.change_sets().flat_map(|changes| {
            changes
                .accounts
                .values()
                .flatten()
                .filter(|account| account.alias.as_ref() == Some(alias))
                .map(|account| account.id)
        });
        layered
            .chain(self.root.account_by_alias(alias))
            .find(|id| self.account(id).is_some_and(|account| account.alias.as_ref() == Some(alias)))
    }

    fn token(&self, id: &TokenId) -> Option<Cow<'_, Token>> {
        match self.lookup(|changes| &changes.tokens, id) {
            Some(layered) => layered.map(Cow::Borrowed),
            None => self.root.token(id),
        }
    }

    fn relation(&self, key: &RelKey) -> Option<Cow<'_, TokenRelation>> {
        match self.lookup(|changes| &changes.relations, key) {
            Some(layered) => layered.map(Cow::Borrowed),
            None => self.root.relation(key),
        }
    }

    fn nft(&self, id: &NftId) -> Option<Cow<'_, UniqueToken>> {
        match self.lookup(|changes| &changes.nfts, id) {
            Some(layered) => layered.map(Cow::Borrowed),
            None => self.root.nft(id),
        }
    }

    fn next_entity_num(&self) -> u64 {
        let root = self.root.next_entity_num();
        self.change_sets()
            .find_map(|changes| changes.next_entity_num)
            .map_or(root, |next| next.max(root))
    }

    fn apply(&mut self, changes: ChangeSet) {
        self.staged.absorb(changes);
    }
}
