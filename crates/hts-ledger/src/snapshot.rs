//! Copy-on-write snapshot over a parent [`LedgerView`].

use crate::{Account, LedgerView, RelKey, Token, TokenRelation, UniqueToken};
use alloy_primitives::Address;
use hts_primitives::{AccountId, NftId, TokenId};
use std::{borrow::Cow, collections::BTreeMap, fmt};

/// Pending writes of a snapshot. `None` values are removals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Account writes.
    pub accounts: BTreeMap<AccountId, Option<Account>>,
    /// Token writes.
    pub tokens: BTreeMap<TokenId, Option<Token>>,
    /// Relationship writes.
    pub relations: BTreeMap<RelKey, Option<TokenRelation>>,
    /// NFT writes.
    pub nfts: BTreeMap<NftId, Option<UniqueToken>>,
    /// Entity counter after allocations made in this change set.
    pub next_entity_num: Option<u64>,
}

impl ChangeSet {
    /// Number of keyed entries touched.
    pub fn len(&self) -> usize {
        self.accounts.len() + self.tokens.len() + self.relations.len() + self.nfts.len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.next_entity_num.is_none()
    }

    /// Overlays `newer` on top of `self`.
    pub fn absorb(&mut self, newer: Self) {
        self.accounts.extend(newer.accounts);
        self.tokens.extend(newer.tokens);
        self.relations.extend(newer.relations);
        self.nfts.extend(newer.nfts);
        if let Some(next) = newer.next_entity_num {
            self.next_entity_num = Some(self.next_entity_num.map_or(next, |cur| cur.max(next)));
        }
    }
}

/// Transactional layer over a parent ledger.
///
/// Reads resolve through the whole parent chain; writes stay local until
/// [`commit`](Self::commit). A snapshot that is dropped without committing
/// leaves its parent untouched.
pub struct LedgerSnapshot<'p> {
    parent: &'p mut dyn LedgerView,
    changes: ChangeSet,
    writes: usize,
}

impl fmt::Debug for LedgerSnapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerSnapshot")
            .field("changes", &self.changes)
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

impl<'p> LedgerSnapshot<'p> {
    /// Opens a snapshot over `parent`. The parent cannot be touched until the
    /// snapshot is committed or dropped.
    pub fn wrap(parent: &'p mut dyn LedgerView) -> Self {
        Self { parent, changes: ChangeSet::default(), writes: 0 }
    }

    /// Opens a child snapshot over this one.
    pub fn nest(&mut self) -> LedgerSnapshot<'_> {
        LedgerSnapshot::wrap(self)
    }

    /// Folds all writes into the immediate parent.
    pub fn commit(self) {
        tracing::trace!(
            target: "hts::ledger",
            entries = self.changes.len(),
            writes = self.writes,
            "committing snapshot"
        );
        self.parent.apply(self.changes);
    }

    /// Drops all writes.
    pub fn discard(self) {
        tracing::trace!(
            target: "hts::ledger",
            entries = self.changes.len(),
            "discarding snapshot"
        );
    }

    /// Number of `set` calls made on this snapshot, including writes folded
    /// in from committed children.
    pub const fn write_count(&self) -> usize {
        self.writes
    }

    /// Pending writes.
    pub const fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Writes an account.
    pub fn put_account(&mut self, account: Account) {
        self.writes += 1;
        self.changes.accounts.insert(account.id, Some(account));
    }

    /// Writes a token.
    pub fn put_token(&mut self, token: Token) {
        self.writes += 1;
        self.changes.tokens.insert(token.id, Some(token));
    }

    /// Writes a relationship.
    pub fn put_relation(&mut self, key: RelKey, relation: TokenRelation) {
        self.writes += 1;
        self.changes.relations.insert(key, Some(relation));
    }

    /// Removes a relationship.
    pub fn remove_relation(&mut self, key: RelKey) {
        self.writes += 1;
        self.changes.relations.insert(key, None);
    }

    /// Writes an NFT.
    pub fn put_nft(&mut self, nft: UniqueToken) {
        self.writes += 1;
        self.changes.nfts.insert(nft.id, Some(nft));
    }

    /// Removes an NFT.
    pub fn remove_nft(&mut self, id: NftId) {
        self.writes += 1;
        self.changes.nfts.insert(id, None);
    }

    /// Reserves the next entity number.
    pub fn allocate_entity_num(&mut self) -> u64 {
        let num = self.next_entity_num();
        self.writes += 1;
        self.changes.next_entity_num = Some(num + 1);
        num
    }

    /// Whether the account exists and is not deleted.
    pub fn account_exists(&self, id: &AccountId) -> bool {
        self.account(id).is_some_and(|account| !account.deleted)
    }

    /// Current owner of an NFT.
    pub fn nft_owner(&self, id: &NftId) -> Option<AccountId> {
        self.nft(id).map(|nft| nft.owner)
    }

    /// Account approved to move a single NFT.
    pub fn nft_spender(&self, id: &NftId) -> Option<AccountId> {
        self.nft(id).and_then(|nft| nft.spender)
    }

    /// Fungible allowance `owner` granted `spender` on `token`.
    pub fn fungible_allowance(&self, owner: &AccountId, token: &TokenId, spender: &AccountId) -> u64 {
        self.account(owner)
            .and_then(|account| account.fungible_allowances.get(&(*token, *spender)).copied())
            .unwrap_or_default()
    }

    /// Whether `owner` granted `operator` approve-for-all on `token`.
    pub fn is_approved_for_all(
        &self,
        owner: &AccountId,
        token: &TokenId,
        operator: &AccountId,
    ) -> bool {
        self.account(owner)
            .is_some_and(|account| account.nft_operators.contains(&(*token, *operator)))
    }
}

impl LedgerView for LedgerSnapshot<'_> {
    fn account(&self, id: &AccountId) -> Option<Cow<'_, Account>> {
        match self.changes.accounts.get(id) {
            Some(local) => local.as_ref().map(Cow::Borrowed),
            None => self.parent.account(id),
        }
    }

    fn account_by_alias(&self, alias: &Address) -> Option<AccountId> {
        if let Some(local) = self
            .changes
            .accounts
            .values()
            .flatten()
            .find(|account| account.alias.as_ref() == Some(alias))
        {
            return Some(local.id);
        }
        // A parent hit is stale once the owner was rewritten here without it.
        self.parent
            .account_by_alias(alias)
            .filter(|id| self.account(id).is_some_and(|account| account.alias.as_ref() == Some(alias)))
    }

    fn token(&self, id: &TokenId) -> Option<Cow<'_, Token>> {
        match self.changes.tokens.get(id) {
            Some(local) => local.as_ref().map(Cow::Borrowed),
            None => self.parent.token(id),
        }
    }

    fn relation(&self, key: &RelKey) -> Option<Cow<'_, TokenRelation>> {
        match self.changes.relations.get(key) {
            Some(local) => local.as_ref().map(Cow::Borrowed),
            None => self.parent.relation(key),
        }
    }

    fn nft(&self, id: &NftId) -> Option<Cow<'_, UniqueToken>> {
        match self.changes.nfts.get(id) {
            Some(local) => local.as_ref().map(Cow::Borrowed),
            None => self.parent.nft(id),
        }
    }

    fn next_entity_num(&self) -> u64 {
        self.changes
            .next_entity_num
            .unwrap_or_else(|| self.parent.next_entity_num())
    }

    fn apply(&mut self, changes: ChangeSet) {
        self.writes += changes.len();
        self.changes.absorb(changes);
    }
}
