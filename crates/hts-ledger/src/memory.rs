//! In-memory root ledger.

use crate::{snapshot::ChangeSet, Account, LedgerView, RelKey, Token, TokenRelation, UniqueToken};
use alloy_primitives::Address;
use hts_primitives::{AccountId, NftId, TokenId};
use std::{borrow::Cow, collections::BTreeMap};

/// First entity number handed out by a fresh ledger.
pub const FIRST_USER_ENTITY: u64 = 1001;

/// World state held fully in memory.
#[derive(Clone, Debug)]
pub struct MemoryLedger {
    accounts: BTreeMap<AccountId, Account>,
    aliases: BTreeMap<Address, AccountId>,
    tokens: BTreeMap<TokenId, Token>,
    relations: BTreeMap<RelKey, TokenRelation>,
    nfts: BTreeMap<NftId, UniqueToken>,
    next_entity_num: u64,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Empty ledger.
    pub const fn new() -> Self {
        Self {
            accounts: BTreeMap::new(),
            aliases: BTreeMap::new(),
            tokens: BTreeMap::new(),
            relations: BTreeMap::new(),
            nfts: BTreeMap::new(),
            next_entity_num: FIRST_USER_ENTITY,
        }
    }

    /// Inserts or replaces an account.
    pub fn put_account(&mut self, account: Account) {
        if let Some(alias) = account.alias {
            self.aliases.insert(alias, account.id);
        }
        self.bump_past(account.id.num);
        self.accounts.insert(account.id, account);
    }

    /// Inserts or replaces a token.
    pub fn put_token(&mut self, token: Token) {
        self.bump_past(token.id.num);
        self.tokens.insert(token.id, token);
    }

    /// Inserts or replaces a relationship.
    pub fn put_relation(&mut self, key: RelKey, relation: TokenRelation) {
        self.relations.insert(key, relation);
    }

    /// Inserts or replaces an NFT.
    pub fn put_nft(&mut self, nft: UniqueToken) {
        self.nfts.insert(nft.id, nft);
    }

    /// Number of relationships held.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn bump_past(&mut self, num: u64) {
        if num >= self.next_entity_num {
            self.next_entity_num = num + 1;
        }
    }
}

fn fold<K: Ord, V>(target: &mut BTreeMap<K, V>, writes: BTreeMap<K, Option<V>>) {
    for (key, value) in writes {
        match value {
            Some(value) => {
                target.insert(key, value);
            }
            None => {
                target.remove(&key);
            }
        }
    }
}

impl LedgerView for MemoryLedger {
    fn account(&self, id: &AccountId) -> Option<Cow<'_, Account>> {
        self.accounts.get(id).map(Cow::Borrowed)
    }

    fn account_by_alias(&self, alias: &Address) -> Option<AccountId> {
        self.aliases
            .get(alias)
            .copied()
            .filter(|id| self.accounts.get(id).is_some_and(|account| account.alias.as_ref() == Some(alias)))
    }

    fn token(&self, id: &TokenId) -> Option<Cow<'_, Token>> {
        self.tokens.get(id).map(Cow::Borrowed)
    }

    fn relation(&self, key: &RelKey) -> Option<Cow<'_, TokenRelation>> {
        self.relations.get(key).map(Cow::Borrowed)
    }

    fn nft(&self, id: &NftId) -> Option<Cow<'_, UniqueToken>> {
        self.nfts.get(id).map(Cow::Borrowed)
    }

    fn next_entity_num(&self) -> u64 {
        self.next_entity_num
    }

    fn apply(&mut self, changes: ChangeSet) {
        for account in changes.accounts.values().flatten() {
            if let Some(alias) = account.alias {
                self.aliases.insert(alias, account.id);
            }
        }
        fold(&mut self.accounts, changes.accounts);
        fold(&mut self.tokens, changes.tokens);
        fold(&mut self.relations, changes.relations);
        fold(&mut self.nfts, changes.nfts);
        if let Some(next) = changes.next_entity_num {
            self.next_entity_num = self.next_entity_num.max(next);
        }
    }
}
