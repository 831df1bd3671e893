use crate::{snapshot::ChangeSet, Account, RelKey, Token, TokenRelation, UniqueToken};
use alloy_primitives::Address;
use hts_primitives::{AccountId, NftId, TokenId};
use std::borrow::Cow;

/// A readable ledger that can absorb a committed [`ChangeSet`].
///
/// Implemented by the [`MemoryLedger`](crate::MemoryLedger) root and by
/// [`LedgerSnapshot`](crate::LedgerSnapshot) itself, so snapshots nest.
pub trait LedgerView {
    /// Account by id.
    fn account(&self, id: &AccountId) -> Option<Cow<'_, Account>>;

    /// Account id registered for an EVM alias.
    fn account_by_alias(&self, alias: &Address) -> Option<AccountId>;

    /// Token by id.
    fn token(&self, id: &TokenId) -> Option<Cow<'_, Token>>;

    /// Account/token relationship.
    fn relation(&self, key: &RelKey) -> Option<Cow<'_, TokenRelation>>;

    /// NFT by id.
    fn nft(&self, id: &NftId) -> Option<Cow<'_, UniqueToken>>;

    /// Next unused entity number.
    fn next_entity_num(&self) -> u64;

    /// Folds a child's writes into this view.
    fn apply(&mut self, changes: ChangeSet);
}
