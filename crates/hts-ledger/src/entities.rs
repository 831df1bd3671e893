//! Records stored in the four ledger relations.

use alloy_primitives::{Address, Bytes};
use hts_primitives::{
    AccountId, CustomFee, Key, NftId, Timestamp, TokenId, TokenKeyType, TokenSupplyType,
    TokenType,
};
use std::collections::{BTreeMap, BTreeSet};

/// An account, including contract accounts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Account id.
    pub id: AccountId,
    /// EVM address alias, if the account was created from one.
    pub alias: Option<Address>,
    /// Account key; `None` for keyless accounts.
    pub key: Option<Key>,
    /// Hbar balance in tinybars.
    pub balance: u64,
    /// Deleted accounts keep their id but cannot transact.
    pub deleted: bool,
    /// Credits to this account need its signature.
    pub receiver_sig_required: bool,
    /// Number of token relationships.
    pub num_associations: u32,
    /// Number of NFTs owned across all tokens.
    pub owned_nfts: u64,
    /// Fungible allowances granted by this account, keyed by
    /// `(token, spender)`.
    pub fungible_allowances: BTreeMap<(TokenId, AccountId), u64>,
    /// Approve-for-all grants made by this account, as `(token, operator)`.
    pub nft_operators: BTreeSet<(TokenId, AccountId)>,
}

impl Account {
    /// Empty account with the given id.
    pub fn new(id: AccountId) -> Self {
        Self { id, ..Default::default() }
    }

    /// Builder-style key setter.
    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    /// Builder-style balance setter.
    pub fn with_balance(mut self, balance: u64) -> Self {
        self.balance = balance;
        self
    }

    /// Builder-style alias setter.
    pub fn with_alias(mut self, alias: Address) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Number of allowance entries, fungible and approve-for-all together.
    pub fn allowance_count(&self) -> usize {
        self.fungible_allowances.len() + self.nft_operators.len()
    }
}

/// A token definition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Token {
    /// Token id.
    pub id: TokenId,
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Free-form memo.
    pub memo: String,
    /// Fungible or non-fungible.
    pub token_type: TokenType,
    /// Supply cap policy.
    pub supply_type: TokenSupplyType,
    /// Decimal scale; always zero for NFTs.
    pub decimals: u32,
    /// Units (or NFTs) in circulation.
    pub total_supply: u64,
    /// Cap on `total_supply` for finite tokens.
    pub max_supply: u64,
    /// Account holding newly minted units.
    pub treasury: AccountId,
    /// Role keys.
    pub keys: BTreeMap<TokenKeyType, Key>,
    /// New relationships start frozen when a freeze key exists.
    pub freeze_default: bool,
    /// Deleted tokens reject every operation except dissociation.
    pub deleted: bool,
    /// Paused tokens reject transfers, mints and burns.
    pub paused: bool,
    /// Fees assessed on transfers.
    pub custom_fees: Vec<CustomFee>,
    /// Expiry, in consensus seconds.
    pub expiry: u64,
    /// Account charged for auto-renewal.
    pub auto_renew_account: Option<AccountId>,
    /// Auto-renewal period in seconds.
    pub auto_renew_period: u64,
    /// Highest serial minted so far.
    pub last_used_serial: u64,
}

impl Token {
    /// Key for `role`, if set.
    pub fn key(&self, role: TokenKeyType) -> Option<&Key> {
        self.keys.get(&role)
    }

    /// Whether new relationships are KYC-granted on creation.
    pub fn kyc_granted_by_default(&self) -> bool {
        !self.keys.contains_key(&TokenKeyType::Kyc)
    }
}

/// Key of an account/token relationship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelKey {
    /// Holder.
    pub account: AccountId,
    /// Token held.
    pub token: TokenId,
}

impl RelKey {
    /// Builds a relationship key.
    pub const fn new(account: AccountId, token: TokenId) -> Self {
        Self { account, token }
    }
}

/// An account's relationship with a token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenRelation {
    /// Units held, or number of NFTs held for non-fungible tokens.
    pub balance: u64,
    /// Frozen relationships cannot send or receive.
    pub frozen: bool,
    /// Whether KYC has been granted.
    pub kyc_granted: bool,
    /// Whether the relationship was created automatically.
    pub automatic_association: bool,
}

/// A single minted NFT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueToken {
    /// NFT id.
    pub id: NftId,
    /// Current owner.
    pub owner: AccountId,
    /// Account approved to transfer this serial, if any.
    pub spender: Option<AccountId>,
    /// Metadata supplied at mint.
    pub metadata: Bytes,
    /// Consensus time of the mint.
    pub created: Timestamp,
}
