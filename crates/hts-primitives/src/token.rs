//! Token shapes and custom fee schedules.

use crate::{AccountId, TokenId};
use serde::{Deserialize, Serialize};

/// Whether units of a token are interchangeable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenType {
    /// Interchangeable units with a decimal scale.
    #[default]
    FungibleCommon = 0,
    /// Individually serialised instances.
    NonFungibleUnique = 1,
}

impl TokenType {
    /// Protocol value as reported by `getTokenType`.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Shorthand for `self == TokenType::NonFungibleUnique`.
    pub const fn is_nft(self) -> bool {
        matches!(self, Self::NonFungibleUnique)
    }
}

/// Whether the total supply of a token is capped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenSupplyType {
    /// No cap.
    #[default]
    Infinite,
    /// Capped at the token's `max_supply`.
    Finite,
}

/// A flat fee per transfer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedFee {
    /// Units charged.
    pub amount: i64,
    /// Token the fee is paid in; `None` means hbar.
    pub denominating_token: Option<TokenId>,
}

/// A fee taken as a fraction of each transferred amount.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FractionalFee {
    /// Fraction numerator.
    pub numerator: i64,
    /// Fraction denominator.
    pub denominator: i64,
    /// Lower bound of the assessed fee.
    pub minimum_amount: i64,
    /// Upper bound of the assessed fee, zero for none.
    pub maximum_amount: i64,
    /// Charge the fee on top of the transfer instead of out of it.
    pub net_of_transfers: bool,
}

/// A fee taken from the value exchanged for an NFT.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoyaltyFee {
    /// Fraction numerator.
    pub numerator: i64,
    /// Fraction denominator.
    pub denominator: i64,
    /// Fee charged when no value is exchanged.
    pub fallback: Option<FixedFee>,
}

/// The assessment rule of a custom fee.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeKind {
    /// See [`FixedFee`].
    Fixed(FixedFee),
    /// See [`FractionalFee`].
    Fractional(FractionalFee),
    /// See [`RoyaltyFee`].
    Royalty(RoyaltyFee),
}

/// A custom fee attached to a token and the account that collects it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomFee {
    /// Assessment rule.
    pub kind: FeeKind,
    /// Collector.
    pub collector: AccountId,
}
