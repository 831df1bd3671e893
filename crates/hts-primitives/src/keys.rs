//! Key structures that gate token and account operations.

use crate::AccountId;
use alloy_primitives::FixedBytes;
use serde::{Deserialize, Serialize};

/// A ledger key.
///
/// Contract keys are satisfied by the calling contract itself; cryptographic
/// keys are satisfied by signatures on the enclosing transaction. Lists and
/// thresholds compose both.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    /// Active when the named contract is the direct, non-delegate caller.
    ContractId(AccountId),
    /// Active when the named contract is the caller, including through
    /// delegate calls.
    DelegatableContractId(AccountId),
    /// Ed25519 public key.
    Ed25519(FixedBytes<32>),
    /// Compressed secp256k1 public key.
    EcdsaSecp256k1(FixedBytes<33>),
    /// Active when every member key is active.
    KeyList(Vec<Key>),
    /// Active when at least `threshold` member keys are active.
    Threshold {
        /// Number of member keys that must be active.
        threshold: u32,
        /// Member keys.
        keys: Vec<Key>,
    },
}

impl Key {
    /// Whether this key (or any nested member) is a cryptographic key.
    pub fn is_cryptographic(&self) -> bool {
        match self {
            Self::Ed25519(_) | Self::EcdsaSecp256k1(_) => true,
            Self::ContractId(_) | Self::DelegatableContractId(_) => false,
            Self::KeyList(keys) | Self::Threshold { keys, .. } => {
                keys.iter().any(Self::is_cryptographic)
            }
        }
    }
}

/// Role a key plays on a token. Discriminants are the protocol bit values.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::EnumIter,
)]
#[repr(u8)]
pub enum TokenKeyType {
    /// May update or delete the token.
    Admin = 1,
    /// May grant and revoke KYC.
    Kyc = 2,
    /// May freeze and unfreeze accounts.
    Freeze = 4,
    /// May wipe balances.
    Wipe = 8,
    /// May mint and burn.
    Supply = 16,
    /// May change custom fees.
    FeeSchedule = 32,
    /// May pause and unpause.
    Pause = 64,
}

impl TokenKeyType {
    /// Exclusive upper bound of a valid key-type bitfield.
    pub const BITFIELD_LIMIT: u64 = 128;

    /// Protocol bit value.
    pub const fn bit(self) -> u64 {
        self as u64
    }

    /// Parses a bitfield holding exactly one key type.
    pub fn from_bit(bit: u64) -> Option<Self> {
        <Self as strum::IntoEnumIterator>::iter().find(|t| t.bit() == bit)
    }

    /// Splits a bitfield into its key types, or `None` if it is zero or
    /// carries bits outside the protocol range.
    pub fn decompose(bits: u64) -> Option<Vec<Self>> {
        if bits == 0 || bits >= Self::BITFIELD_LIMIT {
            return None;
        }
        Some(
            <Self as strum::IntoEnumIterator>::iter()
                .filter(|t| bits & t.bit() != 0)
                .collect(),
        )
    }
}
