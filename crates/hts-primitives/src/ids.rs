//! Ledger entity identifiers and their EVM address form.
//!
//! Every account and token has a `shard.realm.num` id. Its EVM "long-zero"
//! mirror address packs the three parts big-endian into 20 bytes:
//!
//! | bytes | field |
//! |-------|-------|
//! | 0..4  | shard (`u32`) |
//! | 4..12 | realm (`u64`) |
//! | 12..20 | num (`u64`) |
//!
//! So `0.0.777` is `0x0000000000000000000000000000000000000309`.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Errors returned when parsing `shard.realm.num` strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityIdParseError {
    /// The string did not contain exactly three dot-separated parts.
    #[error("expected `shard.realm.num`, got {0:?}")]
    Format(String),
    /// One of the parts was not a valid unsigned integer.
    #[error("invalid entity id component {0:?}")]
    Component(String),
}

/// Returns true when the first 12 bytes of `address` are zero, i.e. the
/// address is the mirror form of an entity in shard 0, realm 0.
pub fn is_long_zero(address: &Address) -> bool {
    address.as_slice()[..12].iter().all(|b| *b == 0)
}

fn pack(shard: u32, realm: u64, num: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[..4].copy_from_slice(&shard.to_be_bytes());
    bytes[4..12].copy_from_slice(&realm.to_be_bytes());
    bytes[12..].copy_from_slice(&num.to_be_bytes());
    Address::from(bytes)
}

fn unpack(address: &Address) -> (u32, u64, u64) {
    let raw = address.as_slice();
    let mut shard = [0u8; 4];
    let mut realm = [0u8; 8];
    let mut num = [0u8; 8];
    shard.copy_from_slice(&raw[..4]);
    realm.copy_from_slice(&raw[4..12]);
    num.copy_from_slice(&raw[12..]);
    (
        u32::from_be_bytes(shard),
        u64::from_be_bytes(realm),
        u64::from_be_bytes(num),
    )
}

fn parse_triple(s: &str) -> Result<(u32, u64, u64), EntityIdParseError> {
    let mut parts = s.split('.');
    let (Some(shard), Some(realm), Some(num), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(EntityIdParseError::Format(s.to_string()));
    };
    let component = |p: &str| EntityIdParseError::Component(p.to_string());
    Ok((
        shard.parse().map_err(|_| component(shard))?,
        realm.parse().map_err(|_| component(realm))?,
        num.parse().map_err(|_| component(num))?,
    ))
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            /// Shard number.
            pub shard: u32,
            /// Realm number.
            pub realm: u64,
            /// Entity number within the realm.
            pub num: u64,
        }

        impl $name {
            /// Builds an id from its three parts.
            pub const fn new(shard: u32, realm: u64, num: u64) -> Self {
                Self { shard, realm, num }
            }

            /// Builds an id in shard 0, realm 0.
            pub const fn from_num(num: u64) -> Self {
                Self::new(0, 0, num)
            }

            /// Long-zero mirror address of this entity.
            pub fn to_evm_address(&self) -> Address {
                pack(self.shard, self.realm, self.num)
            }

            /// Reads an id back out of a mirror address. Total: any 20 bytes
            /// decode to some id, whether or not that entity exists.
            pub fn from_evm_address(address: &Address) -> Self {
                let (shard, realm, num) = unpack(address);
                Self { shard, realm, num }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
            }
        }

        impl FromStr for $name {
            type Err = EntityIdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (shard, realm, num) = parse_triple(s.trim())?;
                Ok(Self { shard, realm, num })
            }
        }

        impl From<$name> for Address {
            fn from(id: $name) -> Self {
                id.to_evm_address()
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

entity_id! {
    /// Identifier of an account (including contract accounts).
    AccountId
}

entity_id! {
    /// Identifier of a token definition.
    TokenId
}

/// A single non-fungible token instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NftId {
    /// The non-fungible token this instance belongs to.
    pub token: TokenId,
    /// Serial number, starting at 1.
    pub serial: u64,
}

impl NftId {
    /// Builds an NFT id.
    pub const fn new(token: TokenId, serial: u64) -> Self {
        Self { token, serial }
    }
}

impl fmt::Display for NftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.token, self.serial)
    }
}
