//! Primitive types shared by the HTS precompile crates.
//!
//! Everything here is plain data: entity identifiers and their mapping onto
//! 20-byte EVM addresses, the ledger's outcome [`ResponseCode`] vocabulary,
//! key structures and token shapes. No type in this crate touches state.

pub mod ids;
pub mod keys;
pub mod status;
pub mod time;
pub mod token;

pub use ids::{AccountId, EntityIdParseError, NftId, TokenId};
pub use keys::{Key, TokenKeyType};
pub use status::ResponseCode;
pub use time::Timestamp;
pub use token::{
    CustomFee, FeeKind, FixedFee, FractionalFee, RoyaltyFee, TokenSupplyType, TokenType,
};
