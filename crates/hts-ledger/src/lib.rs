//! Transactional ledger state for the HTS precompile.
//!
//! The ledger is four keyed relations: accounts, token definitions,
//! account/token relationships, and unique NFT instances. A
//! [`LedgerSnapshot`] layers speculative writes over any [`LedgerView`]
//! parent, which is either the [`MemoryLedger`] root or another snapshot.
//!
//! ```text
//! MemoryLedger (world state)
//!   └─ LedgerSnapshot (precompile call)
//!        └─ LedgerSnapshot (nested step, e.g. allowance check + transfer)
//! ```
//!
//! Nesting borrows the parent mutably, so only the innermost snapshot can be
//! written and an outer snapshot cannot be committed while an inner one is
//! alive. [`LedgerSnapshot::commit`] takes the snapshot by value and folds its
//! writes into the immediate parent in one step; dropping a snapshot discards
//! it.

pub mod entities;
pub mod error;
pub mod memory;
mod rules;
pub mod snapshot;
pub mod view;

pub use entities::{Account, RelKey, Token, TokenRelation, UniqueToken};
pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use rules::Limits;
pub use snapshot::{ChangeSet, LedgerSnapshot};
pub use view::LedgerView;
