//! # HTS Token Service Precompile
//!
//! Lets contracts running in the EVM call the ledger's native token service
//! (create, mint, burn, wipe, transfer, associate, approve and query tokens) as if
//! it were a regular contract, with the same atomicity, authorization and
//! fee guarantees as a natively submitted transaction.
//!
//! ## Addresses
//!
//! | Address | Name | Description |
//! |---------|------|-------------|
//! | `0x0167` | [`precompile`] | Protocol-native token service |
//! | token address | [`codec::split_redirect`] | ERC-20/721 facade, redirected to `0x0167` |
//!
//! ## Architecture
//!
//! Every call runs the same pipeline in [`engine::DispatchEngine`]:
//!
//! 1. **Codec**: selector dispatch and bit-exact ABI decoding into an [`Operation`]
//! 2. **Authorization**: key activation checks in [`auth::AuthorizationGate`]
//! 3. **Ledger**: speculative writes on a [`hts_ledger::LedgerSnapshot`]
//! 4. **Fees**: gas pricing and value reconciliation via [`hts_fees`]
//! 5. **Records**: one [`records::SyntheticRecord`] per dispatched call
//!
//! A handler failure discards the snapshot and reverts with the status name
//! as reason; success commits the snapshot into the caller's world state in
//! one step.
//!
//! Inside an EVM the caller's world state is a [`journal::JournaledLedger`]:
//! each committed call becomes a layer tied to a journaled storage slot of the
//! service account, so writes and records vanish when an enclosing frame
//! reverts.
//!
//! ## Integration
//!
//! ```ignore
//! use hts_precompile::{HtsConfig, HtsPrecompile};
//!
//! let config = HtsConfig::from_env()?;
//! let hts = HtsPrecompile::new(config, hts_fees::default_fee_schedule(), MemoryLedger::default());
//! precompiles.apply_precompile(&hts.address(), |_| Some(DynPrecompile::from(hts.clone())));
//!
//! // after each transaction
//! let records = hts.settle(&result_and_state.state);
//! ```

pub mod abi;
pub mod auth;
pub mod codec;
pub mod config;
pub mod engine;
pub mod failure;
mod handlers;
pub mod journal;
pub mod operation;
pub mod precompile;
pub mod records;

pub use config::{ConfigError, HtsConfig, HTS_PRECOMPILE_ADDR};
pub use engine::{CallFrame, CallMode, DispatchEngine, DispatchOutcome};
pub use failure::Failure;
pub use journal::JournaledLedger;
pub use operation::Operation;
pub use precompile::HtsPrecompile;
pub use records::{InProgressRecords, RecordLog, SyntheticRecord, TransactionKind};
