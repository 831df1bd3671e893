//! Fee pricing for token service calls.
//!
//! A [`FeeSchedule`] prices each [`PricedOperation`] in tinycents. [`quote`]
//! converts that price with the exchange rate active at consensus time,
//! [`gas_requirement`] turns it into gas, and [`reconcile`] settles value
//! attached to entity-creating calls.

pub mod apply;
pub mod compute;
pub mod config;
pub mod types;

pub use apply::*;
pub use compute::*;
pub use config::*;
pub use types::*;
