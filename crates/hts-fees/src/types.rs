//! Fee schedule and quote types.

use hts_primitives::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operation classes that carry their own price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PricedOperation {
    /// Associating one or more tokens with an account.
    Associate,
    /// Dissociating tokens from an account.
    Dissociate,
    /// Minting fungible units.
    Mint,
    /// Minting NFT serials.
    MintNft,
    /// Burning units or serials.
    Burn,
    /// Wiping units or serials from a holder.
    Wipe,
    /// Any fungible-only transfer.
    Transfer,
    /// A transfer moving at least one NFT.
    TransferNft,
    /// Fungible or single-serial approval.
    Approve,
    /// Approve-for-all.
    ApproveForAll,
    /// Creating a token.
    TokenCreate,
    /// Updating a token's properties.
    TokenUpdate,
    /// Pause, freeze, KYC and delete.
    Admin,
    /// Read-only calls.
    Query,
}

/// Resource fee components, in tinycents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeComponents {
    /// Paid to the submitting node.
    #[serde(default)]
    pub node: u64,
    /// Paid for network-wide processing.
    #[serde(default)]
    pub network: u64,
    /// Paid for the service's own state.
    #[serde(default)]
    pub service: u64,
}

impl FeeComponents {
    /// Sum of all three components, saturating.
    pub const fn total(&self) -> u64 {
        self.node.saturating_add(self.network).saturating_add(self.service)
    }
}

/// Price of one operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationPrice {
    /// Metered resource fees.
    #[serde(default)]
    pub components: FeeComponents,
    /// Floor applied when converting to gas, in tinycents.
    #[serde(default)]
    pub minimum: u64,
}

/// Hbar/cent exchange rate: `hbar_equiv` hbar buy `cent_equiv` cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    /// Hbar side of the ratio.
    pub hbar_equiv: u32,
    /// Cent side of the ratio.
    pub cent_equiv: u32,
    /// Consensus second after which this rate is no longer current.
    pub expiration_time: u64,
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self { hbar_equiv: 1, cent_equiv: 12, expiration_time: u64::MAX }
    }
}

/// The current rate and the one that replaces it on expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExchangeRateSet {
    /// Rate in force until its expiration time.
    pub current: ExchangeRate,
    /// Rate in force afterwards. Without one, `current` never expires.
    #[serde(default)]
    pub next: Option<ExchangeRate>,
}

impl ExchangeRateSet {
    /// Rate active at `now`.
    pub fn active_at(&self, now: Timestamp) -> ExchangeRate {
        match self.next {
            Some(next) if now.seconds >= self.current.expiration_time => next,
            _ => self.current,
        }
    }
}

/// Exchange rates plus the price of every operation class.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    /// Rates used to convert tinycents to tinybars.
    #[serde(default)]
    pub exchange_rates: ExchangeRateSet,
    /// Price per class. A class missing here cannot be quoted.
    #[serde(default)]
    pub prices: BTreeMap<PricedOperation, OperationPrice>,
}

/// A priced operation at a given consensus time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    /// Metered fee in tinycents.
    pub components: FeeComponents,
    /// Floor in tinycents.
    pub minimum: u64,
    /// Rate active at the quoted consensus time.
    pub rate: ExchangeRate,
}

/// Outcome of reconciling attached value against a quote. All amounts are
/// tinybars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// Fee taken out of the attached value.
    pub charge: u64,
    /// Attached value above the fee, returned to the sender.
    pub refund_to_sender: u64,
    /// Credit to the fee collection account.
    pub top_up_to_fee_collector: u64,
}
