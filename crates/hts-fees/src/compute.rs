//! Quoting and gas conversion.

use crate::types::*;
use hts_primitives::Timestamp;
use thiserror::Error;

/// Gas premium applied on top of the converted fee: 1/5, i.e. 20%.
pub const GAS_PREMIUM_DIVISOR: u64 = 5;

/// Errors raised while pricing a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    /// The schedule has no entry for the class.
    #[error("no price configured for {0:?}")]
    MissingPrice(PricedOperation),
    /// A zero gas price cannot convert tinybars to gas.
    #[error("gas price must be non-zero")]
    ZeroGasPrice,
    /// The call attached less value than the quoted fee.
    #[error("attached value {attached} below required {required} tinybars")]
    InsufficientValue {
        /// Quoted fee in tinybars.
        required: u64,
        /// Value the call carried, in tinybars.
        attached: u64,
    },
}

/// tinybars = tinycents * hbar_equiv / cent_equiv, saturating.
#[inline]
pub fn tinycents_to_tinybars(tinycents: u64, rate: &ExchangeRate) -> u64 {
    let num = (tinycents as u128).saturating_mul(rate.hbar_equiv as u128);
    match num.checked_div(rate.cent_equiv as u128) {
        Some(v) => u64::try_from(v).unwrap_or(u64::MAX),
        None => u64::MAX,
    }
}

impl FeeQuote {
    /// node + network + service, in tinybars at the quoted rate.
    pub fn total_tinybars(&self) -> u64 {
        tinycents_to_tinybars(self.components.total(), &self.rate)
    }

    /// The floor in tinybars at the quoted rate.
    pub fn minimum_tinybars(&self) -> u64 {
        tinycents_to_tinybars(self.minimum, &self.rate)
    }

    /// The larger of the metered fee and the floor.
    pub fn chargeable_tinybars(&self) -> u64 {
        self.total_tinybars().max(self.minimum_tinybars())
    }
}

/// Prices `op` with the exchange rate active at `now`.
pub fn quote(
    schedule: &FeeSchedule,
    op: PricedOperation,
    now: Timestamp,
) -> Result<FeeQuote, FeeError> {
    let price = schedule
        .prices
        .get(&op)
        .ok_or(FeeError::MissingPrice(op))?;
    let rate = schedule.exchange_rates.active_at(now);
    tracing::trace!(target: "hts::fees", ?op, %now, total = price.components.total(), "quoted");
    Ok(FeeQuote { components: price.components, minimum: price.minimum, rate })
}

/// Gas the VM must charge: ceil(chargeable / gas_price) plus the premium.
#[inline]
pub fn gas_requirement(quote: &FeeQuote, gas_price_tinybars: u64) -> Result<u64, FeeError> {
    if gas_price_tinybars == 0 {
        return Err(FeeError::ZeroGasPrice);
    }
    let base = quote.chargeable_tinybars().div_ceil(gas_price_tinybars);
    Ok(base.saturating_add(base / GAS_PREMIUM_DIVISOR))
}

/// Reconciles value attached to an entity-creating call against its quote.
///
/// The full quoted fee is charged and topped up to the fee collector; the
/// rest of the attached value goes back to the sender.
pub fn reconcile(call_value: u64, quote: &FeeQuote) -> Result<Reconciliation, FeeError> {
    let charge = quote.total_tinybars();
    if call_value < charge {
        return Err(FeeError::InsufficientValue { required: charge, attached: call_value });
    }
    Ok(Reconciliation {
        charge,
        refund_to_sender: call_value - charge,
        top_up_to_fee_collector: charge,
    })
}
