//! Fee schedule loading.

use crate::types::*;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading a fee schedule.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `hts.feeSchedule` is absent.
    #[error("missing feeSchedule config in extras")]
    Missing,
    /// The section is present but malformed or inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Reads `hts.feeSchedule` from an extras JSON blob.
///
/// Expected shape (example):
/// {
///   "hts": {
///     "feeSchedule": {
///       "exchangeRates": {
///         "current": { "hbarEquiv": 1, "centEquiv": 12, "expirationTime": 1700000000 },
///         "next": { "hbarEquiv": 1, "centEquiv": 15, "expirationTime": 1700003600 }
///       },
///       "prices": {
///         "associate": { "components": { "node": 0, "network": 0, "service": 500000000 }, "minimum": 500000000 },
///         "query": { "minimum": 10000000 }
///       }
///     }
///   }
/// }
pub fn parse_fee_schedule(extras: &Value) -> Result<FeeSchedule, ConfigError> {
    let hts = extras.get("hts").ok_or(ConfigError::Missing)?;
    let fs = hts.get("feeSchedule").ok_or(ConfigError::Missing)?;
    let schedule = serde_json::from_value::<FeeSchedule>(fs.clone())
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    validate_schedule(&schedule)?;
    Ok(schedule)
}

/// Rejects schedules whose exchange rates cannot convert fees.
pub fn validate_schedule(schedule: &FeeSchedule) -> Result<(), ConfigError> {
    let rates = &schedule.exchange_rates;
    for rate in std::iter::once(&rates.current).chain(rates.next.as_ref()) {
        if rate.cent_equiv == 0 || rate.hbar_equiv == 0 {
            return Err(ConfigError::Invalid("exchange rate parts must be non-zero".into()));
        }
    }
    Ok(())
}

/// Canonical schedule: every operation priced by its floor alone, in
/// tinycents (1 USD = 10^10 tinycents).
pub fn default_fee_schedule() -> FeeSchedule {
    const CENT: u64 = 100_000_000;
    let floors = [
        (PricedOperation::Associate, 5 * CENT),
        (PricedOperation::Dissociate, 5 * CENT),
        (PricedOperation::Mint, CENT / 10),
        (PricedOperation::MintNft, 2 * CENT),
        (PricedOperation::Burn, CENT / 10),
        (PricedOperation::Wipe, CENT / 10),
        (PricedOperation::Transfer, CENT / 10),
        (PricedOperation::TransferNft, CENT / 10),
        (PricedOperation::Approve, 5 * CENT),
        (PricedOperation::ApproveForAll, 5 * CENT),
        (PricedOperation::TokenCreate, 100 * CENT),
        (PricedOperation::TokenUpdate, 10 * CENT),
        (PricedOperation::Admin, 10 * CENT),
        (PricedOperation::Query, CENT / 10),
    ];
    FeeSchedule {
        exchange_rates: ExchangeRateSet::default(),
        prices: floors
            .into_iter()
            .map(|(op, minimum)| (op, OperationPrice { components: FeeComponents::default(), minimum }))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_schedule() {
        let extras = json!({
            "hts": {
                "feeSchedule": {
                    "exchangeRates": {
                        "current": { "hbarEquiv": 1, "centEquiv": 12, "expirationTime": 100 }
                    },
                    "prices": {
                        "associate": { "components": { "service": 1200 }, "minimum": 600 }
                    }
                }
            }
        });
        let schedule = parse_fee_schedule(&extras).unwrap();
        let price = schedule.prices[&PricedOperation::Associate];
        assert_eq!(price.components.service, 1_200);
        assert_eq!(price.minimum, 600);
        assert_eq!(schedule.exchange_rates.current.expiration_time, 100);
        assert!(schedule.exchange_rates.next.is_none());
    }

    #[test]
    fn missing_and_invalid_documents_are_reported() {
        assert!(matches!(parse_fee_schedule(&json!({})), Err(ConfigError::Missing)));
        let zero_rate = json!({
            "hts": { "feeSchedule": { "exchangeRates": {
                "current": { "hbarEquiv": 1, "centEquiv": 0, "expirationTime": 0 }
            } } }
        });
        assert!(matches!(parse_fee_schedule(&zero_rate), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn default_schedule_prices_every_operation() {
        let schedule = default_fee_schedule();
        assert_eq!(schedule.prices.len(), 14);
        assert!(schedule.prices.contains_key(&PricedOperation::Wipe));
        assert!(validate_schedule(&schedule).is_ok());
    }
}
