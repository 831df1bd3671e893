//! Runtime configuration for the token service precompile.

use alloy_primitives::{address, Address};
use hts_ledger::Limits;
use hts_primitives::AccountId;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};
use thiserror::Error;

/// Address the service is deployed at.
pub const HTS_PRECOMPILE_ADDR: Address = address!("0x0000000000000000000000000000000000000167");

/// Account receiving fees for entity-creating calls.
pub const DEFAULT_FUNDING_ACCOUNT: AccountId = AccountId::from_num(98);

/// Gas charged for input that cannot be decoded.
pub const DEFAULT_GAS_COST: u64 = 10_000;

/// Feature switches and limits of the precompile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HtsConfig {
    /// Address the precompile answers at.
    pub precompile_address: Address,
    /// Fee collector for entity-creating calls.
    pub funding_account: AccountId,
    /// Gas charged for undecodable input and static-frame rejections.
    pub default_gas_cost: u64,
    /// Tinybars per unit of gas used to convert fees into gas.
    pub gas_price_tinybars: u64,
    /// Whether approvals and allowance-based transfers are served.
    pub allowances_enabled: bool,
    /// Whether token creation is served.
    pub token_create_enabled: bool,
    /// Whether calls through a token's own address are served.
    pub redirect_enabled: bool,
    /// Whether read-only selectors may be served from a static frame.
    pub static_queries_enabled: bool,
    /// Whether the ABI return data is copied into the synthetic record.
    pub export_call_results: bool,
    /// Maximum NFTs minted per call.
    pub max_batch_size_mint: usize,
    /// Maximum NFTs wiped per call.
    pub max_batch_size_wipe: usize,
    /// Maximum metadata bytes per NFT.
    pub max_nft_metadata_bytes: usize,
    /// Maximum token relationships per account.
    pub max_tokens_per_account: u32,
    /// Maximum allowance entries per account.
    pub max_allowances_per_account: usize,
    /// Maximum UTF-8 bytes of a token name.
    pub max_token_name_bytes: usize,
    /// Maximum UTF-8 bytes of a token symbol.
    pub max_token_symbol_bytes: usize,
}

impl Default for HtsConfig {
    fn default() -> Self {
        Self {
            precompile_address: HTS_PRECOMPILE_ADDR,
            funding_account: DEFAULT_FUNDING_ACCOUNT,
            default_gas_cost: DEFAULT_GAS_COST,
            gas_price_tinybars: 71,
            allowances_enabled: true,
            token_create_enabled: true,
            redirect_enabled: true,
            static_queries_enabled: false,
            export_call_results: true,
            max_batch_size_mint: 10,
            max_batch_size_wipe: 10,
            max_nft_metadata_bytes: 100,
            max_tokens_per_account: 1000,
            max_allowances_per_account: 100,
            max_token_name_bytes: 100,
            max_token_symbol_bytes: 100,
        }
    }
}

impl HtsConfig {
    /// Ledger limits derived from this configuration.
    pub const fn limits(&self) -> Limits {
        Limits {
            max_tokens_per_account: self.max_tokens_per_account,
            max_allowances_per_account: self.max_allowances_per_account,
        }
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gas_price_tinybars == 0 {
            return Err(ConfigError::Invalid { field: "gasPriceTinybars", reason: "must be non-zero" });
        }
        if self.precompile_address.is_zero() {
            return Err(ConfigError::Invalid { field: "precompileAddress", reason: "must be set" });
        }
        if self.max_batch_size_mint == 0 {
            return Err(ConfigError::Invalid { field: "maxBatchSizeMint", reason: "must be non-zero" });
        }
        if self.max_batch_size_wipe == 0 {
            return Err(ConfigError::Invalid { field: "maxBatchSizeWipe", reason: "must be non-zero" });
        }
        Ok(())
    }

    /// Reads the `hts` object of a JSON document, falling back to defaults
    /// for absent fields.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let config = match value.get("hts") {
            Some(section) => Self::deserialize(section).map_err(ConfigError::Json)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates a configuration from `HTS_*` environment variables. Unset
    /// variables keep their defaults.
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();
        if let Some(addr) = optional_var::<Address>("HTS_PRECOMPILE_ADDR")? {
            config.precompile_address = addr;
        }
        if let Some(account) = optional_var::<AccountId>("HTS_FUNDING_ACCOUNT")? {
            config.funding_account = account;
        }
        if let Some(gas) = optional_var("HTS_DEFAULT_GAS_COST")? {
            config.default_gas_cost = gas;
        }
        if let Some(price) = optional_var("HTS_GAS_PRICE_TINYBARS")? {
            config.gas_price_tinybars = price;
        }
        if let Some(flag) = optional_var("HTS_ALLOWANCES_ENABLED")? {
            config.allowances_enabled = flag;
        }
        if let Some(flag) = optional_var("HTS_TOKEN_CREATE_ENABLED")? {
            config.token_create_enabled = flag;
        }
        if let Some(flag) = optional_var("HTS_REDIRECT_ENABLED")? {
            config.redirect_enabled = flag;
        }
        if let Some(flag) = optional_var("HTS_STATIC_QUERIES_ENABLED")? {
            config.static_queries_enabled = flag;
        }
        if let Some(flag) = optional_var("HTS_EXPORT_CALL_RESULTS")? {
            config.export_call_results = flag;
        }
        if let Some(max) = optional_var("HTS_MAX_BATCH_SIZE_MINT")? {
            config.max_batch_size_mint = max;
        }
        if let Some(max) = optional_var("HTS_MAX_BATCH_SIZE_WIPE")? {
            config.max_batch_size_wipe = max;
        }
        if let Some(max) = optional_var("HTS_MAX_NFT_METADATA_BYTES")? {
            config.max_nft_metadata_bytes = max;
        }
        if let Some(max) = optional_var("HTS_MAX_TOKENS_PER_ACCOUNT")? {
            config.max_tokens_per_account = max;
        }
        if let Some(max) = optional_var("HTS_MAX_ALLOWANCES_PER_ACCOUNT")? {
            config.max_allowances_per_account = max;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Errors that can occur while building an [`HtsConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The variable was set but empty or whitespace.
    #[error("environment variable {var} is empty")]
    EmptyEnv {
        /// Name of the variable.
        var: &'static str,
    },
    /// The variable could not be parsed.
    #[error("environment variable {var} is invalid: {reason}")]
    InvalidEnv {
        /// Name of the variable.
        var: &'static str,
        /// Parser message.
        reason: String,
    },
    /// A field holds a value the engine cannot run with.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// camelCase field name.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The JSON section did not deserialize.
    #[error("invalid hts config: {0}")]
    Json(#[source] serde_json::Error),
}

fn optional_var<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = env::var(var) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::EmptyEnv { var });
    }
    raw.parse()
        .map(Some)
        .map_err(|err: T::Err| ConfigError::InvalidEnv { var, reason: err.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_the_protocol() {
        let cfg = HtsConfig::default();
        assert_eq!(cfg.precompile_address, HTS_PRECOMPILE_ADDR);
        assert_eq!(cfg.funding_account.to_string(), "0.0.98");
        assert_eq!(cfg.max_batch_size_mint, 10);
        assert_eq!(cfg.max_batch_size_wipe, 10);
        assert!(!cfg.static_queries_enabled);
        cfg.validate().unwrap();
    }

    #[test]
    fn json_overrides_individual_fields() {
        let cfg = HtsConfig::from_json(&json!({
            "hts": { "allowancesEnabled": false, "fundingAccount": "0.0.800", "maxBatchSizeMint": 3 }
        }))
        .unwrap();
        assert!(!cfg.allowances_enabled);
        assert_eq!(cfg.funding_account, AccountId::from_num(800));
        assert_eq!(cfg.max_batch_size_mint, 3);
        assert!(cfg.token_create_enabled);
    }

    #[test]
    fn missing_section_is_default() {
        assert_eq!(HtsConfig::from_json(&json!({})).unwrap(), HtsConfig::default());
    }

    #[test]
    fn zero_gas_price_is_rejected() {
        let err = HtsConfig::from_json(&json!({ "hts": { "gasPriceTinybars": 0 } })).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "gasPriceTinybars", .. }));
    }

    #[test]
    fn from_env_reads_overrides() {
        // Only variables unique to this test are touched.
        std::env::set_var("HTS_MAX_NFT_METADATA_BYTES", " 64 ");
        let cfg = HtsConfig::from_env().unwrap();
        std::env::remove_var("HTS_MAX_NFT_METADATA_BYTES");
        assert_eq!(cfg.max_nft_metadata_bytes, 64);
    }
}
