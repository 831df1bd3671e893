//! Conversions between ledger records and ABI structs.

use super::address_of;
use crate::{abi::IHederaTokenService as Hts, failure::Failure};
use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use hts_ledger::{LedgerSnapshot, LedgerView, Token};
use hts_primitives::{
    AccountId, CustomFee, FeeKind, FixedFee, FractionalFee, Key, ResponseCode, RoyaltyFee,
    TokenId, TokenKeyType, TokenSupplyType,
};
use std::collections::BTreeMap;

/// Ledger id reported in token info.
const LEDGER_ID: &str = "0x03";

/// Key a caller's `inheritAccountKey` stands for: the sender's own key, or
/// its contract id when it has none.
pub(super) fn inherited_key(ledger: &LedgerSnapshot<'_>, sender: &AccountId) -> Key {
    ledger
        .account(sender)
        .and_then(|account| account.key.clone())
        .unwrap_or(Key::ContractId(*sender))
}

/// Converts an ABI key value. Exactly one variant must be set; `inherit`
/// stands for the account key the caller would otherwise have to repeat.
pub(super) fn key_from_abi(value: &Hts::KeyValue, inherit: &Key) -> Result<Key, Failure> {
    let mut found = Vec::with_capacity(1);
    if value.inheritAccountKey {
        found.push(inherit.clone());
    }
    if !value.contractId.is_zero() {
        found.push(Key::ContractId(AccountId::from_evm_address(&value.contractId)));
    }
    if !value.ed25519.is_empty() {
        let raw: [u8; 32] = value
            .ed25519
            .as_ref()
            .try_into()
            .map_err(|_| Failure::from(ResponseCode::InvalidTransactionBody))?;
        found.push(Key::Ed25519(FixedBytes(raw)));
    }
    if !value.ECDSA_secp256k1.is_empty() {
        let raw: [u8; 33] = value
            .ECDSA_secp256k1
            .as_ref()
            .try_into()
            .map_err(|_| Failure::from(ResponseCode::InvalidTransactionBody))?;
        found.push(Key::EcdsaSecp256k1(FixedBytes(raw)));
    }
    if !value.delegatableContractId.is_zero() {
        found.push(Key::DelegatableContractId(AccountId::from_evm_address(
            &value.delegatableContractId,
        )));
    }
    match found.len() {
        1 => Ok(found.remove(0)),
        _ => Err(ResponseCode::InvalidTransactionBody.into()),
    }
}

/// Converts a ledger key. Lists and thresholds have no ABI form and come out
/// empty.
pub(super) fn key_to_abi(key: Option<&Key>) -> Hts::KeyValue {
    let mut value = Hts::KeyValue {
        inheritAccountKey: false,
        contractId: Address::ZERO,
        ed25519: Bytes::new(),
        ECDSA_secp256k1: Bytes::new(),
        delegatableContractId: Address::ZERO,
    };
    match key {
        Some(Key::ContractId(id)) => value.contractId = id.to_evm_address(),
        Some(Key::DelegatableContractId(id)) => value.delegatableContractId = id.to_evm_address(),
        Some(Key::Ed25519(raw)) => value.ed25519 = Bytes::copy_from_slice(raw.as_slice()),
        Some(Key::EcdsaSecp256k1(raw)) => {
            value.ECDSA_secp256k1 = Bytes::copy_from_slice(raw.as_slice())
        }
        Some(Key::KeyList(_) | Key::Threshold { .. }) | None => {}
    }
    value
}

/// Parses a token key list. Every entry's bitfield must be non-zero, within
/// range, and disjoint from every other entry's.
pub(super) fn keys_from_abi(
    keys: &[Hts::TokenKey],
    inherit: &Key,
) -> Result<BTreeMap<TokenKeyType, Key>, Failure> {
    let mut seen = 0u64;
    let mut out = BTreeMap::new();
    for entry in keys {
        let bits = u64::try_from(entry.keyType)
            .map_err(|_| Failure::from(ResponseCode::InvalidTransactionBody))?;
        let roles = TokenKeyType::decompose(bits)
            .ok_or(Failure::from(ResponseCode::InvalidTransactionBody))?;
        if seen & bits != 0 {
            return Err(ResponseCode::InvalidTransactionBody.into());
        }
        seen |= bits;
        let key = key_from_abi(&entry.key, inherit)?;
        for role in roles {
            out.insert(role, key.clone());
        }
    }
    Ok(out)
}

fn token_key_list(token: &Token) -> Vec<Hts::TokenKey> {
    token
        .keys
        .iter()
        .map(|(role, key)| Hts::TokenKey { keyType: U256::from(role.bit()), key: key_to_abi(Some(key)) })
        .collect()
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn optional_address(ledger: &LedgerSnapshot<'_>, id: Option<&AccountId>) -> Address {
    id.map_or(Address::ZERO, |id| address_of(ledger, id))
}

pub(super) fn expiry_to_abi(ledger: &LedgerSnapshot<'_>, token: &Token) -> Hts::Expiry {
    Hts::Expiry {
        second: saturating_u32(token.expiry),
        autoRenewAccount: optional_address(ledger, token.auto_renew_account.as_ref()),
        autoRenewPeriod: saturating_u32(token.auto_renew_period),
    }
}

pub(super) fn token_to_abi(ledger: &LedgerSnapshot<'_>, token: &Token) -> Hts::HederaToken {
    Hts::HederaToken {
        name: token.name.clone(),
        symbol: token.symbol.clone(),
        treasury: address_of(ledger, &token.treasury),
        memo: token.memo.clone(),
        tokenSupplyType: token.supply_type == TokenSupplyType::Finite,
        maxSupply: saturating_u32(token.max_supply),
        freezeDefault: token.freeze_default,
        tokenKeys: token_key_list(token),
        expiry: expiry_to_abi(ledger, token),
    }
}

/// ABI views of a token's custom fees, split by kind.
pub(super) fn fees_to_abi(
    ledger: &LedgerSnapshot<'_>,
    token: &Token,
) -> (Vec<Hts::FixedFee>, Vec<Hts::FractionalFee>, Vec<Hts::RoyaltyFee>) {
    let mut fixed = Vec::new();
    let mut fractional = Vec::new();
    let mut royalty = Vec::new();
    for fee in &token.custom_fees {
        let collector = address_of(ledger, &fee.collector);
        match &fee.kind {
            FeeKind::Fixed(f) => fixed.push(Hts::FixedFee {
                amount: f.amount,
                tokenId: f.denominating_token.map_or(Address::ZERO, |t| t.to_evm_address()),
                useHbarsForPayment: f.denominating_token.is_none(),
                useCurrentTokenForPayment: f.denominating_token == Some(token.id),
                feeCollector: collector,
            }),
            FeeKind::Fractional(f) => fractional.push(Hts::FractionalFee {
                numerator: f.numerator,
                denominator: f.denominator,
                minimumAmount: f.minimum_amount,
                maximumAmount: f.maximum_amount,
                netOfTransfers: f.net_of_transfers,
                feeCollector: collector,
            }),
            FeeKind::Royalty(r) => {
                let fallback = r.fallback.as_ref();
                royalty.push(Hts::RoyaltyFee {
                    numerator: r.numerator,
                    denominator: r.denominator,
                    amount: fallback.map_or(0, |f| f.amount),
                    tokenId: fallback
                        .and_then(|f| f.denominating_token)
                        .map_or(Address::ZERO, |t| t.to_evm_address()),
                    useHbarsForPayment: fallback.is_some_and(|f| f.denominating_token.is_none()),
                    feeCollector: collector,
                })
            }
        }
    }
    (fixed, fractional, royalty)
}

pub(super) fn info_to_abi(ledger: &LedgerSnapshot<'_>, token: &Token) -> Hts::TokenInfo {
    let (fixed_fees, fractional_fees, royalty_fees) = fees_to_abi(ledger, token);
    Hts::TokenInfo {
        token: token_to_abi(ledger, token),
        totalSupply: saturating_i64(token.total_supply),
        deleted: token.deleted,
        defaultKycStatus: token.kyc_granted_by_default(),
        pauseStatus: token.paused,
        fixedFees: fixed_fees,
        fractionalFees: fractional_fees,
        royaltyFees: royalty_fees,
        ledgerId: LEDGER_ID.to_string(),
    }
}

fn collector(ledger: &LedgerSnapshot<'_>, address: &Address) -> Result<AccountId, Failure> {
    Ok(ledger.resolve_account(address)?)
}

/// Denomination of a fixed fee: at most one of an explicit token, hbar, or
/// the token being created.
fn denomination(
    token: &Address,
    use_hbar: bool,
    use_current: bool,
    current: TokenId,
) -> Result<Option<TokenId>, Failure> {
    let explicit = !token.is_zero();
    if [explicit, use_hbar, use_current].iter().filter(|b| **b).count() > 1 {
        return Err(ResponseCode::InvalidTransactionBody.into());
    }
    Ok(if explicit {
        Some(TokenId::from_evm_address(token))
    } else if use_current {
        Some(current)
    } else {
        None
    })
}

fn check_fraction(numerator: i64, denominator: i64) -> Result<(), Failure> {
    if numerator <= 0 || denominator <= 0 {
        return Err(ResponseCode::CustomFeeMustBePositive.into());
    }
    if numerator > denominator {
        return Err(ResponseCode::CustomFeeOutsideNumericRange.into());
    }
    Ok(())
}

/// Parses and validates the custom fees of a token being created as `current`.
pub(super) fn fees_from_abi(
    ledger: &LedgerSnapshot<'_>,
    current: TokenId,
    fixed: &[Hts::FixedFee],
    fractional: &[Hts::FractionalFee],
    royalty: &[Hts::RoyaltyFee],
) -> Result<Vec<CustomFee>, Failure> {
    let mut fees = Vec::with_capacity(fixed.len() + fractional.len() + royalty.len());
    for f in fixed {
        if f.amount <= 0 {
            return Err(ResponseCode::CustomFeeMustBePositive.into());
        }
        fees.push(CustomFee {
            kind: FeeKind::Fixed(FixedFee {
                amount: f.amount,
                denominating_token: denomination(
                    &f.tokenId,
                    f.useHbarsForPayment,
                    f.useCurrentTokenForPayment,
                    current,
                )?,
            }),
            collector: collector(ledger, &f.feeCollector)?,
        });
    }
    for f in fractional {
        check_fraction(f.numerator, f.denominator)?;
        if f.minimumAmount < 0 || f.maximumAmount < 0 {
            return Err(ResponseCode::CustomFeeMustBePositive.into());
        }
        if f.maximumAmount != 0 && f.minimumAmount > f.maximumAmount {
            return Err(ResponseCode::CustomFeeOutsideNumericRange.into());
        }
        fees.push(CustomFee {
            kind: FeeKind::Fractional(FractionalFee {
                numerator: f.numerator,
                denominator: f.denominator,
                minimum_amount: f.minimumAmount,
                maximum_amount: f.maximumAmount,
                net_of_transfers: f.netOfTransfers,
            }),
            collector: collector(ledger, &f.feeCollector)?,
        });
    }
    for r in royalty {
        check_fraction(r.numerator, r.denominator)?;
        if r.amount < 0 {
            return Err(ResponseCode::CustomFeeMustBePositive.into());
        }
        let fallback = if r.amount > 0 {
            Some(FixedFee {
                amount: r.amount,
                denominating_token: denomination(&r.tokenId, r.useHbarsForPayment, false, current)?,
            })
        } else {
            None
        };
        fees.push(CustomFee {
            kind: FeeKind::Royalty(RoyaltyFee {
                numerator: r.numerator,
                denominator: r.denominator,
                fallback,
            }),
            collector: collector(ledger, &r.feeCollector)?,
        });
    }
    Ok(fees)
}
