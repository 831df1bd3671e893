use super::{convert, CallContext, Executed};
use crate::{
    auth::Authority,
    codec::SUCCESS_CODE,
    failure::Failure,
    operation::{check_i64, TokenCreate},
    records::SideEffects,
};
use alloy_primitives::U256;
use alloy_sol_types::SolValue;
use hts_ledger::{LedgerSnapshot, RelKey, Token, TokenRelation};
use hts_primitives::{ResponseCode, TokenId, TokenKeyType, TokenSupplyType, TokenType};

/// Auto-renew period applied when the caller leaves it unset: 90 days.
const DEFAULT_AUTO_RENEW_PERIOD: u64 = 7_776_000;

fn check_text(
    value: &str,
    max: usize,
    missing: ResponseCode,
    too_long: ResponseCode,
) -> Result<(), Failure> {
    if value.is_empty() {
        return Err(missing.into());
    }
    if value.len() > max {
        return Err(too_long.into());
    }
    Ok(())
}

fn check_i32(value: &U256) -> Result<u32, Failure> {
    u32::try_from(*value)
        .ok()
        .filter(|v| i32::try_from(*v).is_ok())
        .ok_or_else(|| ResponseCode::InvalidTransactionBody.into())
}

pub(super) fn create(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    create: &TokenCreate,
) -> Result<Executed, Failure> {
    if !cx.config.token_create_enabled {
        return Err(ResponseCode::NotSupported.into());
    }
    let reconciliation = hts_fees::reconcile(cx.value, cx.quote)?;

    let shape = &create.token;
    let initial_supply = check_i64(&create.initial_supply, ResponseCode::InvalidTransactionBody)?;
    let decimals = check_i32(&create.decimals)?;
    let initial_supply = initial_supply.unsigned_abs();
    if create.non_fungible && (initial_supply != 0 || decimals != 0) {
        return Err(ResponseCode::InvalidTokenInitialSupply.into());
    }
    check_text(
        &shape.name,
        cx.config.max_token_name_bytes,
        ResponseCode::MissingTokenName,
        ResponseCode::TokenNameTooLong,
    )?;
    check_text(
        &shape.symbol,
        cx.config.max_token_symbol_bytes,
        ResponseCode::MissingTokenSymbol,
        ResponseCode::TokenSymbolTooLong,
    )?;
    let treasury = ledger
        .resolve_account(&shape.treasury)
        .ok()
        .filter(|id| ledger.account_exists(id))
        .ok_or(Failure::from(ResponseCode::InvalidTreasuryAccountForToken))?;

    let sender = cx.sender();
    let inherit = convert::inherited_key(ledger, &sender);
    let keys = convert::keys_from_abi(&shape.tokenKeys, &inherit)?;
    if create.non_fungible && !keys.contains_key(&TokenKeyType::Supply) {
        return Err(ResponseCode::TokenHasNoSupplyKey.into());
    }

    let (supply_type, max_supply) = if shape.tokenSupplyType {
        let max = u64::from(shape.maxSupply);
        if max == 0 {
            return Err(ResponseCode::InvalidTokenMaxSupply.into());
        }
        if initial_supply > max {
            return Err(ResponseCode::InvalidTokenInitialSupply.into());
        }
        (TokenSupplyType::Finite, max)
    } else {
        if shape.maxSupply != 0 {
            return Err(ResponseCode::InvalidTokenMaxSupply.into());
        }
        (TokenSupplyType::Infinite, 0)
    };

    cx.require(&Authority::AccountKey(treasury), ledger)?;
    if let Some(admin) = keys.get(&TokenKeyType::Admin).filter(|key| key.is_cryptographic()) {
        cx.require(&Authority::CryptoKey(admin.clone()), ledger)?;
    }

    let auto_renew_account = if shape.expiry.autoRenewAccount.is_zero() {
        sender
    } else {
        let account = ledger.resolve_account(&shape.expiry.autoRenewAccount)?;
        if account != sender {
            cx.require(&Authority::AccountKey(account), ledger)?;
        }
        account
    };
    let auto_renew_period = match u64::from(shape.expiry.autoRenewPeriod) {
        0 => DEFAULT_AUTO_RENEW_PERIOD,
        period => period,
    };
    let expiry = match u64::from(shape.expiry.second) {
        0 => cx.now.seconds.saturating_add(auto_renew_period),
        second => second,
    };

    let id = TokenId::new(0, 0, ledger.allocate_entity_num());
    let custom_fees = convert::fees_from_abi(
        ledger,
        id,
        &create.fixed_fees,
        &create.fractional_fees,
        &create.royalty_fees,
    )?;
    ledger.put_token(Token {
        id,
        name: shape.name.clone(),
        symbol: shape.symbol.clone(),
        memo: shape.memo.clone(),
        token_type: if create.non_fungible {
            TokenType::NonFungibleUnique
        } else {
            TokenType::FungibleCommon
        },
        supply_type,
        decimals,
        total_supply: initial_supply,
        max_supply,
        treasury,
        keys,
        freeze_default: shape.freezeDefault,
        deleted: false,
        paused: false,
        custom_fees,
        expiry,
        auto_renew_account: Some(auto_renew_account),
        auto_renew_period,
        last_used_serial: 0,
    });
    ledger.associate(&treasury, &[id], &cx.config.limits())?;
    ledger.put_relation(
        RelKey::new(treasury, id),
        TokenRelation {
            balance: initial_supply,
            frozen: false,
            kyc_granted: true,
            automatic_association: false,
        },
    );

    for (account, amount) in
        hts_fees::credit_plan(&reconciliation, sender, cx.config.funding_account)
    {
        ledger.credit_hbar(&account, amount)?;
    }

    tracing::info!(
        target: "hts::dispatch",
        token = %id,
        %treasury,
        initial_supply,
        charged = reconciliation.charge,
        refunded = reconciliation.refund_to_sender,
        "token created"
    );
    Ok(Executed {
        output: (SUCCESS_CODE, id.to_evm_address()).abi_encode_params().into(),
        effects: SideEffects {
            created_token: Some(id),
            value_charged: reconciliation.charge,
            ..Default::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_must_fit_a_signed_word() {
        assert_eq!(check_i32(&U256::from(8)).unwrap(), 8);
        assert!(check_i32(&U256::from(u64::from(i32::MAX as u32) + 1)).is_err());
        assert!(check_i32(&U256::MAX).is_err());
    }

    #[test]
    fn names_are_required_and_bounded() {
        let missing = ResponseCode::MissingTokenName;
        let long = ResponseCode::TokenNameTooLong;
        assert_eq!(check_text("", 3, missing, long).unwrap_err().status, missing);
        assert_eq!(check_text("abcd", 3, missing, long).unwrap_err().status, long);
        assert!(check_text("abc", 3, missing, long).is_ok());
    }
}
