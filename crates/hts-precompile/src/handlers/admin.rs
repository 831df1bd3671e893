use super::{convert, CallContext, Executed};
use crate::{abi::IHederaTokenService as Hts, auth::Authority, codec, failure::Failure, operation::Operation};
use alloy_primitives::Address;
use hts_ledger::{LedgerSnapshot, RelKey, TokenRelation};
use hts_primitives::{ResponseCode, TokenId, TokenKeyType};

/// Status reported when a token lacks the key a mutation needs.
const fn missing_key_status(role: TokenKeyType) -> ResponseCode {
    match role {
        TokenKeyType::Admin => ResponseCode::TokenIsImmutable,
        TokenKeyType::Kyc => ResponseCode::TokenHasNoKycKey,
        TokenKeyType::Freeze => ResponseCode::TokenHasNoFreezeKey,
        TokenKeyType::Wipe => ResponseCode::TokenHasNoWipeKey,
        TokenKeyType::Supply => ResponseCode::TokenHasNoSupplyKey,
        TokenKeyType::Pause => ResponseCode::TokenHasNoPauseKey,
        TokenKeyType::FeeSchedule => ResponseCode::InvalidTransactionBody,
    }
}

/// Checks that the token carries `role` and that the caller holds it.
pub(super) fn require_role(
    cx: &CallContext<'_>,
    ledger: &LedgerSnapshot<'_>,
    token: &TokenId,
    role: TokenKeyType,
) -> Result<(), Failure> {
    if ledger.live_token(token)?.key(role).is_none() {
        return Err(missing_key_status(role).into());
    }
    cx.require(&Authority::TokenKey { token: *token, role }, ledger)?;
    Ok(())
}

pub(super) fn update(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token_id: &TokenId,
    info: &Hts::HederaToken,
) -> Result<Executed, Failure> {
    require_role(cx, ledger, token_id, TokenKeyType::Admin)?;
    let mut token = ledger.live_token(token_id)?.into_owned();

    if !info.name.is_empty() {
        if info.name.len() > cx.config.max_token_name_bytes {
            return Err(ResponseCode::TokenNameTooLong.into());
        }
        token.name.clone_from(&info.name);
    }
    if !info.symbol.is_empty() {
        if info.symbol.len() > cx.config.max_token_symbol_bytes {
            return Err(ResponseCode::TokenSymbolTooLong.into());
        }
        token.symbol.clone_from(&info.symbol);
    }
    if !info.memo.is_empty() {
        token.memo.clone_from(&info.memo);
    }

    if !info.tokenKeys.is_empty() {
        let inherit = convert::inherited_key(ledger, &cx.sender());
        for (role, key) in convert::keys_from_abi(&info.tokenKeys, &inherit)? {
            if !token.keys.contains_key(&role) {
                return Err(missing_key_status(role).into());
            }
            token.keys.insert(role, key);
        }
    }

    let expiry = &info.expiry;
    if expiry.second != 0 {
        if u64::from(expiry.second) < token.expiry {
            return Err(ResponseCode::InvalidTransactionBody.into());
        }
        token.expiry = u64::from(expiry.second);
    }
    if !expiry.autoRenewAccount.is_zero() {
        let account = ledger.resolve_account(&expiry.autoRenewAccount)?;
        cx.require(&Authority::AccountKey(account), ledger)?;
        token.auto_renew_account = Some(account);
    }
    if expiry.autoRenewPeriod != 0 {
        token.auto_renew_period = u64::from(expiry.autoRenewPeriod);
    }

    if !info.treasury.is_zero() {
        let treasury = ledger
            .resolve_account(&info.treasury)
            .map_err(|_| Failure::from(ResponseCode::InvalidTreasuryAccountForToken))?;
        if treasury != token.treasury {
            cx.require(&Authority::AccountKey(treasury), ledger)?;
            let old = token.treasury;
            let moved = ledger.live_relation(&old, token_id)?.balance;
            ledger.live_relation(&treasury, token_id)?;
            if moved > 0 {
                if token.token_type.is_nft() {
                    return Err(ResponseCode::TransactionRequiresZeroTokenBalances.into());
                }
                let delta = i64::try_from(moved)
                    .map_err(|_| Failure::from(ResponseCode::InvalidAccountAmounts))?;
                ledger.adjust_fungible(&old, token_id, -delta)?;
                ledger.adjust_fungible(&treasury, token_id, delta)?;
            }
            token.treasury = treasury;
        }
    }

    ledger.put_token(token);
    tracing::info!(target: "hts::dispatch", token = %token_id, "token updated");
    Ok(Executed::output(codec::encode_status(ResponseCode::Success)))
}

/// Writes a flag on an account's relationship with a token.
fn set_relation_flag(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token: &TokenId,
    account: &Address,
    role: TokenKeyType,
    apply: impl FnOnce(&mut TokenRelation),
) -> Result<(), Failure> {
    ledger.usable_token(token)?;
    require_role(cx, ledger, token, role)?;
    let account = ledger.resolve_account(account)?;
    let mut relation = ledger.live_relation(&account, token)?.into_owned();
    apply(&mut relation);
    ledger.put_relation(RelKey::new(account, *token), relation);
    Ok(())
}

pub(super) fn admin(
    op: &Operation,
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
) -> Result<Executed, Failure> {
    match op {
        Operation::Pause { token } | Operation::Unpause { token } => {
            require_role(cx, ledger, token, TokenKeyType::Pause)?;
            let mut updated = ledger.live_token(token)?.into_owned();
            updated.paused = matches!(op, Operation::Pause { .. });
            ledger.put_token(updated);
        }
        Operation::Freeze { token, account } => {
            set_relation_flag(cx, ledger, token, account, TokenKeyType::Freeze, |rel| {
                rel.frozen = true
            })?;
        }
        Operation::Unfreeze { token, account } => {
            set_relation_flag(cx, ledger, token, account, TokenKeyType::Freeze, |rel| {
                rel.frozen = false
            })?;
        }
        Operation::GrantKyc { token, account } => {
            set_relation_flag(cx, ledger, token, account, TokenKeyType::Kyc, |rel| {
                rel.kyc_granted = true
            })?;
        }
        Operation::RevokeKyc { token, account } => {
            set_relation_flag(cx, ledger, token, account, TokenKeyType::Kyc, |rel| {
                rel.kyc_granted = false
            })?;
        }
        Operation::DeleteToken { token } => {
            require_role(cx, ledger, token, TokenKeyType::Admin)?;
            let mut deleted = ledger.live_token(token)?.into_owned();
            deleted.deleted = true;
            ledger.put_token(deleted);
        }
        _ => return Err(ResponseCode::FailInvalid.into()),
    }
    tracing::info!(target: "hts::dispatch", kind = ?op.kind(), "token admin applied");
    Ok(Executed::output(codec::encode_status(ResponseCode::Success)))
}
