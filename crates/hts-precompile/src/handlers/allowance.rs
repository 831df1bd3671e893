use super::{address_of, CallContext, Executed};
use crate::{
    auth::{Authority, Grant},
    codec,
    failure::Failure,
    operation::{check_i64, Form, Operation},
};
use alloy_primitives::{Address, U256};
use hts_ledger::{LedgerError, LedgerSnapshot};
use hts_primitives::{AccountId, NftId, ResponseCode, TokenId};

fn resolve_as(
    ledger: &LedgerSnapshot<'_>,
    address: &Address,
    status: ResponseCode,
) -> Result<AccountId, Failure> {
    ledger.resolve_account(address).map_err(|_| Failure::from(status))
}

/// The owner must be associated with the token it approves.
fn require_association(
    ledger: &LedgerSnapshot<'_>,
    owner: &AccountId,
    token: &TokenId,
) -> Result<(), Failure> {
    ledger.live_relation(owner, token)?;
    Ok(())
}

pub(super) fn approve(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token: &TokenId,
    spender: &Address,
    amount: &U256,
    form: Form,
) -> Result<Executed, Failure> {
    let amount = check_i64(amount, ResponseCode::NegativeAllowanceAmount)?.unsigned_abs();
    if amount != 0 && !cx.config.allowances_enabled {
        return Err(ResponseCode::NotSupported.into());
    }
    if ledger.live_token(token)?.token_type.is_nft() {
        return Err(ResponseCode::NftInFungibleTokenAllowances.into());
    }
    let owner = cx.sender();
    cx.require(&Authority::AccountKey(owner), ledger)?;
    let spender = resolve_as(ledger, spender, ResponseCode::InvalidAllowanceSpenderId)?;
    if spender == owner {
        return Err(ResponseCode::SpenderAccountSameAsOwner.into());
    }
    require_association(ledger, &owner, token)?;
    ledger.set_fungible_allowance(&owner, token, &spender, amount, &cx.config.limits())?;
    tracing::info!(target: "hts::dispatch", %token, %owner, %spender, amount, "approved");
    Ok(Executed::output(codec::encode_write_ack(form, true)))
}

pub(super) fn approve_nft(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token: &TokenId,
    spender: &Address,
    serial: &U256,
    form: Form,
) -> Result<Executed, Failure> {
    let revoke = spender.is_zero();
    if !revoke && !cx.config.allowances_enabled {
        return Err(ResponseCode::NotSupported.into());
    }
    if !ledger.live_token(token)?.token_type.is_nft() {
        return Err(ResponseCode::FungibleTokenInNftAllowances.into());
    }
    let serial = check_i64(serial, ResponseCode::InvalidTokenNftSerialNumber)?.unsigned_abs();
    let nft = NftId::new(*token, serial);
    let owner = ledger.live_nft(&nft)?.owner;

    // Only the owner or one of its approve-for-all operators may set or clear
    // the per-serial spender; an existing spender may not.
    match cx.gate.check(&Authority::NftDebit { nft, owner }, &cx.auth, ledger) {
        Some(Grant::Sender | Grant::Key | Grant::Operator) => {}
        _ => return Err(ResponseCode::SenderDoesNotOwnNftSerialNo.into()),
    }

    let spender = if revoke {
        None
    } else {
        let spender = resolve_as(ledger, spender, ResponseCode::InvalidAllowanceSpenderId)?;
        if spender == owner {
            return Err(ResponseCode::SpenderAccountSameAsOwner.into());
        }
        Some(spender)
    };
    ledger.set_nft_spender(&nft, spender)?;
    tracing::info!(target: "hts::dispatch", %nft, ?spender, "approved nft");
    Ok(Executed::output(codec::encode_write_ack(form, true)))
}

pub(super) fn set_approval_for_all(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token: &TokenId,
    operator: &Address,
    approved: bool,
    form: Form,
) -> Result<Executed, Failure> {
    if approved && !cx.config.allowances_enabled {
        return Err(ResponseCode::NotSupported.into());
    }
    if !ledger.live_token(token)?.token_type.is_nft() {
        return Err(ResponseCode::CannotApproveForAllFungibleCommon.into());
    }
    let owner = cx.sender();
    if cx.auth.delegate_call && approved {
        return Err(ResponseCode::DelegatingSpenderCannotGrantApproveForAll.into());
    }
    cx.require(&Authority::AccountKey(owner), ledger)?;
    let operator = resolve_as(ledger, operator, ResponseCode::InvalidAllowanceSpenderId)?;
    if operator == owner {
        return Err(ResponseCode::SpenderAccountSameAsOwner.into());
    }
    require_association(ledger, &owner, token)?;
    ledger.set_approval_for_all(&owner, token, &operator, approved, &cx.config.limits())?;
    tracing::info!(target: "hts::dispatch", %token, %owner, %operator, approved, "set approval for all");
    Ok(Executed::output(codec::encode_write_ack(form, false)))
}

/// `allowance`, `getApproved` and `isApprovedForAll`.
pub(super) fn query(op: &Operation, ledger: &LedgerSnapshot<'_>) -> Result<Executed, Failure> {
    let output = match op {
        Operation::Allowance { token, owner, spender, form } => {
            ledger.live_token(token)?;
            let owner = resolve_as(ledger, owner, ResponseCode::InvalidAllowanceOwnerId)?;
            let spender = resolve_as(ledger, spender, ResponseCode::InvalidAllowanceSpenderId)?;
            let granted = ledger.fungible_allowance(&owner, token, &spender);
            codec::encode_query(*form, U256::from(granted))
        }
        Operation::GetApproved { token, serial, form } => {
            if !ledger.live_token(token)?.token_type.is_nft() {
                return Err(ResponseCode::InvalidTokenId.into());
            }
            let serial = check_i64(serial, ResponseCode::InvalidTokenNftSerialNumber)?;
            let nft = NftId::new(*token, serial.unsigned_abs());
            let spender = ledger.live_nft(&nft)?.spender;
            let approved = spender.map_or(Address::ZERO, |id| address_of(ledger, &id));
            codec::encode_query(*form, approved)
        }
        Operation::IsApprovedForAll { token, owner, operator, form } => {
            ledger.live_token(token)?;
            let owner = resolve_as(ledger, owner, ResponseCode::InvalidAllowanceOwnerId)?;
            let approved = match ledger.resolve_account(operator) {
                Ok(operator) => ledger.is_approved_for_all(&owner, token, &operator),
                Err(LedgerError::MissingAccount(_)) => false,
                Err(err) => return Err(err.into()),
            };
            codec::encode_query(*form, approved)
        }
        _ => return Err(ResponseCode::FailInvalid.into()),
    };
    Ok(Executed::output(output))
}
