use super::{address_of, convert, Executed};
use crate::{
    codec::{self, SUCCESS_CODE},
    failure::Failure,
    operation::{check_i64, Form, Operation},
};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolValue;
use hts_ledger::{LedgerError, LedgerSnapshot, LedgerView, Token, TokenRelation};
use hts_primitives::{NftId, ResponseCode, TokenId, TokenKeyType};
use std::borrow::Cow;

/// Loads a token for introspection. Deleted tokens stay visible here.
fn existing_token<'a>(
    ledger: &'a LedgerSnapshot<'_>,
    token: &TokenId,
) -> Result<Cow<'a, Token>, Failure> {
    ledger.token(token).ok_or_else(|| LedgerError::MissingToken(*token).into())
}

/// Relationship of `account` with `token`, or `None` when not associated.
fn relation_of<'a>(
    ledger: &'a LedgerSnapshot<'_>,
    token: &TokenId,
    account: &Address,
) -> Result<Option<Cow<'a, TokenRelation>>, Failure> {
    ledger.live_token(token)?;
    let account = ledger.resolve_account(account)?;
    match ledger.live_relation(&account, token) {
        Ok(relation) => Ok(Some(relation)),
        Err(LedgerError::NotAssociated { .. }) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn serial_of(token: &TokenId, serial: &U256) -> Result<NftId, Failure> {
    let serial = check_i64(serial, ResponseCode::InvalidTokenNftSerialNumber)?;
    Ok(NftId::new(*token, serial.unsigned_abs()))
}

pub(super) fn query(op: &Operation, ledger: &LedgerSnapshot<'_>) -> Result<Executed, Failure> {
    let output: Bytes = match op {
        Operation::BalanceOf { token, account } => {
            let balance = relation_of(ledger, token, account)?.map_or(0, |rel| rel.balance);
            codec::encode_query(Form::Erc, U256::from(balance))
        }
        Operation::OwnerOf { token, serial } => {
            let owner = ledger.live_nft(&serial_of(token, serial)?)?.owner;
            codec::encode_query(Form::Erc, address_of(ledger, &owner))
        }
        Operation::TokenUri { token, serial } => {
            ledger.live_token(token)?;
            let uri = ledger
                .nft(&serial_of(token, serial)?)
                .map_or_else(|| codec::MISSING_TOKEN_URI.to_string(), |nft| {
                    String::from_utf8_lossy(&nft.metadata).into_owned()
                });
            codec::encode_query(Form::Erc, uri)
        }
        Operation::Name { token } => {
            codec::encode_query(Form::Erc, ledger.live_token(token)?.name.clone())
        }
        Operation::Symbol { token } => {
            codec::encode_query(Form::Erc, ledger.live_token(token)?.symbol.clone())
        }
        Operation::Decimals { token } => {
            let decimals = u8::try_from(ledger.live_token(token)?.decimals)
                .map_err(|_| Failure::from(ResponseCode::InvalidTokenDecimals))?;
            codec::encode_query(Form::Erc, U256::from(decimals))
        }
        Operation::TotalSupply { token } => {
            codec::encode_query(Form::Erc, U256::from(ledger.live_token(token)?.total_supply))
        }
        Operation::IsToken { token } => {
            codec::encode_query(Form::Native, ledger.token(token).is_some())
        }
        Operation::TokenType { token } => {
            codec::encode_query(Form::Native, existing_token(ledger, token)?.token_type.code())
        }
        Operation::TokenKey { token, key_type } => {
            let role = u64::try_from(*key_type)
                .ok()
                .and_then(TokenKeyType::from_bit)
                .ok_or(Failure::from(ResponseCode::InvalidTransactionBody))?;
            let token = existing_token(ledger, token)?;
            codec::encode_query(Form::Native, convert::key_to_abi(token.key(role)))
        }
        Operation::TokenInfo { token } => {
            let token = existing_token(ledger, token)?;
            codec::encode_query(Form::Native, convert::info_to_abi(ledger, &token))
        }
        Operation::TokenCustomFees { token } => {
            let token = existing_token(ledger, token)?;
            let (fixed, fractional, royalty) = convert::fees_to_abi(ledger, &token);
            (SUCCESS_CODE, fixed, fractional, royalty).abi_encode_params().into()
        }
        Operation::DefaultKycStatus { token } => {
            let token = existing_token(ledger, token)?;
            codec::encode_query(Form::Native, token.kyc_granted_by_default())
        }
        Operation::DefaultFreezeStatus { token } => {
            codec::encode_query(Form::Native, existing_token(ledger, token)?.freeze_default)
        }
        Operation::TokenExpiryInfo { token } => {
            let token = existing_token(ledger, token)?;
            codec::encode_query(Form::Native, convert::expiry_to_abi(ledger, &token))
        }
        Operation::IsFrozen { token, account } => {
            let frozen = relation_of(ledger, token, account)?.is_some_and(|rel| rel.frozen);
            codec::encode_query(Form::Native, frozen)
        }
        Operation::IsKyc { token, account } => {
            let granted = relation_of(ledger, token, account)?.is_some_and(|rel| rel.kyc_granted);
            codec::encode_query(Form::Native, granted)
        }
        _ => return Err(ResponseCode::FailInvalid.into()),
    };
    Ok(Executed::output(output))
}
