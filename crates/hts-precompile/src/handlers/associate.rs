use super::{CallContext, Executed};
use crate::{auth::Authority, codec, failure::Failure};
use alloy_primitives::Address;
use hts_ledger::LedgerSnapshot;
use hts_primitives::{ResponseCode, TokenId};

pub(super) fn associate(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    account: &Address,
    tokens: &[TokenId],
) -> Result<Executed, Failure> {
    let account = ledger.resolve_account(account)?;
    cx.require(&Authority::AccountKey(account), ledger)?;
    ledger.associate(&account, tokens, &cx.config.limits())?;
    tracing::info!(target: "hts::dispatch", %account, ?tokens, "associated");
    Ok(Executed::output(codec::encode_status(ResponseCode::Success)))
}

pub(super) fn dissociate(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    account: &Address,
    tokens: &[TokenId],
) -> Result<Executed, Failure> {
    let account = ledger.resolve_account(account)?;
    cx.require(&Authority::AccountKey(account), ledger)?;
    ledger.dissociate(&account, tokens)?;
    tracing::info!(target: "hts::dispatch", %account, ?tokens, "dissociated");
    Ok(Executed::output(codec::encode_status(ResponseCode::Success)))
}
