use super::{admin::require_role, CallContext, Executed};
use crate::{auth::Authority, codec, failure::Failure, records::SideEffects};
use alloy_primitives::{Address, Bytes};
use hts_ledger::LedgerSnapshot;
use hts_primitives::{ResponseCode, TokenId, TokenKeyType};

fn require_supply_key(
    cx: &CallContext<'_>,
    ledger: &LedgerSnapshot<'_>,
    token: &TokenId,
) -> Result<(), Failure> {
    ledger.live_token(token)?;
    cx.require(&Authority::TokenKey { token: *token, role: TokenKeyType::Supply }, ledger)?;
    Ok(())
}

pub(super) fn mint(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token: &TokenId,
    amount: u64,
    metadata: &[Bytes],
) -> Result<Executed, Failure> {
    require_supply_key(cx, ledger, token)?;
    let (supply, serials) = if metadata.is_empty() {
        (ledger.mint_fungible(token, amount)?, Vec::new())
    } else {
        if metadata.len() > cx.config.max_batch_size_mint {
            return Err(ResponseCode::BatchSizeLimitExceeded.into());
        }
        if metadata.iter().any(|m| m.len() > cx.config.max_nft_metadata_bytes) {
            return Err(ResponseCode::MetadataTooLong.into());
        }
        ledger.mint_nfts(token, metadata, cx.now)?
    };
    tracing::info!(target: "hts::dispatch", %token, amount, minted = serials.len(), supply, "minted");
    Ok(Executed {
        output: codec::encode_mint(supply, &serials),
        effects: SideEffects {
            new_total_supply: Some(supply),
            serial_numbers: serials,
            ..Default::default()
        },
    })
}

pub(super) fn burn(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token: &TokenId,
    amount: u64,
    serials: &[i64],
) -> Result<Executed, Failure> {
    require_supply_key(cx, ledger, token)?;
    let supply = if serials.is_empty() {
        ledger.burn_fungible(token, amount)?
    } else {
        let serials: Vec<u64> = serials.iter().map(|s| s.unsigned_abs()).collect();
        ledger.burn_nfts(token, &serials)?
    };
    tracing::info!(target: "hts::dispatch", %token, amount, burned = serials.len(), supply, "burned");
    Ok(Executed {
        output: codec::encode_burn(supply),
        effects: SideEffects { new_total_supply: Some(supply), ..Default::default() },
    })
}

pub(super) fn wipe(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token: &TokenId,
    account: &Address,
    amount: i64,
) -> Result<Executed, Failure> {
    require_role(cx, ledger, token, TokenKeyType::Wipe)?;
    let holder = ledger.resolve_account(account)?;
    let supply = ledger.wipe_fungible(token, &holder, amount.unsigned_abs())?;
    tracing::info!(target: "hts::dispatch", %token, account = %holder, amount, supply, "wiped");
    Ok(wiped(supply))
}

pub(super) fn wipe_nft(
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
    token: &TokenId,
    account: &Address,
    serials: &[i64],
) -> Result<Executed, Failure> {
    if serials.len() > cx.config.max_batch_size_wipe {
        return Err(ResponseCode::BatchSizeLimitExceeded.into());
    }
    require_role(cx, ledger, token, TokenKeyType::Wipe)?;
    let holder = ledger.resolve_account(account)?;
    let serials: Vec<u64> = serials.iter().map(|s| s.unsigned_abs()).collect();
    let supply = ledger.wipe_nfts(token, &holder, &serials)?;
    tracing::info!(target: "hts::dispatch", %token, account = %holder, wiped = serials.len(), supply, "wiped");
    Ok(wiped(supply))
}

fn wiped(supply: u64) -> Executed {
    Executed {
        output: codec::encode_status(ResponseCode::Success),
        effects: SideEffects { new_total_supply: Some(supply), ..Default::default() },
    }
}
