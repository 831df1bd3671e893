//! Fungible and NFT transfers.
//!
//! Every form is normalised into per-token [`TokenMoves`]. All moves are
//! validated and authorized against the untouched snapshot first; only then
//! is each token's batch applied in its own nested snapshot.

use super::{CallContext, Executed};
use crate::{
    auth::{Authority, Grant},
    codec,
    failure::Failure,
    operation::{check_i64, Form, Operation, TransferList},
};
use alloy_primitives::Address;
use hts_ledger::LedgerSnapshot;
use hts_primitives::{AccountId, NftId, ResponseCode, TokenId};

#[derive(Debug)]
struct FungibleLeg {
    account: AccountId,
    delta: i64,
    /// Debit must be covered by an allowance granted to the caller.
    approval: bool,
}

#[derive(Debug)]
struct NftLeg {
    serial: u64,
    from: AccountId,
    to: AccountId,
    approval: bool,
}

#[derive(Debug)]
struct TokenMoves {
    token: TokenId,
    fungible: Vec<FungibleLeg>,
    nfts: Vec<NftLeg>,
}

pub(super) fn transfer(
    op: &Operation,
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
) -> Result<Executed, Failure> {
    let (moves, output) = normalise(op, cx, ledger)?;

    let mut consumptions = Vec::with_capacity(moves.len());
    for batch in &moves {
        validate(batch)?;
        consumptions.push(authorize(cx, ledger, batch)?);
    }

    for (batch, consume) in moves.iter().zip(consumptions) {
        let mut step = ledger.nest();
        apply(cx, &mut step, batch, &consume)?;
        step.commit();
        tracing::info!(
            target: "hts::dispatch",
            token = %batch.token,
            fungible = batch.fungible.len(),
            nfts = batch.nfts.len(),
            "transferred"
        );
    }
    Ok(Executed::output(output))
}

fn resolve(ledger: &LedgerSnapshot<'_>, address: &Address) -> Result<AccountId, Failure> {
    Ok(ledger.resolve_account(address)?)
}

fn pair(
    ledger: &LedgerSnapshot<'_>,
    from: &Address,
    to: &Address,
    amount: i64,
    approval: bool,
) -> Result<Vec<FungibleLeg>, Failure> {
    Ok(vec![
        FungibleLeg { account: resolve(ledger, from)?, delta: -amount, approval },
        FungibleLeg { account: resolve(ledger, to)?, delta: amount, approval: false },
    ])
}

fn from_list(ledger: &LedgerSnapshot<'_>, list: &TransferList) -> Result<TokenMoves, Failure> {
    let fungible = list
        .adjustments
        .iter()
        .map(|adj| {
            Ok(FungibleLeg {
                account: resolve(ledger, &adj.account)?,
                delta: adj.amount,
                approval: false,
            })
        })
        .collect::<Result<_, Failure>>()?;
    let nfts = list
        .nft_exchanges
        .iter()
        .map(|x| {
            Ok(NftLeg {
                serial: x.serial.unsigned_abs(),
                from: resolve(ledger, &x.sender)?,
                to: resolve(ledger, &x.receiver)?,
                approval: false,
            })
        })
        .collect::<Result<_, Failure>>()?;
    Ok(TokenMoves { token: list.token, fungible, nfts })
}

fn require_allowances(cx: &CallContext<'_>) -> Result<(), Failure> {
    if cx.config.allowances_enabled {
        Ok(())
    } else {
        Err(ResponseCode::NotSupported.into())
    }
}

fn normalise(
    op: &Operation,
    cx: &CallContext<'_>,
    ledger: &LedgerSnapshot<'_>,
) -> Result<(Vec<TokenMoves>, alloy_primitives::Bytes), Failure> {
    let status = codec::encode_status(ResponseCode::Success);
    let single = |token: TokenId, fungible, nfts| vec![TokenMoves { token, fungible, nfts }];
    let result = match op {
        Operation::TransferToken { token, sender, recipient, amount } => {
            (single(*token, pair(ledger, sender, recipient, *amount, false)?, vec![]), status)
        }
        Operation::TransferTokens { token, accounts, amounts } => {
            let legs = accounts
                .iter()
                .zip(amounts)
                .map(|(account, amount)| {
                    Ok(FungibleLeg {
                        account: resolve(ledger, account)?,
                        delta: *amount,
                        approval: false,
                    })
                })
                .collect::<Result<_, Failure>>()?;
            (single(*token, legs, vec![]), status)
        }
        Operation::TransferNft { token, sender, recipient, serial } => {
            let leg = NftLeg {
                serial: serial.unsigned_abs(),
                from: resolve(ledger, sender)?,
                to: resolve(ledger, recipient)?,
                approval: false,
            };
            (single(*token, vec![], vec![leg]), status)
        }
        Operation::TransferNfts { token, senders, recipients, serials } => {
            let legs = senders
                .iter()
                .zip(recipients)
                .zip(serials)
                .map(|((from, to), serial)| {
                    Ok(NftLeg {
                        serial: serial.unsigned_abs(),
                        from: resolve(ledger, from)?,
                        to: resolve(ledger, to)?,
                        approval: false,
                    })
                })
                .collect::<Result<_, Failure>>()?;
            (single(*token, vec![], legs), status)
        }
        Operation::CryptoTransfer { lists } => {
            let moves =
                lists.iter().map(|list| from_list(ledger, list)).collect::<Result<_, _>>()?;
            (moves, status)
        }
        Operation::ErcTransfer { token, recipient, amount } => {
            let amount = check_i64(amount, ResponseCode::InvalidAccountAmounts)?;
            let sender = cx.auth.sender_address;
            let legs = pair(ledger, &sender, recipient, amount, false)?;
            (single(*token, legs, vec![]), codec::encode_write_ack(Form::Erc, true))
        }
        Operation::TransferFrom { token, from, to, amount, form } => {
            require_allowances(cx)?;
            let amount = check_i64(amount, ResponseCode::InvalidAccountAmounts)?;
            // An owner moving its own units debits by signature, not allowance.
            let approval = resolve(ledger, from)? != cx.sender();
            let legs = pair(ledger, from, to, amount, approval)?;
            (single(*token, legs, vec![]), codec::encode_write_ack(*form, true))
        }
        Operation::TransferFromNft { token, from, to, serial, form } => {
            require_allowances(cx)?;
            let serial = check_i64(serial, ResponseCode::InvalidTokenNftSerialNumber)?.unsigned_abs();
            let owner = ledger.nft_owner(&NftId::new(*token, serial));
            let leg = NftLeg {
                serial,
                from: resolve(ledger, from)?,
                to: resolve(ledger, to)?,
                approval: owner != Some(cx.sender()),
            };
            (single(*token, vec![], vec![leg]), codec::encode_write_ack(*form, false))
        }
        _ => return Err(ResponseCode::FailInvalid.into()),
    };
    Ok(result)
}

fn validate(batch: &TokenMoves) -> Result<(), Failure> {
    for (idx, leg) in batch.fungible.iter().enumerate() {
        if batch.fungible[..idx].iter().any(|prev| prev.account == leg.account) {
            return Err(ResponseCode::AccountRepeatedInAccountAmounts.into());
        }
    }
    let net: i128 = batch.fungible.iter().map(|leg| leg.delta as i128).sum();
    if net != 0 {
        return Err(ResponseCode::TransfersNotZeroSumForToken.into());
    }
    Ok(())
}

/// Checks every debit and credit; returns, per fungible leg, whether the
/// debit spends an allowance.
fn authorize(
    cx: &CallContext<'_>,
    ledger: &LedgerSnapshot<'_>,
    batch: &TokenMoves,
) -> Result<Vec<bool>, Failure> {
    let mut consume = Vec::with_capacity(batch.fungible.len());
    for leg in &batch.fungible {
        let spends_allowance = if leg.delta < 0 {
            if leg.approval {
                true
            } else {
                let debit = Authority::Debit {
                    owner: leg.account,
                    token: batch.token,
                    amount: leg.delta.unsigned_abs(),
                };
                cx.require(&debit, ledger)? == Grant::Allowance
            }
        } else {
            if leg.delta > 0 {
                cx.require(&Authority::Credit(leg.account), ledger)?;
            }
            false
        };
        consume.push(spends_allowance);
    }
    for leg in &batch.nfts {
        let debit =
            Authority::NftDebit { nft: NftId::new(batch.token, leg.serial), owner: leg.from };
        if leg.approval {
            if cx.gate.check(&debit, &cx.auth, ledger).is_none() {
                return Err(ResponseCode::SpenderDoesNotHaveAllowance.into());
            }
        } else {
            cx.require(&debit, ledger)?;
        }
        cx.require(&Authority::Credit(leg.to), ledger)?;
    }
    Ok(consume)
}

fn apply(
    cx: &CallContext<'_>,
    step: &mut LedgerSnapshot<'_>,
    batch: &TokenMoves,
    consume: &[bool],
) -> Result<(), Failure> {
    for (leg, spends) in batch.fungible.iter().zip(consume) {
        if *spends {
            step.consume_fungible_allowance(
                &leg.account,
                &batch.token,
                &cx.sender(),
                leg.delta.unsigned_abs(),
            )?;
        }
    }
    for leg in batch.fungible.iter().filter(|leg| leg.delta < 0) {
        step.adjust_fungible(&leg.account, &batch.token, leg.delta)?;
    }
    for leg in batch.fungible.iter().filter(|leg| leg.delta > 0) {
        step.adjust_fungible(&leg.account, &batch.token, leg.delta)?;
    }
    for leg in &batch.nfts {
        step.transfer_nft(&NftId::new(batch.token, leg.serial), &leg.from, &leg.to)?;
    }
    Ok(())
}
