//! Per-operation handlers.
//!
//! Each handler runs against the call's snapshot and either returns the
//! encoded result with its side effects, or a [`Failure`]. The dispatch
//! engine decides commit or discard from that alone.

mod admin;
mod allowance;
mod associate;
mod convert;
mod create;
mod query;
mod supply;
mod transfer;

use crate::{
    auth::{AuthorizationContext, AuthorizationGate, Authority, Grant},
    config::HtsConfig,
    failure::Failure,
    operation::Operation,
    records::SideEffects,
};
use alloy_primitives::{Address, Bytes};
use hts_fees::FeeQuote;
use hts_ledger::{LedgerSnapshot, LedgerView};
use hts_primitives::{AccountId, ResponseCode, Timestamp};

/// Everything a handler may consult besides the ledger.
#[derive(Debug)]
pub(crate) struct CallContext<'a> {
    pub(crate) config: &'a HtsConfig,
    pub(crate) gate: AuthorizationGate<'a>,
    pub(crate) auth: AuthorizationContext,
    pub(crate) now: Timestamp,
    /// Attached value, in tinybars.
    pub(crate) value: u64,
    pub(crate) quote: &'a FeeQuote,
}

impl CallContext<'_> {
    /// Checks `authority`, mapping a denial to the canonical signature
    /// failure.
    pub(crate) fn require(
        &self,
        authority: &Authority,
        ledger: &LedgerSnapshot<'_>,
    ) -> Result<Grant, Failure> {
        self.gate
            .check(authority, &self.auth, ledger)
            .ok_or_else(|| ResponseCode::InvalidSignature.into())
    }

    pub(crate) const fn sender(&self) -> AccountId {
        self.auth.sender
    }
}

/// Result of a handler that succeeded.
#[derive(Debug, Default)]
pub(crate) struct Executed {
    pub(crate) output: Bytes,
    pub(crate) effects: SideEffects,
}

impl Executed {
    pub(crate) fn output(output: Bytes) -> Self {
        Self { output, effects: SideEffects::default() }
    }
}

/// EVM address of an account: its alias if it has one, else its long-zero
/// mirror address.
pub(crate) fn address_of(ledger: &LedgerSnapshot<'_>, id: &AccountId) -> Address {
    ledger
        .account(id)
        .and_then(|account| account.alias)
        .unwrap_or_else(|| id.to_evm_address())
}

/// Runs `op`.
pub(crate) fn execute(
    op: &Operation,
    cx: &CallContext<'_>,
    ledger: &mut LedgerSnapshot<'_>,
) -> Result<Executed, Failure> {
    match op {
        Operation::AssociateOne { account, token } => {
            associate::associate(cx, ledger, account, std::slice::from_ref(token))
        }
        Operation::AssociateMany { account, tokens } => {
            associate::associate(cx, ledger, account, tokens)
        }
        Operation::DissociateOne { account, token } => {
            associate::dissociate(cx, ledger, account, std::slice::from_ref(token))
        }
        Operation::DissociateMany { account, tokens } => {
            associate::dissociate(cx, ledger, account, tokens)
        }
        Operation::Mint { token, amount, metadata } => {
            supply::mint(cx, ledger, token, *amount, metadata)
        }
        Operation::Burn { token, amount, serials } => {
            supply::burn(cx, ledger, token, *amount, serials)
        }
        Operation::Wipe { token, account, amount } => {
            supply::wipe(cx, ledger, token, account, *amount)
        }
        Operation::WipeNft { token, account, serials } => {
            supply::wipe_nft(cx, ledger, token, account, serials)
        }
        Operation::TransferToken { .. }
        | Operation::TransferTokens { .. }
        | Operation::TransferNft { .. }
        | Operation::TransferNfts { .. }
        | Operation::CryptoTransfer { .. }
        | Operation::ErcTransfer { .. }
        | Operation::TransferFrom { .. }
        | Operation::TransferFromNft { .. } => transfer::transfer(op, cx, ledger),
        Operation::Approve { token, spender, amount, form } => {
            allowance::approve(cx, ledger, token, spender, amount, *form)
        }
        Operation::ApproveNft { token, spender, serial, form } => {
            allowance::approve_nft(cx, ledger, token, spender, serial, *form)
        }
        Operation::SetApprovalForAll { token, operator, approved, form } => {
            allowance::set_approval_for_all(cx, ledger, token, operator, *approved, *form)
        }
        Operation::Allowance { .. }
        | Operation::GetApproved { .. }
        | Operation::IsApprovedForAll { .. } => allowance::query(op, ledger),
        Operation::CreateToken(create) => create::create(cx, ledger, create),
        Operation::UpdateToken { token, info } => admin::update(cx, ledger, token, info),
        Operation::Pause { .. }
        | Operation::Unpause { .. }
        | Operation::Freeze { .. }
        | Operation::Unfreeze { .. }
        | Operation::GrantKyc { .. }
        | Operation::RevokeKyc { .. }
        | Operation::DeleteToken { .. } => admin::admin(op, cx, ledger),
        _ => query::query(op, ledger),
    }
}
