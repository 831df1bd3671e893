//! Atomicity, idempotence and short-circuit properties of the dispatcher.

mod common;

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use common::*;
use hts_ledger::{LedgerView, RelKey};
use hts_precompile::{
    abi::IHederaTokenService as Hts,
    codec,
    engine::DECODE_FAILURE_REASON,
    DispatchOutcome, TransactionKind,
};
use hts_primitives::{AccountId, ResponseCode, TokenId};
use proptest::prelude::*;

fn leg(account: AccountId, amount: i64) -> Hts::AccountAmount {
    Hts::AccountAmount { accountID: account.to_evm_address(), amount }
}

fn list(token: TokenId, transfers: Vec<Hts::AccountAmount>) -> Hts::TokenTransferList {
    Hts::TokenTransferList { token: token.to_evm_address(), transfers, nftTransfers: Vec::new() }
}

#[test]
fn failing_second_list_rolls_back_the_first() {
    let mut h = Harness::new();
    let input = Hts::cryptoTransferCall {
        tokenTransfers: vec![
            list(GOLD, vec![leg(CONTRACT, -10), leg(STRANGER, 10)]),
            list(SILVER, vec![leg(CONTRACT, -10), leg(STRANGER, 10)]),
        ],
    }
    .abi_encode();

    assert_eq!(expect_revert(h.call(&input)), "INSUFFICIENT_TOKEN_BALANCE");
    assert_eq!(h.balance(CONTRACT, GOLD), Some(100));
    assert_eq!(h.balance(STRANGER, GOLD), Some(0));
    assert_eq!(h.balance(CONTRACT, SILVER), Some(5));
    assert_eq!(h.world.applied, 0);

    assert_eq!(h.records.len(), 1);
    let record = h.records.last().expect("failure record");
    assert_eq!(record.status, ResponseCode::InsufficientTokenBalance);
    assert_eq!(record.kind, TransactionKind::CryptoTransfer);
}

#[test]
fn transfers_must_net_to_zero() {
    let mut h = Harness::new();
    let input = Hts::cryptoTransferCall {
        tokenTransfers: vec![list(GOLD, vec![leg(CONTRACT, -10), leg(STRANGER, 9)])],
    }
    .abi_encode();

    assert_eq!(expect_revert(h.call(&input)), "TRANSFERS_NOT_ZERO_SUM_FOR_TOKEN");
    assert_eq!(h.world.applied, 0);
}

#[test]
fn repeated_queries_return_identical_bytes() {
    let mut h = Harness::new();
    let input = Hts::getTokenInfoCall { token: GOLD.to_evm_address() }.abi_encode();

    let first = expect_success(h.call(&input));
    let second = expect_success(h.call(&input));
    assert_eq!(first, second);
    assert_eq!(h.world.applied, 0);
    assert_eq!(h.records.len(), 2);
    assert!(h.records.records().iter().all(|r| r.status == ResponseCode::Success));
}

#[test]
fn denied_dissociation_never_writes() {
    let mut h = Harness::new();
    let input = Hts::dissociateTokenCall {
        account: STRANGER.to_evm_address(),
        token: GOLD.to_evm_address(),
    }
    .abi_encode();

    assert_eq!(expect_revert(h.call(&input)), "INVALID_SIGNATURE");
    assert_eq!(h.world.applied, 0);
    assert!(h.world.relation(&RelKey::new(STRANGER, GOLD)).is_some());
    assert_eq!(h.records.last().map(|r| r.status), Some(ResponseCode::InvalidSignature));
}

#[test]
fn disabled_redirects_fail_with_a_record() {
    let config = hts_precompile::HtsConfig { redirect_enabled: false, ..Default::default() };
    let mut h = Harness::with(config, hts_fees::default_fee_schedule());
    let nested = hts_precompile::abi::ITokenProxy::nameCall {}.abi_encode();

    assert_eq!(expect_revert(h.call(&redirect(GOLD, &nested))), "NOT_SUPPORTED");
    assert_eq!(h.records.last().map(|r| r.status), Some(ResponseCode::NotSupported));
}

#[test]
fn truncated_arguments_halt_without_record() {
    let mut h = Harness::new();
    let mut input = Hts::associateTokenCall {
        account: HOLDER.to_evm_address(),
        token: GOLD.to_evm_address(),
    }
    .abi_encode();
    input.truncate(20);

    match h.call(&input) {
        DispatchOutcome::Halt { reason, .. } => assert_eq!(reason, DECODE_FAILURE_REASON),
        other => panic!("expected halt, got {other:?}"),
    }
    assert!(h.records.is_empty());
}

proptest! {
    #[test]
    fn unknown_selectors_leave_no_trace(selector in any::<[u8; 4]>(), tail in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut input = selector.to_vec();
        input.extend_from_slice(&tail);
        prop_assume!(!codec::is_known_selector(&input));

        let mut h = Harness::new();
        let outcome = h.call(&input);
        prop_assert!(matches!(outcome, DispatchOutcome::Halt { .. }), "unexpected outcome {:?}", outcome);
        prop_assert!(h.records.is_empty());
        prop_assert_eq!(h.world.applied, 0);
    }

    #[test]
    fn balance_queries_are_idempotent(account in 0u64..2_000) {
        let mut h = Harness::new();
        let owner: Address = AccountId::from_num(account).to_evm_address();
        let nested = hts_precompile::abi::ITokenProxy::balanceOfCall { account: owner }.abi_encode();
        let input = redirect(GOLD, &nested);

        let first = h.call(&input);
        let second = h.call(&input);
        prop_assert_eq!(first, second);
        prop_assert_eq!(h.world.applied, 0);
        prop_assert_eq!(h.records.len(), 2);
    }
}
