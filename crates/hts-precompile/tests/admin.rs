//! Pause, freeze, KYC, update and delete.

mod common;

use alloy_primitives::U256;
use alloy_sol_types::{SolCall, SolValue};
use common::*;
use hts_ledger::LedgerView;
use hts_precompile::abi::IHederaTokenService as Hts;
use hts_primitives::{AccountId, Key, TokenId, TokenKeyType};

/// GOLD with every admin role held by [`CONTRACT`].
fn managed() -> Harness {
    let mut h = Harness::new();
    let mut gold = h.world.token(&GOLD).expect("gold").into_owned();
    for role in [TokenKeyType::Freeze, TokenKeyType::Kyc, TokenKeyType::Pause] {
        gold.keys.insert(role, Key::ContractId(CONTRACT));
    }
    h.world.inner.put_token(gold);
    h
}

fn transfer(token: TokenId, from: AccountId, to: AccountId, amount: i64) -> Vec<u8> {
    Hts::transferTokenCall {
        token: token.to_evm_address(),
        sender: from.to_evm_address(),
        recipient: to.to_evm_address(),
        amount,
    }
    .abi_encode()
}

fn flag(h: &mut Harness, input: &[u8]) -> bool {
    let output = expect_success(h.call(input));
    <(i64, bool)>::abi_decode_params(&output).expect("status and flag").1
}

#[test]
fn pause_blocks_transfers_until_unpaused() {
    let mut h = managed();
    let token = GOLD.to_evm_address();

    expect_success(h.call(&Hts::pauseTokenCall { token }.abi_encode()));
    assert_eq!(expect_revert(h.call(&transfer(GOLD, CONTRACT, STRANGER, 1))), "TOKEN_IS_PAUSED");

    expect_success(h.call(&Hts::unpauseTokenCall { token }.abi_encode()));
    expect_success(h.call(&transfer(GOLD, CONTRACT, STRANGER, 1)));
    assert_eq!(h.balance(STRANGER, GOLD), Some(1));
}

#[test]
fn pausing_needs_a_pause_key() {
    let mut h = Harness::new();
    let input = Hts::pauseTokenCall { token: SILVER.to_evm_address() }.abi_encode();

    assert_eq!(expect_revert(h.call(&input)), "TOKEN_HAS_NO_PAUSE_KEY");
}

#[test]
fn frozen_accounts_cannot_receive() {
    let mut h = managed();
    let token = GOLD.to_evm_address();
    let account = STRANGER.to_evm_address();

    expect_success(h.call(&Hts::freezeTokenCall { token, account }.abi_encode()));
    assert!(flag(&mut h, &Hts::isFrozenCall { token, account }.abi_encode()));
    assert_eq!(
        expect_revert(h.call(&transfer(GOLD, CONTRACT, STRANGER, 1))),
        "ACCOUNT_FROZEN_FOR_TOKEN"
    );

    expect_success(h.call(&Hts::unfreezeTokenCall { token, account }.abi_encode()));
    assert!(!flag(&mut h, &Hts::isFrozenCall { token, account }.abi_encode()));
}

#[test]
fn kyc_grant_and_revoke_round_trip() {
    let mut h = managed();
    let token = GOLD.to_evm_address();
    let account = STRANGER.to_evm_address();

    expect_success(h.call(&Hts::revokeTokenKycCall { token, account }.abi_encode()));
    assert!(!flag(&mut h, &Hts::isKycCall { token, account }.abi_encode()));
    expect_success(h.call(&Hts::grantTokenKycCall { token, account }.abi_encode()));
    assert!(flag(&mut h, &Hts::isKycCall { token, account }.abi_encode()));
}

#[test]
fn update_renames_and_rejects_shrinking_expiry() {
    let mut h = Harness::new();
    let mut info = Hts::HederaToken { name: "Gilded".into(), ..Default::default() };
    let input = Hts::updateTokenInfoCall { token: GOLD.to_evm_address(), tokenInfo: info.clone() }.abi_encode();

    expect_success(h.call(&input));
    assert_eq!(h.world.token(&GOLD).map(|t| t.name.clone()).as_deref(), Some("Gilded"));
    assert_eq!(h.world.token(&GOLD).map(|t| t.symbol.clone()).as_deref(), Some("GLD"));

    info.expiry.second = 1;
    let input = Hts::updateTokenInfoCall { token: GOLD.to_evm_address(), tokenInfo: info }.abi_encode();
    assert_eq!(expect_revert(h.call(&input)), "INVALID_TRANSACTION_BODY");
}

#[test]
fn tokens_without_admin_key_are_immutable() {
    let mut h = Harness::new();
    let info = Hts::HederaToken { name: "Renamed".into(), ..Default::default() };
    let input = Hts::updateTokenInfoCall { token: ART.to_evm_address(), tokenInfo: info }.abi_encode();

    assert_eq!(expect_revert(h.call(&input)), "TOKEN_IS_IMMUTABLE");
}

#[test]
fn deleted_tokens_reject_mints() {
    let mut h = Harness::new();
    let token = GOLD.to_evm_address();

    expect_success(h.call(&Hts::deleteTokenCall { token }.abi_encode()));
    let mint = Hts::mintTokenCall { token, amount: 1, metadata: Vec::new() }.abi_encode();
    assert_eq!(expect_revert(h.call(&mint)), "TOKEN_WAS_DELETED");

    let is_token = expect_success(h.call(&Hts::isTokenCall { token }.abi_encode()));
    let (_, exists) = <(i64, bool)>::abi_decode_params(&is_token).expect("isToken");
    assert!(exists);
}

#[test]
fn token_key_query_reports_the_holder() {
    let mut h = Harness::new();
    let input = Hts::getTokenKeyCall { token: GOLD.to_evm_address(), keyType: U256::from(16) }.abi_encode();

    let output = expect_success(h.call(&input));
    let (status, key) = <(i64, Hts::KeyValue)>::abi_decode_params(&output).expect("key");
    assert_eq!(status, 22);
    assert_eq!(key.contractId, CONTRACT.to_evm_address());
}
