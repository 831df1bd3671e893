//! Token creation: value reconciliation, defaults and the treasury relation.

mod common;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, SolValue};
use common::*;
use hts_fees::{default_fee_schedule, FeeComponents, FeeSchedule, OperationPrice, PricedOperation};
use hts_ledger::{LedgerView, RelKey};
use hts_precompile::{
    abi::{IHederaTokenService as Hts, ITokenProxy},
    HtsConfig, TransactionKind,
};
use hts_primitives::{Key, ResponseCode, TokenId, TokenKeyType, TokenSupplyType};

/// Token creation metered at 1_200_000 tinycents, 100_000 tinybars at 1:12.
fn priced_schedule() -> FeeSchedule {
    let mut schedule = default_fee_schedule();
    schedule.prices.insert(
        PricedOperation::TokenCreate,
        OperationPrice {
            components: FeeComponents { node: 0, network: 0, service: 1_200_000 },
            minimum: 0,
        },
    );
    schedule
}

fn inherited(key_type: TokenKeyType) -> Hts::TokenKey {
    Hts::TokenKey {
        keyType: U256::from(key_type.bit()),
        key: Hts::KeyValue { inheritAccountKey: true, ..Default::default() },
    }
}

fn shape(name: &str, keys: Vec<Hts::TokenKey>) -> Hts::HederaToken {
    Hts::HederaToken {
        name: name.into(),
        symbol: name[..3].to_uppercase(),
        treasury: CONTRACT.to_evm_address(),
        memo: "minted by contract".into(),
        tokenSupplyType: false,
        maxSupply: 0,
        freezeDefault: false,
        tokenKeys: keys,
        expiry: Hts::Expiry::default(),
    }
}

fn fungible(name: &str, initial: u64) -> Vec<u8> {
    Hts::createFungibleTokenCall {
        token: shape(name, vec![inherited(TokenKeyType::Supply)]),
        initialTotalSupply: U256::from(initial),
        decimals: U256::from(4),
    }
    .abi_encode()
}

fn created_token(output: &[u8]) -> TokenId {
    let (status, address) = <(i64, Address)>::abi_decode_params(output).expect("create result");
    assert_eq!(status, 22);
    TokenId::from_evm_address(&address)
}

fn hbar(h: &Harness, account: hts_primitives::AccountId) -> u64 {
    h.world.account(&account).map_or(0, |a| a.balance)
}

#[test]
fn fungible_create_assigns_supply_to_treasury() {
    let mut h = Harness::new();
    let output = expect_success(h.call(&fungible("Bronze", 1_000)));
    let id = created_token(&output);

    let token = h.world.token(&id).expect("token stored");
    assert_eq!(token.name, "Bronze");
    assert_eq!(token.symbol, "BRO");
    assert_eq!(token.decimals, 4);
    assert_eq!(token.supply_type, TokenSupplyType::Infinite);
    assert_eq!(token.treasury, CONTRACT);
    assert_eq!(token.key(TokenKeyType::Supply), Some(&Key::ContractId(CONTRACT)));
    assert_eq!(token.auto_renew_account, Some(CONTRACT));
    assert_eq!(token.auto_renew_period, 7_776_000);
    assert_eq!(token.expiry, NOW.seconds + 7_776_000);

    let treasury = h.world.relation(&RelKey::new(CONTRACT, id)).expect("treasury associated");
    assert_eq!(treasury.balance, 1_000);
    assert!(treasury.kyc_granted);

    let record = h.records.last().expect("record");
    assert_eq!(record.kind, TransactionKind::TokenCreate);
    assert_eq!(record.created_token, Some(id));
}

#[test]
fn created_token_answers_redirected_queries() {
    let mut h = Harness::new();
    let id = created_token(&expect_success(h.call(&fungible("Bronze", 1_000))));

    let nested = ITokenProxy::totalSupplyCall {}.abi_encode();
    let output = expect_success(h.call(&redirect(id, &nested)));
    assert_eq!(U256::abi_decode(&output).expect("uint256"), U256::from(1_000));
}

#[test]
fn excess_value_is_refunded() {
    let mut h = Harness::with(HtsConfig::default(), priced_schedule());
    let frame = hts_precompile::CallFrame { value: 100_500, ..frame(CONTRACT) };

    let id = created_token(&expect_success(h.call_with(&fungible("Bronze", 10), &frame)));
    assert_eq!(hbar(&h, CONTRACT), 1_500);
    assert_eq!(hbar(&h, FUNDING), 100_000);
    assert!(h.world.token(&id).is_some());
}

#[test]
fn insufficient_value_creates_nothing() {
    let mut h = Harness::with(HtsConfig::default(), priced_schedule());
    let frame = hts_precompile::CallFrame { value: 99_999, ..frame(CONTRACT) };
    let next = h.world.next_entity_num();

    assert_eq!(expect_revert(h.call_with(&fungible("Bronze", 10), &frame)), "INSUFFICIENT_TX_FEE");
    assert_eq!(h.world.next_entity_num(), next);
    assert_eq!(hbar(&h, FUNDING), 0);
    assert_eq!(h.world.applied, 0);
    assert_eq!(h.records.last().map(|r| r.status), Some(ResponseCode::InsufficientTxFee));
}

#[test]
fn nft_create_requires_a_supply_key() {
    let mut h = Harness::new();
    let input = Hts::createNonFungibleTokenCall { token: shape("Sketches", Vec::new()) }.abi_encode();

    assert_eq!(expect_revert(h.call(&input)), "TOKEN_HAS_NO_SUPPLY_KEY");
}

#[test]
fn finite_supply_needs_a_max() {
    let mut h = Harness::new();
    let mut token = shape("Bronze", Vec::new());
    token.tokenSupplyType = true;
    let input = Hts::createFungibleTokenCall {
        token,
        initialTotalSupply: U256::from(10),
        decimals: U256::ZERO,
    }
    .abi_encode();

    assert_eq!(expect_revert(h.call(&input)), "INVALID_TOKEN_MAX_SUPPLY");
}

#[test]
fn foreign_treasury_must_sign() {
    let mut h = Harness::new();
    let mut token = shape("Bronze", Vec::new());
    token.treasury = STRANGER.to_evm_address();
    let input = Hts::createFungibleTokenCall {
        token,
        initialTotalSupply: U256::from(10),
        decimals: U256::ZERO,
    }
    .abi_encode();

    assert_eq!(expect_revert(h.call(&input)), "INVALID_SIGNATURE");
    assert_eq!(h.world.applied, 0);
}

#[test]
fn creation_can_be_switched_off() {
    let config = HtsConfig { token_create_enabled: false, ..Default::default() };
    let mut h = Harness::with(config, default_fee_schedule());

    assert_eq!(expect_revert(h.call(&fungible("Bronze", 10))), "NOT_SUPPORTED");
}
