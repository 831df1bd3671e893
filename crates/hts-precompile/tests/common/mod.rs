//! In-memory world used by the dispatch tests.

#![allow(dead_code, unreachable_pub)]

use alloy_primitives::{Address, Bytes, FixedBytes};
use hts_fees::{default_fee_schedule, FeeSchedule};
use hts_ledger::{
    Account, ChangeSet, LedgerView, MemoryLedger, RelKey, Token, TokenRelation, UniqueToken,
};
use hts_precompile::{
    records::RecordLog, CallFrame, CallMode, DispatchEngine, DispatchOutcome, HtsConfig,
};
use hts_primitives::{
    AccountId, Key, NftId, Timestamp, TokenId, TokenKeyType, TokenSupplyType, TokenType,
};
use std::borrow::Cow;

/// The calling contract.
pub const CONTRACT: AccountId = AccountId::from_num(1001);
/// Account whose key is the calling contract.
pub const HOLDER: AccountId = AccountId::from_num(999);
/// Account controlled by an ed25519 key that never signs.
pub const STRANGER: AccountId = AccountId::from_num(1002);
/// Another ed25519 account.
pub const SPENDER: AccountId = AccountId::from_num(1003);
/// Fee collector.
pub const FUNDING: AccountId = AccountId::from_num(98);

/// Fungible token with a supply key held by [`CONTRACT`].
pub const GOLD: TokenId = TokenId::from_num(777);
/// NFT token with no supply key.
pub const ART: TokenId = TokenId::from_num(778);
/// Fungible token in which [`CONTRACT`] holds only 5 units.
pub const SILVER: TokenId = TokenId::from_num(779);

pub const NOW: Timestamp = Timestamp::from_seconds(1_700_000_000);
pub const GAS: u64 = 30_000_000;

/// Root ledger that counts how often committed writes reach it.
#[derive(Debug, Default)]
pub struct CountingLedger {
    pub inner: MemoryLedger,
    pub applied: usize,
}

impl LedgerView for CountingLedger {
    fn account(&self, id: &AccountId) -> Option<Cow<'_, Account>> {
        self.inner.account(id)
    }

    fn account_by_alias(&self, alias: &Address) -> Option<AccountId> {
        self.inner.account_by_alias(alias)
    }

    fn token(&self, id: &TokenId) -> Option<Cow<'_, Token>> {
        self.inner.token(id)
    }

    fn relation(&self, key: &RelKey) -> Option<Cow<'_, TokenRelation>> {
        self.inner.relation(key)
    }

    fn nft(&self, id: &NftId) -> Option<Cow<'_, UniqueToken>> {
        self.inner.nft(id)
    }

    fn next_entity_num(&self) -> u64 {
        self.inner.next_entity_num()
    }

    fn apply(&mut self, changes: ChangeSet) {
        if !changes.is_empty() {
            self.applied += 1;
        }
        self.inner.apply(changes);
    }
}

fn ed25519(byte: u8) -> Key {
    Key::Ed25519(FixedBytes::repeat_byte(byte))
}

fn relation(balance: u64) -> TokenRelation {
    TokenRelation { balance, frozen: false, kyc_granted: true, automatic_association: false }
}

fn fungible(id: TokenId, supply: u64) -> Token {
    let mut token = Token {
        id,
        name: "Gold".into(),
        symbol: "GLD".into(),
        token_type: TokenType::FungibleCommon,
        supply_type: TokenSupplyType::Infinite,
        decimals: 2,
        total_supply: supply,
        treasury: CONTRACT,
        expiry: NOW.seconds + 7_776_000,
        auto_renew_period: 7_776_000,
        ..Default::default()
    };
    token.keys.insert(TokenKeyType::Supply, Key::ContractId(CONTRACT));
    token.keys.insert(TokenKeyType::Admin, Key::ContractId(CONTRACT));
    token
}

fn nft(serial: u64, owner: AccountId, spender: Option<AccountId>) -> UniqueToken {
    UniqueToken {
        id: NftId::new(ART, serial),
        owner,
        spender,
        metadata: Bytes::from(format!("ipfs://art/{serial}").into_bytes()),
        created: NOW,
    }
}

/// Accounts, three tokens and a handful of NFTs.
pub fn world() -> CountingLedger {
    let mut ledger = MemoryLedger::new();
    ledger.put_account(Account::new(CONTRACT).with_key(Key::ContractId(CONTRACT)).with_balance(1_000));
    ledger.put_account(Account::new(HOLDER).with_key(Key::ContractId(CONTRACT)));
    ledger.put_account(Account::new(STRANGER).with_key(ed25519(2)));
    ledger.put_account(Account::new(SPENDER).with_key(ed25519(3)));
    ledger.put_account(Account::new(FUNDING));

    ledger.put_token(fungible(GOLD, 100));
    ledger.put_relation(RelKey::new(CONTRACT, GOLD), relation(100));
    ledger.put_relation(RelKey::new(STRANGER, GOLD), relation(0));

    let mut silver = fungible(SILVER, 5);
    silver.name = "Silver".into();
    silver.symbol = "SLV".into();
    ledger.put_token(silver);
    ledger.put_relation(RelKey::new(CONTRACT, SILVER), relation(5));
    ledger.put_relation(RelKey::new(STRANGER, SILVER), relation(0));

    ledger.put_token(Token {
        id: ART,
        name: "Art".into(),
        symbol: "ART".into(),
        token_type: TokenType::NonFungibleUnique,
        supply_type: TokenSupplyType::Finite,
        max_supply: 1_000,
        total_supply: 3,
        treasury: CONTRACT,
        last_used_serial: 300,
        ..Default::default()
    });
    ledger.put_relation(RelKey::new(CONTRACT, ART), relation(2));
    ledger.put_relation(RelKey::new(STRANGER, ART), relation(1));
    ledger.put_nft(nft(123, CONTRACT, None));
    ledger.put_nft(nft(234, CONTRACT, None));
    ledger.put_nft(nft(300, STRANGER, Some(SPENDER)));

    CountingLedger { inner: ledger, applied: 0 }
}

pub fn frame(sender: AccountId) -> CallFrame {
    CallFrame {
        sender: sender.to_evm_address(),
        recipient: hts_precompile::HTS_PRECOMPILE_ADDR,
        parent_contract: None,
        delegate_call: false,
        value: 0,
        gas_remaining: GAS,
        mode: CallMode::Mutable,
        consensus_time: NOW,
    }
}

/// Engine, world and record log for one test.
#[derive(Debug)]
pub struct Harness {
    pub engine: DispatchEngine,
    pub world: CountingLedger,
    pub records: RecordLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(HtsConfig::default(), default_fee_schedule())
    }

    pub fn with(config: HtsConfig, fees: FeeSchedule) -> Self {
        Self { engine: DispatchEngine::new(config, fees), world: world(), records: RecordLog::default() }
    }

    /// Calls from [`CONTRACT`].
    pub fn call(&mut self, input: &[u8]) -> DispatchOutcome {
        self.call_with(input, &frame(CONTRACT))
    }

    pub fn call_with(&mut self, input: &[u8], frame: &CallFrame) -> DispatchOutcome {
        self.engine.handle(input, frame, &mut self.world, &mut self.records)
    }

    pub fn balance(&self, account: AccountId, token: TokenId) -> Option<u64> {
        self.world.relation(&RelKey::new(account, token)).map(|rel| rel.balance)
    }

    pub fn owner(&self, serial: u64) -> Option<AccountId> {
        self.world.nft(&NftId::new(ART, serial)).map(|nft| nft.owner)
    }
}

/// Return data of a successful call.
pub fn expect_success(outcome: DispatchOutcome) -> Bytes {
    match outcome {
        DispatchOutcome::Success { output, .. } => output,
        other => panic!("expected success, got {other:?}"),
    }
}

/// Revert reason of a reverted call.
pub fn expect_revert(outcome: DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Revert { reason, .. } => String::from_utf8_lossy(&reason).into_owned(),
        other => panic!("expected revert, got {other:?}"),
    }
}

/// Redirected call to `token`'s facade.
pub fn redirect(token: TokenId, nested: &[u8]) -> Vec<u8> {
    let mut data = hts_precompile::abi::REDIRECT_FOR_TOKEN.to_vec();
    data.extend_from_slice(token.to_evm_address().as_slice());
    data.extend_from_slice(nested);
    data
}
