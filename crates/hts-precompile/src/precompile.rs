//! Token service precompile for alloy-evm.

use crate::{
    config::HtsConfig,
    engine::{CallFrame, CallMode, DispatchEngine, DispatchOutcome},
    journal::{JournaledLedger, SEQUENCE_SLOT},
    records::{RecordLog, SyntheticRecord},
};
use alloy_evm::{
    precompiles::{Precompile, PrecompileInput},
    revm::precompile::{PrecompileError, PrecompileId, PrecompileResult},
    EvmInternals, EvmInternalsError,
};
use alloy_primitives::{Address, Bytes, U256};
use hts_fees::FeeSchedule;
use hts_ledger::MemoryLedger;
use hts_primitives::Timestamp;
use parking_lot::RwLock;
use revm::{bytecode::Bytecode, precompile::PrecompileOutput, state::EvmState};
use std::sync::{Arc, OnceLock};

/// Code installed at the service address so the account is never empty and
/// its sequence slot survives state clearing. Executing it always fails.
pub const SERVICE_CODE: [u8; 1] = [0xfe];

/// Serves the token service at its configured address.
///
/// A successful call seals its writes as a layer of the shared
/// [`JournaledLedger`] and bumps [`SEQUENCE_SLOT`] in the service account's
/// storage, so an enclosing frame that reverts takes the writes with it.
/// Once the transaction is done the host calls [`settle`](Self::settle) with
/// the post-execution state to fold the surviving layers into the root and
/// collect their records.
///
/// `PrecompileInput` only exposes the immediate caller, so frames built here
/// never carry a `parent_contract` and contract keys are matched against the
/// caller alone.
#[derive(Clone, Debug)]
pub struct HtsPrecompile {
    engine: Arc<DispatchEngine>,
    state: Arc<RwLock<JournaledLedger>>,
}

impl HtsPrecompile {
    /// Precompile id.
    // Use a lazily-initialized static for the ID since `custom` is not const.
    pub fn id() -> &'static PrecompileId {
        static ID: OnceLock<PrecompileId> = OnceLock::new();
        ID.get_or_init(|| PrecompileId::custom("hts"))
    }

    /// Precompile over `root`.
    pub fn new(config: HtsConfig, fees: FeeSchedule, root: MemoryLedger) -> Self {
        Self::with_engine(
            Arc::new(DispatchEngine::new(config, fees)),
            Arc::new(RwLock::new(JournaledLedger::new(root))),
        )
    }

    /// Precompile around an existing engine and ledger state.
    pub const fn with_engine(engine: Arc<DispatchEngine>, state: Arc<RwLock<JournaledLedger>>) -> Self {
        Self { engine, state }
    }

    /// Address the precompile is installed at.
    pub fn address(&self) -> Address {
        self.engine.config().precompile_address
    }

    /// Shared ledger state, including layers of the transaction in flight.
    pub const fn state(&self) -> &Arc<RwLock<JournaledLedger>> {
        &self.state
    }

    /// Sequence committed in `post_state`, zero if the service account was
    /// never loaded.
    pub fn committed_sequence(&self, post_state: &EvmState) -> u64 {
        post_state
            .get(&self.address())
            .and_then(|account| account.storage.get(&SEQUENCE_SLOT))
            .map_or(0, |slot| slot.present_value.saturating_to())
    }

    /// Ends the transaction: drops layers reverted in `post_state`, folds the
    /// rest into the root and returns their records.
    pub fn settle(&self, post_state: &EvmState) -> Vec<SyntheticRecord> {
        let sequence = self.committed_sequence(post_state);
        self.state.write().settle(sequence)
    }

    fn map_internals_error(err: EvmInternalsError) -> PrecompileError {
        PrecompileError::Other(err.to_string().into())
    }

    fn load_sequence(internals: &mut EvmInternals<'_>, addr: Address) -> Result<u64, PrecompileError> {
        let slot = internals
            .sload(addr, SEQUENCE_SLOT)
            .map_err(Self::map_internals_error)?;
        Ok(slot.data.saturating_to())
    }

    fn store_sequence(
        internals: &mut EvmInternals<'_>,
        addr: Address,
        sequence: u64,
    ) -> Result<(), PrecompileError> {
        let has_code = !internals
            .load_account(addr)
            .map_err(Self::map_internals_error)?
            .info
            .is_empty_code_hash();
        if !has_code {
            internals
                .set_code(addr, Bytecode::new_raw(Bytes::from_static(&SERVICE_CODE)))
                .map_err(Self::map_internals_error)?;
        }
        internals.touch_account(addr).map_err(Self::map_internals_error)?;
        internals
            .sstore(addr, SEQUENCE_SLOT, U256::from(sequence))
            .map_err(Self::map_internals_error)?;
        Ok(())
    }

    /// Removes attached value from the precompile's EVM account once it has
    /// been credited inside the token ledger.
    fn sweep_value(
        internals: &mut EvmInternals<'_>,
        addr: Address,
        amount: U256,
    ) -> Result<(), PrecompileError> {
        let balance = internals
            .load_account(addr)
            .map_err(Self::map_internals_error)?
            .info
            .balance;
        let new_balance = balance
            .checked_sub(amount)
            .ok_or_else(|| PrecompileError::Other("insufficient balance".to_string().into()))?;
        internals
            .set_balance(addr, new_balance)
            .map_err(Self::map_internals_error)
    }
}

impl Precompile for HtsPrecompile {
    fn precompile_id(&self) -> &PrecompileId {
        Self::id()
    }

    fn call(&self, mut input: PrecompileInput<'_>) -> PrecompileResult {
        let attached = input.value;
        let value = u64::try_from(attached)
            .map_err(|_| PrecompileError::Other("attached value exceeds 64 bits".to_string().into()))?;
        let gas_limit = input.gas;
        let data = input.data;
        let target = input.target_address;
        let service = self.address();
        let frame = CallFrame {
            sender: input.caller,
            recipient: target,
            parent_contract: None,
            delegate_call: !input.is_direct_call(),
            value,
            gas_remaining: gas_limit,
            mode: if input.is_static { CallMode::View } else { CallMode::Mutable },
            consensus_time: Timestamp::from_seconds(input.internals.block_timestamp().saturating_to()),
        };

        let internals = input.internals_mut();
        let base = Self::load_sequence(internals, service)?;
        let (outcome, sealed, created) = {
            let mut state = self.state.write();
            state.rewind(base);
            let mut records = RecordLog::default();
            let outcome = self.engine.handle(data, &frame, &mut *state, &mut records);
            if outcome.gas_used() > gas_limit {
                state.rewind(base);
                return Err(PrecompileError::OutOfGas);
            }
            let created = records.last().is_some_and(|record| record.created_token.is_some());
            (outcome, state.seal(base, records.drain()), created)
        };

        match outcome {
            DispatchOutcome::Success { output, gas_used } => {
                if let Some(sequence) = sealed {
                    Self::store_sequence(internals, service, sequence)?;
                }
                if created && value > 0 {
                    internals.touch_account(target).map_err(Self::map_internals_error)?;
                    Self::sweep_value(internals, target, attached)?;
                }
                Ok(PrecompileOutput::new(gas_used, output))
            }
            DispatchOutcome::Revert { reason, gas_used } => {
                Ok(PrecompileOutput::new_reverted(gas_used, reason))
            }
            DispatchOutcome::Halt { reason, .. } => Err(PrecompileError::Other(reason.into())),
        }
    }

    fn is_pure(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{abi::IHederaTokenService as Hts, engine::STATIC_CALL_REASON};
    use alloy_primitives::address;
    use alloy_sol_types::{SolCall, SolValue};
    use hts_fees::default_fee_schedule;
    use hts_ledger::{Account, LedgerView, RelKey, Token, TokenRelation};
    use hts_primitives::{AccountId, Key, ResponseCode, TokenId, TokenKeyType, TokenType};
    use revm::{
        context::{
            journal::{Journal, JournalInner},
            BlockEnv, CfgEnv, TxEnv,
        },
        database::{CacheDB, EmptyDB},
        primitives::hardfork::SpecId,
        state::AccountInfo,
    };

    type TestJournal = Journal<CacheDB<EmptyDB>>;

    const GAS_LIMIT: u64 = 30_000_000;
    const CALLER: Address = address!("0x00000000000000000000000000000000000003e9");
    const CALLER_ID: AccountId = AccountId::from_num(1001);
    const GOLD: TokenId = TokenId::from_num(2000);

    struct TestEvm {
        journal: TestJournal,
        block_env: BlockEnv,
        cfg_env: CfgEnv,
        tx_env: TxEnv,
    }

    impl TestEvm {
        fn new() -> Self {
            let mut journal = Journal::new_with_inner(CacheDB::default(), JournalInner::new());
            journal.inner.set_spec_id(SpecId::PRAGUE);
            Self { journal, block_env: BlockEnv::default(), cfg_env: CfgEnv::new(), tx_env: TxEnv::default() }
        }

        fn fund(&mut self, addr: Address, balance: U256) {
            self.journal
                .database
                .insert_account_info(addr, AccountInfo { balance, ..Default::default() });
        }

        fn call(&mut self, precompile: &HtsPrecompile, data: &[u8], value: U256, is_static: bool) -> PrecompileResult {
            let input = PrecompileInput {
                data,
                gas: GAS_LIMIT,
                caller: CALLER,
                value,
                target_address: precompile.address(),
                is_static,
                bytecode_address: precompile.address(),
                internals: EvmInternals::new(&mut self.journal, &self.block_env, &self.cfg_env, &self.tx_env),
            };
            precompile.call(input)
        }

        fn mint(&mut self, precompile: &HtsPrecompile, amount: u64) -> PrecompileOutput {
            let data = Hts::mintTokenCall { token: GOLD.to_evm_address(), amount, metadata: Vec::new() }
                .abi_encode();
            self.call(precompile, &data, U256::ZERO, false).expect("mint call succeeds")
        }

        fn account_balance(&self, addr: Address) -> Option<U256> {
            self.journal.inner.state.get(&addr).map(|account| account.info.balance)
        }
    }

    fn ledger_with_token() -> MemoryLedger {
        let mut ledger = MemoryLedger::default();
        ledger.put_account(Account::new(CALLER_ID).with_key(Key::ContractId(CALLER_ID)));
        let mut definition = Token {
            id: GOLD,
            name: "Gold".into(),
            symbol: "GLD".into(),
            token_type: TokenType::FungibleCommon,
            treasury: CALLER_ID,
            total_supply: 100,
            ..Default::default()
        };
        definition.keys.insert(TokenKeyType::Supply, Key::ContractId(CALLER_ID));
        ledger.put_token(definition);
        ledger.put_relation(
            RelKey::new(CALLER_ID, GOLD),
            TokenRelation { balance: 100, kyc_granted: true, ..Default::default() },
        );
        ledger
    }

    fn precompile() -> HtsPrecompile {
        HtsPrecompile::new(HtsConfig::default(), default_fee_schedule(), ledger_with_token())
    }

    fn gold_balance(view: &dyn LedgerView) -> Option<u64> {
        view.relation(&RelKey::new(CALLER_ID, GOLD)).map(|relation| relation.balance)
    }

    #[test]
    fn mint_lands_in_root_after_settle() {
        let precompile = precompile();
        let mut evm = TestEvm::new();

        let output = evm.mint(&precompile, 50);
        assert!(!output.reverted);
        let (status, supply, serials) =
            <(i64, u64, Vec<i64>)>::abi_decode_params(&output.bytes).expect("mint result");
        assert_eq!((status, supply), (22, 150));
        assert!(serials.is_empty());
        assert_eq!(precompile.committed_sequence(&evm.journal.inner.state), 1);
        assert_eq!(gold_balance(&*precompile.state().read()), Some(150));
        assert_eq!(gold_balance(precompile.state().read().root()), Some(100));

        let records = precompile.settle(&evm.journal.inner.state);
        assert_eq!(records.len(), 1);
        assert_eq!(gold_balance(precompile.state().read().root()), Some(150));
    }

    #[test]
    fn service_account_keeps_code_after_a_commit() {
        let precompile = precompile();
        let mut evm = TestEvm::new();
        evm.mint(&precompile, 1);

        let account = evm.journal.inner.state.get(&precompile.address()).expect("service account loaded");
        assert!(!account.info.is_empty_code_hash());
        assert!(account.is_touched());
    }

    #[test]
    fn outer_revert_discards_ledger_writes_and_records() {
        let precompile = precompile();
        let mut evm = TestEvm::new();

        let checkpoint = evm.journal.inner.checkpoint();
        evm.mint(&precompile, 50);
        assert_eq!(gold_balance(&*precompile.state().read()), Some(150));
        evm.journal.inner.checkpoint_revert(checkpoint);

        assert_eq!(precompile.committed_sequence(&evm.journal.inner.state), 0);
        assert!(precompile.settle(&evm.journal.inner.state).is_empty());
        assert_eq!(gold_balance(precompile.state().read().root()), Some(100));
    }

    #[test]
    fn calls_after_a_revert_build_on_surviving_layers() {
        let precompile = precompile();
        let mut evm = TestEvm::new();

        evm.mint(&precompile, 10);
        let checkpoint = evm.journal.inner.checkpoint();
        evm.mint(&precompile, 20);
        evm.journal.inner.checkpoint_revert(checkpoint);

        let output = evm.mint(&precompile, 40);
        let (_, supply, _) = <(i64, u64, Vec<i64>)>::abi_decode_params(&output.bytes).expect("mint result");
        assert_eq!(supply, 150);

        let records = precompile.settle(&evm.journal.inner.state);
        assert_eq!(records.len(), 2);
        assert_eq!(gold_balance(precompile.state().read().root()), Some(150));
    }

    #[test]
    fn static_frames_cannot_write() {
        let precompile = precompile();
        let mut evm = TestEvm::new();
        let data = Hts::mintTokenCall { token: GOLD.to_evm_address(), amount: 50, metadata: Vec::new() }
            .abi_encode();

        let result = evm.call(&precompile, &data, U256::ZERO, true);
        match result {
            Err(PrecompileError::Other(msg)) => assert_eq!(msg, STATIC_CALL_REASON),
            other => panic!("expected static rejection, got {other:?}"),
        }
        assert_eq!(gold_balance(&*precompile.state().read()), Some(100));
        assert_eq!(precompile.state().read().depth(), 0);
    }

    #[test]
    fn static_queries_are_served_when_enabled() {
        let config = HtsConfig { static_queries_enabled: true, ..Default::default() };
        let precompile = HtsPrecompile::new(config, default_fee_schedule(), ledger_with_token());
        let mut evm = TestEvm::new();
        let data = Hts::isTokenCall { token: GOLD.to_evm_address() }.abi_encode();

        let output = evm.call(&precompile, &data, U256::ZERO, true).expect("query succeeds");
        let (status, exists) = <(i64, bool)>::abi_decode_params(&output.bytes).expect("isToken result");
        assert_eq!(status, 22);
        assert!(exists);
        assert_eq!(precompile.committed_sequence(&evm.journal.inner.state), 0);
    }

    #[test]
    fn create_sweeps_attached_value_into_the_ledger() {
        let precompile = precompile();
        let mut evm = TestEvm::new();
        let attached = U256::from(500);
        evm.fund(precompile.address(), attached);
        let data = Hts::createFungibleTokenCall {
            token: Hts::HederaToken {
                name: "Bronze".into(),
                symbol: "BRZ".into(),
                treasury: CALLER,
                ..Default::default()
            },
            initialTotalSupply: U256::from(10),
            decimals: U256::ZERO,
        }
        .abi_encode();

        let output = evm.call(&precompile, &data, attached, false).expect("create succeeds");
        assert!(!output.reverted);
        assert_eq!(evm.account_balance(precompile.address()), Some(U256::ZERO));

        precompile.settle(&evm.journal.inner.state);
        let state = precompile.state().read();
        assert_eq!(state.root().account(&CALLER_ID).map(|account| account.balance), Some(500));
    }

    #[test]
    fn failures_are_reverted_outputs() {
        let precompile = precompile();
        let mut evm = TestEvm::new();
        let data = Hts::mintTokenCall {
            token: TokenId::from_num(4444).to_evm_address(),
            amount: 1,
            metadata: Vec::new(),
        }
        .abi_encode();

        let output = evm.call(&precompile, &data, U256::ZERO, false).expect("reverts, not errors");
        assert!(output.reverted);
        assert_eq!(&output.bytes[..], b"INVALID_TOKEN_ID");
        assert_eq!(precompile.committed_sequence(&evm.journal.inner.state), 0);

        let records = precompile.settle(&evm.journal.inner.state);
        assert_eq!(records.iter().map(|record| record.status).collect::<Vec<_>>(), [ResponseCode::InvalidTokenId]);
    }

    #[test]
    fn undecodable_input_is_an_error() {
        let precompile = precompile();
        let mut evm = TestEvm::new();

        let result = evm.call(&precompile, &[0x01, 0x02], U256::ZERO, false);
        assert!(matches!(result, Err(PrecompileError::Other(_))));
        assert_eq!(precompile.state().read().pending_records().count(), 0);
    }
}
