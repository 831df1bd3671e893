//! Dispatch engine.
//!
//! One call moves through `Idle → FieldsPrepared → ComputationPrepared →
//! Executed`. Each stage is its own type and consumes the previous one, so a
//! handler can only run once the caller is resolved and the operation is
//! decoded, priced and validated.
//!
//! Undecodable input halts before any ledger access and leaves no record.
//! Every other call registers exactly one synthetic record: a success record
//! after the snapshot is committed, or a failure record after it is
//! discarded.

use crate::{
    auth::{AuthorizationContext, AuthorizationGate, NoSignatures, SignatureOracle},
    codec::{self, DecodeError},
    config::HtsConfig,
    failure::Failure,
    handlers::{self, CallContext, Executed},
    operation::Operation,
    records::{InProgressRecords, RecordBuilder, SyntheticRecord, TransactionKind},
};
use alloy_primitives::{Address, Bytes};
use hts_fees::{FeeQuote, FeeSchedule};
use hts_ledger::{LedgerSnapshot, LedgerView};
use hts_primitives::{AccountId, ResponseCode, Timestamp};
use std::sync::Arc;

/// Revert reason for rejected static frames.
pub const STATIC_CALL_REASON: &str = "HTS precompiles are not static";

/// Halt reason for input that does not decode.
pub const DECODE_FAILURE_REASON: &str = "Error decoding precompile input";

/// Whether the frame may change state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallMode {
    /// `STATICCALL` or a view context.
    View,
    /// Regular call.
    #[default]
    Mutable,
}

/// The VM call frame that reached the precompile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallFrame {
    /// Immediate caller.
    pub sender: Address,
    /// Address called: the service address, or a token for redirects.
    pub recipient: Address,
    /// Nearest non-delegate contract above the caller.
    pub parent_contract: Option<AccountId>,
    /// Whether the caller was reached through a delegate call.
    pub delegate_call: bool,
    /// Value attached to the call, in tinybars.
    pub value: u64,
    /// Gas left in the frame.
    pub gas_remaining: u64,
    /// Static or mutable.
    pub mode: CallMode,
    /// Consensus time of the enclosing transaction.
    pub consensus_time: Timestamp,
}

/// What the VM sees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Return data of a successful call.
    Success {
        /// ABI-encoded return data.
        output: Bytes,
        /// Gas charged.
        gas_used: u64,
    },
    /// Reverted call; state changes are dropped.
    Revert {
        /// Revert payload.
        reason: Bytes,
        /// Gas charged.
        gas_used: u64,
    },
    /// The call could not be interpreted at all.
    Halt {
        /// Human-readable reason.
        reason: String,
        /// Gas charged.
        gas_used: u64,
    },
}

impl DispatchOutcome {
    /// Gas charged for the call.
    pub const fn gas_used(&self) -> u64 {
        match self {
            Self::Success { gas_used, .. }
            | Self::Revert { gas_used, .. }
            | Self::Halt { gas_used, .. } => *gas_used,
        }
    }

    /// Whether the call succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Routes token service calls to their handlers.
#[derive(Clone, Debug)]
pub struct DispatchEngine {
    config: HtsConfig,
    fees: FeeSchedule,
    oracle: Arc<dyn SignatureOracle>,
}

impl DispatchEngine {
    /// Engine that sees no transaction signatures, as for EVM-originated calls.
    pub fn new(config: HtsConfig, fees: FeeSchedule) -> Self {
        Self::with_oracle(config, fees, Arc::new(NoSignatures))
    }

    /// Engine consulting `oracle` for cryptographic keys.
    pub fn with_oracle(
        config: HtsConfig,
        fees: FeeSchedule,
        oracle: Arc<dyn SignatureOracle>,
    ) -> Self {
        Self { config, fees, oracle }
    }

    /// Active configuration.
    pub const fn config(&self) -> &HtsConfig {
        &self.config
    }

    /// Handles one call against `world`, registering its record in `records`.
    pub fn handle(
        &self,
        input: &[u8],
        frame: &CallFrame,
        world: &mut dyn LedgerView,
        records: &mut dyn InProgressRecords,
    ) -> DispatchOutcome {
        let idle = Idle { engine: self, input, frame };
        if let Err(outcome) = idle.admit() {
            return outcome;
        }
        let fields = match idle.prepare_fields(world) {
            Ok(fields) => fields,
            Err(rejected) => return rejected.finish(records),
        };
        let computation = match fields.prepare_computation() {
            Ok(computation) => computation,
            Err(Rejected::Halt(outcome)) => return outcome,
            Err(rejected) => return rejected.finish(records),
        };
        computation.execute().finish(records)
    }
}

/// A call that has not touched the ledger yet.
struct Idle<'e> {
    engine: &'e DispatchEngine,
    input: &'e [u8],
    frame: &'e CallFrame,
}

/// Caller resolved and snapshot open.
struct FieldsPrepared<'e, 'w> {
    idle: Idle<'e>,
    ledger: LedgerSnapshot<'w>,
    auth: AuthorizationContext,
}

/// Operation decoded, priced and validated.
struct ComputationPrepared<'e, 'w> {
    fields: FieldsPrepared<'e, 'w>,
    operation: Operation,
    quote: FeeQuote,
    gas: u64,
}

/// A call that ended before its handler ran.
enum Rejected {
    /// No record is kept.
    Halt(DispatchOutcome),
    /// Reverted with a failure record.
    Failed { record: SyntheticRecord, reason: Bytes, gas_used: u64 },
}

/// A call whose handler ran.
enum Finished {
    Success { record: SyntheticRecord, output: Bytes, gas_used: u64 },
    Reverted { record: SyntheticRecord, reason: Bytes, gas_used: u64 },
}

impl Rejected {
    fn finish(self, records: &mut dyn InProgressRecords) -> DispatchOutcome {
        match self {
            Self::Halt(outcome) => outcome,
            Self::Failed { record, reason, gas_used } => {
                records.track(record);
                DispatchOutcome::Revert { reason, gas_used }
            }
        }
    }
}

impl Finished {
    fn finish(self, records: &mut dyn InProgressRecords) -> DispatchOutcome {
        match self {
            Self::Success { record, output, gas_used } => {
                records.track(record);
                DispatchOutcome::Success { output, gas_used }
            }
            Self::Reverted { record, reason, gas_used } => {
                records.track(record);
                DispatchOutcome::Revert { reason, gas_used }
            }
        }
    }
}

fn halt(reason: &str, gas_used: u64) -> DispatchOutcome {
    DispatchOutcome::Halt { reason: reason.to_string(), gas_used }
}

impl<'e> Idle<'e> {
    const fn default_gas(&self) -> u64 {
        self.engine.config.default_gas_cost
    }

    /// Checks that don't need the ledger: frame mode and selector.
    fn admit(&self) -> Result<(), DispatchOutcome> {
        if self.frame.mode == CallMode::View
            && !(self.engine.config.static_queries_enabled && codec::is_read_only_call(self.input))
        {
            tracing::warn!(target: "hts::dispatch", caller = ?self.frame.sender, "static frame rejected");
            return Err(halt(STATIC_CALL_REASON, self.default_gas()));
        }
        if !codec::is_known_selector(self.input) {
            tracing::debug!(
                target: "hts::dispatch",
                caller = ?self.frame.sender,
                len = self.input.len(),
                "unknown selector"
            );
            return Err(halt(DECODE_FAILURE_REASON, self.default_gas()));
        }
        Ok(())
    }

    /// Failure before an operation is known; recorded as a plain contract call.
    fn reject(&self, sender: AccountId, failure: &Failure) -> Rejected {
        tracing::warn!(target: "hts::dispatch", status = %failure.status, "call rejected");
        let record = RecordBuilder::new(
            TransactionKind::ContractCall,
            self.frame.consensus_time,
            sender,
        )
        .build_failure(failure);
        Rejected::Failed {
            record,
            reason: codec::encode_revert_reason(failure.revert_reason()),
            gas_used: self.default_gas(),
        }
    }

    fn prepare_fields<'w>(self, world: &'w mut dyn LedgerView) -> Result<FieldsPrepared<'e, 'w>, Rejected> {
        let ledger = LedgerSnapshot::wrap(world);
        let sender = match ledger.resolve_account(&self.frame.sender) {
            Ok(sender) => sender,
            Err(err) => {
                return Err(self.reject(AccountId::from_evm_address(&self.frame.sender), &err.into()))
            }
        };
        if !self.engine.config.redirect_enabled && codec::split_redirect(self.input).is_some() {
            return Err(self.reject(sender, &ResponseCode::NotSupported.into()));
        }
        let auth = AuthorizationContext {
            sender,
            sender_address: self.frame.sender,
            recipient: self.frame.recipient,
            parent_contract: self.frame.parent_contract,
            delegate_call: self.frame.delegate_call,
        };
        tracing::debug!(target: "hts::dispatch", %sender, "fields prepared");
        Ok(FieldsPrepared { idle: self, ledger, auth })
    }
}

impl<'e, 'w> FieldsPrepared<'e, 'w> {
    fn prepare_computation(self) -> Result<ComputationPrepared<'e, 'w>, Rejected> {
        let engine = self.idle.engine;
        let decoded = codec::decode(self.idle.input, |id| {
            self.ledger.token(id).map(|token| token.token_type)
        });
        let operation = match decoded {
            Ok(decoded) => decoded.operation,
            Err(err) => return Err(self.reject_decode(err)),
        };

        let kind = operation.kind();
        let quote = match hts_fees::quote(&engine.fees, operation.priced(), self.idle.frame.consensus_time) {
            Ok(quote) => quote,
            Err(err) => return Err(self.reject(kind, &err.into())),
        };
        let gas = match hts_fees::gas_requirement(&quote, engine.config.gas_price_tinybars) {
            Ok(gas) => gas,
            Err(err) => return Err(self.reject(kind, &err.into())),
        };
        let remaining = self.idle.frame.gas_remaining;
        if remaining < gas {
            return Err(self.reject_priced(kind, &quote, remaining, &ResponseCode::InsufficientGas.into()));
        }
        if let Err(failure) = operation.validate() {
            return Err(self.reject_priced(kind, &quote, gas, &failure));
        }
        tracing::debug!(target: "hts::dispatch", ?kind, gas, "computation prepared");
        Ok(ComputationPrepared { fields: self, operation, quote, gas })
    }

    fn reject_decode(self, err: DecodeError) -> Rejected {
        let failure = match (&err, err.status()) {
            (DecodeError::UnsupportedForTokenType(reason), Some(status)) => {
                Failure::with_reason(status, *reason)
            }
            (_, Some(status)) => status.into(),
            (_, None) => {
                tracing::debug!(target: "hts::dispatch", %err, "undecodable input");
                return Rejected::Halt(halt(DECODE_FAILURE_REASON, self.idle.default_gas()));
            }
        };
        self.reject(TransactionKind::ContractCall, &failure)
    }

    fn reject(self, kind: TransactionKind, failure: &Failure) -> Rejected {
        let gas = self.idle.default_gas();
        self.rejected(kind, 0, gas, failure)
    }

    fn reject_priced(self, kind: TransactionKind, quote: &FeeQuote, gas: u64, failure: &Failure) -> Rejected {
        self.rejected(kind, quote.chargeable_tinybars(), gas, failure)
    }

    fn rejected(self, kind: TransactionKind, fee: u64, gas_used: u64, failure: &Failure) -> Rejected {
        tracing::warn!(target: "hts::dispatch", ?kind, status = %failure.status, "call rejected");
        self.ledger.discard();
        let record = RecordBuilder::new(kind, self.idle.frame.consensus_time, self.auth.sender)
            .with_fee(fee)
            .build_failure(failure);
        Rejected::Failed {
            record,
            reason: codec::encode_revert_reason(failure.revert_reason()),
            gas_used,
        }
    }
}

impl ComputationPrepared<'_, '_> {
    fn execute(self) -> Finished {
        let Self { fields, operation, quote, gas } = self;
        let FieldsPrepared { idle, mut ledger, auth } = fields;
        let engine = idle.engine;
        let kind = operation.kind();
        let cx = CallContext {
            config: &engine.config,
            gate: AuthorizationGate::new(engine.oracle.as_ref()),
            auth,
            now: idle.frame.consensus_time,
            value: idle.frame.value,
            quote: &quote,
        };
        let builder = RecordBuilder::new(kind, idle.frame.consensus_time, auth.sender)
            .with_fee(quote.chargeable_tinybars());

        match handlers::execute(&operation, &cx, &mut ledger) {
            Ok(Executed { output, effects }) => {
                let writes = ledger.write_count();
                ledger.commit();
                tracing::debug!(target: "hts::dispatch", ?kind, writes, gas, "committed");
                let builder = if engine.config.export_call_results {
                    builder.with_call_result(output.clone())
                } else {
                    builder
                };
                Finished::Success { record: builder.build_success(effects, ""), output, gas_used: gas }
            }
            Err(failure) => {
                ledger.discard();
                tracing::warn!(
                    target: "hts::dispatch",
                    ?kind,
                    status = %failure.status,
                    reason = failure.revert_reason(),
                    "reverted"
                );
                Finished::Reverted {
                    reason: codec::encode_revert_reason(failure.revert_reason()),
                    record: builder.build_failure(&failure),
                    gas_used: gas,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{abi::IHederaTokenService as Hts, records::RecordLog};
    use alloy_primitives::address;
    use alloy_sol_types::SolCall;
    use hts_fees::default_fee_schedule;
    use hts_ledger::{Account, MemoryLedger};
    use hts_primitives::{Key, TokenId};

    const CALLER: Address = address!("0x00000000000000000000000000000000000003e9");
    const DEFAULT_GAS: u64 = crate::config::DEFAULT_GAS_COST;

    fn frame(mode: CallMode) -> CallFrame {
        CallFrame {
            sender: CALLER,
            recipient: crate::config::HTS_PRECOMPILE_ADDR,
            parent_contract: None,
            delegate_call: false,
            value: 0,
            gas_remaining: 5_000_000,
            mode,
            consensus_time: Timestamp::from_seconds(1_700_000_000),
        }
    }

    fn world() -> MemoryLedger {
        let mut ledger = MemoryLedger::default();
        let caller = AccountId::from_num(1001);
        ledger.put_account(Account::new(caller).with_key(Key::ContractId(caller)));
        ledger
    }

    fn is_token(token: TokenId) -> Vec<u8> {
        Hts::isTokenCall { token: token.to_evm_address() }.abi_encode()
    }

    #[test]
    fn unknown_selector_halts_without_record() {
        let engine = DispatchEngine::new(HtsConfig::default(), default_fee_schedule());
        let mut world = world();
        let mut records = RecordLog::default();
        let outcome = engine.handle(&[0xde, 0xad, 0xbe, 0xef], &frame(CallMode::Mutable), &mut world, &mut records);
        match outcome {
            DispatchOutcome::Halt { reason, gas_used } => {
                assert_eq!(reason, DECODE_FAILURE_REASON);
                assert_eq!(gas_used, DEFAULT_GAS);
            }
            other => panic!("expected halt, got {other:?}"),
        }
        assert!(records.is_empty());
    }

    #[test]
    fn static_frames_are_rejected_unless_enabled() {
        let input = is_token(TokenId::from_num(2000));
        let engine = DispatchEngine::new(HtsConfig::default(), default_fee_schedule());
        let mut world = world();
        let mut records = RecordLog::default();
        let outcome = engine.handle(&input, &frame(CallMode::View), &mut world, &mut records);
        assert_eq!(outcome, halt(STATIC_CALL_REASON, DEFAULT_GAS));
        assert!(records.is_empty());

        let config = HtsConfig { static_queries_enabled: true, ..Default::default() };
        let engine = DispatchEngine::new(config, default_fee_schedule());
        let outcome = engine.handle(&input, &frame(CallMode::View), &mut world, &mut records);
        assert!(outcome.is_success());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn unresolvable_sender_fails_with_record() {
        let engine = DispatchEngine::new(HtsConfig::default(), default_fee_schedule());
        let mut world = MemoryLedger::default();
        let mut records = RecordLog::default();
        let mut call = frame(CallMode::Mutable);
        call.sender = address!("0x1111111111111111111111111111111111111111");
        let outcome = engine.handle(&is_token(TokenId::from_num(5)), &call, &mut world, &mut records);
        match outcome {
            DispatchOutcome::Revert { reason, .. } => assert_eq!(&reason[..], b"INVALID_ACCOUNT_ID"),
            other => panic!("expected revert, got {other:?}"),
        }
        assert_eq!(records.last().map(|r| r.status), Some(ResponseCode::InvalidAccountId));
    }

    #[test]
    fn insufficient_gas_reverts_with_priced_record() {
        let engine = DispatchEngine::new(HtsConfig::default(), default_fee_schedule());
        let mut world = world();
        let mut records = RecordLog::default();
        let mut call = frame(CallMode::Mutable);
        call.gas_remaining = 1;
        let outcome = engine.handle(&is_token(TokenId::from_num(5)), &call, &mut world, &mut records);
        assert_eq!(outcome.gas_used(), 1);
        let record = records.last().expect("failure record");
        assert_eq!(record.status, ResponseCode::InsufficientGas);
        assert!(record.fee_tinybars > 0);
    }
}
