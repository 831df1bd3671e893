//! Synthetic records.
//!
//! Every dispatched call produces exactly one [`SyntheticRecord`], shaped
//! like the receipt of the equivalent native transaction, and hands it to
//! the enclosing transaction's [`InProgressRecords`].

use crate::failure::Failure;
use alloy_primitives::{Address, Bytes};
use alloy_rlp::{BufMut, Decodable, Encodable, Header, EMPTY_LIST_CODE};
use hts_primitives::{AccountId, ResponseCode, Timestamp, TokenId};

/// Native transaction a precompile call stands in for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TransactionKind {
    ContractCall = 0,
    TokenAssociate = 1,
    TokenDissociate = 2,
    TokenMint = 3,
    TokenBurn = 4,
    CryptoTransfer = 5,
    CryptoApproveAllowance = 6,
    TokenCreate = 7,
    TokenUpdate = 8,
    TokenPause = 9,
    TokenUnpause = 10,
    TokenFreeze = 11,
    TokenUnfreeze = 12,
    TokenGrantKyc = 13,
    TokenRevokeKyc = 14,
    TokenDelete = 15,
    TokenWipe = 16,
}

impl TransactionKind {
    const ALL: [Self; 17] = [
        Self::ContractCall,
        Self::TokenAssociate,
        Self::TokenDissociate,
        Self::TokenMint,
        Self::TokenBurn,
        Self::CryptoTransfer,
        Self::CryptoApproveAllowance,
        Self::TokenCreate,
        Self::TokenUpdate,
        Self::TokenPause,
        Self::TokenUnpause,
        Self::TokenFreeze,
        Self::TokenUnfreeze,
        Self::TokenGrantKyc,
        Self::TokenRevokeKyc,
        Self::TokenDelete,
        Self::TokenWipe,
    ];

    fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

/// State changes worth externalizing from a successful call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SideEffects {
    /// Token created by the call.
    pub created_token: Option<TokenId>,
    /// Total supply after a mint or burn.
    pub new_total_supply: Option<u64>,
    /// Serials minted.
    pub serial_numbers: Vec<u64>,
    /// Tinybars charged against attached value.
    pub value_charged: u64,
}

/// Receipt-shaped outcome of one precompile call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticRecord {
    /// Outcome.
    pub status: ResponseCode,
    /// Equivalent native transaction.
    pub kind: TransactionKind,
    /// Consensus time of the enclosing transaction.
    pub consensus_time: Timestamp,
    /// Token created, if any.
    pub created_token: Option<TokenId>,
    /// Resource fees, in tinybars.
    pub fee_tinybars: u64,
    /// Total supply after a mint or burn.
    pub new_total_supply: Option<u64>,
    /// Serials minted.
    pub serial_numbers: Vec<u64>,
    /// Payer of the synthetic transaction.
    pub sender: AccountId,
    /// Memo.
    pub memo: String,
    /// Return data on success, revert reason on failure.
    pub call_result: Bytes,
}

impl SyntheticRecord {
    fn fields_length(&self) -> usize {
        self.status.length()
            + (self.kind as u8).length()
            + self.consensus_time.seconds.length()
            + self.consensus_time.nanos.length()
            + optional_length(self.created_token.map(|t| t.to_evm_address()).as_ref())
            + self.fee_tinybars.length()
            + optional_length(self.new_total_supply.as_ref())
            + self.serial_numbers.length()
            + self.sender.to_evm_address().length()
            + self.memo.as_str().length()
            + self.call_result.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.status.encode(out);
        (self.kind as u8).encode(out);
        self.consensus_time.seconds.encode(out);
        self.consensus_time.nanos.encode(out);
        encode_optional(out, self.created_token.map(|t| t.to_evm_address()).as_ref());
        self.fee_tinybars.encode(out);
        encode_optional(out, self.new_total_supply.as_ref());
        self.serial_numbers.encode(out);
        self.sender.to_evm_address().encode(out);
        self.memo.as_str().encode(out);
        self.call_result.encode(out);
    }
}

impl Encodable for SyntheticRecord {
    fn length(&self) -> usize {
        Header { list: true, payload_length: self.fields_length() }.length_with_payload()
    }

    fn encode(&self, out: &mut dyn BufMut) {
        Header { list: true, payload_length: self.fields_length() }.encode(out);
        self.encode_fields(out);
    }
}

impl Decodable for SyntheticRecord {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let (mut body, rest) = buf
            .split_at_checked(header.payload_length)
            .ok_or(alloy_rlp::Error::InputTooShort)?;
        let record = Self {
            status: Decodable::decode(&mut body)?,
            kind: TransactionKind::from_u8(u8::decode(&mut body)?)
                .ok_or(alloy_rlp::Error::Custom("unknown transaction kind"))?,
            consensus_time: Timestamp {
                seconds: Decodable::decode(&mut body)?,
                nanos: Decodable::decode(&mut body)?,
            },
            created_token: decode_optional::<Address>(&mut body)?
                .map(|a| TokenId::from_evm_address(&a)),
            fee_tinybars: Decodable::decode(&mut body)?,
            new_total_supply: decode_optional(&mut body)?,
            serial_numbers: Decodable::decode(&mut body)?,
            sender: AccountId::from_evm_address(&Address::decode(&mut body)?),
            memo: Decodable::decode(&mut body)?,
            call_result: Decodable::decode(&mut body)?,
        };
        if !body.is_empty() {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: header.payload_length - body.len(),
            });
        }
        *buf = rest;
        Ok(record)
    }
}

fn optional_length<T: Encodable>(value: Option<&T>) -> usize {
    let payload_length = value.map_or(0, Encodable::length);
    Header { list: true, payload_length }.length_with_payload()
}

fn encode_optional<T: Encodable>(out: &mut dyn BufMut, value: Option<&T>) {
    match value {
        Some(v) => {
            Header { list: true, payload_length: v.length() }.encode(out);
            v.encode(out);
        }
        None => out.put_u8(EMPTY_LIST_CODE),
    }
}

fn decode_optional<T: Decodable>(buf: &mut &[u8]) -> alloy_rlp::Result<Option<T>> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString);
    }
    if header.payload_length == 0 {
        return Ok(None);
    }
    let (mut payload, rest) = buf
        .split_at_checked(header.payload_length)
        .ok_or(alloy_rlp::Error::InputTooShort)?;
    let value = T::decode(&mut payload)?;
    if !payload.is_empty() {
        return Err(alloy_rlp::Error::UnexpectedLength);
    }
    *buf = rest;
    Ok(Some(value))
}

/// Builds the record for one call. Consumed by whichever outcome occurs, so
/// a call cannot produce two.
#[derive(Debug)]
pub struct RecordBuilder {
    kind: TransactionKind,
    consensus_time: Timestamp,
    sender: AccountId,
    fee_tinybars: u64,
    call_result: Bytes,
}

impl RecordBuilder {
    /// Builder for a call by `sender` at `consensus_time`.
    pub const fn new(kind: TransactionKind, consensus_time: Timestamp, sender: AccountId) -> Self {
        Self { kind, consensus_time, sender, fee_tinybars: 0, call_result: Bytes::new() }
    }

    /// Resource fees to record.
    pub fn with_fee(mut self, fee_tinybars: u64) -> Self {
        self.fee_tinybars = fee_tinybars;
        self
    }

    /// Return data to export with a successful record.
    pub fn with_call_result(mut self, output: Bytes) -> Self {
        self.call_result = output;
        self
    }

    /// Record of a successful call.
    pub fn build_success(self, effects: SideEffects, memo: impl Into<String>) -> SyntheticRecord {
        SyntheticRecord {
            status: ResponseCode::Success,
            kind: self.kind,
            consensus_time: self.consensus_time,
            created_token: effects.created_token,
            fee_tinybars: self.fee_tinybars.saturating_add(effects.value_charged),
            new_total_supply: effects.new_total_supply,
            serial_numbers: effects.serial_numbers,
            sender: self.sender,
            memo: memo.into(),
            call_result: self.call_result,
        }
    }

    /// Record of a failed call.
    pub fn build_failure(self, failure: &Failure) -> SyntheticRecord {
        SyntheticRecord {
            status: failure.status,
            kind: self.kind,
            consensus_time: self.consensus_time,
            created_token: None,
            fee_tinybars: self.fee_tinybars,
            new_total_supply: None,
            serial_numbers: Vec::new(),
            sender: self.sender,
            memo: String::new(),
            call_result: Bytes::copy_from_slice(failure.revert_reason().as_bytes()),
        }
    }
}

/// The enclosing transaction's collection of child records.
pub trait InProgressRecords {
    /// Registers a finished record.
    fn track(&mut self, record: SyntheticRecord);
}

/// Records kept in memory, in registration order.
#[derive(Debug, Default, Clone)]
pub struct RecordLog {
    records: Vec<SyntheticRecord>,
}

impl RecordLog {
    /// Registered records.
    pub fn records(&self) -> &[SyntheticRecord] {
        &self.records
    }

    /// Number of registered records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&SyntheticRecord> {
        self.records.last()
    }

    /// Removes and returns every record.
    pub fn drain(&mut self) -> Vec<SyntheticRecord> {
        std::mem::take(&mut self.records)
    }
}

impl InProgressRecords for RecordLog {
    fn track(&mut self, record: SyntheticRecord) {
        tracing::info!(
            target: "hts::records",
            status = %record.status,
            kind = ?record.kind,
            fee = record.fee_tinybars,
            "tracked synthetic record"
        );
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minted() -> SyntheticRecord {
        RecordBuilder::new(
            TransactionKind::TokenMint,
            Timestamp { seconds: 1_700_000_000, nanos: 42 },
            AccountId::from_num(1001),
        )
        .with_fee(640)
        .build_success(
            SideEffects {
                new_total_supply: Some(15),
                serial_numbers: vec![1, 2],
                ..Default::default()
            },
            "mint",
        )
    }

    #[test]
    fn rlp_roundtrip_keeps_optional_fields() {
        let record = minted();
        let mut out = Vec::new();
        record.encode(&mut out);
        assert_eq!(out.len(), record.length());
        let decoded = SyntheticRecord::decode(&mut out.as_slice()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.created_token, None);
        assert_eq!(decoded.new_total_supply, Some(15));
    }

    #[test]
    fn zero_supply_is_distinct_from_absent_supply() {
        let mut record = minted();
        record.new_total_supply = Some(0);
        let mut some_zero = Vec::new();
        record.encode(&mut some_zero);
        record.new_total_supply = None;
        let mut none = Vec::new();
        record.encode(&mut none);
        assert_ne!(some_zero, none);
        assert_eq!(SyntheticRecord::decode(&mut some_zero.as_slice()).unwrap().new_total_supply, Some(0));
    }

    #[test]
    fn failure_records_carry_the_reason() {
        let record = RecordBuilder::new(
            TransactionKind::TokenBurn,
            Timestamp::default(),
            AccountId::from_num(1001),
        )
        .build_failure(&ResponseCode::InvalidSignature.into());
        assert_eq!(record.status, ResponseCode::InvalidSignature);
        assert_eq!(record.call_result.as_ref(), b"INVALID_SIGNATURE");
    }

    #[test]
    fn log_keeps_registration_order() {
        let mut log = RecordLog::default();
        log.track(minted());
        log.track(
            RecordBuilder::new(TransactionKind::ContractCall, Timestamp::default(), AccountId::from_num(1))
                .build_success(SideEffects::default(), ""),
        );
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().map(|r| r.kind), Some(TransactionKind::ContractCall));
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }
}
