//! Outcome codes shared with natively submitted transactions.
//!
//! The numeric values are a fixed external protocol. The upper-snake-case name
//! of each variant is what a reverted precompile call carries as its revert
//! reason, so [`ResponseCode::name`] must match the protocol name exactly.

use alloy_rlp::{BufMut, Decodable, Encodable};
use serde::{Deserialize, Serialize};

/// Ledger transaction outcome.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::IntoStaticStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::FromRepr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
#[allow(missing_docs)]
pub enum ResponseCode {
    Ok = 0,
    InvalidTransaction = 1,
    InvalidSignature = 7,
    InsufficientTxFee = 9,
    InsufficientPayerBalance = 10,
    NotSupported = 13,
    InvalidAccountId = 15,
    Success = 22,
    FailInvalid = 23,
    InsufficientAccountBalance = 28,
    InsufficientGas = 30,
    InvalidAccountAmounts = 48,
    InvalidTransactionBody = 50,
    AccountDeleted = 72,
    AccountRepeatedInAccountAmounts = 74,
    AccountFrozenForToken = 165,
    TokensPerAccountLimitExceeded = 166,
    InvalidTokenId = 167,
    InvalidTokenDecimals = 168,
    InvalidTokenInitialSupply = 169,
    InvalidTreasuryAccountForToken = 170,
    TokenHasNoFreezeKey = 172,
    TransfersNotZeroSumForToken = 173,
    MissingTokenSymbol = 174,
    TokenSymbolTooLong = 175,
    AccountKycNotGrantedForToken = 176,
    TokenHasNoKycKey = 177,
    InsufficientTokenBalance = 178,
    TokenWasDeleted = 179,
    TokenHasNoSupplyKey = 180,
    TokenHasNoWipeKey = 181,
    InvalidTokenMintAmount = 182,
    InvalidTokenBurnAmount = 183,
    TokenNotAssociatedToAccount = 184,
    CannotWipeTokenTreasuryAccount = 185,
    MissingTokenName = 190,
    TokenNameTooLong = 191,
    InvalidWipingAmount = 192,
    TokenIsImmutable = 193,
    TokenAlreadyAssociatedToAccount = 194,
    TransactionRequiresZeroTokenBalances = 195,
    AccountIsTreasury = 196,
    TokenIdRepeatedInTokenList = 197,
    EmptyTokenTransferAccountAmounts = 200,
    InvalidTokenMaxSupply = 224,
    InvalidTokenNftSerialNumber = 225,
    InvalidNftId = 226,
    MetadataTooLong = 227,
    BatchSizeLimitExceeded = 228,
    TokenMaxSupplyReached = 236,
    SenderDoesNotOwnNftSerialNo = 237,
    CustomFeeMustBePositive = 239,
    CustomFeeOutsideNumericRange = 241,
    TreasuryMustOwnBurnedNft = 252,
    AccountDoesNotOwnWipedNft = 253,
    TokenIsPaused = 265,
    TokenHasNoPauseKey = 266,
    SpenderAccountSameAsOwner = 288,
    NegativeAllowanceAmount = 290,
    CannotApproveForAllFungibleCommon = 291,
    SpenderDoesNotHaveAllowance = 292,
    AmountExceedsAllowance = 293,
    MaxAllowancesExceeded = 294,
    FungibleTokenInNftAllowances = 298,
    NftInFungibleTokenAllowances = 299,
    InvalidAllowanceOwnerId = 300,
    InvalidAllowanceSpenderId = 301,
    DelegatingSpenderCannotGrantApproveForAll = 304,
    InvalidFullPrefixSignatureForPrecompile = 326,
}

impl ResponseCode {
    /// Numeric protocol value.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Protocol name, e.g. `INVALID_SIGNATURE`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether this code reports a successful outcome.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Ok)
    }
}

impl Encodable for ResponseCode {
    fn encode(&self, out: &mut dyn BufMut) {
        self.code().encode(out);
    }

    fn length(&self) -> usize {
        self.code().length()
    }
}

impl Decodable for ResponseCode {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let raw = u32::decode(buf)?;
        Self::from_repr(raw).ok_or(alloy_rlp::Error::Custom("unknown response code"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_match_protocol_spelling() {
        assert_eq!(ResponseCode::InvalidSignature.name(), "INVALID_SIGNATURE");
        assert_eq!(
            ResponseCode::SenderDoesNotOwnNftSerialNo.name(),
            "SENDER_DOES_NOT_OWN_NFT_SERIAL_NO"
        );
        assert_eq!(
            ResponseCode::NftInFungibleTokenAllowances.name(),
            "NFT_IN_FUNGIBLE_TOKEN_ALLOWANCES"
        );
        assert_eq!(
            ResponseCode::InvalidFullPrefixSignatureForPrecompile.name(),
            "INVALID_FULL_PREFIX_SIGNATURE_FOR_PRECOMPILE"
        );
        assert_eq!(ResponseCode::Ok.name(), "OK");
    }

    #[test]
    fn codes_are_unique_and_round_trip() {
        let mut seen = std::collections::BTreeSet::new();
        for code in ResponseCode::iter() {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
            assert_eq!(ResponseCode::from_repr(code.code()), Some(code));
            assert_eq!(code.name().parse::<ResponseCode>(), Ok(code));
        }
        assert_eq!(ResponseCode::Success.code(), 22);
        assert_eq!(ResponseCode::InvalidTokenId.code(), 167);
    }
}
