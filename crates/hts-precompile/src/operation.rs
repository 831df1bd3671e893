//! Operation descriptors produced by the codec.

use crate::{abi::IHederaTokenService as Hts, failure::Failure, records::TransactionKind};
use alloy_primitives::{Address, Bytes, U256};
use hts_fees::PricedOperation;
use hts_primitives::{ResponseCode, TokenId};

/// Which encoding the call arrived in, and therefore which result encoding
/// it expects back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Form {
    /// Protocol-native call at the service address; results lead with a
    /// status code.
    Native,
    /// ERC-20/721 call through the token-proxy redirect; results are bare
    /// values.
    Erc,
}

/// One fungible leg of a transfer list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjustment {
    /// Account whose balance changes.
    pub account: Address,
    /// Signed change; negative for debits.
    pub amount: i64,
}

/// One NFT movement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftExchange {
    /// Current owner.
    pub sender: Address,
    /// New owner.
    pub receiver: Address,
    /// Serial moved.
    pub serial: i64,
}

/// All movements of a single token in a transfer batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferList {
    /// Token moved.
    pub token: TokenId,
    /// Fungible legs.
    pub adjustments: Vec<Adjustment>,
    /// NFT legs.
    pub nft_exchanges: Vec<NftExchange>,
}

/// Token definition to create.
#[derive(Clone, Debug)]
pub struct TokenCreate {
    /// True for non-fungible tokens.
    pub non_fungible: bool,
    /// Token shape.
    pub token: Hts::HederaToken,
    /// Initial supply, before range checks.
    pub initial_supply: U256,
    /// Decimals, before range checks.
    pub decimals: U256,
    /// Fixed custom fees.
    pub fixed_fees: Vec<Hts::FixedFee>,
    /// Fractional custom fees (fungible only).
    pub fractional_fees: Vec<Hts::FractionalFee>,
    /// Royalty custom fees (non-fungible only).
    pub royalty_fees: Vec<Hts::RoyaltyFee>,
}

/// A decoded call. Each variant carries only what its handler needs.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum Operation {
    AssociateOne { account: Address, token: TokenId },
    AssociateMany { account: Address, tokens: Vec<TokenId> },
    DissociateOne { account: Address, token: TokenId },
    DissociateMany { account: Address, tokens: Vec<TokenId> },
    Mint { token: TokenId, amount: u64, metadata: Vec<Bytes> },
    Burn { token: TokenId, amount: u64, serials: Vec<i64> },
    /// Both `wipeTokenAccount` widths; the `uint32` form is widened.
    Wipe { token: TokenId, account: Address, amount: i64 },
    WipeNft { token: TokenId, account: Address, serials: Vec<i64> },
    TransferToken { token: TokenId, sender: Address, recipient: Address, amount: i64 },
    TransferTokens { token: TokenId, accounts: Vec<Address>, amounts: Vec<i64> },
    TransferNft { token: TokenId, sender: Address, recipient: Address, serial: i64 },
    TransferNfts { token: TokenId, senders: Vec<Address>, recipients: Vec<Address>, serials: Vec<i64> },
    CryptoTransfer { lists: Vec<TransferList> },
    /// ERC-20 `transfer`: moves the caller's own units.
    ErcTransfer { token: TokenId, recipient: Address, amount: U256 },
    TransferFrom { token: TokenId, from: Address, to: Address, amount: U256, form: Form },
    TransferFromNft { token: TokenId, from: Address, to: Address, serial: U256, form: Form },
    Approve { token: TokenId, spender: Address, amount: U256, form: Form },
    ApproveNft { token: TokenId, spender: Address, serial: U256, form: Form },
    SetApprovalForAll { token: TokenId, operator: Address, approved: bool, form: Form },
    Allowance { token: TokenId, owner: Address, spender: Address, form: Form },
    GetApproved { token: TokenId, serial: U256, form: Form },
    IsApprovedForAll { token: TokenId, owner: Address, operator: Address, form: Form },
    BalanceOf { token: TokenId, account: Address },
    OwnerOf { token: TokenId, serial: U256 },
    TokenUri { token: TokenId, serial: U256 },
    Name { token: TokenId },
    Symbol { token: TokenId },
    Decimals { token: TokenId },
    TotalSupply { token: TokenId },
    IsToken { token: TokenId },
    TokenType { token: TokenId },
    TokenKey { token: TokenId, key_type: U256 },
    TokenInfo { token: TokenId },
    TokenCustomFees { token: TokenId },
    DefaultKycStatus { token: TokenId },
    DefaultFreezeStatus { token: TokenId },
    TokenExpiryInfo { token: TokenId },
    IsFrozen { token: TokenId, account: Address },
    IsKyc { token: TokenId, account: Address },
    CreateToken(Box<TokenCreate>),
    UpdateToken { token: TokenId, info: Box<Hts::HederaToken> },
    Pause { token: TokenId },
    Unpause { token: TokenId },
    Freeze { token: TokenId, account: Address },
    Unfreeze { token: TokenId, account: Address },
    GrantKyc { token: TokenId, account: Address },
    RevokeKyc { token: TokenId, account: Address },
    DeleteToken { token: TokenId },
}

impl Operation {
    /// Queries never write to the ledger.
    pub const fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Allowance { .. }
                | Self::GetApproved { .. }
                | Self::IsApprovedForAll { .. }
                | Self::BalanceOf { .. }
                | Self::OwnerOf { .. }
                | Self::TokenUri { .. }
                | Self::Name { .. }
                | Self::Symbol { .. }
                | Self::Decimals { .. }
                | Self::TotalSupply { .. }
                | Self::IsToken { .. }
                | Self::TokenType { .. }
                | Self::TokenKey { .. }
                | Self::TokenInfo { .. }
                | Self::TokenCustomFees { .. }
                | Self::DefaultKycStatus { .. }
                | Self::DefaultFreezeStatus { .. }
                | Self::TokenExpiryInfo { .. }
                | Self::IsFrozen { .. }
                | Self::IsKyc { .. }
        )
    }

    /// Operations that create ledger entities and must be paid for with
    /// attached value.
    pub const fn creates_entities(&self) -> bool {
        matches!(self, Self::CreateToken(_))
    }

    /// Price class used for the fee quote.
    pub fn priced(&self) -> PricedOperation {
        match self {
            Self::AssociateOne { .. } | Self::AssociateMany { .. } => PricedOperation::Associate,
            Self::DissociateOne { .. } | Self::DissociateMany { .. } => PricedOperation::Dissociate,
            Self::Mint { metadata, .. } if !metadata.is_empty() => PricedOperation::MintNft,
            Self::Mint { .. } => PricedOperation::Mint,
            Self::Burn { .. } => PricedOperation::Burn,
            Self::Wipe { .. } | Self::WipeNft { .. } => PricedOperation::Wipe,
            Self::TransferNft { .. } | Self::TransferNfts { .. } | Self::TransferFromNft { .. } => {
                PricedOperation::TransferNft
            }
            Self::CryptoTransfer { lists }
                if lists.iter().any(|list| !list.nft_exchanges.is_empty()) =>
            {
                PricedOperation::TransferNft
            }
            Self::TransferToken { .. }
            | Self::TransferTokens { .. }
            | Self::CryptoTransfer { .. }
            | Self::ErcTransfer { .. }
            | Self::TransferFrom { .. } => PricedOperation::Transfer,
            Self::Approve { .. } | Self::ApproveNft { .. } => PricedOperation::Approve,
            Self::SetApprovalForAll { .. } => PricedOperation::ApproveForAll,
            Self::CreateToken(_) => PricedOperation::TokenCreate,
            Self::UpdateToken { .. } => PricedOperation::TokenUpdate,
            Self::Pause { .. }
            | Self::Unpause { .. }
            | Self::Freeze { .. }
            | Self::Unfreeze { .. }
            | Self::GrantKyc { .. }
            | Self::RevokeKyc { .. }
            | Self::DeleteToken { .. } => PricedOperation::Admin,
            _ => PricedOperation::Query,
        }
    }

    /// Native transaction this call is recorded as.
    pub const fn kind(&self) -> TransactionKind {
        match self {
            Self::AssociateOne { .. } | Self::AssociateMany { .. } => TransactionKind::TokenAssociate,
            Self::DissociateOne { .. } | Self::DissociateMany { .. } => {
                TransactionKind::TokenDissociate
            }
            Self::Mint { .. } => TransactionKind::TokenMint,
            Self::Burn { .. } => TransactionKind::TokenBurn,
            Self::Wipe { .. } | Self::WipeNft { .. } => TransactionKind::TokenWipe,
            Self::TransferToken { .. }
            | Self::TransferTokens { .. }
            | Self::TransferNft { .. }
            | Self::TransferNfts { .. }
            | Self::CryptoTransfer { .. }
            | Self::ErcTransfer { .. }
            | Self::TransferFrom { .. }
            | Self::TransferFromNft { .. } => TransactionKind::CryptoTransfer,
            Self::Approve { .. } | Self::ApproveNft { .. } | Self::SetApprovalForAll { .. } => {
                TransactionKind::CryptoApproveAllowance
            }
            Self::CreateToken(_) => TransactionKind::TokenCreate,
            Self::UpdateToken { .. } => TransactionKind::TokenUpdate,
            Self::Pause { .. } => TransactionKind::TokenPause,
            Self::Unpause { .. } => TransactionKind::TokenUnpause,
            Self::Freeze { .. } => TransactionKind::TokenFreeze,
            Self::Unfreeze { .. } => TransactionKind::TokenUnfreeze,
            Self::GrantKyc { .. } => TransactionKind::TokenGrantKyc,
            Self::RevokeKyc { .. } => TransactionKind::TokenRevokeKyc,
            Self::DeleteToken { .. } => TransactionKind::TokenDelete,
            _ => TransactionKind::ContractCall,
        }
    }

    /// Range checks on descriptor fields. Runs before any ledger access.
    pub fn validate(&self) -> Result<(), Failure> {
        match self {
            Self::Mint { amount, metadata, .. } => {
                if *amount > i64::MAX as u64 {
                    return Err(ResponseCode::InvalidTokenMintAmount.into());
                }
                if *amount != 0 && !metadata.is_empty() {
                    return Err(ResponseCode::InvalidTransactionBody.into());
                }
            }
            Self::Burn { amount, serials, .. } => {
                if *amount > i64::MAX as u64 {
                    return Err(ResponseCode::InvalidTokenBurnAmount.into());
                }
                if serials.iter().any(|s| *s <= 0) {
                    return Err(ResponseCode::InvalidNftId.into());
                }
            }
            Self::Wipe { amount, .. } if *amount <= 0 => {
                return Err(ResponseCode::InvalidWipingAmount.into());
            }
            Self::WipeNft { serials, .. } => {
                if serials.is_empty() {
                    return Err(ResponseCode::InvalidWipingAmount.into());
                }
                if serials.iter().any(|s| *s <= 0) {
                    return Err(ResponseCode::InvalidNftId.into());
                }
            }
            Self::TransferTokens { accounts, amounts, .. } => {
                if accounts.is_empty() {
                    return Err(ResponseCode::EmptyTokenTransferAccountAmounts.into());
                }
                if accounts.len() != amounts.len() || amounts.contains(&i64::MIN) {
                    return Err(ResponseCode::InvalidAccountAmounts.into());
                }
            }
            Self::TransferNfts { senders, recipients, serials, .. } => {
                if serials.is_empty() {
                    return Err(ResponseCode::EmptyTokenTransferAccountAmounts.into());
                }
                if senders.len() != serials.len() || recipients.len() != serials.len() {
                    return Err(ResponseCode::InvalidAccountAmounts.into());
                }
                if serials.iter().any(|s| *s <= 0) {
                    return Err(ResponseCode::InvalidTokenNftSerialNumber.into());
                }
            }
            Self::TransferToken { amount, .. } if *amount < 0 => {
                return Err(ResponseCode::InvalidAccountAmounts.into());
            }
            Self::TransferNft { serial, .. } if *serial <= 0 => {
                return Err(ResponseCode::InvalidTokenNftSerialNumber.into());
            }
            Self::CryptoTransfer { lists } => {
                if lists.is_empty() {
                    return Err(ResponseCode::EmptyTokenTransferAccountAmounts.into());
                }
                for list in lists {
                    if list.adjustments.iter().any(|a| a.amount == i64::MIN) {
                        return Err(ResponseCode::InvalidAccountAmounts.into());
                    }
                    if list.adjustments.is_empty() && list.nft_exchanges.is_empty() {
                        return Err(ResponseCode::EmptyTokenTransferAccountAmounts.into());
                    }
                    if list.nft_exchanges.iter().any(|x| x.serial <= 0) {
                        return Err(ResponseCode::InvalidTokenNftSerialNumber.into());
                    }
                }
            }
            Self::ErcTransfer { amount, .. } | Self::TransferFrom { amount, .. } => {
                check_i64(amount, ResponseCode::InvalidAccountAmounts)?;
            }
            Self::Approve { amount, .. } => {
                check_i64(amount, ResponseCode::NegativeAllowanceAmount)?;
            }
            Self::TransferFromNft { serial, .. }
            | Self::ApproveNft { serial, .. }
            | Self::GetApproved { serial, .. }
            | Self::OwnerOf { serial, .. } => {
                check_i64(serial, ResponseCode::InvalidTokenNftSerialNumber)?;
            }
            Self::AssociateMany { tokens, .. } | Self::DissociateMany { tokens, .. }
                if tokens.is_empty() =>
            {
                return Err(ResponseCode::InvalidTransactionBody.into());
            }
            _ => {}
        }
        Ok(())
    }
}

/// `value` as a non-negative `i64`.
pub(crate) fn check_i64(value: &U256, status: ResponseCode) -> Result<i64, Failure> {
    i64::try_from(*value).map_err(|_| Failure::from(status))
}
