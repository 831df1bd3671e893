//! Operation codec.
//!
//! Pure functions from call data to [`Operation`] descriptors and from
//! handler results to return data. Nothing here touches the ledger; the one
//! fact the redirect path needs about state (the token's type) is supplied by
//! the caller.

use crate::{
    abi::{
        IHederaTokenService::{self as Hts, IHederaTokenServiceCalls as HtsCall},
        ITokenProxy::{self as Erc, ITokenProxyCalls as ErcCall},
        REDIRECT_FOR_TOKEN, REDIRECT_HEADER_LEN,
    },
    operation::{Adjustment, Form, NftExchange, Operation, TokenCreate, TransferList},
};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolInterface, SolValue};
use hts_primitives::{ResponseCode, TokenId, TokenType};
use thiserror::Error;

/// Revert reason for NFT-only ERC forms called on a fungible token.
pub const ERC20_MISMATCH: &str = "Invalid operation for ERC-20 token!";

/// Revert reason for fungible-only ERC forms called on an NFT.
pub const ERC721_MISMATCH: &str = "Invalid operation for ERC-721 token!";

/// `tokenURI` result for a serial that does not exist.
pub const MISSING_TOKEN_URI: &str = "ERC721Metadata: URI query for nonexistent token";

/// Status code leading every successful protocol-native result.
pub const SUCCESS_CODE: i64 = ResponseCode::Success.code() as i64;

/// Errors raised while decoding call data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer than four bytes of input.
    #[error("input shorter than a selector")]
    Truncated,
    /// The selector is not part of the dispatch table.
    #[error("unknown selector 0x{}", alloy_primitives::hex::encode(.0))]
    UnknownSelector([u8; 4]),
    /// The arguments do not decode against the selector's signature.
    #[error("malformed arguments: {0}")]
    Malformed(String),
    /// A redirect names a token that does not exist.
    #[error("redirect to unknown token {0}")]
    UnknownToken(TokenId),
    /// An ERC form was sent to a token of the wrong type.
    #[error("{0}")]
    UnsupportedForTokenType(&'static str),
}

impl DecodeError {
    /// Errors detected after the selector was recognised against a known
    /// token; these are reported like validation failures.
    pub const fn status(&self) -> Option<ResponseCode> {
        match self {
            Self::UnknownToken(_) | Self::UnsupportedForTokenType(_) => {
                Some(ResponseCode::InvalidTokenId)
            }
            Self::Truncated | Self::UnknownSelector(_) | Self::Malformed(_) => None,
        }
    }
}

/// A decoded call.
#[derive(Clone, Debug)]
pub struct Decoded {
    /// What to do.
    pub operation: Operation,
    /// Token whose address received the call, for redirected calls.
    pub redirect: Option<TokenId>,
}

/// Splits a redirected call into the target token and nested call data.
pub fn split_redirect(data: &[u8]) -> Option<(TokenId, &[u8])> {
    if data.len() < REDIRECT_HEADER_LEN || data[..4] != REDIRECT_FOR_TOKEN {
        return None;
    }
    let token = Address::from_slice(&data[4..REDIRECT_HEADER_LEN]);
    Some((TokenId::from_evm_address(&token), &data[REDIRECT_HEADER_LEN..]))
}

fn selector_of(data: &[u8]) -> Result<[u8; 4], DecodeError> {
    data.get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or(DecodeError::Truncated)
}

/// Whether the selector (or, for redirects, the nested selector) is in the
/// dispatch table. Checked before any ledger access.
pub fn is_known_selector(data: &[u8]) -> bool {
    match split_redirect(data) {
        Some((_, nested)) => selector_of(nested).is_ok_and(ErcCall::valid_selector),
        None => selector_of(data).is_ok_and(HtsCall::valid_selector),
    }
}

/// Whether the call is a query that a static frame may serve.
pub fn is_read_only_call(data: &[u8]) -> bool {
    const NATIVE: &[[u8; 4]] = &[
        Hts::allowanceCall::SELECTOR,
        Hts::getApprovedCall::SELECTOR,
        Hts::isApprovedForAllCall::SELECTOR,
        Hts::isTokenCall::SELECTOR,
        Hts::getTokenTypeCall::SELECTOR,
        Hts::getTokenKeyCall::SELECTOR,
        Hts::getTokenInfoCall::SELECTOR,
        Hts::getTokenCustomFeesCall::SELECTOR,
        Hts::getTokenDefaultKycStatusCall::SELECTOR,
        Hts::getTokenDefaultFreezeStatusCall::SELECTOR,
        Hts::getTokenExpiryInfoCall::SELECTOR,
        Hts::isFrozenCall::SELECTOR,
        Hts::isKycCall::SELECTOR,
    ];
    const PROXY: &[[u8; 4]] = &[
        Erc::nameCall::SELECTOR,
        Erc::symbolCall::SELECTOR,
        Erc::decimalsCall::SELECTOR,
        Erc::totalSupplyCall::SELECTOR,
        Erc::balanceOfCall::SELECTOR,
        Erc::ownerOfCall::SELECTOR,
        Erc::tokenURICall::SELECTOR,
        Erc::allowanceCall::SELECTOR,
        Erc::getApprovedCall::SELECTOR,
        Erc::isApprovedForAllCall::SELECTOR,
    ];
    match split_redirect(data) {
        Some((_, nested)) => selector_of(nested).is_ok_and(|s| PROXY.contains(&s)),
        None => selector_of(data).is_ok_and(|s| NATIVE.contains(&s)),
    }
}

/// Decodes call data into an operation.
///
/// `token_type_of` resolves the type of a redirect target; ERC forms are
/// ambiguous between fungible and non-fungible tokens without it.
pub fn decode(
    data: &[u8],
    token_type_of: impl Fn(&TokenId) -> Option<TokenType>,
) -> Result<Decoded, DecodeError> {
    match split_redirect(data) {
        Some((token, nested)) => {
            let token_type = token_type_of(&token).ok_or(DecodeError::UnknownToken(token))?;
            let operation = decode_proxy(token, token_type, nested)?;
            Ok(Decoded { operation, redirect: Some(token) })
        }
        None => Ok(Decoded { operation: decode_native(data)?, redirect: None }),
    }
}

fn malformed(err: alloy_sol_types::Error) -> DecodeError {
    DecodeError::Malformed(err.to_string())
}

fn token_id(address: Address) -> TokenId {
    TokenId::from_evm_address(&address)
}

fn token_ids(addresses: Vec<Address>) -> Vec<TokenId> {
    addresses.into_iter().map(token_id).collect()
}

fn decode_native(data: &[u8]) -> Result<Operation, DecodeError> {
    let selector = selector_of(data)?;
    if !HtsCall::valid_selector(selector) {
        return Err(DecodeError::UnknownSelector(selector));
    }
    let call = HtsCall::abi_decode(data).map_err(malformed)?;
    let op = match call {
        HtsCall::associateToken(c) => {
            Operation::AssociateOne { account: c.account, token: token_id(c.token) }
        }
        HtsCall::associateTokens(c) => {
            Operation::AssociateMany { account: c.account, tokens: token_ids(c.tokens) }
        }
        HtsCall::dissociateToken(c) => {
            Operation::DissociateOne { account: c.account, token: token_id(c.token) }
        }
        HtsCall::dissociateTokens(c) => {
            Operation::DissociateMany { account: c.account, tokens: token_ids(c.tokens) }
        }
        HtsCall::mintToken(c) => {
            Operation::Mint { token: token_id(c.token), amount: c.amount, metadata: c.metadata }
        }
        HtsCall::burnToken(c) => Operation::Burn {
            token: token_id(c.token),
            amount: c.amount,
            serials: c.serialNumbers,
        },
        HtsCall::wipeTokenAccount_0(c) => Operation::Wipe {
            token: token_id(c.token),
            account: c.account,
            amount: i64::from(c.amount),
        },
        HtsCall::wipeTokenAccount_1(c) => {
            Operation::Wipe { token: token_id(c.token), account: c.account, amount: c.amount }
        }
        HtsCall::wipeTokenAccountNFT(c) => Operation::WipeNft {
            token: token_id(c.token),
            account: c.account,
            serials: c.serialNumbers,
        },
        HtsCall::transferToken(c) => Operation::TransferToken {
            token: token_id(c.token),
            sender: c.sender,
            recipient: c.recipient,
            amount: c.amount,
        },
        HtsCall::transferTokens(c) => Operation::TransferTokens {
            token: token_id(c.token),
            accounts: c.accountId,
            amounts: c.amount,
        },
        HtsCall::transferNFT(c) => Operation::TransferNft {
            token: token_id(c.token),
            sender: c.sender,
            recipient: c.recipient,
            serial: c.serialNumber,
        },
        HtsCall::transferNFTs(c) => Operation::TransferNfts {
            token: token_id(c.token),
            senders: c.sender,
            recipients: c.receiver,
            serials: c.serialNumber,
        },
        HtsCall::cryptoTransfer(c) => Operation::CryptoTransfer {
            lists: c.tokenTransfers.into_iter().map(transfer_list).collect(),
        },
        HtsCall::transferFrom(c) => Operation::TransferFrom {
            token: token_id(c.token),
            from: c.from,
            to: c.to,
            amount: c.amount,
            form: Form::Native,
        },
        HtsCall::transferFromNFT(c) => Operation::TransferFromNft {
            token: token_id(c.token),
            from: c.from,
            to: c.to,
            serial: c.serialNumber,
            form: Form::Native,
        },
        HtsCall::approve(c) => Operation::Approve {
            token: token_id(c.token),
            spender: c.spender,
            amount: c.amount,
            form: Form::Native,
        },
        HtsCall::approveNFT(c) => Operation::ApproveNft {
            token: token_id(c.token),
            spender: c.approved,
            serial: c.serialNumber,
            form: Form::Native,
        },
        HtsCall::setApprovalForAll(c) => Operation::SetApprovalForAll {
            token: token_id(c.token),
            operator: c.operator,
            approved: c.approved,
            form: Form::Native,
        },
        HtsCall::allowance(c) => Operation::Allowance {
            token: token_id(c.token),
            owner: c.owner,
            spender: c.spender,
            form: Form::Native,
        },
        HtsCall::getApproved(c) => Operation::GetApproved {
            token: token_id(c.token),
            serial: c.serialNumber,
            form: Form::Native,
        },
        HtsCall::isApprovedForAll(c) => Operation::IsApprovedForAll {
            token: token_id(c.token),
            owner: c.owner,
            operator: c.operator,
            form: Form::Native,
        },
        HtsCall::createFungibleToken(c) => Operation::CreateToken(Box::new(TokenCreate {
            non_fungible: false,
            token: c.token,
            initial_supply: c.initialTotalSupply,
            decimals: c.decimals,
            fixed_fees: Vec::new(),
            fractional_fees: Vec::new(),
            royalty_fees: Vec::new(),
        })),
        HtsCall::createFungibleTokenWithCustomFees(c) => {
            Operation::CreateToken(Box::new(TokenCreate {
                non_fungible: false,
                token: c.token,
                initial_supply: c.initialTotalSupply,
                decimals: c.decimals,
                fixed_fees: c.fixedFees,
                fractional_fees: c.fractionalFees,
                royalty_fees: Vec::new(),
            }))
        }
        HtsCall::createNonFungibleToken(c) => Operation::CreateToken(Box::new(TokenCreate {
            non_fungible: true,
            token: c.token,
            initial_supply: U256::ZERO,
            decimals: U256::ZERO,
            fixed_fees: Vec::new(),
            fractional_fees: Vec::new(),
            royalty_fees: Vec::new(),
        })),
        HtsCall::createNonFungibleTokenWithCustomFees(c) => {
            Operation::CreateToken(Box::new(TokenCreate {
                non_fungible: true,
                token: c.token,
                initial_supply: U256::ZERO,
                decimals: U256::ZERO,
                fixed_fees: c.fixedFees,
                fractional_fees: Vec::new(),
                royalty_fees: c.royaltyFees,
            }))
        }
        HtsCall::updateTokenInfo(c) => {
            Operation::UpdateToken { token: token_id(c.token), info: Box::new(c.tokenInfo) }
        }
        HtsCall::pauseToken(c) => Operation::Pause { token: token_id(c.token) },
        HtsCall::unpauseToken(c) => Operation::Unpause { token: token_id(c.token) },
        HtsCall::deleteToken(c) => Operation::DeleteToken { token: token_id(c.token) },
        HtsCall::freezeToken(c) => Operation::Freeze { token: token_id(c.token), account: c.account },
        HtsCall::unfreezeToken(c) => {
            Operation::Unfreeze { token: token_id(c.token), account: c.account }
        }
        HtsCall::grantTokenKyc(c) => {
            Operation::GrantKyc { token: token_id(c.token), account: c.account }
        }
        HtsCall::revokeTokenKyc(c) => {
            Operation::RevokeKyc { token: token_id(c.token), account: c.account }
        }
        HtsCall::isToken(c) => Operation::IsToken { token: token_id(c.token) },
        HtsCall::getTokenType(c) => Operation::TokenType { token: token_id(c.token) },
        HtsCall::getTokenKey(c) => {
            Operation::TokenKey { token: token_id(c.token), key_type: c.keyType }
        }
        HtsCall::getTokenInfo(c) => Operation::TokenInfo { token: token_id(c.token) },
        HtsCall::getTokenCustomFees(c) => Operation::TokenCustomFees { token: token_id(c.token) },
        HtsCall::getTokenDefaultKycStatus(c) => {
            Operation::DefaultKycStatus { token: token_id(c.token) }
        }
        HtsCall::getTokenDefaultFreezeStatus(c) => {
            Operation::DefaultFreezeStatus { token: token_id(c.token) }
        }
        HtsCall::getTokenExpiryInfo(c) => Operation::TokenExpiryInfo { token: token_id(c.token) },
        HtsCall::isFrozen(c) => Operation::IsFrozen { token: token_id(c.token), account: c.account },
        HtsCall::isKyc(c) => Operation::IsKyc { token: token_id(c.token), account: c.account },
    };
    Ok(op)
}

fn transfer_list(list: Hts::TokenTransferList) -> TransferList {
    TransferList {
        token: token_id(list.token),
        adjustments: list
            .transfers
            .into_iter()
            .map(|aa| Adjustment { account: aa.accountID, amount: aa.amount })
            .collect(),
        nft_exchanges: list
            .nftTransfers
            .into_iter()
            .map(|nt| NftExchange {
                sender: nt.senderAccountID,
                receiver: nt.receiverAccountID,
                serial: nt.serialNumber,
            })
            .collect(),
    }
}

fn decode_proxy(
    token: TokenId,
    token_type: TokenType,
    nested: &[u8],
) -> Result<Operation, DecodeError> {
    let selector = selector_of(nested)?;
    if !ErcCall::valid_selector(selector) {
        return Err(DecodeError::UnknownSelector(selector));
    }
    let call = ErcCall::abi_decode(nested).map_err(malformed)?;
    let nft = token_type.is_nft();
    let fungible_only = || {
        if nft {
            Err(DecodeError::UnsupportedForTokenType(ERC721_MISMATCH))
        } else {
            Ok(())
        }
    };
    let nft_only = || {
        if nft {
            Ok(())
        } else {
            Err(DecodeError::UnsupportedForTokenType(ERC20_MISMATCH))
        }
    };
    let op = match call {
        ErcCall::name(_) => Operation::Name { token },
        ErcCall::symbol(_) => Operation::Symbol { token },
        ErcCall::totalSupply(_) => Operation::TotalSupply { token },
        ErcCall::balanceOf(c) => Operation::BalanceOf { token, account: c.account },
        ErcCall::decimals(_) => {
            fungible_only()?;
            Operation::Decimals { token }
        }
        ErcCall::transfer(c) => {
            fungible_only()?;
            Operation::ErcTransfer { token, recipient: c.recipient, amount: c.amount }
        }
        ErcCall::allowance(c) => {
            fungible_only()?;
            Operation::Allowance { token, owner: c.owner, spender: c.spender, form: Form::Erc }
        }
        ErcCall::ownerOf(c) => {
            nft_only()?;
            Operation::OwnerOf { token, serial: c.tokenId }
        }
        ErcCall::tokenURI(c) => {
            nft_only()?;
            Operation::TokenUri { token, serial: c.tokenId }
        }
        ErcCall::getApproved(c) => {
            nft_only()?;
            Operation::GetApproved { token, serial: c.tokenId, form: Form::Erc }
        }
        ErcCall::setApprovalForAll(c) => {
            nft_only()?;
            Operation::SetApprovalForAll {
                token,
                operator: c.operator,
                approved: c.approved,
                form: Form::Erc,
            }
        }
        ErcCall::isApprovedForAll(c) => {
            nft_only()?;
            Operation::IsApprovedForAll {
                token,
                owner: c.owner,
                operator: c.operator,
                form: Form::Erc,
            }
        }
        ErcCall::transferFrom(c) if nft => Operation::TransferFromNft {
            token,
            from: c.sender,
            to: c.recipient,
            serial: c.amount,
            form: Form::Erc,
        },
        ErcCall::transferFrom(c) => Operation::TransferFrom {
            token,
            from: c.sender,
            to: c.recipient,
            amount: c.amount,
            form: Form::Erc,
        },
        ErcCall::approve(c) if nft => {
            Operation::ApproveNft { token, spender: c.spender, serial: c.amount, form: Form::Erc }
        }
        ErcCall::approve(c) => {
            Operation::Approve { token, spender: c.spender, amount: c.amount, form: Form::Erc }
        }
    };
    Ok(op)
}

/// `(int64 status)` result.
pub fn encode_status(status: ResponseCode) -> Bytes {
    (status.code() as i64,).abi_encode_params().into()
}

/// Result of a state-changing call: the status word for protocol-native
/// forms, `true` (or nothing, for `setApprovalForAll`) for ERC forms.
pub fn encode_write_ack(form: Form, erc_returns_bool: bool) -> Bytes {
    match form {
        Form::Native => encode_status(ResponseCode::Success),
        Form::Erc if erc_returns_bool => true.abi_encode().into(),
        Form::Erc => Bytes::new(),
    }
}

/// Result of a query: `(int64 status, value)` for protocol-native forms,
/// the bare value for ERC forms.
pub fn encode_query<T: SolValue>(form: Form, value: T) -> Bytes {
    match form {
        Form::Native => (SUCCESS_CODE, value).abi_encode_params().into(),
        Form::Erc => value.abi_encode().into(),
    }
}

/// Result of `mintToken`.
pub fn encode_mint(new_total_supply: u64, serials: &[u64]) -> Bytes {
    let serials: Vec<i64> = serials.iter().map(|s| *s as i64).collect();
    (SUCCESS_CODE, new_total_supply, serials).abi_encode_params().into()
}

/// Result of `burnToken`.
pub fn encode_burn(new_total_supply: u64) -> Bytes {
    (SUCCESS_CODE, new_total_supply).abi_encode_params().into()
}

/// Revert payload carrying a reason string.
pub fn encode_revert_reason(reason: &str) -> Bytes {
    Bytes::copy_from_slice(reason.as_bytes())
}
