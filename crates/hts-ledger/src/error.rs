use hts_primitives::{AccountId, NftId, ResponseCode, TokenId};

/// Ledger rule violations, raised by the token and account logic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The account does not exist.
    #[error("account {0} does not exist")]
    MissingAccount(AccountId),
    /// The account exists but has been deleted.
    #[error("account {0} is deleted")]
    AccountDeleted(AccountId),
    /// The token does not exist.
    #[error("token {0} does not exist")]
    MissingToken(TokenId),
    /// The NFT does not exist.
    #[error("nft {0} does not exist")]
    MissingNft(NftId),
    /// The account has no relationship with the token.
    #[error("account {account} is not associated with token {token}")]
    NotAssociated {
        /// Account.
        account: AccountId,
        /// Token.
        token: TokenId,
    },
    /// Any other rule, reported by its status code.
    #[error("ledger rule violated: {0}")]
    Rule(ResponseCode),
}

impl LedgerError {
    /// Status code a native transaction would report for this violation.
    pub const fn status(&self) -> ResponseCode {
        match self {
            Self::MissingAccount(_) => ResponseCode::InvalidAccountId,
            Self::AccountDeleted(_) => ResponseCode::AccountDeleted,
            Self::MissingToken(_) => ResponseCode::InvalidTokenId,
            Self::MissingNft(_) => ResponseCode::InvalidNftId,
            Self::NotAssociated { .. } => ResponseCode::TokenNotAssociatedToAccount,
            Self::Rule(code) => *code,
        }
    }
}

impl From<ResponseCode> for LedgerError {
    fn from(code: ResponseCode) -> Self {
        Self::Rule(code)
    }
}
