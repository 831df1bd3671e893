//! Call-level failure type.

use hts_fees::FeeError;
use hts_ledger::LedgerError;
use hts_primitives::ResponseCode;
use std::{borrow::Cow, fmt};

/// Why a call did not succeed: the status recorded for it and, when the
/// status name alone is not what callers see, the revert reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Status recorded in the synthetic record.
    pub status: ResponseCode,
    /// Revert reason override.
    pub reason: Option<Cow<'static, str>>,
}

impl Failure {
    /// Failure with a fixed revert reason.
    pub fn with_reason(status: ResponseCode, reason: impl Into<Cow<'static, str>>) -> Self {
        Self { status, reason: Some(reason.into()) }
    }

    /// Text placed in the revert payload.
    pub fn revert_reason(&self) -> &str {
        self.reason.as_deref().unwrap_or_else(|| self.status.name())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{} ({reason})", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for Failure {}

impl From<ResponseCode> for Failure {
    fn from(status: ResponseCode) -> Self {
        Self { status, reason: None }
    }
}

impl From<LedgerError> for Failure {
    fn from(err: LedgerError) -> Self {
        err.status().into()
    }
}

impl From<FeeError> for Failure {
    fn from(err: FeeError) -> Self {
        match err {
            FeeError::InsufficientValue { .. } => ResponseCode::InsufficientTxFee.into(),
            FeeError::MissingPrice(_) | FeeError::ZeroGasPrice => ResponseCode::FailInvalid.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_defaults_to_status_name() {
        let failure = Failure::from(LedgerError::Rule(ResponseCode::TokenIsPaused));
        assert_eq!(failure.revert_reason(), "TOKEN_IS_PAUSED");

        let custom = Failure::with_reason(ResponseCode::InvalidTokenId, "Invalid operation for ERC-20 token!");
        assert_eq!(custom.revert_reason(), "Invalid operation for ERC-20 token!");
    }

    #[test]
    fn short_value_is_an_insufficient_fee() {
        let failure = Failure::from(FeeError::InsufficientValue { required: 10, attached: 3 });
        assert_eq!(failure.status, ResponseCode::InsufficientTxFee);
    }
}
