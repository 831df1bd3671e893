//! Turning a reconciliation into balance credits.

use crate::types::Reconciliation;
use hts_primitives::AccountId;

/// Balance credits to apply for a reconciled call, skipping zero amounts.
/// The attached value has already left the sender, so only credits remain.
pub fn credit_plan(
    reconciliation: &Reconciliation,
    sender: AccountId,
    funding_account: AccountId,
) -> Vec<(AccountId, u64)> {
    let mut v = Vec::with_capacity(2);
    if reconciliation.refund_to_sender != 0 {
        v.push((sender, reconciliation.refund_to_sender));
    }
    if reconciliation.top_up_to_fee_collector != 0 {
        v.push((funding_account, reconciliation.top_up_to_fee_collector));
    }
    v
}
