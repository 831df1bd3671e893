//! Authorization gate.
//!
//! Key activation is decided against an [`AuthorizationContext`] computed
//! once per call. Contract keys are satisfied by the calling contract;
//! cryptographic keys by the enclosing transaction's signatures, which this
//! crate sees only through a [`SignatureOracle`].

use alloy_primitives::Address;
use hts_ledger::{LedgerSnapshot, LedgerView};
use hts_primitives::{AccountId, Key, NftId, TokenId, TokenKeyType};
use std::fmt;

/// Who is calling, resolved from the call frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthorizationContext {
    /// Account of the precompile's immediate caller.
    pub sender: AccountId,
    /// EVM address the caller used.
    pub sender_address: Address,
    /// Address the call was sent to: the service, or a token for redirects.
    pub recipient: Address,
    /// Nearest non-delegate contract above the caller, if any.
    pub parent_contract: Option<AccountId>,
    /// Whether the caller reached the precompile through a delegate call.
    pub delegate_call: bool,
}

/// Source of truth for cryptographic signatures on the enclosing transaction.
pub trait SignatureOracle: Send + Sync + fmt::Debug {
    /// Whether `key` (an Ed25519 or secp256k1 key) signed the transaction.
    fn has_signature(&self, key: &Key) -> bool;
}

/// Oracle for EVM-originated calls, which carry no ledger signatures.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSignatures;

impl SignatureOracle for NoSignatures {
    fn has_signature(&self, _key: &Key) -> bool {
        false
    }
}

/// Oracle over a fixed set of keys known to have signed.
#[derive(Clone, Debug, Default)]
pub struct SignedKeys(pub Vec<Key>);

impl SignatureOracle for SignedKeys {
    fn has_signature(&self, key: &Key) -> bool {
        self.0.contains(key)
    }
}

/// Authority an operation needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authority {
    /// The account's own key.
    AccountKey(AccountId),
    /// A role key of a token.
    TokenKey {
        /// Token.
        token: TokenId,
        /// Role.
        role: TokenKeyType,
    },
    /// Debiting `amount` fungible units from `owner`.
    Debit {
        /// Account debited.
        owner: AccountId,
        /// Token moved.
        token: TokenId,
        /// Units debited.
        amount: u64,
    },
    /// Moving an NFT away from `owner`.
    NftDebit {
        /// NFT moved.
        nft: NftId,
        /// Current owner.
        owner: AccountId,
    },
    /// Crediting an account.
    Credit(AccountId),
    /// A key supplied with the call itself, e.g. the admin key of a new token.
    CryptoKey(Key),
}

/// How an authority was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grant {
    /// The caller is the account itself.
    Sender,
    /// A required key was active.
    Key,
    /// A fungible allowance from the owner covers the debit.
    Allowance,
    /// The caller holds approve-for-all from the owner.
    Operator,
    /// The caller is the approved spender of the serial.
    Spender,
    /// The credited account does not require a receiver signature.
    NoReceiverSigRequired,
}

/// Decides whether required authorities are present.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationGate<'a> {
    oracle: &'a dyn SignatureOracle,
}

impl<'a> AuthorizationGate<'a> {
    /// Gate consulting `oracle` for cryptographic keys.
    pub const fn new(oracle: &'a dyn SignatureOracle) -> Self {
        Self { oracle }
    }

    /// Whether `key` is active for the calling context.
    pub fn is_key_active(&self, key: &Key, ctx: &AuthorizationContext) -> bool {
        match key {
            Key::ContractId(id) => *id == ctx.sender && !ctx.delegate_call,
            Key::DelegatableContractId(id) => {
                *id == ctx.sender || ctx.parent_contract == Some(*id)
            }
            Key::Ed25519(_) | Key::EcdsaSecp256k1(_) => self.oracle.has_signature(key),
            Key::KeyList(keys) => !keys.is_empty() && keys.iter().all(|k| self.is_key_active(k, ctx)),
            Key::Threshold { threshold, keys } => {
                *threshold > 0
                    && keys.iter().filter(|k| self.is_key_active(k, ctx)).count()
                        >= *threshold as usize
            }
        }
    }

    fn account_key_active(
        &self,
        account: &AccountId,
        ctx: &AuthorizationContext,
        ledger: &LedgerSnapshot<'_>,
    ) -> Option<Grant> {
        if *account == ctx.sender && !ctx.delegate_call {
            return Some(Grant::Sender);
        }
        let holder = ledger.account(account)?;
        let key = holder.key.as_ref()?;
        self.is_key_active(key, ctx).then_some(Grant::Key)
    }

    /// How `authority` is satisfied, or `None` if it is not.
    pub fn check(
        &self,
        authority: &Authority,
        ctx: &AuthorizationContext,
        ledger: &LedgerSnapshot<'_>,
    ) -> Option<Grant> {
        let grant = match authority {
            Authority::AccountKey(account) => self.account_key_active(account, ctx, ledger),
            Authority::TokenKey { token, role } => ledger
                .token(token)
                .is_some_and(|definition| {
                    definition.key(*role).is_some_and(|key| self.is_key_active(key, ctx))
                })
                .then_some(Grant::Key),
            Authority::Debit { owner, token, amount } => {
                self.account_key_active(owner, ctx, ledger).or_else(|| {
                    (ledger.fungible_allowance(owner, token, &ctx.sender) >= *amount)
                        .then_some(Grant::Allowance)
                })
            }
            Authority::NftDebit { nft, owner } => {
                self.account_key_active(owner, ctx, ledger).or_else(|| {
                    if ledger.nft_spender(nft) == Some(ctx.sender) {
                        Some(Grant::Spender)
                    } else if ledger.is_approved_for_all(owner, &nft.token, &ctx.sender) {
                        Some(Grant::Operator)
                    } else {
                        None
                    }
                })
            }
            Authority::Credit(account) => match ledger.account(account) {
                Some(holder) if !holder.receiver_sig_required => {
                    Some(Grant::NoReceiverSigRequired)
                }
                Some(_) => self.account_key_active(account, ctx, ledger),
                None => None,
            },
            Authority::CryptoKey(key) => self.is_key_active(key, ctx).then_some(Grant::Key),
        };
        match grant {
            Some(grant) => {
                tracing::debug!(target: "hts::auth", ?authority, ?grant, sender = %ctx.sender, "authorized")
            }
            None => tracing::warn!(target: "hts::auth", ?authority, sender = %ctx.sender, "denied"),
        }
        grant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::FixedBytes;
    use hts_ledger::{Account, MemoryLedger, Token, UniqueToken};
    use hts_primitives::Timestamp;

    const CONTRACT: AccountId = AccountId::from_num(1001);
    const OWNER: AccountId = AccountId::from_num(1002);
    const PARENT: AccountId = AccountId::from_num(1003);
    const TOKEN: TokenId = TokenId::from_num(2001);

    fn ctx(delegate_call: bool) -> AuthorizationContext {
        AuthorizationContext {
            sender: CONTRACT,
            sender_address: CONTRACT.to_evm_address(),
            recipient: Address::ZERO,
            parent_contract: Some(PARENT),
            delegate_call,
        }
    }

    #[test]
    fn contract_keys_follow_delegate_semantics() {
        let gate = AuthorizationGate::new(&NoSignatures);
        assert!(gate.is_key_active(&Key::ContractId(CONTRACT), &ctx(false)));
        assert!(!gate.is_key_active(&Key::ContractId(CONTRACT), &ctx(true)));
        assert!(gate.is_key_active(&Key::DelegatableContractId(PARENT), &ctx(true)));
        assert!(!gate.is_key_active(&Key::ContractId(PARENT), &ctx(false)));
    }

    #[test]
    fn thresholds_count_active_members() {
        let ed = Key::Ed25519(FixedBytes::repeat_byte(1));
        let signed = SignedKeys(vec![ed.clone()]);
        let gate = AuthorizationGate::new(&signed);
        let two_of_three = Key::Threshold {
            threshold: 2,
            keys: vec![ed.clone(), Key::ContractId(CONTRACT), Key::ContractId(OWNER)],
        };
        assert!(gate.is_key_active(&two_of_three, &ctx(false)));
        assert!(!gate.is_key_active(&two_of_three, &ctx(true)));
        assert!(!gate.is_key_active(&Key::KeyList(vec![]), &ctx(false)));
    }

    #[test]
    fn nft_debits_accept_spender_and_operator() {
        let mut root = MemoryLedger::new();
        root.put_account(Account::new(OWNER).with_key(Key::Ed25519(FixedBytes::repeat_byte(9))));
        root.put_account(Account::new(CONTRACT));
        root.put_token(Token { id: TOKEN, treasury: OWNER, ..Default::default() });
        let nft = NftId::new(TOKEN, 1);
        root.put_nft(UniqueToken {
            id: nft,
            owner: OWNER,
            spender: Some(CONTRACT),
            metadata: Default::default(),
            created: Timestamp::default(),
        });
        let snapshot = LedgerSnapshot::wrap(&mut root);
        let gate = AuthorizationGate::new(&NoSignatures);
        let debit = Authority::NftDebit { nft, owner: OWNER };
        assert_eq!(gate.check(&debit, &ctx(false), &snapshot), Some(Grant::Spender));

        let other = Authority::NftDebit { nft: NftId::new(TOKEN, 2), owner: OWNER };
        assert_eq!(gate.check(&other, &ctx(false), &snapshot), None);
        assert_eq!(snapshot.write_count(), 0);
    }

    #[test]
    fn credits_need_no_signature_unless_required() {
        let mut root = MemoryLedger::new();
        root.put_account(Account::new(OWNER));
        let mut strict = Account::new(PARENT).with_key(Key::Ed25519(FixedBytes::repeat_byte(2)));
        strict.receiver_sig_required = true;
        root.put_account(strict);
        let snapshot = LedgerSnapshot::wrap(&mut root);
        let gate = AuthorizationGate::new(&NoSignatures);
        assert_eq!(
            gate.check(&Authority::Credit(OWNER), &ctx(false), &snapshot),
            Some(Grant::NoReceiverSigRequired)
        );
        assert_eq!(gate.check(&Authority::Credit(PARENT), &ctx(false), &snapshot), None);
    }
}
