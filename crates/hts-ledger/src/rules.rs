//! Token and account rules applied through a snapshot.
//!
//! Every mutation here validates first and writes last, so a returned error
//! never leaves a partial write behind in the snapshot.

use crate::{
    Account, LedgerError, LedgerSnapshot, LedgerView, RelKey, Token, TokenRelation, UniqueToken,
};
use alloy_primitives::{Address, Bytes};
use hts_primitives::{ids::is_long_zero, AccountId, NftId, ResponseCode, Timestamp, TokenId};
use std::borrow::Cow;

/// Per-account caps enforced by the rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum token relationships per account.
    pub max_tokens_per_account: u32,
    /// Maximum allowance entries per account.
    pub max_allowances_per_account: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_tokens_per_account: 1000, max_allowances_per_account: 100 }
    }
}

impl LedgerSnapshot<'_> {
    /// Resolves an EVM address to an account id. Long-zero addresses map
    /// directly; anything else goes through the alias index.
    pub fn resolve_account(&self, address: &Address) -> Result<AccountId, LedgerError> {
        if is_long_zero(address) {
            return Ok(AccountId::from_evm_address(address));
        }
        self.account_by_alias(address)
            .ok_or(LedgerError::MissingAccount(AccountId::from_evm_address(address)))
    }

    /// Loads a live account.
    pub fn live_account(&self, id: &AccountId) -> Result<Cow<'_, Account>, LedgerError> {
        let account = self.account(id).ok_or(LedgerError::MissingAccount(*id))?;
        if account.deleted {
            return Err(LedgerError::AccountDeleted(*id));
        }
        Ok(account)
    }

    /// Loads a token that has not been deleted.
    pub fn live_token(&self, id: &TokenId) -> Result<Cow<'_, Token>, LedgerError> {
        let token = self.token(id).ok_or(LedgerError::MissingToken(*id))?;
        if token.deleted {
            return Err(ResponseCode::TokenWasDeleted.into());
        }
        Ok(token)
    }

    /// Loads a live token that is not paused.
    pub fn usable_token(&self, id: &TokenId) -> Result<Cow<'_, Token>, LedgerError> {
        let token = self.live_token(id)?;
        if token.paused {
            return Err(ResponseCode::TokenIsPaused.into());
        }
        Ok(token)
    }

    /// Loads an existing relationship.
    pub fn live_relation(
        &self,
        account: &AccountId,
        token: &TokenId,
    ) -> Result<Cow<'_, TokenRelation>, LedgerError> {
        self.relation(&RelKey::new(*account, *token))
            .ok_or(LedgerError::NotAssociated { account: *account, token: *token })
    }

    /// Loads an existing NFT.
    pub fn live_nft(&self, id: &NftId) -> Result<Cow<'_, UniqueToken>, LedgerError> {
        self.nft(id).ok_or(LedgerError::MissingNft(*id))
    }

    /// Creates relationships between `account` and each of `tokens`.
    pub fn associate(
        &mut self,
        account: &AccountId,
        tokens: &[TokenId],
        limits: &Limits,
    ) -> Result<(), LedgerError> {
        let mut holder = self.live_account(account)?.into_owned();
        let mut pending = Vec::with_capacity(tokens.len());
        for (idx, token_id) in tokens.iter().enumerate() {
            if tokens[..idx].contains(token_id) {
                return Err(ResponseCode::TokenIdRepeatedInTokenList.into());
            }
            let token = self.live_token(token_id)?;
            let key = RelKey::new(*account, *token_id);
            if self.relation(&key).is_some() {
                return Err(ResponseCode::TokenAlreadyAssociatedToAccount.into());
            }
            let frozen = token.freeze_default
                && token.key(hts_primitives::TokenKeyType::Freeze).is_some();
            pending.push((
                key,
                TokenRelation {
                    balance: 0,
                    frozen,
                    kyc_granted: token.kyc_granted_by_default(),
                    automatic_association: false,
                },
            ));
        }
        let total = holder.num_associations as usize + pending.len();
        if total > limits.max_tokens_per_account as usize {
            return Err(ResponseCode::TokensPerAccountLimitExceeded.into());
        }
        holder.num_associations = total as u32;
        for (key, relation) in pending {
            self.put_relation(key, relation);
        }
        self.put_account(holder);
        Ok(())
    }

    /// Removes relationships between `account` and each of `tokens`.
    pub fn dissociate(&mut self, account: &AccountId, tokens: &[TokenId]) -> Result<(), LedgerError> {
        let mut holder = self.live_account(account)?.into_owned();
        let mut removals = Vec::with_capacity(tokens.len());
        for (idx, token_id) in tokens.iter().enumerate() {
            if tokens[..idx].contains(token_id) {
                return Err(ResponseCode::TokenIdRepeatedInTokenList.into());
            }
            let token = self.token(token_id).ok_or(LedgerError::MissingToken(*token_id))?;
            let relation = self.live_relation(account, token_id)?;
            if !token.deleted {
                if token.treasury == *account {
                    return Err(ResponseCode::AccountIsTreasury.into());
                }
                if relation.frozen {
                    return Err(ResponseCode::AccountFrozenForToken.into());
                }
                if relation.balance > 0 {
                    return Err(ResponseCode::TransactionRequiresZeroTokenBalances.into());
                }
            }
            removals.push(RelKey::new(*account, *token_id));
        }
        holder.num_associations = holder.num_associations.saturating_sub(removals.len() as u32);
        for key in removals {
            self.remove_relation(key);
        }
        self.put_account(holder);
        Ok(())
    }

    /// Checks that `account` may send or receive `token`.
    fn transferable_relation(
        &self,
        account: &AccountId,
        token: &TokenId,
    ) -> Result<TokenRelation, LedgerError> {
        self.live_account(account)?;
        let relation = self.live_relation(account, token)?;
        if relation.frozen {
            return Err(ResponseCode::AccountFrozenForToken.into());
        }
        if !relation.kyc_granted {
            return Err(ResponseCode::AccountKycNotGrantedForToken.into());
        }
        Ok(relation.into_owned())
    }

    /// Applies a signed balance change to a fungible relationship.
    pub fn adjust_fungible(
        &mut self,
        account: &AccountId,
        token: &TokenId,
        delta: i64,
    ) -> Result<u64, LedgerError> {
        if self.usable_token(token)?.token_type.is_nft() {
            return Err(ResponseCode::InvalidAccountAmounts.into());
        }
        let mut relation = self.transferable_relation(account, token)?;
        relation.balance = if delta < 0 {
            relation
                .balance
                .checked_sub(delta.unsigned_abs())
                .ok_or(ResponseCode::InsufficientTokenBalance)?
        } else {
            relation
                .balance
                .checked_add(delta as u64)
                .ok_or(ResponseCode::InvalidAccountAmounts)?
        };
        let balance = relation.balance;
        self.put_relation(RelKey::new(*account, *token), relation);
        Ok(balance)
    }

    /// Moves one NFT from `from` to `to`, clearing any per-serial approval.
    pub fn transfer_nft(
        &mut self,
        id: &NftId,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), LedgerError> {
        if !self.usable_token(&id.token)?.token_type.is_nft() {
            return Err(ResponseCode::InvalidNftId.into());
        }
        let mut nft = self.live_nft(id)?.into_owned();
        if nft.owner != *from {
            return Err(ResponseCode::SenderDoesNotOwnNftSerialNo.into());
        }
        let mut sender_rel = self.transferable_relation(from, &id.token)?;
        let mut receiver_rel = self.transferable_relation(to, &id.token)?;
        let mut sender = self.live_account(from)?.into_owned();
        let mut receiver = self.live_account(to)?.into_owned();
        if from == to {
            return Ok(());
        }
        sender_rel.balance = sender_rel.balance.saturating_sub(1);
        receiver_rel.balance += 1;
        sender.owned_nfts = sender.owned_nfts.saturating_sub(1);
        receiver.owned_nfts += 1;
        nft.owner = *to;
        nft.spender = None;

        self.put_relation(RelKey::new(*from, id.token), sender_rel);
        self.put_relation(RelKey::new(*to, id.token), receiver_rel);
        self.put_account(sender);
        self.put_account(receiver);
        self.put_nft(nft);
        Ok(())
    }

    /// Mints fungible units into the treasury. Returns the new total supply.
    pub fn mint_fungible(&mut self, token: &TokenId, amount: u64) -> Result<u64, LedgerError> {
        let mut definition = self.usable_token(token)?.into_owned();
        if definition.token_type.is_nft() || amount == 0 {
            return Err(ResponseCode::InvalidTokenMintAmount.into());
        }
        let supply = checked_supply(&definition, amount)?;
        let treasury = definition.treasury;
        let mut relation = self.live_relation(&treasury, token)?.into_owned();
        relation.balance = relation
            .balance
            .checked_add(amount)
            .ok_or(ResponseCode::InvalidTokenMintAmount)?;
        definition.total_supply = supply;
        self.put_relation(RelKey::new(treasury, *token), relation);
        self.put_token(definition);
        Ok(supply)
    }

    /// Mints one NFT per metadata entry into the treasury. Returns the new
    /// total supply and the serials minted.
    pub fn mint_nfts(
        &mut self,
        token: &TokenId,
        metadata: &[Bytes],
        now: Timestamp,
    ) -> Result<(u64, Vec<u64>), LedgerError> {
        let mut definition = self.usable_token(token)?.into_owned();
        if !definition.token_type.is_nft() || metadata.is_empty() {
            return Err(ResponseCode::InvalidTokenMintAmount.into());
        }
        let count = metadata.len() as u64;
        let supply = checked_supply(&definition, count)?;
        let treasury = definition.treasury;
        let mut relation = self.live_relation(&treasury, token)?.into_owned();
        let mut holder = self.live_account(&treasury)?.into_owned();

        let first = definition.last_used_serial + 1;
        let serials: Vec<u64> = (first..first + count).collect();
        for (serial, meta) in serials.iter().zip(metadata) {
            self.put_nft(UniqueToken {
                id: NftId::new(*token, *serial),
                owner: treasury,
                spender: None,
                metadata: meta.clone(),
                created: now,
            });
        }
        relation.balance += count;
        holder.owned_nfts += count;
        definition.total_supply = supply;
        definition.last_used_serial += count;
        self.put_relation(RelKey::new(treasury, *token), relation);
        self.put_account(holder);
        self.put_token(definition);
        Ok((supply, serials))
    }

    /// Burns fungible units from the treasury. Returns the new total supply.
    pub fn burn_fungible(&mut self, token: &TokenId, amount: u64) -> Result<u64, LedgerError> {
        let mut definition = self.usable_token(token)?.into_owned();
        if definition.token_type.is_nft() || amount == 0 {
            return Err(ResponseCode::InvalidTokenBurnAmount.into());
        }
        let treasury = definition.treasury;
        let mut relation = self.live_relation(&treasury, token)?.into_owned();
        relation.balance = relation
            .balance
            .checked_sub(amount)
            .ok_or(ResponseCode::InsufficientTokenBalance)?;
        definition.total_supply = definition
            .total_supply
            .checked_sub(amount)
            .ok_or(ResponseCode::InvalidTokenBurnAmount)?;
        let supply = definition.total_supply;
        self.put_relation(RelKey::new(treasury, *token), relation);
        self.put_token(definition);
        Ok(supply)
    }

    /// Burns treasury-owned NFTs. Returns the new total supply.
    pub fn burn_nfts(&mut self, token: &TokenId, serials: &[u64]) -> Result<u64, LedgerError> {
        let mut definition = self.usable_token(token)?.into_owned();
        if !definition.token_type.is_nft() || serials.is_empty() {
            return Err(ResponseCode::InvalidTokenBurnAmount.into());
        }
        let treasury = definition.treasury;
        for (idx, serial) in serials.iter().enumerate() {
            if serials[..idx].contains(serial) {
                return Err(ResponseCode::InvalidNftId.into());
            }
            let nft = self.live_nft(&NftId::new(*token, *serial))?;
            if nft.owner != treasury {
                return Err(ResponseCode::TreasuryMustOwnBurnedNft.into());
            }
        }
        let count = serials.len() as u64;
        let mut relation = self.live_relation(&treasury, token)?.into_owned();
        let mut holder = self.live_account(&treasury)?.into_owned();
        relation.balance = relation.balance.saturating_sub(count);
        holder.owned_nfts = holder.owned_nfts.saturating_sub(count);
        definition.total_supply = definition.total_supply.saturating_sub(count);
        let supply = definition.total_supply;
        for serial in serials {
            self.remove_nft(NftId::new(*token, *serial));
        }
        self.put_relation(RelKey::new(treasury, *token), relation);
        self.put_account(holder);
        self.put_token(definition);
        Ok(supply)
    }

    /// Removes `amount` fungible units held by `account`. Returns the new
    /// total supply.
    pub fn wipe_fungible(
        &mut self,
        token: &TokenId,
        account: &AccountId,
        amount: u64,
    ) -> Result<u64, LedgerError> {
        let mut definition = self.usable_token(token)?.into_owned();
        if definition.token_type.is_nft() || amount == 0 {
            return Err(ResponseCode::InvalidWipingAmount.into());
        }
        let mut relation = self.wipeable_relation(&definition, account)?;
        relation.balance =
            relation.balance.checked_sub(amount).ok_or(ResponseCode::InvalidWipingAmount)?;
        definition.total_supply = definition
            .total_supply
            .checked_sub(amount)
            .ok_or(ResponseCode::InvalidWipingAmount)?;
        let supply = definition.total_supply;
        self.put_relation(RelKey::new(*account, *token), relation);
        self.put_token(definition);
        Ok(supply)
    }

    /// Removes NFTs owned by `account`. Returns the new total supply.
    pub fn wipe_nfts(
        &mut self,
        token: &TokenId,
        account: &AccountId,
        serials: &[u64],
    ) -> Result<u64, LedgerError> {
        let mut definition = self.usable_token(token)?.into_owned();
        if !definition.token_type.is_nft() || serials.is_empty() {
            return Err(ResponseCode::InvalidWipingAmount.into());
        }
        let mut relation = self.wipeable_relation(&definition, account)?;
        for (idx, serial) in serials.iter().enumerate() {
            if serials[..idx].contains(serial) {
                return Err(ResponseCode::InvalidNftId.into());
            }
            let nft = self.live_nft(&NftId::new(*token, *serial))?;
            if nft.owner != *account {
                return Err(ResponseCode::AccountDoesNotOwnWipedNft.into());
            }
        }
        let count = serials.len() as u64;
        let mut holder = self.live_account(account)?.into_owned();
        relation.balance = relation.balance.saturating_sub(count);
        holder.owned_nfts = holder.owned_nfts.saturating_sub(count);
        definition.total_supply = definition.total_supply.saturating_sub(count);
        let supply = definition.total_supply;
        for serial in serials {
            self.remove_nft(NftId::new(*token, *serial));
        }
        self.put_relation(RelKey::new(*account, *token), relation);
        self.put_account(holder);
        self.put_token(definition);
        Ok(supply)
    }

    fn wipeable_relation(
        &self,
        definition: &Token,
        account: &AccountId,
    ) -> Result<TokenRelation, LedgerError> {
        self.live_account(account)?;
        let relation = self.live_relation(account, &definition.id)?.into_owned();
        if definition.treasury == *account {
            return Err(ResponseCode::CannotWipeTokenTreasuryAccount.into());
        }
        Ok(relation)
    }

    /// Sets (or with `amount == 0` removes) a fungible allowance.
    pub fn set_fungible_allowance(
        &mut self,
        owner: &AccountId,
        token: &TokenId,
        spender: &AccountId,
        amount: u64,
        limits: &Limits,
    ) -> Result<(), LedgerError> {
        let mut account = self.live_account(owner)?.into_owned();
        let key = (*token, *spender);
        if amount == 0 {
            account.fungible_allowances.remove(&key);
        } else {
            let is_new = !account.fungible_allowances.contains_key(&key);
            if is_new && account.allowance_count() >= limits.max_allowances_per_account {
                return Err(ResponseCode::MaxAllowancesExceeded.into());
            }
            account.fungible_allowances.insert(key, amount);
        }
        self.put_account(account);
        Ok(())
    }

    /// Spends `amount` of the allowance `owner` granted `spender`.
    pub fn consume_fungible_allowance(
        &mut self,
        owner: &AccountId,
        token: &TokenId,
        spender: &AccountId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let mut account = self.live_account(owner)?.into_owned();
        let key = (*token, *spender);
        let granted = *account
            .fungible_allowances
            .get(&key)
            .ok_or(ResponseCode::SpenderDoesNotHaveAllowance)?;
        let remaining = granted
            .checked_sub(amount)
            .ok_or(ResponseCode::AmountExceedsAllowance)?;
        if remaining == 0 {
            account.fungible_allowances.remove(&key);
        } else {
            account.fungible_allowances.insert(key, remaining);
        }
        self.put_account(account);
        Ok(())
    }

    /// Sets or clears the per-serial spender of an NFT.
    pub fn set_nft_spender(
        &mut self,
        id: &NftId,
        spender: Option<AccountId>,
    ) -> Result<(), LedgerError> {
        let mut nft = self.live_nft(id)?.into_owned();
        nft.spender = spender;
        self.put_nft(nft);
        Ok(())
    }

    /// Grants or revokes approve-for-all.
    pub fn set_approval_for_all(
        &mut self,
        owner: &AccountId,
        token: &TokenId,
        operator: &AccountId,
        approved: bool,
        limits: &Limits,
    ) -> Result<(), LedgerError> {
        let mut account = self.live_account(owner)?.into_owned();
        let key = (*token, *operator);
        if approved {
            if !account.nft_operators.contains(&key)
                && account.allowance_count() >= limits.max_allowances_per_account
            {
                return Err(ResponseCode::MaxAllowancesExceeded.into());
            }
            account.nft_operators.insert(key);
        } else {
            account.nft_operators.remove(&key);
        }
        self.put_account(account);
        Ok(())
    }

    /// Moves hbar between accounts.
    pub fn transfer_hbar(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let mut payer = self.live_account(from)?.into_owned();
        let mut payee = self.live_account(to)?.into_owned();
        payer.balance = payer
            .balance
            .checked_sub(amount)
            .ok_or(ResponseCode::InsufficientPayerBalance)?;
        payee.balance = payee
            .balance
            .checked_add(amount)
            .ok_or(ResponseCode::InvalidAccountAmounts)?;
        self.put_account(payer);
        self.put_account(payee);
        Ok(())
    }

    /// Credits hbar to an account.
    pub fn credit_hbar(&mut self, to: &AccountId, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let mut payee = self.live_account(to)?.into_owned();
        payee.balance = payee
            .balance
            .checked_add(amount)
            .ok_or(ResponseCode::InvalidAccountAmounts)?;
        self.put_account(payee);
        Ok(())
    }
}

fn checked_supply(token: &Token, minted: u64) -> Result<u64, LedgerError> {
    let supply = token
        .total_supply
        .checked_add(minted)
        .filter(|supply| *supply <= i64::MAX as u64)
        .ok_or(ResponseCode::InvalidTokenMintAmount)?;
    if token.supply_type == hts_primitives::TokenSupplyType::Finite && supply > token.max_supply {
        return Err(ResponseCode::TokenMaxSupplyReached.into());
    }
    Ok(supply)
}
