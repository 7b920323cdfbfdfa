//! TokenFarm Staking Contract
//!
//! Users stake allowed CEP-18 tokens; the owner periodically rewards every
//! staker with DAPP equal to the USD value of their stake.
//! - Oracle registry: token -> price feed, owner only
//! - Staking ledger: per (token, account) balances, stakers, allowed tokens
//! - Reward issuer: values stakes via price feeds, pays out DAPP
//!
//! ## Units
//! Token amounts are raw CEP-18 units (U256). A token's value is
//! `balance * answer / 10^feed_decimals`, so with 18-decimal feeds one
//! DAPP unit is paid per wad of USD value.

use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;
use crate::dapp_token::Cep18TokenContractRef;
use crate::price_feed::PriceFeedContractRef;
use alloc::vec::Vec;

// ==========================================
// Events
// ==========================================

pub mod events {
    use odra::casper_types::U256;
    use odra::prelude::*;

    #[odra::event]
    pub struct TokensStaked {
        pub staker: Address,
        pub token: Address,
        pub amount: U256,
        pub new_balance: U256,
    }

    #[odra::event]
    pub struct TokensUnstaked {
        pub staker: Address,
        pub token: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct TokensIssued {
        pub recipient: Address,
        pub amount: U256,
    }

    #[odra::event]
    pub struct AllowedTokenAdded {
        pub token: Address,
    }

    #[odra::event]
    pub struct PriceFeedSet {
        pub token: Address,
        pub price_feed: Address,
    }

    #[odra::event]
    pub struct OwnershipTransferred {
        pub previous_owner: Option<Address>,
        pub new_owner: Address,
    }
}

// ==========================================
// Types
// ==========================================

/// Price of a token as reported by its feed
#[odra::odra_type]
pub struct TokenValue {
    pub price: U256,
    pub decimals: u8,
}

// ==========================================
// Errors
// ==========================================

#[odra::odra_error]
pub enum FarmError {
    Unauthorized = 1,
    ZeroAmount = 2,
    TokenNotAllowed = 3,
    NoStakingBalance = 4,
    NoTokensStaked = 5,
    PriceFeedNotSet = 6,
    IndexOutOfBounds = 7,
    RewardTokenNotSet = 8,
    Overflow = 9,
}

// ==========================================
// Contract
// ==========================================

#[odra::module(
    events = [
        events::TokensStaked,
        events::TokensUnstaked,
        events::TokensIssued,
        events::AllowedTokenAdded,
        events::PriceFeedSet,
        events::OwnershipTransferred
    ],
    errors = FarmError
)]
pub struct TokenFarm {
    // Reward token
    dapp_token: Var<Address>,

    // Oracle registry
    token_price_feed_mapping: Mapping<Address, Address>,

    // Staking ledger
    staking_balance: Mapping<(Address, Address), U256>, // (token, staker)
    unique_token_staked: Mapping<Address, u32>,
    is_staker: Mapping<Address, bool>,
    stakers: List<Address>,
    allowed_tokens: List<Address>,

    // Admin
    owner: Var<Address>,
}

#[odra::module]
impl TokenFarm {
    /// Initialize the farm with the token it pays rewards in
    pub fn init(&mut self, dapp_token: Address) {
        self.dapp_token.set(dapp_token);
        let owner = self.env().caller();
        self.owner.set(owner);
        self.env().emit_event(events::OwnershipTransferred {
            previous_owner: None,
            new_owner: owner,
        });
    }

    // ==========================================
    // Oracle Registry
    // ==========================================

    /// Point `token` at the feed its value is read from (owner only)
    pub fn set_price_feed_contract(&mut self, token: Address, price_feed: Address) {
        self.require_owner();
        self.token_price_feed_mapping.set(&token, price_feed);
        self.env().emit_event(events::PriceFeedSet { token, price_feed });
    }

    pub fn token_price_feed_mapping(&self, token: Address) -> Option<Address> {
        self.token_price_feed_mapping.get(&token)
    }

    /// Latest feed answer for `token` together with the feed's decimals
    pub fn get_token_value(&self, token: Address) -> TokenValue {
        let feed_addr = self
            .token_price_feed_mapping
            .get(&token)
            .unwrap_or_else(|| self.env().revert(FarmError::PriceFeedNotSet));
        let feed = PriceFeedContractRef::new(self.env().clone(), feed_addr);
        let round = feed.latest_round_data();
        TokenValue {
            price: round.answer,
            decimals: feed.decimals(),
        }
    }

    // ==========================================
    // Allowed Tokens
    // ==========================================

    /// Allow `token` to be staked (owner only). Already allowed tokens are
    /// left untouched so a token is never valued twice.
    pub fn add_allowed_tokens(&mut self, token: Address) {
        self.require_owner();
        if self.token_is_allowed(token) {
            return;
        }
        self.allowed_tokens.push(token);
        self.env().emit_event(events::AllowedTokenAdded { token });
    }

    pub fn allowed_tokens(&self, index: u32) -> Address {
        self.allowed_tokens
            .get(index)
            .unwrap_or_else(|| self.env().revert(FarmError::IndexOutOfBounds))
    }

    pub fn allowed_tokens_count(&self) -> u32 {
        self.allowed_tokens.len()
    }

    pub fn token_is_allowed(&self, token: Address) -> bool {
        self.allowed_tokens.iter().any(|allowed| allowed == token)
    }

    // ==========================================
    // Staking
    // ==========================================

    /// Stake `amount` of `token`. The caller must first approve the farm
    /// for at least `amount`.
    pub fn stake_tokens(&mut self, amount: U256, token: Address) {
        if amount.is_zero() {
            self.env().revert(FarmError::ZeroAmount);
        }
        if !self.token_is_allowed(token) {
            self.env().revert(FarmError::TokenNotAllowed);
        }
        let caller = self.env().caller();
        let self_address = self.env().self_address();

        let mut staked = Cep18TokenContractRef::new(self.env().clone(), token);
        staked.transfer_from(caller, self_address, amount);

        let current = self.staking_balance.get(&(token, caller)).unwrap_or_default();
        if current.is_zero() {
            let unique = self.unique_token_staked.get(&caller).unwrap_or_default();
            self.unique_token_staked.set(&caller, unique + 1);
        }
        let new_balance = current
            .checked_add(amount)
            .unwrap_or_else(|| self.env().revert(FarmError::Overflow));
        self.staking_balance.set(&(token, caller), new_balance);

        if !self.is_staker.get(&caller).unwrap_or_default() {
            self.is_staker.set(&caller, true);
            self.stakers.push(caller);
        }

        self.env().emit_event(events::TokensStaked {
            staker: caller,
            token,
            amount,
            new_balance,
        });
    }

    /// Withdraw the caller's whole balance of `token`.
    /// The caller stays in the stakers list.
    pub fn unstake_tokens(&mut self, token: Address) {
        let caller = self.env().caller();
        let balance = self.staking_balance.get(&(token, caller)).unwrap_or_default();
        if balance.is_zero() {
            self.env().revert(FarmError::NoStakingBalance);
        }

        self.staking_balance.set(&(token, caller), U256::zero());
        let unique = self.unique_token_staked.get(&caller).unwrap_or_default();
        self.unique_token_staked.set(&caller, unique.saturating_sub(1));

        let mut staked = Cep18TokenContractRef::new(self.env().clone(), token);
        staked.transfer(caller, balance);

        self.env().emit_event(events::TokensUnstaked {
            staker: caller,
            token,
            amount: balance,
        });
    }

    pub fn staking_balance(&self, token: Address, account: Address) -> U256 {
        self.staking_balance.get(&(token, account)).unwrap_or_default()
    }

    pub fn unique_token_staked(&self, account: Address) -> u32 {
        self.unique_token_staked.get(&account).unwrap_or_default()
    }

    pub fn stakers(&self, index: u32) -> Address {
        self.stakers
            .get(index)
            .unwrap_or_else(|| self.env().revert(FarmError::IndexOutOfBounds))
    }

    pub fn stakers_count(&self) -> u32 {
        self.stakers.len()
    }

    // ==========================================
    // Rewards
    // ==========================================

    /// Pay every staker DAPP equal to the USD value of their stake (owner only)
    pub fn issue_tokens(&mut self) {
        self.require_owner();
        let dapp_addr = self
            .dapp_token
            .get()
            .unwrap_or_else(|| self.env().revert(FarmError::RewardTokenNotSet));
        let mut dapp = Cep18TokenContractRef::new(self.env().clone(), dapp_addr);

        let stakers: Vec<Address> = self.stakers.iter().collect();
        for recipient in stakers {
            // Stakers who withdrew everything keep their list slot but earn nothing
            if self.unique_token_staked(recipient) == 0 {
                continue;
            }
            let amount = self.get_user_total_value(recipient);
            if amount.is_zero() {
                continue;
            }
            dapp.transfer(recipient, amount);
            self.env().emit_event(events::TokensIssued { recipient, amount });
        }
    }

    /// USD value of everything `account` has staked
    pub fn get_user_total_value(&self, account: Address) -> U256 {
        if self.unique_token_staked(account) == 0 {
            self.env().revert(FarmError::NoTokensStaked);
        }
        let mut total = U256::zero();
        for token in self.allowed_tokens.iter() {
            let value = self.get_user_single_token_value(account, token);
            total = total
                .checked_add(value)
                .unwrap_or_else(|| self.env().revert(FarmError::Overflow));
        }
        total
    }

    /// USD value of `account`'s stake in `token`, zero when nothing is staked
    pub fn get_user_single_token_value(&self, account: Address, token: Address) -> U256 {
        if self.unique_token_staked(account) == 0 {
            return U256::zero();
        }
        let balance = self.staking_balance(token, account);
        if balance.is_zero() {
            return U256::zero();
        }
        let value = self.get_token_value(token);
        // 10^78 no longer fits in a U256
        let scale = U256::from(10u8)
            .checked_pow(U256::from(value.decimals))
            .unwrap_or_else(|| self.env().revert(FarmError::Overflow));
        balance
            .checked_mul(value.price)
            .map(|x| x / scale)
            .unwrap_or_else(|| self.env().revert(FarmError::Overflow))
    }

    // ==========================================
    // Admin
    // ==========================================

    pub fn dapp_token(&self) -> Option<Address> {
        self.dapp_token.get()
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner.get()
    }

    pub fn transfer_ownership(&mut self, new_owner: Address) {
        self.require_owner();
        let previous_owner = self.owner.get();
        self.owner.set(new_owner);
        self.env().emit_event(events::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
    }

    // ==========================================
    // Internal Functions
    // ==========================================

    fn require_owner(&self) {
        if self.owner.get() != Some(self.env().caller()) {
            self.env().revert(FarmError::Unauthorized);
        }
    }
}
