//! TokenFarm Flow Tests
//!
//! Staking, price feed registry, allowed tokens and reward issuance against
//! a freshly deployed farm on the local Odra VM.

use odra::casper_types::U256;
use odra::host::{Deployer, HostEnv, HostRef};
use odra::prelude::*;

use token_farm::dapp_token::{MockToken, MockTokenHostRef, MockTokenInitArgs};
use token_farm::deploy::{
    deploy_token_farm_and_dapp_token, get_account, ContractName, ContractRegistry,
    FarmDeployment, NetworkConfig, INITIAL_DAPP_SUPPLY, KEPT_BALANCE, WAD,
};
use token_farm::price_feed::{
    mock, MockV3Aggregator, MockV3AggregatorHostRef, MockV3AggregatorInitArgs,
};
use token_farm::token_farm::FarmError;

fn amount_staked() -> U256 {
    U256::from(WAD)
}

fn wad(tokens: u64) -> U256 {
    U256::from(tokens) * U256::from(WAD)
}

// ==========================================
// Helper: Deploy contracts
// ==========================================

/// Fresh local env, or None when a live network is configured
fn local_env() -> Option<(HostEnv, ContractRegistry)> {
    let config = NetworkConfig::from_env().expect("network config");
    if !config.network.is_local() {
        return None;
    }
    Some((odra_test::env(), ContractRegistry::new(config)))
}

fn deploy(env: &HostEnv, registry: &mut ContractRegistry) -> FarmDeployment {
    deploy_token_farm_and_dapp_token(env, registry).expect("local deployment")
}

/// Approve and stake `amount` DAPP from `account`
fn stake_dapp(env: &HostEnv, farm: &mut FarmDeployment, account: Address, amount: U256) {
    env.set_caller(account);
    farm.dapp_token.approve(farm.token_farm.address(), amount);
    farm.token_farm.stake_tokens(amount, farm.dapp_token.address());
}

/// Mint mock tokens to `account` and stake them
fn stake_mock(env: &HostEnv, farm: &mut FarmDeployment, token: Address, account: Address, amount: U256) {
    let mut mock_token = MockTokenHostRef::new(token, env.clone());
    mock_token.faucet_mint(account, amount);
    env.set_caller(account);
    mock_token.approve(farm.token_farm.address(), amount);
    farm.token_farm.stake_tokens(amount, token);
}

// ==========================================
// Deployment
// ==========================================

#[test]
fn test_deployment_funds_farm_and_registers_tokens() {
    let Some((env, mut registry)) = local_env() else { return };
    let farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    let supply = U256::from(INITIAL_DAPP_SUPPLY);
    assert_eq!(farm.dapp_token.total_supply(), supply);
    assert_eq!(farm.dapp_token.balance_of(account), U256::from(KEPT_BALANCE));
    assert_eq!(
        farm.dapp_token.balance_of(farm.token_farm.address()),
        supply - U256::from(KEPT_BALANCE)
    );

    let fau = registry.get_contract(&env, ContractName::FauToken).unwrap();
    let weth = registry.get_contract(&env, ContractName::WethToken).unwrap();
    assert_eq!(farm.token_farm.allowed_tokens_count(), 3);
    assert_eq!(farm.token_farm.allowed_tokens(0), farm.dapp_token.address());
    assert_eq!(farm.token_farm.allowed_tokens(1), fau);
    assert_eq!(farm.token_farm.allowed_tokens(2), weth);
    assert_eq!(farm.token_farm.owner(), Some(account));
    assert_eq!(farm.token_farm.dapp_token(), Some(farm.dapp_token.address()));
}

// ==========================================
// Price Feed Registry
// ==========================================

#[test]
fn test_set_price_feed_contract() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let non_owner = get_account(&env, 1);
    let eth_usd_price_feed = registry
        .get_contract(&env, ContractName::EthUsdPriceFeed)
        .unwrap();

    env.set_caller(account);
    farm.token_farm
        .set_price_feed_contract(farm.dapp_token.address(), eth_usd_price_feed);
    assert_eq!(
        farm.token_farm.token_price_feed_mapping(farm.dapp_token.address()),
        Some(eth_usd_price_feed)
    );

    env.set_caller(non_owner);
    let result = farm
        .token_farm
        .try_set_price_feed_contract(farm.dapp_token.address(), eth_usd_price_feed);
    assert_eq!(result, Err(FarmError::Unauthorized.into()));
}

#[test]
fn test_get_token_value() {
    let Some((env, mut registry)) = local_env() else { return };
    let farm = deploy(&env, &mut registry);

    let value = farm.token_farm.get_token_value(farm.dapp_token.address());
    assert_eq!(value.price, wad(2));
    assert_eq!(value.decimals, 18);
    assert_eq!(value.price, U256::from(mock::INITIAL_PRICE_FEED_VALUE));
}

#[test]
fn test_get_token_value_without_feed_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let farm = deploy(&env, &mut registry);
    let unknown = get_account(&env, 4);

    let result = farm.token_farm.try_get_token_value(unknown);
    assert_eq!(result, Err(FarmError::PriceFeedNotSet.into()));
}

// ==========================================
// Staking
// ==========================================

#[test]
fn test_stake_token() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    stake_dapp(&env, &mut farm, account, amount_staked());

    assert_eq!(
        farm.token_farm.staking_balance(farm.dapp_token.address(), account),
        amount_staked()
    );
    assert_eq!(farm.token_farm.unique_token_staked(account), 1);
    assert_eq!(farm.token_farm.stakers(0), account);
    assert_eq!(
        farm.dapp_token.balance_of(account),
        U256::from(KEPT_BALANCE) - amount_staked()
    );
}

#[test]
fn test_repeated_stake_adds_staker_once() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    stake_dapp(&env, &mut farm, account, amount_staked());
    stake_dapp(&env, &mut farm, account, amount_staked());

    assert_eq!(
        farm.token_farm.staking_balance(farm.dapp_token.address(), account),
        amount_staked() * U256::from(2u64)
    );
    assert_eq!(farm.token_farm.unique_token_staked(account), 1);
    assert_eq!(farm.token_farm.stakers_count(), 1);
}

#[test]
fn test_stake_second_token_counts_unique_tokens() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let weth = registry.get_contract(&env, ContractName::WethToken).unwrap();

    stake_dapp(&env, &mut farm, account, amount_staked());
    stake_mock(&env, &mut farm, weth, account, wad(3));

    assert_eq!(farm.token_farm.unique_token_staked(account), 2);
    assert_eq!(farm.token_farm.stakers_count(), 1);
    assert_eq!(farm.token_farm.staking_balance(weth, account), wad(3));
}

#[test]
fn test_multiple_stakers_are_listed_in_order() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let user = get_account(&env, 1);
    let fau = registry.get_contract(&env, ContractName::FauToken).unwrap();

    stake_mock(&env, &mut farm, fau, user, wad(5));
    stake_dapp(&env, &mut farm, account, amount_staked());

    assert_eq!(farm.token_farm.stakers_count(), 2);
    assert_eq!(farm.token_farm.stakers(0), user);
    assert_eq!(farm.token_farm.stakers(1), account);
}

#[test]
fn test_stake_zero_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    env.set_caller(account);
    let result = farm
        .token_farm
        .try_stake_tokens(U256::zero(), farm.dapp_token.address());
    assert_eq!(result, Err(FarmError::ZeroAmount.into()));
    assert_eq!(farm.token_farm.stakers_count(), 0);
}

#[test]
fn test_stake_token_not_allowed_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    env.set_caller(account);
    let mut stray = MockToken::deploy(
        &env,
        MockTokenInitArgs {
            name: "Stray".to_string(),
            symbol: "STR".to_string(),
        },
    );
    stray.faucet_mint(account, amount_staked());
    stray.approve(farm.token_farm.address(), amount_staked());

    let result = farm
        .token_farm
        .try_stake_tokens(amount_staked(), stray.address());
    assert_eq!(result, Err(FarmError::TokenNotAllowed.into()));
    assert_eq!(farm.token_farm.stakers_count(), 0);
}

#[test]
fn test_stake_without_approval_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    env.set_caller(account);
    let result = farm
        .token_farm
        .try_stake_tokens(amount_staked(), farm.dapp_token.address());
    assert!(result.is_err());
    assert_eq!(
        farm.token_farm.staking_balance(farm.dapp_token.address(), account),
        U256::zero()
    );
}

#[test]
fn test_stakers_index_out_of_bounds_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    assert_eq!(
        farm.token_farm.try_stakers(0),
        Err(FarmError::IndexOutOfBounds.into())
    );
    stake_dapp(&env, &mut farm, account, amount_staked());
    assert_eq!(farm.token_farm.stakers(0), account);
    assert_eq!(
        farm.token_farm.try_stakers(1),
        Err(FarmError::IndexOutOfBounds.into())
    );
}

// ==========================================
// Unstaking
// ==========================================

#[test]
fn test_unstake_returns_balance() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    stake_dapp(&env, &mut farm, account, amount_staked());
    farm.token_farm.unstake_tokens(farm.dapp_token.address());

    assert_eq!(
        farm.token_farm.staking_balance(farm.dapp_token.address(), account),
        U256::zero()
    );
    assert_eq!(farm.token_farm.unique_token_staked(account), 0);
    assert_eq!(farm.dapp_token.balance_of(account), U256::from(KEPT_BALANCE));
    // Stakers list is append-only
    assert_eq!(farm.token_farm.stakers(0), account);
}

#[test]
fn test_restake_after_unstake_keeps_single_entry() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    stake_dapp(&env, &mut farm, account, amount_staked());
    farm.token_farm.unstake_tokens(farm.dapp_token.address());
    stake_dapp(&env, &mut farm, account, amount_staked());

    assert_eq!(farm.token_farm.unique_token_staked(account), 1);
    assert_eq!(farm.token_farm.stakers_count(), 1);
}

#[test]
fn test_unstake_without_balance_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let user = get_account(&env, 2);

    env.set_caller(user);
    let result = farm.token_farm.try_unstake_tokens(farm.dapp_token.address());
    assert_eq!(result, Err(FarmError::NoStakingBalance.into()));
}

// ==========================================
// Allowed Tokens
// ==========================================

#[test]
fn test_token_is_allowed() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    stake_dapp(&env, &mut farm, account, amount_staked());

    assert!(farm.token_farm.token_is_allowed(farm.dapp_token.address()));
    assert!(!farm.token_farm.token_is_allowed(get_account(&env, 3)));
    assert_eq!(farm.token_farm.allowed_tokens(0), farm.dapp_token.address());
}

#[test]
fn test_add_allowed_tokens() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let non_owner = get_account(&env, 1);

    stake_dapp(&env, &mut farm, account, amount_staked());

    env.set_caller(account);
    farm.token_farm.add_allowed_tokens(farm.dapp_token.address());
    assert_eq!(farm.token_farm.allowed_tokens(0), farm.dapp_token.address());
    // Re-adding does not create a second entry
    assert_eq!(farm.token_farm.allowed_tokens_count(), 3);

    env.set_caller(non_owner);
    let result = farm
        .token_farm
        .try_add_allowed_tokens(farm.dapp_token.address());
    assert_eq!(result, Err(FarmError::Unauthorized.into()));
}

#[test]
fn test_add_new_allowed_token_non_owner_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let token = get_account(&env, 5);

    env.set_caller(get_account(&env, 1));
    let result = farm.token_farm.try_add_allowed_tokens(token);
    assert_eq!(result, Err(FarmError::Unauthorized.into()));
    assert!(!farm.token_farm.token_is_allowed(token));
}

// ==========================================
// Rewards
// ==========================================

#[test]
fn test_issue_tokens() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    stake_dapp(&env, &mut farm, account, amount_staked());
    let starting_balance = farm.dapp_token.balance_of(account);

    env.set_caller(account);
    farm.token_farm.issue_tokens();

    // 1 DAPP staked at 2 USD earns 2 DAPP
    assert_eq!(
        farm.dapp_token.balance_of(account),
        starting_balance + U256::from(mock::INITIAL_PRICE_FEED_VALUE)
    );
}

#[test]
fn test_issue_tokens_values_every_staked_token() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let user = get_account(&env, 1);
    let weth = registry.get_contract(&env, ContractName::WethToken).unwrap();
    let fau = registry.get_contract(&env, ContractName::FauToken).unwrap();

    stake_mock(&env, &mut farm, weth, user, wad(1));
    stake_mock(&env, &mut farm, fau, user, wad(4));
    assert_eq!(farm.token_farm.get_user_single_token_value(user, weth), wad(2));
    assert_eq!(farm.token_farm.get_user_single_token_value(user, fau), wad(8));
    assert_eq!(farm.token_farm.get_user_total_value(user), wad(10));

    env.set_caller(account);
    farm.token_farm.issue_tokens();
    assert_eq!(farm.dapp_token.balance_of(user), wad(10));
}

#[test]
fn test_issue_tokens_follows_price_updates() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let user = get_account(&env, 1);
    let weth = registry.get_contract(&env, ContractName::WethToken).unwrap();
    let eth_usd = registry
        .get_contract(&env, ContractName::EthUsdPriceFeed)
        .unwrap();

    stake_mock(&env, &mut farm, weth, user, wad(2));

    let mut feed = MockV3AggregatorHostRef::new(eth_usd, env.clone());
    feed.update_answer(wad(1500));

    env.set_caller(account);
    farm.token_farm.issue_tokens();
    assert_eq!(farm.dapp_token.balance_of(user), wad(3000));
}

#[test]
fn test_issue_tokens_skips_withdrawn_stakers() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let user = get_account(&env, 1);
    let fau = registry.get_contract(&env, ContractName::FauToken).unwrap();

    stake_mock(&env, &mut farm, fau, user, wad(1));
    env.set_caller(user);
    farm.token_farm.unstake_tokens(fau);
    stake_dapp(&env, &mut farm, account, amount_staked());

    env.set_caller(account);
    farm.token_farm.issue_tokens();

    assert_eq!(farm.dapp_token.balance_of(user), U256::zero());
    assert_eq!(
        farm.dapp_token.balance_of(account),
        U256::from(KEPT_BALANCE) - amount_staked() + wad(2)
    );
}

#[test]
fn test_issue_tokens_non_owner_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let user = get_account(&env, 1);

    env.set_caller(user);
    let result = farm.token_farm.try_issue_tokens();
    assert_eq!(result, Err(FarmError::Unauthorized.into()));
}

#[test]
fn test_value_reverts_when_feed_decimals_overflow() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);

    // 10^80 does not fit in a U256
    let wide_feed = MockV3Aggregator::deploy(
        &env,
        MockV3AggregatorInitArgs {
            decimals: 80,
            initial_answer: U256::one(),
        },
    );
    env.set_caller(account);
    farm.token_farm
        .set_price_feed_contract(farm.dapp_token.address(), wide_feed.address());
    stake_dapp(&env, &mut farm, account, amount_staked());

    let result = farm
        .token_farm
        .try_get_user_single_token_value(account, farm.dapp_token.address());
    assert_eq!(result, Err(FarmError::Overflow.into()));

    env.set_caller(account);
    assert_eq!(
        farm.token_farm.try_issue_tokens(),
        Err(FarmError::Overflow.into())
    );
}

#[test]
fn test_user_value_without_stake() {
    let Some((env, mut registry)) = local_env() else { return };
    let farm = deploy(&env, &mut registry);
    let user = get_account(&env, 1);

    assert_eq!(
        farm.token_farm
            .get_user_single_token_value(user, farm.dapp_token.address()),
        U256::zero()
    );
    let result = farm.token_farm.try_get_user_total_value(user);
    assert_eq!(result, Err(FarmError::NoTokensStaked.into()));
}

// ==========================================
// Ownership
// ==========================================

#[test]
fn test_transfer_ownership() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let new_owner = get_account(&env, 1);
    let token = get_account(&env, 6);

    env.set_caller(account);
    farm.token_farm.transfer_ownership(new_owner);
    assert_eq!(farm.token_farm.owner(), Some(new_owner));

    let result = farm.token_farm.try_add_allowed_tokens(token);
    assert_eq!(result, Err(FarmError::Unauthorized.into()));

    env.set_caller(new_owner);
    farm.token_farm.add_allowed_tokens(token);
    assert!(farm.token_farm.token_is_allowed(token));
}

#[test]
fn test_transfer_ownership_non_owner_reverts() {
    let Some((env, mut registry)) = local_env() else { return };
    let mut farm = deploy(&env, &mut registry);
    let account = get_account(&env, 0);
    let intruder = get_account(&env, 1);

    env.set_caller(intruder);
    let result = farm.token_farm.try_transfer_ownership(intruder);
    assert_eq!(result, Err(FarmError::Unauthorized.into()));
    assert_eq!(farm.token_farm.owner(), Some(account));
}
