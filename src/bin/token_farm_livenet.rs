//! Livenet deploy and demo binary for the TokenFarm.
//!
//! Run with:
//! - Deploy only:       TOKEN_FARM_LIVENET_MODE=deploy cargo run --bin token_farm_livenet --features=livenet
//! - Deploy + demo:     TOKEN_FARM_LIVENET_MODE=deploy_and_demo cargo run --bin token_farm_livenet --features=livenet
//! - Query position:    TOKEN_FARM_LIVENET_MODE=query TOKEN_FARM_EXISTING_FARM=... TOKEN_FARM_EXISTING_DAPP=... cargo run ...
//!
//! Required environment variables (Odra livenet):
//! - ODRA_CASPER_LIVENET_SECRET_KEY_PATH
//! - ODRA_CASPER_LIVENET_NODE_ADDRESS
//! - ODRA_CASPER_LIVENET_EVENTS_URL
//! - ODRA_CASPER_LIVENET_CHAIN_NAME
//! - TOKEN_FARM_ETH_USD_PRICE_FEED, TOKEN_FARM_DAI_USD_PRICE_FEED,
//!   TOKEN_FARM_WETH_TOKEN, TOKEN_FARM_FAU_TOKEN (deploy modes)
//!
//! Optional:
//! - TOKEN_FARM_NETWORK                 (defaults to the chain name)
//! - ODRA_CASPER_LIVENET_DEPLOY_GAS     (motes)
//! - ODRA_CASPER_LIVENET_CALL_GAS       (motes)
//! - TOKEN_FARM_DEMO_STAKE_DAPP         (default: 1)
//! - RUST_LOG                           (default: info)

use odra::casper_types::U256;
use odra::host::{HostEnv, HostRef, HostRefLoader};
use odra::prelude::*;

use token_farm::dapp_token::{DappToken, DappTokenHostRef};
use token_farm::deploy::{
    deploy_token_farm_and_dapp_token, read_u64_env, required_address, ContractRegistry,
    DeployError, FarmDeployment, NetworkConfig, WAD,
};
use token_farm::token_farm::{TokenFarm, TokenFarmHostRef};

const MOTES_PER_CSPR: u64 = 1_000_000_000;
const DEFAULT_DEPLOY_GAS_MOTES: u64 = 450_000_000_000; // 450 CSPR
const DEFAULT_CALL_GAS_MOTES: u64 = 50_000_000_000; // 50 CSPR

fn main() -> Result<(), DeployError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let env = odra_casper_livenet_env::env();

    let mode = std::env::var("TOKEN_FARM_LIVENET_MODE").unwrap_or_else(|_| "deploy".to_string());
    let should_deploy = mode == "deploy" || mode == "deploy_and_demo";
    let should_demo = mode == "deploy_and_demo";

    let deploy_gas = read_u64_env("ODRA_CASPER_LIVENET_DEPLOY_GAS", DEFAULT_DEPLOY_GAS_MOTES);
    let call_gas = read_u64_env("ODRA_CASPER_LIVENET_CALL_GAS", DEFAULT_CALL_GAS_MOTES);
    let stake_dapp = read_u64_env("TOKEN_FARM_DEMO_STAKE_DAPP", 1);

    log::info!("mode: {}", mode);
    log::info!("caller: {:?}", env.caller());
    log::info!(
        "gas (motes): deploy={} ({} CSPR), calls={} ({} CSPR)",
        deploy_gas,
        deploy_gas / MOTES_PER_CSPR,
        call_gas,
        call_gas / MOTES_PER_CSPR
    );

    let FarmDeployment {
        mut token_farm,
        mut dapp_token,
    } = if should_deploy {
        let mut registry = ContractRegistry::new(livenet_config()?);
        log::info!("deploying TokenFarm and DAPP on {}", registry.network().name());
        env.set_gas(deploy_gas);
        deploy_token_farm_and_dapp_token(&env, &mut registry)?
    } else {
        log::info!("reusing existing TokenFarm and DAPP");
        FarmDeployment {
            token_farm: TokenFarm::load(&env, existing_address("TOKEN_FARM_EXISTING_FARM", &mode)?),
            dapp_token: DappToken::load(&env, existing_address("TOKEN_FARM_EXISTING_DAPP", &mode)?),
        }
    };
    log::info!("TokenFarm: {:?}", token_farm.address());
    log::info!("DAPP: {:?}", dapp_token.address());

    if should_demo {
        run_demo(&env, &mut token_farm, &mut dapp_token, call_gas, stake_dapp);
    }

    if mode == "query" {
        output_position_json(&token_farm, &dapp_token, env.caller());
        return Ok(());
    }

    output_deploy_json(token_farm.address(), dapp_token.address());
    Ok(())
}

/// Network config for a live chain; the chain name doubles as network name
fn livenet_config() -> Result<NetworkConfig, DeployError> {
    let chain_name = std::env::var("ODRA_CASPER_LIVENET_CHAIN_NAME")
        .unwrap_or_else(|_| "casper-test".to_string());
    NetworkConfig::from_lookup(|key| match key {
        "TOKEN_FARM_NETWORK" => std::env::var(key).ok().or_else(|| Some(chain_name.clone())),
        _ => std::env::var(key).ok(),
    })
}

fn existing_address(var: &str, mode: &str) -> Result<Address, DeployError> {
    required_address(|key| std::env::var(key).ok(), var)
        .inspect_err(|err| log::error!("mode={}: {}", mode, err))
}

fn run_demo(
    env: &HostEnv,
    token_farm: &mut TokenFarmHostRef,
    dapp_token: &mut DappTokenHostRef,
    call_gas: u64,
    stake_dapp: u64,
) {
    let caller = env.caller();
    let amount = U256::from(stake_dapp) * U256::from(WAD);

    log::info!("[DEMO 1] approving and staking {} DAPP", stake_dapp);
    env.set_gas(call_gas);
    dapp_token.approve(token_farm.address(), amount);
    env.set_gas(call_gas);
    token_farm.stake_tokens(amount, dapp_token.address());
    log_position(token_farm, dapp_token, caller);

    log::info!("[DEMO 2] issuing rewards");
    env.set_gas(call_gas);
    token_farm.issue_tokens();
    log_position(token_farm, dapp_token, caller);
}

fn log_position(token_farm: &TokenFarmHostRef, dapp_token: &DappTokenHostRef, user: Address) {
    log::info!(
        "staked DAPP: {}",
        token_farm.staking_balance(dapp_token.address(), user)
    );
    log::info!("unique tokens staked: {}", token_farm.unique_token_staked(user));
    log::info!("stakers: {}", token_farm.stakers_count());
    log::info!("user DAPP balance: {}", dapp_token.balance_of(user));
    log::info!("farm DAPP balance: {}", dapp_token.balance_of(token_farm.address()));
}

fn output_position_json(token_farm: &TokenFarmHostRef, dapp_token: &DappTokenHostRef, user: Address) {
    let unique = token_farm.unique_token_staked(user);
    let total_value = if unique == 0 {
        U256::zero()
    } else {
        token_farm.get_user_total_value(user)
    };
    println!(
        "TOKEN_FARM_POSITION_JSON={{\"user\":\"{:?}\",\"staked_dapp\":\"{}\",\"unique_tokens_staked\":{},\"total_value_wad\":\"{}\",\"dapp_balance\":\"{}\"}}",
        user,
        token_farm.staking_balance(dapp_token.address(), user),
        unique,
        total_value,
        dapp_token.balance_of(user)
    );
}

fn output_deploy_json(farm_addr: Address, dapp_addr: Address) {
    let chain_name =
        std::env::var("ODRA_CASPER_LIVENET_CHAIN_NAME").unwrap_or_else(|_| "casper-test".to_string());
    let node_url = std::env::var("ODRA_CASPER_LIVENET_NODE_ADDRESS")
        .unwrap_or_else(|_| "https://node.testnet.casper.network".to_string());

    println!(
        r#"TOKEN_FARM_DEPLOY_JSON={{"chain_name":"{}","node_url":"{}","token_farm_contract_hash":"{}","dapp_token_contract_hash":"{}","deployed_at":"{}"}}"#,
        chain_name,
        node_url,
        format_address_hash(&farm_addr),
        format_address_hash(&dapp_addr),
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
}

fn format_address_hash(addr: &Address) -> String {
    match addr.as_contract_package_hash() {
        Some(hash) => hash
            .value()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect(),
        None => format!("{:?}", addr),
    }
}
