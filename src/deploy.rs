//! Host-side deployment harness
//!
//! Resolves accounts and per-network contract addresses, deploys mocks on
//! local networks and wires up a fresh TokenFarm + DAPP pair.
//!
//! Environment variables:
//! - TOKEN_FARM_NETWORK: network name (default: odra-vm)
//! - TOKEN_FARM_ETH_USD_PRICE_FEED, TOKEN_FARM_DAI_USD_PRICE_FEED,
//!   TOKEN_FARM_WETH_TOKEN, TOKEN_FARM_FAU_TOKEN: contract addresses on
//!   live networks

use std::collections::BTreeMap;
use std::fmt;

use odra::casper_types::account::AccountHash;
use odra::casper_types::contracts::ContractPackageHash;
use odra::casper_types::U256;
use odra::host::{Deployer, HostEnv, HostRef};
use odra::prelude::*;
use thiserror::Error;

use crate::dapp_token::{
    DappToken, DappTokenHostRef, DappTokenInitArgs, MockToken, MockTokenInitArgs,
};
use crate::price_feed::{mock, MockV3Aggregator, MockV3AggregatorInitArgs};
use crate::token_farm::{TokenFarm, TokenFarmHostRef, TokenFarmInitArgs};

/// 1 token with 18 decimals
pub const WAD: u128 = 1_000_000_000_000_000_000;
/// DAPP minted at deployment: 1,000,000 tokens
pub const INITIAL_DAPP_SUPPLY: u128 = 1_000_000 * WAD;
/// DAPP the deployer keeps; the rest funds farm rewards
pub const KEPT_BALANCE: u128 = 100 * WAD;

/// Networks on which mocks are deployed instead of read from config
pub const LOCAL_BLOCKCHAIN_ENVIRONMENTS: &[&str] = &["odra-vm", "casper-vm"];
pub const DEFAULT_NETWORK: &str = "odra-vm";

const NETWORK_ENV: &str = "TOKEN_FARM_NETWORK";
const CONTRACT_ENV_PREFIX: &str = "TOKEN_FARM_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeployError {
    #[error("no {contract} address configured for network {network} (set {env_var})")]
    MissingContract {
        network: String,
        contract: ContractName,
        env_var: String,
    },

    #[error("{0} must be set")]
    MissingEnv(String),

    #[error("invalid address format: {0}")]
    InvalidAddress(String),
}

/// External contracts the farm is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContractName {
    EthUsdPriceFeed,
    DaiUsdPriceFeed,
    WethToken,
    FauToken,
}

impl ContractName {
    pub const ALL: [ContractName; 4] = [
        ContractName::EthUsdPriceFeed,
        ContractName::DaiUsdPriceFeed,
        ContractName::WethToken,
        ContractName::FauToken,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ContractName::EthUsdPriceFeed => "eth_usd_price_feed",
            ContractName::DaiUsdPriceFeed => "dai_usd_price_feed",
            ContractName::WethToken => "weth_token",
            ContractName::FauToken => "fau_token",
        }
    }

    /// Variable holding this contract's address, e.g. TOKEN_FARM_WETH_TOKEN
    pub fn env_var(&self) -> String {
        format!("{}{}", CONTRACT_ENV_PREFIX, self.key().to_uppercase())
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Network {
    Local(String),
    Live(String),
}

impl Network {
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if LOCAL_BLOCKCHAIN_ENVIRONMENTS.contains(&name) {
            Network::Local(name.to_string())
        } else {
            Network::Live(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Network::Local(name) | Network::Live(name) => name,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Network::Local(_))
    }
}

/// Active network plus the addresses configured for it
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: Network,
    contracts: BTreeMap<ContractName, Address>,
}

impl NetworkConfig {
    pub fn local() -> Self {
        Self::for_network(DEFAULT_NETWORK)
    }

    pub fn for_network(name: &str) -> Self {
        Self {
            network: Network::from_name(name),
            contracts: BTreeMap::new(),
        }
    }

    /// Read the network and contract addresses from the process environment
    pub fn from_env() -> Result<Self, DeployError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = lookup(NETWORK_ENV)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        let mut config = Self::for_network(&network);

        for name in ContractName::ALL {
            if let Some(raw) = lookup(&name.env_var()).filter(|raw| !raw.trim().is_empty()) {
                config.contracts.insert(name, parse_contract_address(&raw)?);
            }
        }
        Ok(config)
    }

    pub fn with_contract(mut self, name: ContractName, address: Address) -> Self {
        self.contracts.insert(name, address);
        self
    }

    pub fn contract(&self, name: ContractName) -> Option<Address> {
        self.contracts.get(&name).copied()
    }
}

/// Mock contracts standing in for the external ones on local networks
#[derive(Debug, Clone, Copy)]
pub struct MockContracts {
    pub eth_usd_price_feed: Address,
    pub dai_usd_price_feed: Address,
    pub weth_token: Address,
    pub fau_token: Address,
}

impl MockContracts {
    pub fn get(&self, name: ContractName) -> Address {
        match name {
            ContractName::EthUsdPriceFeed => self.eth_usd_price_feed,
            ContractName::DaiUsdPriceFeed => self.dai_usd_price_feed,
            ContractName::WethToken => self.weth_token,
            ContractName::FauToken => self.fau_token,
        }
    }
}

/// Deploy every mock with the default feed parameters
pub fn deploy_mocks(env: &HostEnv) -> MockContracts {
    log::info!("deploying mocks");
    let feed_args = || MockV3AggregatorInitArgs {
        decimals: mock::DECIMALS,
        initial_answer: U256::from(mock::INITIAL_PRICE_FEED_VALUE),
    };
    let eth_usd_price_feed = MockV3Aggregator::deploy(env, feed_args()).address();
    let dai_usd_price_feed = MockV3Aggregator::deploy(env, feed_args()).address();
    let fau_token = MockToken::deploy(
        env,
        MockTokenInitArgs {
            name: "Mock DAI".to_string(),
            symbol: "DAI".to_string(),
        },
    )
    .address();
    let weth_token = MockToken::deploy(
        env,
        MockTokenInitArgs {
            name: "Mock WETH".to_string(),
            symbol: "WETH".to_string(),
        },
    )
    .address();

    let mocks = MockContracts {
        eth_usd_price_feed,
        dai_usd_price_feed,
        weth_token,
        fau_token,
    };
    log::debug!("mocks deployed: {:?}", mocks);
    mocks
}

/// Resolves external contracts for the active network, deploying mocks
/// once on local networks.
pub struct ContractRegistry {
    config: NetworkConfig,
    mocks: Option<MockContracts>,
}

impl ContractRegistry {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            mocks: None,
        }
    }

    pub fn local() -> Self {
        Self::new(NetworkConfig::local())
    }

    pub fn network(&self) -> &Network {
        &self.config.network
    }

    pub fn get_contract(
        &mut self,
        env: &HostEnv,
        name: ContractName,
    ) -> Result<Address, DeployError> {
        if self.config.network.is_local() {
            let mocks = *self.mocks.get_or_insert_with(|| deploy_mocks(env));
            return Ok(mocks.get(name));
        }
        self.config
            .contract(name)
            .ok_or_else(|| DeployError::MissingContract {
                network: self.config.network.name().to_string(),
                contract: name,
                env_var: name.env_var(),
            })
    }
}

/// Account `index` of the environment; index 0 deploys and owns the farm
pub fn get_account(env: &HostEnv, index: usize) -> Address {
    env.get_account(index)
}

pub struct FarmDeployment {
    pub token_farm: TokenFarmHostRef,
    pub dapp_token: DappTokenHostRef,
}

/// Deploy DAPP and the farm from account 0, fund the farm with all but
/// `KEPT_BALANCE` DAPP and register the allowed tokens with their feeds.
pub fn deploy_token_farm_and_dapp_token(
    env: &HostEnv,
    registry: &mut ContractRegistry,
) -> Result<FarmDeployment, DeployError> {
    let account = get_account(env, 0);
    env.set_caller(account);

    let mut dapp_token = DappToken::deploy(
        env,
        DappTokenInitArgs {
            initial_supply: U256::from(INITIAL_DAPP_SUPPLY),
        },
    );
    log::info!("DAPP deployed at {:?}", dapp_token.address());

    let mut token_farm = TokenFarm::deploy(
        env,
        TokenFarmInitArgs {
            dapp_token: dapp_token.address(),
        },
    );
    log::info!("TokenFarm deployed at {:?}", token_farm.address());

    let reward_pool = dapp_token.total_supply() - U256::from(KEPT_BALANCE);
    dapp_token.transfer(token_farm.address(), reward_pool);

    let dai_usd_price_feed = registry.get_contract(env, ContractName::DaiUsdPriceFeed)?;
    let eth_usd_price_feed = registry.get_contract(env, ContractName::EthUsdPriceFeed)?;
    let fau_token = registry.get_contract(env, ContractName::FauToken)?;
    let weth_token = registry.get_contract(env, ContractName::WethToken)?;

    // Registration order fixes the allowed-token indices: DAPP is always 0
    let allowed = [
        (dapp_token.address(), dai_usd_price_feed),
        (fau_token, dai_usd_price_feed),
        (weth_token, eth_usd_price_feed),
    ];
    env.set_caller(account);
    for (token, price_feed) in allowed {
        token_farm.add_allowed_tokens(token);
        token_farm.set_price_feed_contract(token, price_feed);
        log::debug!("allowed {:?} priced by {:?}", token, price_feed);
    }

    Ok(FarmDeployment {
        token_farm,
        dapp_token,
    })
}

/// Parse a u64 from the environment; underscores are accepted as separators
pub fn read_u64_env(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| parse_u64_lenient(&raw))
        .unwrap_or(default_value)
}

fn parse_u64_lenient(raw: &str) -> Option<u64> {
    raw.trim().replace('_', "").parse::<u64>().ok()
}

/// Address held by a variable that has to be present, e.g. an existing farm
pub fn required_address<F>(lookup: F, var: &str) -> Result<Address, DeployError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(var)
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| DeployError::MissingEnv(var.to_string()))?;
    parse_contract_address(&raw)
}

/// Parse `account-hash-..`, `contract-package-..`, `package-..`, `hash-..`
/// or a bare 64-char hex package hash.
pub fn parse_contract_address(raw: &str) -> Result<Address, DeployError> {
    let trimmed = raw.trim();
    let invalid = || DeployError::InvalidAddress(trimmed.to_string());

    if let Some(hex) = trimmed.strip_prefix("account-hash-") {
        let bytes = decode_hex_32(hex).ok_or_else(invalid)?;
        return Ok(Address::Account(AccountHash::new(bytes)));
    }
    let package_hex = ["contract-package-", "package-", "hash-"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    let bytes = decode_hex_32(package_hex).ok_or_else(invalid)?;
    Ok(Address::Contract(ContractPackageHash::new(bytes)))
}

fn decode_hex_32(s: &str) -> Option<[u8; 32]> {
    if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}
