//! TokenFarm x Casper — Staking Farm (Odra)
//!
//! This crate implements a token staking farm on Casper using Odra framework.
//! - DAPP: Reward token, supply minted to the deployer
//! - TokenFarm: Staking ledger, price feed registry and reward issuer
//! - MockToken / MockV3Aggregator: Local stand-ins for external tokens and feeds
//! - deploy: Host-side harness wiring everything together

#![cfg_attr(target_arch = "wasm32", no_std)]

extern crate alloc;

pub mod dapp_token;
pub mod price_feed;
pub mod token_farm;

#[cfg(not(target_arch = "wasm32"))]
pub mod deploy;
