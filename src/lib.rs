//! Client for a binary-outcome prediction market contract on Stellar Soroban.
//!
//! Library crate exposing all modules for use by integration tests
//! and the watcher binary.

pub mod amount;
pub mod config;
pub mod contract;
pub mod economics;
pub mod engine;
pub mod faucet;
pub mod ledger;
pub mod market;
pub mod types;
pub mod wallet;
