//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` (every field optional) and then lets the
//! environment override the network endpoints and contract id. Read once
//! at startup; nothing is reloaded at runtime.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::InvokeSettings;
use crate::faucet::DEFAULT_FRIENDBOT_URL;
use crate::ledger::xdr::{parse_address, ScAddress};

pub const ENV_RPC_URL: &str = "SOROBAN_RPC_URL";
pub const ENV_CONTRACT_ID: &str = "PREDICT_CONTRACT_ID";
pub const ENV_NETWORK_PASSPHRASE: &str = "NETWORK_PASSPHRASE";
pub const ENV_FRIENDBOT_URL: &str = "FRIENDBOT_URL";

const TESTNET_RPC_URL: &str = "https://soroban-testnet.stellar.org";
const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub invoke: InvokeConfig,
    pub watch: WatchConfig,
    pub faucet: FaucetConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub network_passphrase: String,
    /// `C…` strkey of the prediction-market contract.
    pub contract_id: String,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: TESTNET_RPC_URL.to_string(),
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
            contract_id: String::new(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InvokeConfig {
    pub base_fee: u32,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// 0 polls until the transaction is final.
    pub confirm_timeout_secs: u64,
    /// 0 waits for the wallet indefinitely.
    pub signer_timeout_secs: u64,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            base_fee: 100,
            read_timeout_secs: 30,
            write_timeout_secs: 180,
            poll_interval_ms: 1500,
            confirm_timeout_secs: 120,
            signer_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_secs: u64,
    /// Markets shown in the ticker line.
    pub ticker_limit: usize,
    /// Account whose positions are reported each cycle.
    pub account: Option<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            ticker_limit: 10,
            account: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FaucetConfig {
    pub friendbot_url: String,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            friendbot_url: DEFAULT_FRIENDBOT_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// File (if present) + environment overrides + validation.
    pub fn load_with_env(path: &str) -> Result<Self> {
        let mut cfg = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        cfg.apply_overrides(|name| std::env::var(name).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_RPC_URL) {
            self.network.rpc_url = url;
        }
        if let Some(id) = get(ENV_CONTRACT_ID) {
            self.network.contract_id = id.trim().to_string();
        }
        if let Some(passphrase) = get(ENV_NETWORK_PASSPHRASE) {
            self.network.network_passphrase = passphrase;
        }
        if let Some(url) = get(ENV_FRIENDBOT_URL) {
            self.faucet.friendbot_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.contract_id.is_empty() {
            bail!("No contract id configured (set {ENV_CONTRACT_ID} or network.contract_id)");
        }
        if !matches!(parse_address(&self.network.contract_id), Some(ScAddress::Contract(_))) {
            bail!("Malformed contract id: {}", self.network.contract_id);
        }
        let url = &self.network.rpc_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("RPC URL must be http(s): {url}");
        }
        if self.network.network_passphrase.is_empty() {
            bail!("Network passphrase must not be empty");
        }
        if self.invoke.poll_interval_ms == 0 {
            bail!("invoke.poll_interval_ms must be greater than 0");
        }
        if self.watch.interval_secs == 0 {
            bail!("watch.interval_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn invoke_settings(&self) -> InvokeSettings {
        let bounded = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        InvokeSettings {
            network_passphrase: self.network.network_passphrase.clone(),
            base_fee: self.invoke.base_fee,
            read_timeout: Duration::from_secs(self.invoke.read_timeout_secs),
            write_timeout: Duration::from_secs(self.invoke.write_timeout_secs),
            poll_interval: Duration::from_millis(self.invoke.poll_interval_ms),
            confirm_timeout: bounded(self.invoke.confirm_timeout_secs),
            signer_timeout: bounded(self.invoke.signer_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }
}
