//! Friendbot testnet funding.
//!
//! One GET per request, never retried; the caller decides what to tell
//! the user.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::{info, warn};

use crate::ledger::xdr::{parse_address, ScAddress};

pub const DEFAULT_FRIENDBOT_URL: &str = "https://friendbot.stellar.org";

pub struct Faucet {
    http: Client,
    url: String,
}

impl Faucet {
    pub fn new(url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("soroban-predict/0.1.0 (faucet)")
            .build()
            .context("Failed to build HTTP client for Friendbot")?;
        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Request testnet lumens for a `G…` account.
    pub async fn fund(&self, address: &str) -> Result<()> {
        let address = address.trim();
        validate_account(address)?;

        let url = request_url(&self.url, address);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Friendbot request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(address = %address, status = %status, "Friendbot refused funding");
            bail!("Friendbot returned {status}: {body}");
        }

        info!(address = %address, "Account funded by Friendbot");
        Ok(())
    }
}

fn validate_account(address: &str) -> Result<()> {
    if address.is_empty() {
        bail!("Enter a Stellar address");
    }
    match parse_address(address) {
        Some(ScAddress::Account(_)) => Ok(()),
        _ => bail!("Invalid Stellar address: {address}"),
    }
}

fn request_url(base: &str, address: &str) -> String {
    format!("{base}?addr={}", urlencoding::encode(address))
}
