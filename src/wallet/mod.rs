//! Wallet integration.
//!
//! The `Signer` trait is the seam to whatever wallet holds the user's key
//! (browser extension bridge, hardware wallet, local keystore). The
//! `WalletSession` owns the connected address and wallet name and is
//! injected into the action service.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::types::SignerError;

/// Address and display name reported by a wallet on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub address: String,
    pub name: String,
}

/// A wallet capable of signing transaction envelopes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Signer: Send + Sync {
    /// Let the user pick an account; may wait on human interaction.
    async fn connect(&self) -> Result<WalletInfo, SignerError>;

    async fn disconnect(&self) -> Result<(), SignerError>;

    /// Account currently selected in the wallet.
    async fn get_address(&self) -> Result<String, SignerError>;

    /// Sign a base64 envelope for the given network, returning the signed
    /// base64 envelope.
    async fn sign_envelope(
        &self,
        envelope_b64: &str,
        network_passphrase: &str,
    ) -> Result<String, SignerError>;
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Connection lifecycle around one `Signer`: connect, active, disconnect.
pub struct WalletSession {
    signer: Arc<dyn Signer>,
    network_passphrase: String,
    connection: RwLock<Option<WalletInfo>>,
}

impl WalletSession {
    pub fn new(signer: Arc<dyn Signer>, network_passphrase: impl Into<String>) -> Self {
        Self {
            signer,
            network_passphrase: network_passphrase.into(),
            connection: RwLock::new(None),
        }
    }

    /// Connect and remember the chosen account. Returns its address.
    pub async fn connect(&self) -> Result<String, SignerError> {
        let wallet = self.signer.connect().await?;
        info!(address = %wallet.address, wallet = %wallet.name, "Wallet connected");
        let address = wallet.address.clone();
        *self.connection.write().unwrap_or_else(PoisonError::into_inner) = Some(wallet);
        Ok(address)
    }

    /// Forget the connection. Wallets that cannot disconnect are ignored.
    pub async fn disconnect(&self) {
        if let Err(e) = self.signer.disconnect().await {
            debug!(error = %e, "Wallet does not support disconnect");
        }
        *self.connection.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("Wallet disconnected");
    }

    pub fn address(&self) -> Option<String> {
        self.current().map(|w| w.address)
    }

    pub fn wallet_name(&self) -> Option<String> {
        self.current().map(|w| w.name)
    }

    pub fn is_connected(&self) -> bool {
        self.current().is_some()
    }

    pub fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }

    /// Connected address or `NotConnected`.
    pub fn require_address(&self) -> Result<String, SignerError> {
        self.address().ok_or(SignerError::NotConnected)
    }

    /// Sign an envelope on this session's network.
    ///
    /// The envelope's source is the connected account, so a wallet that
    /// has since switched accounts is refused before it prompts the user.
    pub async fn sign(&self, envelope_b64: String) -> Result<String, SignerError> {
        let connected = self.require_address()?;
        let active = self.signer.get_address().await?;
        if active != connected {
            warn!(connected = %connected, active = %active, "Wallet account changed");
            return Err(SignerError::AccountChanged { connected, active });
        }
        self.signer
            .sign_envelope(&envelope_b64, &self.network_passphrase)
            .await
    }

    fn current(&self) -> Option<WalletInfo> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
