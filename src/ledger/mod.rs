//! Ledger RPC integration.
//!
//! Defines the `LedgerRpc` trait (the four calls the call lifecycle needs)
//! and provides:
//! - `xdr`: strkeys, contract values, ledger keys and result meta
//! - `transaction`: envelope build / assemble / hash
//! - `rpc`: Soroban JSON-RPC client over reqwest

#[cfg(test)]
pub(crate) mod fixtures;
pub mod rpc;
pub mod transaction;
pub mod xdr;

use async_trait::async_trait;

use crate::types::MarketError;
use xdr::ScVal;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Account state needed to build a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: String,
    /// Last used sequence number; the next transaction uses `sequence + 1`.
    pub sequence: i64,
}

impl AccountState {
    pub fn next_sequence(&self) -> i64 {
        self.sequence.saturating_add(1)
    }
}

/// Outcome of a dry run.
#[derive(Debug, Clone, PartialEq)]
pub enum Simulation {
    /// Rejected by the host or the contract; carries the diagnostic text.
    Error(String),
    Success(SimulationSuccess),
}

/// Everything assembly and reads need from a successful simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSuccess {
    /// Base64 `SorobanTransactionData`.
    pub transaction_data: String,
    pub min_resource_fee: u64,
    /// Base64 `SorobanAuthorizationEntry` values.
    pub auth: Vec<String>,
    /// Absent when the invoked function returned nothing readable.
    pub return_value: Option<ScVal>,
    pub latest_ledger: u32,
}

/// Acceptance status reported by `sendTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
}

impl SubmitStatus {
    /// Whether the transaction entered the queue and should be polled.
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitStatus::Pending | SubmitStatus::Duplicate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitStatus::Pending => "PENDING",
            SubmitStatus::Duplicate => "DUPLICATE",
            SubmitStatus::TryAgainLater => "TRY_AGAIN_LATER",
            SubmitStatus::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub hash: String,
    pub status: SubmitStatus,
    /// Base64 `TransactionResult` when status is `Error`.
    pub error_result_xdr: Option<String>,
}

/// Status of a submitted transaction as seen by `getTransaction`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionStatus {
    /// Not in a closed ledger yet (or outside the retention window).
    NotFound,
    Success {
        ledger: u32,
        return_value: Option<ScVal>,
    },
    Failed {
        ledger: u32,
        result_xdr: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over the ledger RPC endpoint.
///
/// Envelopes cross this boundary as base64 XDR strings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Current sequence for a `G…` account. `NotFound` if it does not exist.
    async fn get_account(&self, account_id: &str) -> Result<AccountState, MarketError>;

    /// Dry-run an envelope against current ledger state.
    async fn simulate(&self, envelope_b64: &str) -> Result<Simulation, MarketError>;

    /// Submit a signed envelope.
    async fn submit(&self, signed_envelope_b64: &str) -> Result<SubmitResponse, MarketError>;

    async fn transaction_status(&self, hash: &str) -> Result<TransactionStatus, MarketError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
