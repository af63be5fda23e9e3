//! Shared types for the prediction-market client.
//!
//! Client-side copies of the contract's records plus the error taxonomy
//! every layer reports through. The contract owns the real state; these
//! are snapshots that are only as fresh as the last read.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::contract::ContractError;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Outcome a share pays out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Yes, Side::No];

    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    /// Variant name as the contract spells it.
    pub fn tag(&self) -> &'static str {
        match self {
            Side::Yes => "Yes",
            Side::No => "No",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Case-insensitive parse of "yes" / "no".
impl std::str::FromStr for Side {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(Side::Yes),
            "no" | "n" => Ok(Side::No),
            other => Err(MarketError::Validation(format!("unknown side: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Resolution state. Moves `Open -> Resolved` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    Open,
    Resolved(Side),
}

impl MarketStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, MarketStatus::Resolved(_))
    }

    pub fn outcome(&self) -> Option<Side> {
        match self {
            MarketStatus::Open => None,
            MarketStatus::Resolved(side) => Some(*side),
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStatus::Open => write!(f, "Open"),
            MarketStatus::Resolved(side) => write!(f, "Resolved({side})"),
        }
    }
}

/// One prediction market as last read from the contract.
///
/// Amounts are in stroops. `total_yes + total_no == pool_balance` holds
/// while no claims have been paid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Registry index (not part of the on-chain record).
    pub id: u64,
    pub creator: String,
    pub question: String,
    /// Unix seconds after which purchases are rejected.
    pub deadline: u64,
    pub status: MarketStatus,
    pub total_yes: i128,
    pub total_no: i128,
    pub pool_balance: i128,
}

impl Market {
    /// Stake recorded on one side.
    pub fn total_for(&self, side: Side) -> i128 {
        match side {
            Side::Yes => self.total_yes,
            Side::No => self.total_no,
        }
    }

    /// Combined stake on both sides.
    pub fn total_staked(&self) -> i128 {
        self.total_yes.saturating_add(self.total_no)
    }

    #[cfg(test)]
    pub fn sample() -> Self {
        Market {
            id: 0,
            creator: "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF".to_string(),
            question: "Will XLM close above $1 on Dec 31?".to_string(),
            deadline: 1_900_000_000,
            status: MarketStatus::Open,
            total_yes: 30_000_000,
            total_no: 10_000_000,
            pool_balance: 40_000_000,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{}] (yes: {} | no: {} | pool: {})",
            self.id,
            self.question,
            self.status,
            self.total_yes,
            self.total_no,
            self.pool_balance,
        )
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// One account's stake in one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub yes_shares: i128,
    pub no_shares: i128,
    /// Set by a successful claim; never cleared.
    pub claimed: bool,
}

impl Position {
    /// The position of an account that never traded in the market.
    pub const EMPTY: Position = Position {
        yes_shares: 0,
        no_shares: 0,
        claimed: false,
    };

    pub fn shares_for(&self, side: Side) -> i128 {
        match side {
            Side::Yes => self.yes_shares,
            Side::No => self.no_shares,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.yes_shares == 0 && self.no_shares == 0
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures from the wallet / signer collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Signing rejected: {0}")]
    Rejected(String),

    #[error("Wallet unavailable: {0}")]
    Unavailable(String),

    #[error("Wallet did not respond within {0}s")]
    Timeout(u64),

    #[error("Signed envelope does not match the transaction that was submitted for signing")]
    Mismatch,

    #[error("Wallet switched from {connected} to {active} since connecting")]
    AccountChanged { connected: String, active: String },
}

/// Every failure a market read or write can surface.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// Bad local input; nothing was sent.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Rejected during simulation; no state changed.
    #[error("Simulation failed: {message}")]
    Simulation {
        message: String,
        contract_error: Option<ContractError>,
    },

    /// Rejected at submission (bad sequence, bad signature, congestion).
    #[error("Transaction rejected ({status}): {detail}")]
    Submission { status: String, detail: String },

    /// Executed and reverted on-chain.
    #[error("Transaction {hash} failed on-chain")]
    OnChainFailure {
        hash: String,
        result_xdr: Option<String>,
    },

    /// Still unknown to the ledger after the confirmation window.
    #[error("Transaction {hash} not confirmed after {attempts} status checks")]
    Timeout { hash: String, attempts: u32 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Signer(#[from] SignerError),

    /// JSON-RPC level error object or non-success HTTP status.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Malformed or unexpected wire data.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl MarketError {
    /// Whether re-issuing the same call (rebuilt from scratch) cannot
    /// duplicate an effect. `OnChainFailure` and `Timeout` need the caller
    /// to re-read state first.
    pub fn is_retry_safe(&self) -> bool {
        match self {
            MarketError::Simulation { .. }
            | MarketError::Submission { .. }
            | MarketError::Rpc { .. }
            | MarketError::Transport(_)
            | MarketError::Signer(_) => true,
            MarketError::OnChainFailure { .. }
            | MarketError::Timeout { .. }
            | MarketError::Validation(_)
            | MarketError::NotFound(_)
            | MarketError::Decode(_) => false,
        }
    }

    pub fn contract_error(&self) -> Option<ContractError> {
        match self {
            MarketError::Simulation { contract_error, .. } => *contract_error,
            _ => None,
        }
    }

    pub(crate) fn simulation(message: impl Into<String>) -> Self {
        let message = message.into();
        let contract_error = ContractError::from_diagnostic(&message);
        MarketError::Simulation {
            message,
            contract_error,
        }
    }
}

impl From<crate::ledger::xdr::XdrError> for MarketError {
    fn from(e: crate::ledger::xdr::XdrError) -> Self {
        MarketError::Decode(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
