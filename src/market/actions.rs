//! State-changing market calls.
//!
//! Each action builds its argument list, then hands off to
//! [`CallOrchestrator::write`] with the session's signer. Results and
//! failures come back unchanged; nothing here retries.

use std::sync::Arc;

use tracing::info;

use crate::amount;
use crate::contract::{self, method};
use crate::engine::{CallOrchestrator, WriteOutcome};
use crate::ledger::xdr::ScVal;
use crate::types::{MarketError, Side};
use crate::wallet::WalletSession;

/// Longest accepted market question, in characters.
pub const MAX_QUESTION_CHARS: usize = 200;

pub struct MarketActions {
    orchestrator: Arc<CallOrchestrator>,
    contract_id: String,
    session: Arc<WalletSession>,
}

impl MarketActions {
    pub fn new(
        orchestrator: Arc<CallOrchestrator>,
        contract_id: impl Into<String>,
        session: Arc<WalletSession>,
    ) -> Self {
        Self {
            orchestrator,
            contract_id: contract_id.into(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    async fn invoke(
        &self,
        caller: &str,
        method: &str,
        args: Vec<ScVal>,
    ) -> Result<WriteOutcome, MarketError> {
        let session = &self.session;
        self.orchestrator
            .write(caller, &self.contract_id, method, args, |xdr| session.sign(xdr))
            .await
    }

    /// Create a market. The deadline is passed through as given; the
    /// contract rejects deadlines that are not in the future.
    pub async fn create(&self, question: &str, deadline: u64) -> Result<WriteOutcome, MarketError> {
        let creator = self.session.require_address()?;
        let question = validate_question(question)?;
        let args = vec![
            contract::address(&creator)?,
            contract::string(question)?,
            contract::u64(deadline),
        ];
        let outcome = self.invoke(&creator, method::CREATE_MARKET, args).await?;
        info!(
            market_id = ?created_market_id(&outcome),
            hash = %outcome.hash,
            "Market created"
        );
        Ok(outcome)
    }

    /// Stake `amount` stroops on `side`.
    pub async fn buy_shares(
        &self,
        id: u64,
        side: Side,
        amount: i128,
    ) -> Result<WriteOutcome, MarketError> {
        let buyer = self.session.require_address()?;
        if amount <= 0 {
            return Err(MarketError::Validation(format!(
                "amount must be positive, got {amount}"
            )));
        }
        let args = vec![
            contract::address(&buyer)?,
            contract::u64(id),
            contract::side(side)?,
            contract::i128(amount),
        ];
        let outcome = self.invoke(&buyer, method::BUY_SHARES, args).await?;
        info!(
            market_id = id,
            side = %side,
            amount = %amount,
            hash = %outcome.hash,
            "Shares bought"
        );
        Ok(outcome)
    }

    /// [`buy_shares`](Self::buy_shares) with a decimal XLM amount.
    pub async fn buy_shares_xlm(
        &self,
        id: u64,
        side: Side,
        xlm: &str,
    ) -> Result<WriteOutcome, MarketError> {
        let stroops = amount::to_base_units(xlm)?;
        self.buy_shares(id, side, stroops).await
    }

    /// Settle a market. Only the contract admin can succeed; that check
    /// happens on-chain.
    pub async fn resolve(&self, id: u64, outcome: Side) -> Result<WriteOutcome, MarketError> {
        let resolver = self.session.require_address()?;
        let args = vec![contract::u64(id), contract::side(outcome)?];
        let result = self.invoke(&resolver, method::RESOLVE_MARKET, args).await?;
        info!(market_id = id, outcome = %outcome, hash = %result.hash, "Market resolved");
        Ok(result)
    }

    /// Collect winnings. A second claim fails in simulation with
    /// `AlreadyClaimed`; callers should re-read the position rather than
    /// retry.
    pub async fn claim_winnings(&self, id: u64) -> Result<WriteOutcome, MarketError> {
        let claimant = self.session.require_address()?;
        let args = vec![contract::address(&claimant)?, contract::u64(id)];
        let outcome = self.invoke(&claimant, method::CLAIM_WINNINGS, args).await?;
        info!(
            market_id = id,
            payout = ?claimed_amount(&outcome),
            hash = %outcome.hash,
            "Winnings claimed"
        );
        Ok(outcome)
    }
}

/// Trimmed question, or a validation error if empty or too long.
pub fn validate_question(question: &str) -> Result<&str, MarketError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(MarketError::Validation("question must not be empty".into()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_QUESTION_CHARS {
        return Err(MarketError::Validation(format!(
            "question is {chars} characters, limit is {MAX_QUESTION_CHARS}"
        )));
    }
    Ok(trimmed)
}

/// Id returned by `create_market`.
pub fn created_market_id(outcome: &WriteOutcome) -> Option<u64> {
    outcome.value().and_then(|v| contract::decode_u64(v).ok())
}

/// Stroops paid out by `claim_winnings`.
pub fn claimed_amount(outcome: &WriteOutcome) -> Option<i128> {
    outcome.value().and_then(|v| contract::decode_i128(v).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
