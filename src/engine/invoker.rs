//! Contract call lifecycle.
//!
//! Reads are a single simulation from a placeholder account. Writes run
//! the full sequence, strictly in order:
//! account → build → simulate → assemble → sign → submit → poll.
//! Nothing touches the network after simulation until the signer returns,
//! so dropping a write future before then abandons the call cleanly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ledger::transaction::{is_valid_symbol, signature_count, Envelope, InvokeCall};
use crate::ledger::xdr::{account_key, contract_hash, parse_address, ScVal};
use crate::ledger::{LedgerRpc, Simulation, TransactionStatus};
use crate::types::{MarketError, SignerError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Unfunded all-zero account used as the source of read-only simulations.
pub const PLACEHOLDER_SOURCE: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";

/// Stellar's minimum per-operation fee in stroops.
pub const BASE_FEE: u32 = 100;

#[derive(Debug, Clone)]
pub struct InvokeSettings {
    pub network_passphrase: String,
    pub base_fee: u32,
    /// Validity window of read envelopes.
    pub read_timeout: Duration,
    /// Validity window of write envelopes; must cover a human at the wallet.
    pub write_timeout: Duration,
    pub poll_interval: Duration,
    /// Give up confirming after this long. `None` polls until final.
    pub confirm_timeout: Option<Duration>,
    /// Give up waiting for the wallet after this long. `None` waits forever.
    pub signer_timeout: Option<Duration>,
}

impl Default for InvokeSettings {
    fn default() -> Self {
        Self {
            network_passphrase: "Test SDF Network ; September 2015".to_string(),
            base_fee: BASE_FEE,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(180),
            poll_interval: Duration::from_millis(1500),
            confirm_timeout: Some(Duration::from_secs(120)),
            signer_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// A confirmed write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub hash: String,
    pub ledger: u32,
    /// Return value reported with the confirmed transaction, when the RPC
    /// server includes it.
    pub return_value: Option<ScVal>,
    /// Return value predicted by simulation.
    pub simulated_return: Option<ScVal>,
    /// Status checks it took to see a final state.
    pub polls: u32,
}

impl WriteOutcome {
    /// Confirmed return value, falling back to the simulated one.
    pub fn value(&self) -> Option<&ScVal> {
        self.return_value.as_ref().or(self.simulated_return.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct CallOrchestrator {
    rpc: Arc<dyn LedgerRpc>,
    settings: InvokeSettings,
}

impl CallOrchestrator {
    pub fn new(rpc: Arc<dyn LedgerRpc>, settings: InvokeSettings) -> Self {
        Self { rpc, settings }
    }

    pub fn settings(&self) -> &InvokeSettings {
        &self.settings
    }

    /// Simulate `method` and return its value. `Ok(None)` means the
    /// contract produced nothing (absent, not a failure).
    pub async fn read(
        &self,
        contract_id: &str,
        method: &str,
        args: Vec<ScVal>,
    ) -> Result<Option<ScVal>, MarketError> {
        let source = account_source(PLACEHOLDER_SOURCE).ok_or_else(|| {
            MarketError::Validation(format!("bad placeholder source {PLACEHOLDER_SOURCE}"))
        })?;
        let call = build_call(contract_id, method, args)?;
        let envelope = Envelope::new(
            source,
            1,
            self.settings.base_fee,
            deadline_after(self.settings.read_timeout),
            call,
        );

        debug!(method = method, "Simulating read");
        match self.rpc.simulate(&envelope.to_xdr_base64()?).await? {
            Simulation::Error(message) => {
                debug!(method = method, error = %message, "Read simulation failed");
                Err(MarketError::simulation(message))
            }
            Simulation::Success(sim) => Ok(sim.return_value.filter(|v| *v != ScVal::Void)),
        }
    }

    /// Run a state-changing call to confirmation.
    ///
    /// `sign` receives the assembled unsigned envelope (base64) and must
    /// return it signed. Failures before submission are always safe to
    /// retry; `OnChainFailure` and `Timeout` are not.
    pub async fn write<F, Fut>(
        &self,
        caller: &str,
        contract_id: &str,
        method: &str,
        args: Vec<ScVal>,
        sign: F,
    ) -> Result<WriteOutcome, MarketError>
    where
        F: FnOnce(String) -> Fut + Send,
        Fut: Future<Output = Result<String, SignerError>> + Send,
    {
        let source = account_source(caller).ok_or_else(|| {
            MarketError::Validation(format!("caller is not an account address: {caller:?}"))
        })?;
        let call = build_call(contract_id, method, args)?;

        // 1. account state
        let account = self.rpc.get_account(caller).await?;

        // 2. build
        let envelope = Envelope::new(
            source,
            account.next_sequence(),
            self.settings.base_fee,
            deadline_after(self.settings.write_timeout),
            call,
        );

        // 3. simulate; never submit what cannot land
        debug!(
            method = method,
            caller = %caller,
            sequence = envelope.sequence,
            "Simulating write"
        );
        let sim = match self.rpc.simulate(&envelope.to_xdr_base64()?).await? {
            Simulation::Error(message) => {
                warn!(method = method, error = %message, "Write rejected in simulation");
                return Err(MarketError::simulation(message));
            }
            Simulation::Success(sim) => sim,
        };

        // 4. assemble
        let assembled = envelope.assemble(&sim)?;
        let unsigned = assembled.to_xdr_base64()?;
        let local_hash = assembled.hash_hex(&self.settings.network_passphrase)?;
        debug!(
            method = method,
            fee = assembled.fee,
            auth_entries = assembled.auth.len(),
            "Envelope assembled, awaiting signature"
        );

        // 5. sign
        let signing = sign(unsigned.clone());
        let signed = match self.settings.signer_timeout {
            Some(limit) => tokio::time::timeout(limit, signing)
                .await
                .map_err(|_| SignerError::Timeout(limit.as_secs()))??,
            None => signing.await?,
        };
        match signature_count(&unsigned, &signed)? {
            None => return Err(SignerError::Mismatch.into()),
            Some(0) => {
                let reason = "wallet returned an unsigned envelope".to_string();
                return Err(SignerError::Rejected(reason).into());
            }
            Some(_) => {}
        }

        // 6. submit
        let submitted = self.rpc.submit(&signed).await?;
        if !submitted.status.is_accepted() {
            warn!(
                method = method,
                hash = %submitted.hash,
                status = submitted.status.as_str(),
                "Transaction rejected at submission"
            );
            return Err(MarketError::Submission {
                status: submitted.status.as_str().to_string(),
                detail: submitted
                    .error_result_xdr
                    .unwrap_or_else(|| "no error result".to_string()),
            });
        }
        if submitted.hash != local_hash {
            warn!(
                local = %local_hash,
                remote = %submitted.hash,
                "RPC reported a different transaction hash"
            );
        }
        info!(method = method, hash = %submitted.hash, "Transaction submitted");

        // 7. poll
        let mut outcome = self.confirm(&submitted.hash).await?;
        outcome.simulated_return = sim.return_value;
        Ok(outcome)
    }

    /// Poll `getTransaction` until the hash reaches a final state.
    ///
    /// Transport and RPC errors while polling are logged and polled
    /// through: the transaction is already in flight and surfacing them
    /// would invite a duplicate submission.
    pub async fn confirm(&self, hash: &str) -> Result<WriteOutcome, MarketError> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            match self.rpc.transaction_status(hash).await {
                Ok(TransactionStatus::Success {
                    ledger,
                    return_value,
                }) => {
                    info!(hash = %hash, ledger = ledger, polls = polls, "Transaction confirmed");
                    return Ok(WriteOutcome {
                        hash: hash.to_string(),
                        ledger,
                        return_value,
                        simulated_return: None,
                        polls,
                    });
                }
                Ok(TransactionStatus::Failed { ledger, result_xdr }) => {
                    warn!(hash = %hash, ledger = ledger, "Transaction failed on-chain");
                    return Err(MarketError::OnChainFailure {
                        hash: hash.to_string(),
                        result_xdr,
                    });
                }
                Ok(TransactionStatus::NotFound) => {
                    debug!(hash = %hash, polls = polls, "Transaction not yet in a ledger");
                }
                Err(e @ (MarketError::Transport(_) | MarketError::Rpc { .. })) => {
                    warn!(hash = %hash, error = %e, "Status check failed, still polling");
                }
                Err(e) => return Err(e),
            }

            if let Some(limit) = self.settings.confirm_timeout {
                if started.elapsed() >= limit {
                    warn!(hash = %hash, polls = polls, "Gave up waiting for confirmation");
                    return Err(MarketError::Timeout {
                        hash: hash.to_string(),
                        attempts: polls,
                    });
                }
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

fn account_source(addr: &str) -> Option<[u8; 32]> {
    parse_address(addr).and_then(|addr| account_key(&addr))
}

fn build_call(
    contract_id: &str,
    method: &str,
    args: Vec<ScVal>,
) -> Result<InvokeCall, MarketError> {
    let contract = parse_address(contract_id)
        .and_then(|addr| contract_hash(&addr))
        .ok_or_else(|| {
            MarketError::Validation(format!("not a contract address: {contract_id:?}"))
        })?;
    if !is_valid_symbol(method) {
        return Err(MarketError::Validation(format!("invalid method name: {method:?}")));
    }
    Ok(InvokeCall::new(contract, method, args))
}

/// Unix time `window` from now, the envelope's upper time bound.
fn deadline_after(window: Duration) -> u64 {
    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    now.saturating_add(window.as_secs())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
