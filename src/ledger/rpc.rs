//! Soroban JSON-RPC client.
//!
//! Speaks JSON-RPC 2.0 over HTTPS POST to a single endpoint. Only the
//! methods the market client needs are wrapped.
//!
//! API docs: https://developers.stellar.org/docs/data/apis/rpc/api-reference/methods
//! Public testnet: https://soroban-testnet.stellar.org

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::xdr::{
    account_key, account_ledger_key, account_sequence_from_entry, decode, parse_address,
    return_value_from_meta, ScVal,
};
use super::{
    AccountState, LedgerRpc, Simulation, SimulationSuccess, SubmitResponse, SubmitStatus,
    TransactionStatus,
};
use crate::types::MarketError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const USER_AGENT: &str = "soroban-predict/0.1.0";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// API response types (JSON-RPC → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerEntriesResult {
    /// `null` when none of the requested keys exist.
    #[serde(default)]
    entries: Option<Vec<LedgerEntryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerEntryResult {
    /// Base64 `LedgerEntryData`.
    xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResult {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    transaction_data: Option<String>,
    /// Stringified integer.
    #[serde(default)]
    min_resource_fee: Option<String>,
    #[serde(default)]
    results: Vec<SimulateHostFunctionResult>,
    /// Present when archived entries must be restored first.
    #[serde(default)]
    restore_preamble: Option<serde_json::Value>,
    latest_ledger: u32,
}

#[derive(Debug, Deserialize)]
struct SimulateHostFunctionResult {
    #[serde(default)]
    auth: Vec<String>,
    /// Base64 `ScVal` return value.
    xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResult {
    hash: String,
    status: String,
    #[serde(default)]
    error_result_xdr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTransactionResult {
    status: String,
    #[serde(default)]
    ledger: Option<u32>,
    #[serde(default)]
    result_xdr: Option<String>,
    /// Base64 `TransactionMeta`; a Soroban call's return value lives here.
    #[serde(default)]
    result_meta_xdr: Option<String>,
}

/// `getHealth` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInfo {
    pub status: String,
    #[serde(default)]
    pub latest_ledger: Option<u32>,
    #[serde(default)]
    pub oldest_ledger: Option<u32>,
}

/// `getLatestLedger` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestLedger {
    pub id: String,
    pub protocol_version: u32,
    pub sequence: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: P,
}

/// JSON-RPC client for a Soroban RPC server.
pub struct SorobanRpcClient {
    http: Client,
    url: String,
}

impl SorobanRpcClient {
    pub fn new(url: &str) -> Result<Self, MarketError> {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call and unwrap the `result` member.
    async fn call<P, R>(&self, method: &str, params: P) -> Result<R, MarketError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params,
        };

        debug!(method = method, url = %self.url, "Soroban RPC request");
        let resp = self.http.post(&self.url).json(&request).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MarketError::Rpc {
                code: i64::from(status.as_u16()),
                message: format!("HTTP {status}: {body}"),
            });
        }

        let body: RpcResponse<R> = resp.json().await?;
        if let Some(err) = body.error {
            warn!(method = method, code = err.code, message = %err.message, "Soroban RPC error");
            return Err(MarketError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        body.result
            .ok_or_else(|| MarketError::Decode(format!("{method}: response has no result")))
    }

    /// `getHealth`: whether the server is serving current ledgers.
    pub async fn health(&self) -> Result<HealthInfo, MarketError> {
        self.call("getHealth", json!({})).await
    }

    pub async fn latest_ledger(&self) -> Result<LatestLedger, MarketError> {
        self.call("getLatestLedger", json!({})).await
    }
}

#[async_trait]
impl LedgerRpc for SorobanRpcClient {
    async fn get_account(&self, account_id: &str) -> Result<AccountState, MarketError> {
        let key = parse_address(account_id)
            .and_then(|addr| account_key(&addr))
            .ok_or_else(|| {
                MarketError::Validation(format!("not an account address: {account_id}"))
            })?;

        let result: LedgerEntriesResult = self
            .call("getLedgerEntries", json!({ "keys": [account_ledger_key(key)?] }))
            .await?;
        let entry = result
            .entries
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| MarketError::NotFound(format!("account {account_id}")))?;

        let sequence = account_sequence_from_entry(&entry.xdr)?;
        Ok(AccountState {
            account_id: account_id.to_string(),
            sequence,
        })
    }

    async fn simulate(&self, envelope_b64: &str) -> Result<Simulation, MarketError> {
        let result: SimulateResult = self
            .call("simulateTransaction", json!({ "transaction": envelope_b64 }))
            .await?;
        parse_simulation(result)
    }

    async fn submit(&self, signed_envelope_b64: &str) -> Result<SubmitResponse, MarketError> {
        let result: SendResult = self
            .call("sendTransaction", json!({ "transaction": signed_envelope_b64 }))
            .await?;
        let status = match result.status.as_str() {
            "PENDING" => SubmitStatus::Pending,
            "DUPLICATE" => SubmitStatus::Duplicate,
            "TRY_AGAIN_LATER" => SubmitStatus::TryAgainLater,
            "ERROR" => SubmitStatus::Error,
            other => {
                return Err(MarketError::Decode(format!(
                    "unknown sendTransaction status: {other}"
                )))
            }
        };
        Ok(SubmitResponse {
            hash: result.hash,
            status,
            error_result_xdr: result.error_result_xdr,
        })
    }

    async fn transaction_status(&self, hash: &str) -> Result<TransactionStatus, MarketError> {
        let result: GetTransactionResult =
            self.call("getTransaction", json!({ "hash": hash })).await?;
        parse_transaction_status(result)
    }
}

/// Interpret a raw `simulateTransaction` result object.
pub fn simulation_from_json(result: serde_json::Value) -> Result<Simulation, MarketError> {
    let result: SimulateResult = serde_json::from_value(result)
        .map_err(|e| MarketError::Decode(format!("simulateTransaction result: {e}")))?;
    parse_simulation(result)
}

/// Interpret a raw `getTransaction` result object.
pub fn transaction_status_from_json(
    result: serde_json::Value,
) -> Result<TransactionStatus, MarketError> {
    let result: GetTransactionResult = serde_json::from_value(result)
        .map_err(|e| MarketError::Decode(format!("getTransaction result: {e}")))?;
    parse_transaction_status(result)
}

fn parse_simulation(result: SimulateResult) -> Result<Simulation, MarketError> {
    if let Some(error) = result.error {
        return Ok(Simulation::Error(error));
    }
    if result.restore_preamble.is_some() {
        return Ok(Simulation::Error(
            "contract state is archived and must be restored before this call".to_string(),
        ));
    }

    let transaction_data = result
        .transaction_data
        .ok_or_else(|| MarketError::Decode("simulation has no transactionData".into()))?;
    let min_resource_fee = match result.min_resource_fee {
        Some(fee) => fee
            .parse::<u64>()
            .map_err(|e| MarketError::Decode(format!("minResourceFee {fee:?}: {e}")))?,
        None => 0,
    };

    let (auth, return_value) = match result.results.into_iter().next() {
        Some(first) => {
            let value = if first.xdr.is_empty() {
                None
            } else {
                Some(decode::<ScVal>(&first.xdr)?)
            };
            (first.auth, value)
        }
        None => (Vec::new(), None),
    };

    Ok(Simulation::Success(SimulationSuccess {
        transaction_data,
        min_resource_fee,
        auth,
        return_value,
        latest_ledger: result.latest_ledger,
    }))
}

fn parse_transaction_status(
    result: GetTransactionResult,
) -> Result<TransactionStatus, MarketError> {
    match result.status.as_str() {
        "NOT_FOUND" => Ok(TransactionStatus::NotFound),
        "SUCCESS" => {
            let return_value = match result.result_meta_xdr.as_deref() {
                Some(b64) if !b64.is_empty() => return_value_from_meta(b64)?,
                _ => None,
            };
            Ok(TransactionStatus::Success {
                ledger: result.ledger.unwrap_or_default(),
                return_value,
            })
        }
        "FAILED" => Ok(TransactionStatus::Failed {
            ledger: result.ledger.unwrap_or_default(),
            result_xdr: result.result_xdr,
        }),
        other => Err(MarketError::Decode(format!(
            "unknown getTransaction status: {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
