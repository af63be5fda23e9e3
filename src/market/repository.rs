//! Read-only market accessors over the simulation path.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::cache::MarketCache;
use crate::contract::{self, method, ContractError};
use crate::economics::{self, TickerItem};
use crate::engine::CallOrchestrator;
use crate::ledger::xdr::ScVal;
use crate::types::{Market, MarketError, Position};

/// Markets fetched at once by [`MarketRepository::list`].
const MAX_CONCURRENT_READS: usize = 8;

pub struct MarketRepository {
    orchestrator: Arc<CallOrchestrator>,
    contract_id: String,
    cache: Arc<MarketCache>,
}

impl MarketRepository {
    pub fn new(
        orchestrator: Arc<CallOrchestrator>,
        contract_id: impl Into<String>,
        cache: Arc<MarketCache>,
    ) -> Self {
        Self {
            orchestrator,
            contract_id: contract_id.into(),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<MarketCache> {
        &self.cache
    }

    async fn read(&self, method: &str, args: Vec<ScVal>) -> Result<Option<ScVal>, MarketError> {
        self.orchestrator.read(&self.contract_id, method, args).await
    }

    /// Number of markets created. An uninitialised registry counts as 0.
    pub async fn count(&self) -> Result<u64, MarketError> {
        match self.read(method::GET_MARKET_COUNT, vec![]).await? {
            None => Ok(0),
            Some(val) => contract::decode_u64(&val),
        }
    }

    /// One market by id; `NotFound` if the contract has no such market.
    pub async fn get(&self, id: u64) -> Result<Market, MarketError> {
        let not_found = || MarketError::NotFound(format!("market {id}"));
        let val = match self.read(method::GET_MARKET, vec![contract::u64(id)]).await {
            Ok(Some(val)) => val,
            Ok(None) => return Err(not_found()),
            Err(e) if e.contract_error() == Some(ContractError::MarketNotFound) => {
                return Err(not_found())
            }
            Err(e) => return Err(e),
        };

        let market = contract::decode_market(id, &val)?;
        economics::pool_is_balanced(&market);
        self.cache.store_market(market.clone());
        Ok(market)
    }

    /// An account's stake in a market; accounts that never traded get
    /// [`Position::EMPTY`].
    pub async fn position(&self, id: u64, account: &str) -> Result<Position, MarketError> {
        let args = vec![contract::u64(id), contract::address(account)?];
        let position = match self.read(method::GET_POSITION, args).await? {
            None => Position::EMPTY,
            Some(val) => contract::decode_position(&val)?,
        };
        self.cache.store_position(id, account, position);
        Ok(position)
    }

    /// Every market, in id order. Markets that fail to load are skipped.
    pub async fn list(&self) -> Result<Vec<Market>, MarketError> {
        let count = self.count().await?;
        self.fetch_range(0..count).await
    }

    /// The newest `n` markets, newest first.
    pub async fn newest(&self, n: usize) -> Result<Vec<Market>, MarketError> {
        let count = self.count().await?;
        let start = count.saturating_sub(n as u64);
        let mut markets = self.fetch_range(start..count).await?;
        markets.reverse();
        Ok(markets)
    }

    /// Ticker lines for the first `limit` markets.
    pub async fn ticker(&self, limit: usize) -> Result<Vec<TickerItem>, MarketError> {
        let count = self.count().await?;
        let end = count.min(limit as u64);
        let markets = self.fetch_range(0..end).await?;
        Ok(markets.iter().map(economics::ticker_item).collect())
    }

    async fn fetch_range(&self, ids: std::ops::Range<u64>) -> Result<Vec<Market>, MarketError> {
        debug!(from = ids.start, to = ids.end, "Fetching markets");
        let results: Vec<(u64, Result<Market, MarketError>)> = stream::iter(ids)
            .map(|id| async move { (id, self.get(id).await) })
            .buffered(MAX_CONCURRENT_READS)
            .collect()
            .await;

        let mut markets = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(market) => markets.push(market),
                Err(e) => warn!(market_id = id, error = %e, "Skipping market that failed to load"),
            }
        }
        Ok(markets)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
