//! Last-known view of markets and positions.
//!
//! Every successful read overwrites its entry unconditionally. There is no
//! local write path: an entry is only ever what the ledger last reported.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::types::{Market, Position};

/// A value with the time it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    fn now(value: T) -> Self {
        Self {
            value,
            fetched_at: Utc::now(),
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.fetched_at
    }
}

#[derive(Debug, Default)]
pub struct MarketCache {
    markets: RwLock<HashMap<u64, Snapshot<Market>>>,
    positions: RwLock<HashMap<(u64, String), Snapshot<Position>>>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_market(&self, market: Market) {
        let mut markets = self.markets.write().unwrap_or_else(PoisonError::into_inner);
        markets.insert(market.id, Snapshot::now(market));
    }

    pub fn store_position(&self, market_id: u64, account: &str, position: Position) {
        let mut positions = self.positions.write().unwrap_or_else(PoisonError::into_inner);
        positions.insert((market_id, account.to_string()), Snapshot::now(position));
    }

    pub fn market(&self, id: u64) -> Option<Snapshot<Market>> {
        self.markets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn position(&self, market_id: u64, account: &str) -> Option<Snapshot<Position>> {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(market_id, account.to_string()))
            .cloned()
    }

    /// All cached markets, ordered by id.
    pub fn markets(&self) -> Vec<Market> {
        let markets = self.markets.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<Market> = markets.values().map(|s| s.value.clone()).collect();
        out.sort_by_key(|m| m.id);
        out
    }

    pub fn len(&self) -> usize {
        self.markets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.markets.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.positions.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
