//! Market services.
//!
//! - `repository`: reads (count, market, position, listings)
//! - `actions`: writes (create, buy, resolve, claim)
//! - `cache`: last-known snapshots

pub mod actions;
pub mod cache;
pub mod repository;

pub use actions::MarketActions;
pub use cache::MarketCache;
pub use repository::MarketRepository;

use std::str::FromStr;

use crate::economics::Phase;
use crate::types::{Market, MarketError};

// ---------------------------------------------------------------------------
// Listing filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseFilter {
    #[default]
    All,
    /// Live: open and before the deadline.
    Open,
    /// Open but past the deadline.
    Expired,
    Resolved,
}

impl PhaseFilter {
    pub fn matches(&self, market: &Market, now: u64) -> bool {
        match (self, Phase::of(market, now)) {
            (PhaseFilter::All, _) => true,
            (PhaseFilter::Open, Phase::Live) => true,
            (PhaseFilter::Expired, Phase::Expired) => true,
            (PhaseFilter::Resolved, Phase::Resolved(_)) => true,
            _ => false,
        }
    }
}

impl FromStr for PhaseFilter {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(PhaseFilter::All),
            "open" | "live" => Ok(PhaseFilter::Open),
            "expired" => Ok(PhaseFilter::Expired),
            "resolved" => Ok(PhaseFilter::Resolved),
            other => Err(MarketError::Validation(format!("unknown filter: {other}"))),
        }
    }
}

pub fn filter_by_phase(markets: &[Market], filter: PhaseFilter, now: u64) -> Vec<&Market> {
    markets.iter().filter(|m| filter.matches(m, now)).collect()
}

/// Markets the authority can settle now: open and past the deadline.
pub fn resolvable(markets: &[Market], now: u64) -> Vec<&Market> {
    filter_by_phase(markets, PhaseFilter::Expired, now)
}

pub fn resolved(markets: &[Market]) -> Vec<&Market> {
    markets.iter().filter(|m| m.status.is_resolved()).collect()
}

/// The last `n` markets by id, newest first.
pub fn newest(markets: &[Market], n: usize) -> Vec<&Market> {
    let mut sorted: Vec<&Market> = markets.iter().collect();
    sorted.sort_by(|a, b| b.id.cmp(&a.id));
    sorted.truncate(n);
    sorted
}
