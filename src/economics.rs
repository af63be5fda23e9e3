//! Market economics.
//!
//! Pure functions over market and position snapshots: probability split,
//! lifecycle phase and pro-rata payouts. Nothing here performs I/O; the
//! only side effect is a warning log from [`pool_is_balanced`].

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::amount::to_decimal_string;
use crate::types::{Market, MarketStatus, Position, Side};

/// Ticker questions longer than this are cut and suffixed with "...".
pub const TICKER_QUESTION_CHARS: usize = 40;

// ---------------------------------------------------------------------------
// Probability split
// ---------------------------------------------------------------------------

/// Share of the stake on Yes, in whole percent (integer division).
///
/// An empty pool reads as 50. Negative totals are treated as zero.
pub fn yes_percent(total_yes: i128, total_no: i128) -> u32 {
    let yes = total_yes.max(0);
    let no = total_no.max(0);
    let total = yes.saturating_add(no);
    if total == 0 {
        return 50;
    }
    let pct = match yes.checked_mul(100) {
        Some(scaled) => scaled / total,
        // Only reachable for totals near i128::MAX; total / 100 is > 0 here.
        None => yes / (total / 100),
    };
    pct.clamp(0, 100) as u32
}

/// `100 - yes_percent`, so the pair always sums to 100. Yes is floored and
/// No absorbs the remainder.
pub fn no_percent(total_yes: i128, total_no: i128) -> u32 {
    100 - yes_percent(total_yes, total_no)
}

/// `(yes, no)` percentages for display.
pub fn probability_split(market: &Market) -> (u32, u32) {
    let yes = yes_percent(market.total_yes, market.total_no);
    (yes, 100 - yes)
}

// ---------------------------------------------------------------------------
// Lifecycle phase
// ---------------------------------------------------------------------------

/// Derived lifecycle phase; never stored on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Open and before the deadline: purchases allowed.
    Live,
    /// Open and past the deadline: awaiting resolution.
    Expired,
    Resolved(Side),
}

impl Phase {
    pub fn of(market: &Market, now: u64) -> Self {
        match market.status {
            MarketStatus::Resolved(outcome) => Phase::Resolved(outcome),
            MarketStatus::Open if now < market.deadline => Phase::Live,
            MarketStatus::Open => Phase::Expired,
        }
    }

    pub fn can_buy(&self) -> bool {
        matches!(self, Phase::Live)
    }

    pub fn can_resolve(&self) -> bool {
        matches!(self, Phase::Expired)
    }

    pub fn can_claim(&self) -> bool {
        matches!(self, Phase::Resolved(_))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Live => write!(f, "Open"),
            Phase::Expired => write!(f, "Expired"),
            Phase::Resolved(side) => write!(f, "Resolved: {side}"),
        }
    }
}

/// Current Unix time in seconds (clamped at 0).
pub fn now_unix() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Payouts
// ---------------------------------------------------------------------------

/// Pro-rata share of the pool: `shares * pool_balance / total_winning`.
///
/// Zero when the account holds no winning shares or nobody backed the
/// winning side. If the product overflows i128 the result is capped at the
/// pool balance.
pub fn payout(shares: i128, pool_balance: i128, total_winning: i128) -> i128 {
    if shares <= 0 || total_winning <= 0 || pool_balance <= 0 {
        return 0;
    }
    match shares.checked_mul(pool_balance) {
        Some(product) => product / total_winning,
        None => pool_balance,
    }
}

/// Winnings for `position` in a resolved market. `None` while the market
/// is still open.
pub fn payout_for(market: &Market, position: &Position) -> Option<i128> {
    let winner = market.status.outcome()?;
    Some(payout(
        position.shares_for(winner),
        market.pool_balance,
        market.total_for(winner),
    ))
}

/// What `position` would receive if `side` wins.
///
/// Once the market is resolved only the winning side has a payout; the
/// losing side yields `None`.
pub fn potential_payout(market: &Market, position: &Position, side: Side) -> Option<i128> {
    if let Some(winner) = market.status.outcome() {
        if winner != side {
            return None;
        }
    }
    Some(payout(
        position.shares_for(side),
        market.pool_balance,
        market.total_for(side),
    ))
}

/// Whether an unclaimed position still has something to collect.
pub fn has_claimable(market: &Market, position: &Position) -> bool {
    !position.claimed && payout_for(market, position).unwrap_or(0) > 0
}

/// Check `total_yes + total_no == pool_balance` for an open market and log
/// a warning when it does not hold. Resolved markets always pass, since
/// claims draw the pool down.
pub fn pool_is_balanced(market: &Market) -> bool {
    if market.status.is_resolved() {
        return true;
    }
    let balanced = market.total_yes.checked_add(market.total_no) == Some(market.pool_balance);
    if !balanced {
        warn!(
            market_id = market.id,
            total_yes = %market.total_yes,
            total_no = %market.total_no,
            pool_balance = %market.pool_balance,
            "Open market pool does not match its stakes"
        );
    }
    balanced
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// One-line summary of a market for a scrolling ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerItem {
    pub id: u64,
    pub question: String,
    pub yes_percent: u32,
    /// Pool balance in decimal XLM.
    pub volume: String,
}

pub fn ticker_item(market: &Market) -> TickerItem {
    TickerItem {
        id: market.id,
        question: truncate_question(&market.question, TICKER_QUESTION_CHARS),
        yes_percent: yes_percent(market.total_yes, market.total_no),
        volume: to_decimal_string(market.pool_balance),
    }
}

fn truncate_question(question: &str, max_chars: usize) -> String {
    if question.chars().count() <= max_chars {
        return question.to_string();
    }
    let cut: String = question.chars().take(max_chars).collect();
    format!("{cut}...")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
