//! Market watcher.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! checks the RPC server, then lists every market on an interval and logs
//! a summary line per market until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use soroban_predict::amount::to_decimal_string;
use soroban_predict::config::AppConfig;
use soroban_predict::economics::{self, Phase};
use soroban_predict::engine::CallOrchestrator;
use soroban_predict::ledger::rpc::SorobanRpcClient;
use soroban_predict::market::{self, MarketCache, MarketRepository, PhaseFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_with_env("config.toml")?;

    init_logging();

    info!(
        rpc_url = %cfg.network.rpc_url,
        contract_id = %cfg.network.contract_id,
        interval_secs = cfg.watch.interval_secs,
        "soroban-predict watcher starting up"
    );

    let rpc = Arc::new(
        SorobanRpcClient::with_timeout(&cfg.network.rpc_url, cfg.request_timeout())
            .context("Failed to build Soroban RPC client")?,
    );

    match rpc.health().await {
        Ok(health) => info!(
            status = %health.status,
            latest_ledger = ?health.latest_ledger,
            "RPC server reachable"
        ),
        Err(e) => warn!(error = %e, "RPC health check failed, continuing"),
    }
    if let Ok(ledger) = rpc.latest_ledger().await {
        info!(sequence = ledger.sequence, protocol = ledger.protocol_version, "Latest ledger");
    }

    let orchestrator = Arc::new(CallOrchestrator::new(rpc, cfg.invoke_settings()));
    let cache = Arc::new(MarketCache::new());
    let repository = MarketRepository::new(orchestrator, cfg.network.contract_id.clone(), cache);

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.watch.interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Entering watch loop. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_cycle(&repository, &cfg).await {
                    error!(error = %e, "Watch cycle failed, continuing to next");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(cached_markets = repository.cache().len(), "Watcher stopped");
    Ok(())
}

/// One pass: list markets, summarise them, and report the watched
/// account's positions.
async fn run_cycle(repository: &MarketRepository, cfg: &AppConfig) -> Result<()> {
    let markets = repository.list().await.context("Failed to list markets")?;
    let now = economics::now_unix();

    for m in &markets {
        let (yes, no) = economics::probability_split(m);
        info!(
            market_id = m.id,
            phase = %Phase::of(m, now),
            yes_pct = yes,
            no_pct = no,
            pool_xlm = %to_decimal_string(m.pool_balance),
            question = %m.question,
            "Market"
        );
    }

    let live = market::filter_by_phase(&markets, PhaseFilter::Open, now).len();
    let awaiting = market::resolvable(&markets, now).len();
    let settled = market::resolved(&markets).len();
    info!(
        total = markets.len(),
        live,
        awaiting_resolution = awaiting,
        resolved = settled,
        "Cycle summary"
    );

    let ticker: Vec<String> = markets
        .iter()
        .take(cfg.watch.ticker_limit)
        .map(economics::ticker_item)
        .map(|t| format!("{} YES {}% Vol {} XLM", t.question, t.yes_percent, t.volume))
        .collect();
    if !ticker.is_empty() {
        info!(ticker = %ticker.join(" | "), "Ticker");
    }

    if let Some(account) = &cfg.watch.account {
        for m in &markets {
            let position = match repository.position(m.id, account).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(market_id = m.id, error = %e, "Failed to read position");
                    continue;
                }
            };
            if position.is_empty() {
                continue;
            }
            info!(
                market_id = m.id,
                yes_shares = %to_decimal_string(position.yes_shares),
                no_shares = %to_decimal_string(position.no_shares),
                claimed = position.claimed,
                payout = ?economics::payout_for(m, &position).map(to_decimal_string),
                claimable = economics::has_claimable(m, &position),
                "Position"
            );
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("soroban_predict=info"));

    let json_logging = std::env::var("PREDICT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
