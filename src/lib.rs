pub mod cli;
pub mod core;
pub mod providers;
pub mod server;
pub mod store;

use crate::core::cache::{Cache, Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::fetcher::BatchFetcher;
use crate::core::holding::HoldingKey;
use crate::core::portfolio::PortfolioEngine;
use crate::core::price::{Fundamentals, Quote};
use crate::core::refresh::RefreshScheduler;
use crate::providers::YahooFinanceProvider;
use crate::store::MemoryCache;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Summary,
    Serve,
    Quote { symbol: String, exchange: String },
}

/// Wires the provider, both caches and the fetcher behind one engine.
pub fn build_engine(config: &AppConfig) -> Result<Arc<PortfolioEngine>> {
    let yahoo = config.yahoo();
    let provider = Arc::new(
        YahooFinanceProvider::from_config(&yahoo).context("Failed to build HTTP client")?,
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let quote_cache: Arc<MemoryCache<HoldingKey, Quote>> =
        Arc::new(MemoryCache::new(config.cache.quote_ttl(), clock.clone()));
    let fundamentals_cache: Arc<MemoryCache<HoldingKey, Fundamentals>> =
        Arc::new(MemoryCache::new(config.cache.fundamentals_ttl(), clock.clone()));
    debug!(
        quote_ttl_secs = quote_cache.ttl().num_seconds(),
        fundamentals_ttl_secs = fundamentals_cache.ttl().num_seconds(),
        "Caches ready"
    );

    // The HTTP client times out first; this bounds a call including retries
    let call_budget = yahoo.timeout() * (yahoo.retries as u32 + 1)
        + std::time::Duration::from_millis(yahoo.retry_delay_ms * yahoo.retries as u64);
    let fetcher = BatchFetcher::new(provider.clone(), provider, quote_cache, fundamentals_cache)
        .with_timeout(call_budget);

    Ok(Arc::new(PortfolioEngine::new(
        config.holdings.clone(),
        Arc::new(fetcher),
        clock,
    )))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("pfdash starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let engine = build_engine(&config)?;

    match command {
        AppCommand::Summary => cli::summary::run(&engine).await,
        AppCommand::Quote { symbol, exchange } => {
            cli::quote::run(engine.fetcher(), &symbol, &exchange).await
        }
        AppCommand::Serve => {
            let scheduler =
                RefreshScheduler::new(engine.clone()).with_interval(config.refresh.interval());
            let refresh = scheduler.start();
            let state = server::AppState::new(engine, refresh.as_ref().map(|h| h.subscribe()));

            let result = server::serve(&config.server.bind_addr(), state).await;
            if let Some(handle) = refresh {
                handle.stop().await;
            }
            result
        }
    }
}
