//! Concurrent, partial-failure-tolerant market data lookups for a batch of holdings.

use crate::core::cache::{Cache, CacheLookup};
use crate::core::error::FetchError;
use crate::core::holding::HoldingKey;
use crate::core::price::{Fundamentals, FundamentalsProvider, Quote, QuoteProvider, Snapshot};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one lookup inside a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub key: HoldingKey,
    pub result: Result<Snapshot, FetchError>,
}

/// Every item of a batch, in input order, whether it succeeded or not.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub items: Vec<BatchItem>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn successful(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.successful()
    }

    /// Folds the batch into a map keyed by `"{symbol}_{exchange}"`.
    /// Duplicate identities collapse and the later item wins.
    pub fn into_keyed(self) -> BTreeMap<String, BatchItem> {
        self.items
            .into_iter()
            .map(|item| (item.key.to_string(), item))
            .collect()
    }
}

struct Resolved<V> {
    value: V,
    fetched_at: DateTime<Utc>,
    stale: bool,
}

/// Fans out one lookup per holding and collects every outcome.
///
/// Quotes and fundamentals are cached independently, each with its own TTL.
/// On a miss or expiry the provider is called under a local timeout; if that
/// call fails and an expired entry exists, the expired value is served instead
/// of the error.
pub struct BatchFetcher {
    quotes: Arc<dyn QuoteProvider>,
    fundamentals: Arc<dyn FundamentalsProvider>,
    quote_cache: Arc<dyn Cache<HoldingKey, Quote>>,
    fundamentals_cache: Arc<dyn Cache<HoldingKey, Fundamentals>>,
    timeout: Duration,
}

impl BatchFetcher {
    pub fn new(
        quotes: Arc<dyn QuoteProvider>,
        fundamentals: Arc<dyn FundamentalsProvider>,
        quote_cache: Arc<dyn Cache<HoldingKey, Quote>>,
        fundamentals_cache: Arc<dyn Cache<HoldingKey, Fundamentals>>,
    ) -> Self {
        Self {
            quotes,
            fundamentals,
            quote_cache,
            fundamentals_cache,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(name = "FetchSnapshot", skip(self), fields(key = %key))]
    pub async fn fetch_one(&self, key: &HoldingKey) -> Result<Snapshot, FetchError> {
        let (quote, fundamentals) = tokio::join!(
            resolve(self.quote_cache.as_ref(), key, self.timeout, || {
                self.quotes.fetch_quote(key)
            }),
            resolve(self.fundamentals_cache.as_ref(), key, self.timeout, || {
                self.fundamentals.fetch_fundamentals(key)
            }),
        );

        let quote = quote?;
        let fundamentals = match fundamentals {
            Ok(resolved) => Some(resolved.value),
            Err(e) => {
                warn!(error = %e, "Fundamentals unavailable, continuing with price only");
                None
            }
        };

        Ok(Snapshot::new(
            quote.value,
            fundamentals,
            quote.fetched_at,
            quote.stale,
        ))
    }

    pub async fn fetch_all(&self, keys: &[HoldingKey]) -> BatchOutcome {
        self.fetch_all_with_progress(keys, &|| {}).await
    }

    /// Same as [`fetch_all`](Self::fetch_all), calling `on_settled` once per
    /// item as soon as that item has an outcome.
    pub async fn fetch_all_with_progress(
        &self,
        keys: &[HoldingKey],
        on_settled: &(dyn Fn() + Send + Sync),
    ) -> BatchOutcome {
        let futures = keys.iter().map(|key| async move {
            let result = self.fetch_one(key).await;
            on_settled();
            BatchItem {
                key: key.clone(),
                result,
            }
        });

        let outcome = BatchOutcome {
            items: join_all(futures).await,
        };
        debug!(
            total = outcome.total(),
            successful = outcome.successful(),
            failed = outcome.failed(),
            "Batch settled"
        );
        outcome
    }
}

async fn resolve<V, F, Fut>(
    cache: &dyn Cache<HoldingKey, V>,
    key: &HoldingKey,
    timeout: Duration,
    fetch: F,
) -> Result<Resolved<V>, FetchError>
where
    V: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, FetchError>>,
{
    let fallback = match cache.lookup(key).await {
        CacheLookup::Fresh(entry) => {
            return Ok(Resolved {
                value: entry.value,
                fetched_at: entry.fetched_at,
                stale: false,
            });
        }
        CacheLookup::Stale(entry) => Some(entry),
        CacheLookup::Missing => None,
    };

    let outcome = match tokio::time::timeout(timeout, fetch()).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::unavailable(
            &key.symbol,
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    };

    match (outcome, fallback) {
        (Ok(value), _) => {
            let entry = cache.put(key.clone(), value).await;
            Ok(Resolved {
                value: entry.value,
                fetched_at: entry.fetched_at,
                stale: false,
            })
        }
        (Err(e), Some(entry)) => {
            warn!(error = %e, fetched_at = %entry.fetched_at, "Refetch failed, serving last known value");
            Ok(Resolved {
                value: entry.value,
                fetched_at: entry.fetched_at,
                stale: true,
            })
        }
        (Err(e), None) => Err(e),
    }
}
