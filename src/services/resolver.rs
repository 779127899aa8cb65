use crate::error::{AppError, Result};
use crate::models::{EquityView, RelEquityView, StockData};
use crate::services::equity_store::EquityStore;
use crate::services::quote::QuoteProvider;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Orchestrates fetch-or-create, staleness-triggered price refresh, like
/// registration and response assembly for one or two symbols.
pub struct EquityResolver {
    store: EquityStore,
    provider: Arc<dyn QuoteProvider>,
    stale_after: Duration,
}

impl EquityResolver {
    pub fn new(store: EquityStore, provider: Arc<dyn QuoteProvider>, stale_after: Duration) -> Self {
        Self {
            store,
            provider,
            stale_after,
        }
    }

    /// Resolve one or two symbols. A pair is resolved sequentially in
    /// request order, then `likes` is replaced on both sides by the signed
    /// difference against the other. Any per-symbol failure fails the whole
    /// request.
    pub async fn resolve(
        &self,
        symbols: &[String],
        wants_like: bool,
        identity: &str,
    ) -> Result<StockData> {
        match symbols {
            [only] => Ok(StockData::Single(
                self.resolve_one(only, wants_like, identity).await?,
            )),
            [first, second] => {
                let a = self.resolve_one(first, wants_like, identity).await?;
                let b = self.resolve_one(second, wants_like, identity).await?;
                let rel = a.likes as i64 - b.likes as i64;
                Ok(StockData::Pair([
                    RelEquityView {
                        stock: a.stock,
                        price: a.price,
                        rel_likes: rel,
                    },
                    RelEquityView {
                        stock: b.stock,
                        price: b.price,
                        rel_likes: -rel,
                    },
                ]))
            }
            _ => Err(AppError::Validation(format!(
                "expected 1 or 2 stock symbols, got {}",
                symbols.len()
            ))),
        }
    }

    async fn resolve_one(
        &self,
        raw_symbol: &str,
        wants_like: bool,
        identity: &str,
    ) -> Result<EquityView> {
        let symbol = normalize_symbol(raw_symbol)?;

        let Some(record) = self.store.get(&symbol).await? else {
            // First request for this symbol: a failed price lookup aborts,
            // there is no stale price to fall back on yet.
            let price = self.provider.fetch_price(&symbol).await?;
            let record = self
                .store
                .create(&symbol, &price, wants_like.then_some(identity))
                .await?;
            debug!(symbol = %record.symbol, price = %record.price, "created equity record");
            return Ok(EquityView {
                stock: record.symbol,
                price: record.price,
                likes: record.likes,
            });
        };

        let mut price = record.price;
        let age = Utc::now()
            .signed_duration_since(record.updated_at)
            .to_std()
            .unwrap_or_default();

        if age > self.stale_after {
            match self.provider.fetch_price(&symbol).await {
                Ok(fresh) => {
                    // Not awaited: staleness is re-checked on the next read
                    // anyway, so the response does not wait on this write.
                    let store = self.store.clone();
                    let persist_symbol = symbol.clone();
                    let persist_price = fresh.clone();
                    tokio::spawn(async move {
                        if let Err(e) = store.update_price(&persist_symbol, &persist_price).await {
                            warn!(symbol = %persist_symbol, error = %e, "background price update failed");
                        }
                    });
                    price = fresh;
                }
                Err(e) => {
                    // Degrade gracefully: an unreachable quote provider must
                    // not block likes. The record stays stale until a later
                    // access during which the provider responds.
                    warn!(symbol = %symbol, error = %e, "price refresh failed, keeping stale price");
                }
            }
        }

        if wants_like {
            self.store.add_like(&symbol, identity).await?;
        }

        // Always the current like-set size after any mutation in this call,
        // so a retried like from the same identity still reads back as 1.
        let likes = self.store.likes(&symbol).await?;

        Ok(EquityView {
            stock: symbol,
            price,
            likes,
        })
    }
}

fn normalize_symbol(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!("{raw:?}")));
    }
    Ok(trimmed.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Returns a fixed price and counts calls.
    struct FixedProvider {
        price: Mutex<String>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(price: &str) -> Arc<Self> {
            Arc::new(Self {
                price: Mutex::new(price.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn set_price(&self, price: &str) {
            *self.price.lock().unwrap() = price.to_string();
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteProvider for FixedProvider {
        async fn fetch_price(&self, _symbol: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.price.lock().unwrap().clone())
        }
    }

    /// Succeeds for the first `succeed_for` calls, then fails.
    struct FlakyProvider {
        price: String,
        succeed_for: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteProvider for FlakyProvider {
        async fn fetch_price(&self, _symbol: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.succeed_for {
                Ok(self.price.clone())
            } else {
                Err(AppError::PriceLookup("provider offline".to_string()))
            }
        }
    }

    async fn open_store() -> (tempfile::TempDir, EquityStore) {
        let dir = tempdir().unwrap();
        let store = EquityStore::open(&dir.path().join("test.db")).await.unwrap();
        (dir, store)
    }

    fn single(data: StockData) -> EquityView {
        match data {
            StockData::Single(view) => view,
            StockData::Pair(_) => panic!("expected single-symbol output"),
        }
    }

    fn pair(data: StockData) -> [RelEquityView; 2] {
        match data {
            StockData::Pair(views) => views,
            StockData::Single(_) => panic!("expected two-symbol output"),
        }
    }

    #[tokio::test]
    async fn first_request_creates_record_with_zero_likes() {
        let (_dir, store) = open_store().await;
        let provider = FixedProvider::new("786.90");
        let resolver = EquityResolver::new(store, provider, Duration::from_secs(60));

        let out = resolver
            .resolve(&["goog".to_string()], false, "1.2.3.4")
            .await
            .unwrap();

        let view = single(out);
        assert_eq!(view.stock, "GOOG");
        assert_eq!(view.price, "786.90");
        assert_eq!(view.likes, 0);
    }

    #[tokio::test]
    async fn first_request_with_like_seeds_one() {
        let (_dir, store) = open_store().await;
        let provider = FixedProvider::new("786.90");
        let resolver = EquityResolver::new(store, provider, Duration::from_secs(60));

        let out = resolver
            .resolve(&["goog".to_string()], true, "1.2.3.4")
            .await
            .unwrap();

        assert_eq!(single(out).likes, 1);
    }

    #[tokio::test]
    async fn repeated_like_from_same_identity_counts_once() {
        let (_dir, store) = open_store().await;
        let provider = FixedProvider::new("786.90");
        let resolver = EquityResolver::new(store, provider, Duration::from_secs(60));

        let symbols = vec!["goog".to_string()];
        resolver.resolve(&symbols, true, "1.2.3.4").await.unwrap();
        let second = resolver.resolve(&symbols, true, "1.2.3.4").await.unwrap();
        assert_eq!(single(second).likes, 1);

        let third = resolver.resolve(&symbols, true, "5.6.7.8").await.unwrap();
        assert_eq!(single(third).likes, 2);
    }

    #[tokio::test]
    async fn symbols_are_case_insensitive() {
        let (_dir, store) = open_store().await;
        let provider = FixedProvider::new("786.90");
        let resolver = EquityResolver::new(store.clone(), provider.clone(), Duration::from_secs(60));

        resolver
            .resolve(&["goog".to_string()], false, "1.2.3.4")
            .await
            .unwrap();
        resolver
            .resolve(&["GOOG".to_string()], false, "1.2.3.4")
            .await
            .unwrap();

        // Same record, so the second request never hits the provider.
        assert_eq!(provider.calls(), 1);
        assert_eq!(store.equity_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fresh_record_skips_the_provider() {
        let (_dir, store) = open_store().await;
        let provider = FixedProvider::new("786.90");
        let resolver = EquityResolver::new(store, provider.clone(), Duration::from_secs(60));

        let symbols = vec!["goog".to_string()];
        resolver.resolve(&symbols, false, "1.2.3.4").await.unwrap();
        resolver.resolve(&symbols, false, "1.2.3.4").await.unwrap();

        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn stale_record_gets_a_fresh_price() {
        let (_dir, store) = open_store().await;
        let provider = FixedProvider::new("786.90");
        // Zero threshold: every subsequent read sees the record as stale.
        let resolver = EquityResolver::new(store, provider.clone(), Duration::ZERO);

        let symbols = vec!["goog".to_string()];
        resolver.resolve(&symbols, false, "1.2.3.4").await.unwrap();

        provider.set_price("790.00");
        let second = resolver.resolve(&symbols, false, "1.2.3.4").await.unwrap();

        assert_eq!(single(second).price, "790.00");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_price_and_still_registers_like() {
        let (_dir, store) = open_store().await;
        let provider = Arc::new(FlakyProvider {
            price: "786.90".to_string(),
            succeed_for: 1,
            calls: AtomicUsize::new(0),
        });
        let resolver = EquityResolver::new(store, provider, Duration::ZERO);

        let symbols = vec!["goog".to_string()];
        resolver.resolve(&symbols, false, "1.2.3.4").await.unwrap();

        let second = resolver.resolve(&symbols, true, "1.2.3.4").await.unwrap();
        let view = single(second);
        assert_eq!(view.price, "786.90");
        assert_eq!(view.likes, 1);
    }

    #[tokio::test]
    async fn pair_reports_antisymmetric_rel_likes() {
        let (_dir, store) = open_store().await;
        let provider = FixedProvider::new("786.90");
        let resolver = EquityResolver::new(store, provider, Duration::from_secs(60));

        // GOOG starts with one like, AMZN with none.
        resolver
            .resolve(&["goog".to_string()], true, "1.2.3.4")
            .await
            .unwrap();

        let pair_symbols = vec!["goog".to_string(), "amzn".to_string()];
        let out = resolver.resolve(&pair_symbols, false, "5.6.7.8").await.unwrap();
        let [goog, amzn] = pair(out);
        assert_eq!(goog.stock, "GOOG");
        assert_eq!(goog.rel_likes, 1);
        assert_eq!(amzn.stock, "AMZN");
        assert_eq!(amzn.rel_likes, -1);

        // Liking both from the identity that already liked GOOG levels the
        // counts: the GOOG like is a no-op, AMZN catches up to 1.
        let out = resolver.resolve(&pair_symbols, true, "1.2.3.4").await.unwrap();
        let [goog, amzn] = pair(out);
        assert_eq!(goog.rel_likes, 0);
        assert_eq!(amzn.rel_likes, 0);
    }

    #[tokio::test]
    async fn pair_fails_whole_when_one_symbol_fails() {
        let (_dir, store) = open_store().await;
        let provider = Arc::new(FlakyProvider {
            price: "786.90".to_string(),
            succeed_for: 1,
            calls: AtomicUsize::new(0),
        });
        let resolver = EquityResolver::new(store, provider, Duration::from_secs(60));

        let err = resolver
            .resolve(&["goog".to_string(), "amzn".to_string()], false, "1.2.3.4")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PriceLookup(_)));
    }

    #[tokio::test]
    async fn rejects_bad_symbol_and_bad_counts() {
        let (_dir, store) = open_store().await;
        let provider = FixedProvider::new("786.90");
        let resolver = EquityResolver::new(store, provider, Duration::from_secs(60));

        let err = resolver
            .resolve(&["123".to_string()], false, "1.2.3.4")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = resolver.resolve(&[], false, "1.2.3.4").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let three: Vec<String> = ["goog", "amzn", "msft"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = resolver.resolve(&three, false, "1.2.3.4").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
