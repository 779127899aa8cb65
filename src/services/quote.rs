use crate::constants::QUOTE_TIMEOUT;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Source of the most recent intraday closing price for a ticker symbol.
///
/// Injected into the resolver as a trait object so the service can run
/// against any provider (and tests against a canned one).
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Most recent intraday close as a decimal string, with exactly the
    /// precision the provider returned.
    async fn fetch_price(&self, symbol: &str) -> Result<String>;
}

/// Alpha Vantage TIME_SERIES_INTRADAY client.
#[derive(Debug)]
pub struct AlphaVantageClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AlphaVantageClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "invalid quote provider URL: '{base_url}'"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(QUOTE_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageClient {
    async fn fetch_price(&self, symbol: &str) -> Result<String> {
        debug!(symbol, "fetching intraday quote");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol),
                ("interval", "1min"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::PriceLookup(format!("quote request failed: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::PriceLookup(format!("quote response was not JSON: {e}")))?;

        parse_intraday_close(&body)
    }
}

/// Walks the TIME_SERIES_INTRADAY payload down to the latest 1min close:
/// the bar keyed by "3. Last Refreshed" holds the price in "4. close".
fn parse_intraday_close(body: &Value) -> Result<String> {
    let last_refreshed = body
        .get("Meta Data")
        .and_then(|meta| meta.get("3. Last Refreshed"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::PriceLookup("quote response missing last-refreshed timestamp".to_string())
        })?;

    body.get("Time Series (1min)")
        .and_then(|series| series.get(last_refreshed))
        .and_then(|bar| bar.get("4. close"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::PriceLookup(format!("quote response missing close for {last_refreshed}"))
        })
}
