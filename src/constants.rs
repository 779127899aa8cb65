use std::time::Duration;

/// A price older than this triggers a refresh attempt on the next read.
pub const STALE_THRESHOLD: Duration = Duration::from_secs(60);

/// Timeout for quote-provider requests; a stalled provider surfaces as a
/// price-lookup failure instead of hanging the request.
pub const QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_DATABASE_PATH: &str = "data/stockpulse.db";

pub const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";
