use chrono::{DateTime, Utc};
use serde::Serialize;

/// One record per distinct ticker symbol. The symbol is the unique key and
/// is uppercase-normalized before it reaches the store. `likes` is derived
/// from the like set at read time, never stored on the row.
#[derive(Debug, Clone)]
pub struct EquityRecord {
    pub symbol: String,
    /// Decimal price kept as a string with exactly the precision the quote
    /// provider returned.
    pub price: String,
    pub updated_at: DateTime<Utc>,
    pub likes: u64,
}

/// Single-symbol response view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityView {
    pub stock: String,
    pub price: String,
    pub likes: u64,
}

/// Two-symbol response view: `likes` replaced by the signed difference
/// against the other side of the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelEquityView {
    pub stock: String,
    pub price: String,
    pub rel_likes: i64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StockData {
    Single(EquityView),
    Pair([RelEquityView; 2]),
}

/// Envelope for GET /api/stock-prices.
#[derive(Debug, Serialize)]
pub struct StockResponse {
    #[serde(rename = "stockData")]
    pub stock_data: StockData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_response_serializes_as_object() {
        let response = StockResponse {
            stock_data: StockData::Single(EquityView {
                stock: "GOOG".to_string(),
                price: "786.90".to_string(),
                likes: 0,
            }),
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"stockData": {"stock": "GOOG", "price": "786.90", "likes": 0}})
        );
    }

    #[test]
    fn pair_response_serializes_as_array_with_rel_likes() {
        let response = StockResponse {
            stock_data: StockData::Pair([
                RelEquityView {
                    stock: "GOOG".to_string(),
                    price: "786.90".to_string(),
                    rel_likes: 1,
                },
                RelEquityView {
                    stock: "AMZN".to_string(),
                    price: "3112.46".to_string(),
                    rel_likes: -1,
                },
            ]),
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"stockData": [
                {"stock": "GOOG", "price": "786.90", "rel_likes": 1},
                {"stock": "AMZN", "price": "3112.46", "rel_likes": -1}
            ]})
        );
    }
}
