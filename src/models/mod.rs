mod equity;

pub use equity::{EquityRecord, EquityView, RelEquityView, StockData, StockResponse};
