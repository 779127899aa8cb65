pub mod equity_store;
pub mod quote;
pub mod resolver;

pub use equity_store::EquityStore;
pub use quote::AlphaVantageClient;
pub use resolver::EquityResolver;
