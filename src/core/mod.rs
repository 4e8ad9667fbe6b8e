//! Core business logic abstractions

pub mod analytics;
pub mod config;
pub mod error;
pub mod log;
pub mod market;
pub mod period;
pub mod symbols;

// Re-export main types for cleaner imports
pub use error::{ProviderError, ValidationError};
pub use market::{
    Financials, FinancialStatement, HistoryPoint, MarketDataProvider, QuoteSnapshot, StockData,
    Symbol,
};
pub use period::{DateRange, Frequency, Interval, Period};
