//! Market data types and the provider abstraction

use crate::core::error::ProviderError;
use crate::core::period::{DateRange, Frequency, Interval, Period};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A tradable instrument as shown in the symbol picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub label: String,
    pub value: String,
}

impl Symbol {
    pub fn new(label: &str, value: &str) -> Self {
        Symbol {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Point-in-time summary fields for a symbol. Every field is optional since
/// the provider omits them freely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSnapshot {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub currency: Option<String>,
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(with = "date_format")]
    pub date: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

mod date_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Quote snapshot plus price history for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct StockData {
    pub symbol: String,
    pub quote: QuoteSnapshot,
    pub history: Vec<HistoryPoint>,
}

/// Line item name to period-end date to reported value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialStatement {
    pub rows: BTreeMap<String, BTreeMap<NaiveDate, Option<f64>>>,
}

impl FinancialStatement {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct period-end dates across all rows, most recent first.
    pub fn period_ends(&self) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> = self
            .rows
            .values()
            .flat_map(|row| row.keys().copied())
            .collect();
        dates.into_iter().rev().collect()
    }
}

/// The three statements returned for a ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub income_statement: FinancialStatement,
    pub balance_sheet: FinancialStatement,
    pub cash_flow: FinancialStatement,
}

impl Financials {
    pub fn is_empty(&self) -> bool {
        self.income_statement.is_empty() && self.balance_sheet.is_empty() && self.cash_flow.is_empty()
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Quote snapshot and history over `period`, ordered by ascending date.
    async fn fetch_stock(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<StockData, ProviderError>;

    /// Price history over an explicit date window. The quote carries only
    /// what comes with the history.
    async fn fetch_history_between(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<StockData, ProviderError>;

    async fn fetch_financials(
        &self,
        symbol: &str,
        frequency: Frequency,
    ) -> Result<Financials, ProviderError>;
}
