//! JSON bodies exchanged between the service and the dashboard

use crate::core::market::{HistoryPoint, StockData};
use serde::{Deserialize, Serialize};

const DEFAULT_CURRENCY: &str = "INR";
const UNKNOWN_SECTOR: &str = "Unknown";

/// Quote fields as served, with display fallbacks already applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInfo {
    pub short_name: String,
    pub long_name: String,
    pub currency: String,
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub sector: String,
    pub industry: Option<String>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

impl QuoteInfo {
    pub fn from_stock(data: &StockData) -> Self {
        let quote = &data.quote;
        let last_close = data.history.last().map(|p| p.close);
        let prior_close = data
            .history
            .len()
            .checked_sub(2)
            .and_then(|i| data.history.get(i))
            .map(|p| p.close);

        QuoteInfo {
            short_name: quote
                .short_name
                .clone()
                .unwrap_or_else(|| data.symbol.clone()),
            long_name: quote
                .long_name
                .clone()
                .unwrap_or_else(|| data.symbol.clone()),
            currency: quote
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            current_price: quote.current_price.or(last_close),
            previous_close: quote.previous_close.or(prior_close),
            sector: quote
                .sector
                .clone()
                .unwrap_or_else(|| UNKNOWN_SECTOR.to_string()),
            industry: quote.industry.clone(),
            day_high: quote.day_high,
            day_low: quote.day_low,
            fifty_two_week_high: quote.fifty_two_week_high,
            fifty_two_week_low: quote.fifty_two_week_low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockResponse {
    pub symbol: String,
    pub info: QuoteInfo,
    pub history: Vec<HistoryPoint>,
}

impl From<StockData> for StockResponse {
    fn from(data: StockData) -> Self {
        let info = QuoteInfo::from_stock(&data);
        StockResponse {
            symbol: data.symbol,
            info,
            history: data.history,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub period: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FinancialsQuery {
    pub freq: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}
