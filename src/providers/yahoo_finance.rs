use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::core::error::ProviderError;
use crate::core::market::{
    FinancialStatement, Financials, HistoryPoint, MarketDataProvider, QuoteSnapshot, StockData,
};
use crate::core::period::{DateRange, Frequency, Interval, Period};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; nsedash/0.1)";

// Earliest timestamp the fundamentals endpoint accepts as a window start.
const FUNDAMENTALS_START: i64 = 493_590_046;

const INCOME_STATEMENT_ITEMS: &[&str] = &[
    "TotalRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingExpense",
    "OperatingIncome",
    "EBITDA",
    "EBIT",
    "InterestExpense",
    "PretaxIncome",
    "TaxProvision",
    "NetIncome",
    "NetIncomeCommonStockholders",
    "BasicEPS",
    "DilutedEPS",
    "BasicAverageShares",
    "DilutedAverageShares",
];

const BALANCE_SHEET_ITEMS: &[&str] = &[
    "TotalAssets",
    "CurrentAssets",
    "CashAndCashEquivalents",
    "Inventory",
    "AccountsReceivable",
    "NetPPE",
    "Goodwill",
    "TotalLiabilitiesNetMinorityInterest",
    "CurrentLiabilities",
    "LongTermDebt",
    "TotalDebt",
    "StockholdersEquity",
    "RetainedEarnings",
    "WorkingCapital",
    "OrdinarySharesNumber",
];

const CASH_FLOW_ITEMS: &[&str] = &[
    "OperatingCashFlow",
    "InvestingCashFlow",
    "FinancingCashFlow",
    "FreeCashFlow",
    "CapitalExpenditure",
    "RepurchaseOfCapitalStock",
    "CashDividendsPaid",
    "ChangesInCash",
    "EndCashPosition",
];

/// Market data from the public Yahoo Finance endpoints.
///
/// quoteSummary needs a crumb bound to a session cookie. The crumb is fetched
/// on first use and kept until Yahoo rejects it.
pub struct YahooFinanceProvider {
    base_url: Url,
    session_url: Url,
    client: reqwest::Client,
    crumb: Mutex<Option<String>>,
}

/// Which slice of history a chart request asks for.
#[derive(Debug, Clone, Copy)]
enum ChartWindow {
    Period(Period),
    Range(DateRange),
}

fn parse_base_url(url: &str) -> anyhow::Result<Url> {
    let parsed =
        Url::parse(url).with_context(|| format!("Invalid Yahoo Finance base URL: {url}"))?;
    if parsed.cannot_be_a_base() {
        anyhow::bail!("Invalid Yahoo Finance base URL: {url}");
    }
    Ok(parsed)
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let parsed = parse_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(YahooFinanceProvider {
            session_url: parsed.clone(),
            base_url: parsed,
            client,
            crumb: Mutex::new(None),
        })
    }

    /// Page requested once to pick up the session cookie. Defaults to the base URL.
    pub fn with_session_url(mut self, session_url: &str) -> anyhow::Result<Self> {
        self.session_url = Url::parse(session_url)
            .with_context(|| format!("Invalid Yahoo session URL: {session_url}"))?;
        Ok(self)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, symbol: &str, url: Url) -> Result<reqwest::Response, ProviderError> {
        debug!("Requesting Yahoo data from {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::upstream(symbol, format!("Request timed out: {url}"))
            } else {
                ProviderError::upstream(symbol, format!("Request error: {e}"))
            }
        })?;
        debug!(status = %response.status(), "Received Yahoo response");
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        symbol: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        check_status(symbol, response.status())?;
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::upstream(symbol, format!("Failed to read response: {e}")))?;
        serde_json::from_str(&text).map_err(|e| {
            ProviderError::upstream(symbol, format!("Failed to parse JSON response: {e}"))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, symbol: &str, url: Url) -> Result<T, ProviderError> {
        let response = self.send(symbol, url).await?;
        self.read_json(symbol, response).await
    }

    async fn crumb(&self, symbol: &str) -> Result<String, ProviderError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the cookie matters here, the session page itself may answer 404
        match self.client.get(self.session_url.clone()).send().await {
            Ok(response) => debug!(status = %response.status(), "Yahoo session page fetched"),
            Err(e) => debug!(error = %e, "Yahoo session page unavailable"),
        }

        let response = self
            .send(symbol, self.endpoint(&["v1", "test", "getcrumb"]))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::upstream(
                symbol,
                format!("Crumb request failed: {status}"),
            ));
        }
        let crumb = response
            .text()
            .await
            .map_err(|e| ProviderError::upstream(symbol, format!("Failed to read crumb: {e}")))?
            .trim()
            .to_string();
        if crumb.is_empty() {
            return Err(ProviderError::upstream(symbol, "Empty crumb"));
        }

        debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        window: ChartWindow,
        interval: Interval,
    ) -> Result<ChartItem, ProviderError> {
        let mut url = self.endpoint(&["v8", "finance", "chart", symbol]);
        {
            let mut query = url.query_pairs_mut();
            match window {
                ChartWindow::Period(period) => {
                    query.append_pair("range", period.as_str());
                }
                ChartWindow::Range(range) => {
                    query
                        .append_pair("period1", &midnight_timestamp(range.start).to_string())
                        .append_pair("period2", &midnight_timestamp(range.end).to_string());
                }
            }
            query
                .append_pair("interval", interval.as_str())
                .append_pair("includePrePost", "false")
                .append_pair("events", "div,split");
        }

        let data: YahooChartResponse = self.get_json(symbol, url).await?;
        if let Some(error) = data.chart.error {
            return Err(error.into_provider_error(symbol));
        }
        data.chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<Option<AssetProfile>, ProviderError> {
        let crumb = self.crumb(symbol).await?;
        let mut url = self.endpoint(&["v10", "finance", "quoteSummary", symbol]);
        url.query_pairs_mut()
            .append_pair("modules", "assetProfile")
            .append_pair("crumb", &crumb);

        let response = self.send(symbol, url).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.crumb.lock().await.take();
            return Err(ProviderError::upstream(symbol, "Crumb rejected, session reset"));
        }

        let data: QuoteSummaryResponse = self.read_json(symbol, response).await?;
        if let Some(error) = data.quote_summary.error {
            return Err(error.into_provider_error(symbol));
        }
        Ok(data
            .quote_summary
            .result
            .and_then(|items| items.into_iter().next())
            .and_then(|item| item.asset_profile))
    }

    async fn fetch_statement(
        &self,
        symbol: &str,
        frequency: Frequency,
        items: &[&str],
    ) -> Result<FinancialStatement, ProviderError> {
        let prefix = frequency.series_prefix();
        let types = items
            .iter()
            .map(|item| format!("{prefix}{item}"))
            .collect::<Vec<_>>()
            .join(",");

        let mut url = self.endpoint(&[
            "ws",
            "fundamentals-timeseries",
            "v1",
            "finance",
            "timeseries",
            symbol,
        ]);
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("type", &types)
            .append_pair("period1", &FUNDAMENTALS_START.to_string())
            .append_pair("period2", &Utc::now().timestamp().to_string());

        let data: TimeseriesResponse = self.get_json(symbol, url).await?;
        if let Some(error) = data.timeseries.error {
            return Err(error.into_provider_error(symbol));
        }
        Ok(parse_statement(
            data.timeseries.result.unwrap_or_default(),
            prefix,
        ))
    }
}

fn check_status(symbol: &str, status: StatusCode) -> Result<(), ProviderError> {
    match status {
        StatusCode::NOT_FOUND => Err(ProviderError::NotFound(symbol.to_string())),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Err(
            ProviderError::rejected(symbol, format!("HTTP error: {status}")),
        ),
        s if !s.is_success() => Err(ProviderError::upstream(
            symbol,
            format!("HTTP error: {status}"),
        )),
        _ => Ok(()),
    }
}

#[derive(Deserialize, Debug)]
struct YahooApiError {
    code: String,
    description: Option<String>,
}

impl YahooApiError {
    fn into_provider_error(self, symbol: &str) -> ProviderError {
        let detail = self.description.unwrap_or_default();
        match self.code.to_ascii_lowercase().as_str() {
            "not found" => ProviderError::NotFound(symbol.to_string()),
            "unprocessable entity" | "bad request" => ProviderError::rejected(symbol, detail),
            _ => ProviderError::upstream(symbol, format!("{}: {}", self.code, detail)),
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartEnvelope,
}

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    result: Option<Vec<ChartItem>>,
    error: Option<YahooApiError>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    short_name: Option<String>,
    long_name: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    previous_close: Option<f64>,
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

impl ChartMeta {
    fn to_snapshot(&self) -> QuoteSnapshot {
        QuoteSnapshot {
            short_name: self.short_name.clone(),
            long_name: self.long_name.clone(),
            currency: self.currency.clone(),
            current_price: self.regular_market_price,
            previous_close: self.previous_close,
            day_high: self.regular_market_day_high,
            day_low: self.regular_market_day_low,
            fifty_two_week_high: self.fifty_two_week_high,
            fifty_two_week_low: self.fifty_two_week_low,
            sector: None,
            industry: None,
        }
    }
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<QuoteBars>,
}

#[derive(Deserialize, Debug)]
struct QuoteBars {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

fn value_at(series: &Option<Vec<Option<f64>>>, index: usize) -> Option<f64> {
    series.as_ref()?.get(index).copied().flatten()
}

/// Turns the column-oriented chart payload into bars in exchange local time,
/// ascending, one per timestamp. Daily or coarser bars are one per calendar
/// date and dated at midnight.
fn build_history(item: &ChartItem, interval: Interval) -> Vec<HistoryPoint> {
    let (Some(timestamps), Some(bars)) = (
        item.timestamp.as_ref(),
        item.indicators.as_ref().and_then(|inds| inds.quote.first()),
    ) else {
        return Vec::new();
    };
    let offset = item.meta.gmtoffset.unwrap_or(0);

    let mut points: Vec<HistoryPoint> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            Some(HistoryPoint {
                date: DateTime::from_timestamp(ts + offset, 0)?.naive_utc(),
                open: value_at(&bars.open, i)?,
                high: value_at(&bars.high, i)?,
                low: value_at(&bars.low, i)?,
                close: value_at(&bars.close, i)?,
                volume: value_at(&bars.volume, i).unwrap_or(0.0) as u64,
            })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    // The live session can show up as an extra bar on the last trading date
    points.reverse();
    if interval.is_daily_or_coarser() {
        points.dedup_by_key(|p| p.date.date());
        for point in &mut points {
            point.date = point.date.date().and_time(NaiveTime::MIN);
        }
    } else {
        points.dedup_by_key(|p| p.date);
    }
    points.reverse();
    points
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryEnvelope,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryEnvelope {
    result: Option<Vec<QuoteSummaryItem>>,
    error: Option<YahooApiError>,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryItem {
    #[serde(rename = "assetProfile")]
    asset_profile: Option<AssetProfile>,
}

#[derive(Deserialize, Debug)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TimeseriesResponse {
    timeseries: TimeseriesEnvelope,
}

#[derive(Deserialize, Debug)]
struct TimeseriesEnvelope {
    result: Option<Vec<TimeseriesItem>>,
    error: Option<YahooApiError>,
}

/// One requested series. The values sit under a key named after the series
/// type, next to `meta` and `timestamp`.
#[derive(Deserialize, Debug)]
struct TimeseriesItem {
    meta: TimeseriesMeta,
    #[serde(flatten)]
    series: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct TimeseriesMeta {
    #[serde(rename = "type", default)]
    kind: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ReportedPoint {
    as_of_date: NaiveDate,
    reported_value: Option<ReportedValue>,
}

#[derive(Deserialize, Debug)]
struct ReportedValue {
    raw: f64,
}

fn parse_statement(items: Vec<TimeseriesItem>, prefix: &str) -> FinancialStatement {
    let mut statement = FinancialStatement::default();

    for mut item in items {
        let Some(kind) = item.meta.kind.first().cloned() else {
            continue;
        };
        let Some(values) = item.series.remove(&kind) else {
            continue;
        };
        let points: Vec<Option<ReportedPoint>> = match serde_json::from_value(values) {
            Ok(points) => points,
            Err(e) => {
                warn!(series = %kind, error = %e, "Skipping unreadable fundamentals series");
                continue;
            }
        };

        let row: BTreeMap<NaiveDate, Option<f64>> = points
            .into_iter()
            .flatten()
            .map(|p| (p.as_of_date, p.reported_value.map(|v| v.raw)))
            .collect();
        if row.is_empty() {
            continue;
        }

        let name = kind.strip_prefix(prefix).unwrap_or(&kind).to_string();
        statement.rows.insert(name, row);
    }

    statement
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooStockFetch",
        skip(self),
        fields(symbol = %symbol, period = %period, interval = %interval)
    )]
    async fn fetch_stock(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<StockData, ProviderError> {
        let (chart, profile) = futures::join!(
            self.fetch_chart(symbol, ChartWindow::Period(period), interval),
            self.fetch_profile(symbol)
        );

        let item = chart?;
        let history = build_history(&item, interval);
        if history.is_empty() {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }

        let mut quote = item.meta.to_snapshot();
        match profile {
            Ok(Some(profile)) => {
                quote.sector = profile.sector;
                quote.industry = profile.industry;
            }
            Ok(None) => debug!("No asset profile returned"),
            Err(e) => warn!(error = %e, "Asset profile unavailable, sector left empty"),
        }

        Ok(StockData {
            symbol: symbol.to_string(),
            quote,
            history,
        })
    }

    #[instrument(
        name = "YahooRangeFetch",
        skip(self),
        fields(symbol = %symbol, range = %range, interval = %interval)
    )]
    async fn fetch_history_between(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<StockData, ProviderError> {
        let item = self
            .fetch_chart(symbol, ChartWindow::Range(range), interval)
            .await?;
        let history = build_history(&item, interval);
        if history.is_empty() {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }

        Ok(StockData {
            symbol: symbol.to_string(),
            quote: item.meta.to_snapshot(),
            history,
        })
    }

    #[instrument(
        name = "YahooFinancialsFetch",
        skip(self),
        fields(symbol = %symbol, frequency = %frequency)
    )]
    async fn fetch_financials(
        &self,
        symbol: &str,
        frequency: Frequency,
    ) -> Result<Financials, ProviderError> {
        let (income_statement, balance_sheet, cash_flow) = futures::try_join!(
            self.fetch_statement(symbol, frequency, INCOME_STATEMENT_ITEMS),
            self.fetch_statement(symbol, frequency, BALANCE_SHEET_ITEMS),
            self.fetch_statement(symbol, frequency, CASH_FLOW_ITEMS),
        )?;

        let financials = Financials {
            income_statement,
            balance_sheet,
            cash_flow,
        };
        if financials.is_empty() {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }
        Ok(financials)
    }
}
