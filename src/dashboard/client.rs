use crate::core::market::{Financials, Symbol};
use crate::core::period::Period;
use crate::server::models::{ErrorBody, StockResponse};
use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Talks to the dashboard HTTP service.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid service URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid service URL: {base_url}");
        }
        let client = reqwest::Client::builder().user_agent("nsedash/0.1").build()?;
        Ok(ApiClient { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("Requesting {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "no details".to_string());
            return Err(anyhow!("HTTP error: {} ({}) URL: {}", status, detail, url));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }

    pub async fn list_symbols(&self) -> Result<Vec<Symbol>> {
        self.get_json(self.endpoint(&["api", "stocks"])).await
    }

    pub async fn fetch_stock(&self, symbol: &str, period: Period) -> Result<StockResponse> {
        let mut url = self.endpoint(&["api", "stock", symbol]);
        url.query_pairs_mut().append_pair("period", period.as_str());
        self.get_json(url).await
    }

    pub async fn fetch_financials(&self, symbol: &str) -> Result<Financials> {
        self.get_json(self.endpoint(&["api", "stock", symbol, "financials"]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_symbols() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stocks"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"label":"Reliance Industries","value":"RELIANCE.NS"}]"#,
            ))
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(&mock_server.uri()).unwrap();
        let symbols = client.list_symbols().await.unwrap();
        assert_eq!(symbols, vec![Symbol::new("Reliance Industries", "RELIANCE.NS")]);
    }

    #[tokio::test]
    async fn test_fetch_stock_sends_period() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stock/TCS.NS"))
            .and(query_param("period", "3mo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "symbol": "TCS.NS",
                    "info": {
                        "shortName": "TCS", "longName": "Tata Consultancy Services",
                        "currency": "INR", "currentPrice": 3925.0, "previousClose": 3950.0,
                        "sector": "Technology", "industry": null,
                        "dayHigh": null, "dayLow": null,
                        "fiftyTwoWeekHigh": 4200.0, "fiftyTwoWeekLow": 3300.0
                    },
                    "history": [
                        {"date": "2024-04-01 00:00:00", "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 10}
                    ]
                }"#,
            ))
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(&mock_server.uri()).unwrap();
        let stock = client.fetch_stock("TCS.NS", Period::ThreeMonths).await.unwrap();
        assert_eq!(stock.info.sector, "Technology");
        assert_eq!(stock.history.len(), 1);
        assert_eq!(stock.history[0].close, 1.5);
    }

    #[tokio::test]
    async fn test_error_status_carries_service_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stock/ZZZZZZ.NS/financials"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string(r#"{"error":"No data found for symbol: ZZZZZZ.NS"}"#),
            )
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(&mock_server.uri()).unwrap();
        let err = client.fetch_financials("ZZZZZZ.NS").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("No data found for symbol: ZZZZZZ.NS"));
    }
}
