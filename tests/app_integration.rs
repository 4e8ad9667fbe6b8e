use actix_web::{App, HttpServer, test, web};
use nsedash::core::config::AppConfig;
use nsedash::core::period::Period;
use nsedash::dashboard::client::ApiClient;
use nsedash::providers::YahooFinanceProvider;
use nsedash::server::{AppState, configure};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const CHART_RESPONSE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "currency": "INR",
                    "symbol": "RELIANCE.NS",
                    "shortName": "RELIANCE INDUSTRIES LTD",
                    "longName": "Reliance Industries Limited",
                    "regularMarketPrice": 2990.0,
                    "gmtoffset": 19800
                },
                "timestamp": [1711511100, 1711424700, 1711597500, 1711620000],
                "indicators": {
                    "quote": [{
                        "open":   [2940.0, 2890.0, 2955.0, 2955.0],
                        "high":   [2960.0, 2910.0, 2985.0, 3001.0],
                        "low":    [2930.0, 2880.0, 2950.0, 2960.0],
                        "close":  [2950.5, 2900.0, 2980.0, 2990.0],
                        "volume": [5100000, 4800000, 100000, 6200000]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    pub const PROFILE_RESPONSE: &str = r#"{
        "quoteSummary": {
            "result": [{"assetProfile": {"sector": "Energy", "industry": "Oil & Gas"}}],
            "error": null
        }
    }"#;

    pub async fn create_yahoo_mock() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/RELIANCE.NS"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHART_RESPONSE))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string("crumb123"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/RELIANCE.NS"))
            .and(query_param("crumb", "crumb123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE_RESPONSE))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/ZZZZZZ.NS"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
            ))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn app_state(base_url: &str, config: &AppConfig) -> web::Data<AppState> {
    let provider = YahooFinanceProvider::new(base_url, Duration::from_secs(5))
        .and_then(|p| p.with_session_url(&format!("{base_url}/")))
        .expect("provider should build");
    web::Data::new(AppState {
        provider: Arc::new(provider),
        symbols: config.curated_symbols(),
    })
}

#[test_log::test(actix_rt::test)]
async fn test_stock_endpoint_over_mocked_yahoo() {
    let yahoo = test_utils::create_yahoo_mock().await;
    let app = test::init_service(
        App::new()
            .app_data(app_state(&yahoo.uri(), &AppConfig::default()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/stock/reliance.ns?period=1y")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    info!(?body, "Stock response");
    assert_eq!(body["symbol"], "RELIANCE.NS");
    assert_eq!(body["info"]["sector"], "Energy");
    assert_eq!(body["info"]["currency"], "INR");
    assert_eq!(body["info"]["currentPrice"], 2990.0);
    assert_eq!(body["info"]["previousClose"], 2950.5);

    let dates: Vec<&str> = body["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["date"].as_str().unwrap())
        .collect();
    let mut sorted = dates.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(dates, sorted);
    assert_eq!(dates.len(), 3);
    assert!(dates.iter().all(|d| d.ends_with("00:00:00")));
}

#[test_log::test(actix_rt::test)]
async fn test_unknown_ticker_is_404() {
    let yahoo = test_utils::create_yahoo_mock().await;
    let app = test::init_service(
        App::new()
            .app_data(app_state(&yahoo.uri(), &AppConfig::default()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/stock/ZZZZZZ.NS")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No data found for symbol: ZZZZZZ.NS");
}

#[test_log::test(actix_rt::test)]
async fn test_invalid_period_is_400() {
    let yahoo = test_utils::create_yahoo_mock().await;
    let app = test::init_service(
        App::new()
            .app_data(app_state(&yahoo.uri(), &AppConfig::default()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/stock/RELIANCE.NS?period=7y")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[test_log::test(actix_rt::test)]
async fn test_configured_symbols_are_unique() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        r#"
symbols:
  - label: "Reliance"
    value: "RELIANCE.NS"
  - label: "TCS"
    value: "TCS.NS"
  - label: "Reliance again"
    value: "RELIANCE.NS"
"#,
    )
    .unwrap();
    let config = AppConfig::load_from_path(&config_path).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(app_state("http://127.0.0.1:9", &config))
            .configure(configure),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/stocks").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let values: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, vec!["RELIANCE.NS", "TCS.NS"]);
    assert_eq!(body[0]["label"], "Reliance");
}

#[test_log::test(actix_rt::test)]
async fn test_dashboard_snapshot_against_running_service() {
    let yahoo = test_utils::create_yahoo_mock().await;
    let data = app_state(&yahoo.uri(), &AppConfig::default());

    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());

    let client = ApiClient::new(&format!("http://{addr}")).unwrap();
    let output = nsedash::dashboard::render_snapshot(client, None, Period::OneYear, None)
        .await
        .unwrap();
    info!("{output}");

    assert!(output.contains("RELIANCE.NS (1y)"));
    assert!(output.contains("Reliance Industries Limited"));
    assert!(output.contains("2990.00"));
    assert!(output.contains("Energy"));
}

#[test_log::test(actix_rt::test)]
#[ignore = "requires network access to Yahoo Finance"]
async fn test_real_yahoo_one_year_history() {
    let config = AppConfig::default();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config.yahoo().base_url, &config))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/stock/RELIANCE.NS?period=1y")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;

    let history = body["history"].as_array().unwrap();
    assert!(history.iter().all(|p| p["close"].as_f64().unwrap() > 0.0));

    let parse = |p: &Value| {
        chrono::NaiveDateTime::parse_from_str(p["date"].as_str().unwrap(), "%Y-%m-%d %H:%M:%S")
            .unwrap()
    };
    let span = parse(history.last().unwrap()) - parse(&history[0]);
    info!(days = span.num_days(), points = history.len(), "Real history span");
    let expected = Period::OneYear.to_duration().unwrap().num_days();
    assert!((span.num_days() - expected).abs() <= 30);
}

#[test_log::test(actix_rt::test)]
#[ignore = "requires network access to Yahoo Finance"]
async fn test_real_yahoo_unknown_ticker() {
    let config = AppConfig::default();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&config.yahoo().base_url, &config))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/stock/ZZZZZZ.NS")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
