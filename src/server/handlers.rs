use crate::core::error::ProviderError;
use crate::core::period::{Frequency, Interval, Period};
use crate::core::symbols::normalize_ticker;
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::server::models::{FinancialsQuery, HealthStatus, StockQuery, StockResponse};
use actix_web::{HttpResponse, Responder, get, web};
use tracing::{error, info, warn};

fn log_provider_error(e: &ProviderError) {
    match e {
        ProviderError::NotFound(_) => warn!(error = %e, "Symbol not found"),
        ProviderError::Rejected { .. } => warn!(error = %e, "Provider rejected request"),
        ProviderError::Upstream { .. } => error!(error = %e, "Error serving request"),
    }
}

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthStatus {
        status: "ok".to_string(),
    })
}

#[get("/api/stocks")]
pub async fn list_stocks(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(&state.symbols)
}

#[get("/api/stock/{symbol}")]
pub async fn get_stock(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<StockQuery>,
) -> Result<HttpResponse, ApiError> {
    let symbol = normalize_ticker(&path)?;
    let period = query
        .period
        .as_deref()
        .map(str::parse::<Period>)
        .transpose()?
        .unwrap_or_default();
    let interval = query
        .interval
        .as_deref()
        .map(str::parse::<Interval>)
        .transpose()?
        .unwrap_or_default();

    info!(%symbol, %period, %interval, "Fetching stock data");
    let data = state
        .provider
        .fetch_stock(&symbol, period, interval)
        .await
        .inspect_err(log_provider_error)?;

    Ok(HttpResponse::Ok().json(StockResponse::from(data)))
}

#[get("/api/stock/{symbol}/financials")]
pub async fn get_financials(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<FinancialsQuery>,
) -> Result<HttpResponse, ApiError> {
    let symbol = normalize_ticker(&path)?;
    let frequency = query
        .freq
        .as_deref()
        .map(str::parse::<Frequency>)
        .transpose()?
        .unwrap_or_default();

    info!(%symbol, %frequency, "Fetching financials");
    let financials = state
        .provider
        .fetch_financials(&symbol, frequency)
        .await
        .inspect_err(log_provider_error)?;

    Ok(HttpResponse::Ok().json(financials))
}
