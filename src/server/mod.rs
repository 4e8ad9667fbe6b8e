//! Read-only JSON service over a market data provider

pub mod error;
pub mod handlers;
pub mod models;

use crate::core::market::{MarketDataProvider, Symbol};
use actix_web::{App, HttpServer, middleware, web};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Shared by every request. Nothing in here is mutated after startup.
pub struct AppState {
    pub provider: Arc<dyn MarketDataProvider>,
    pub symbols: Vec<Symbol>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::health_check)
        .service(handlers::list_stocks)
        .service(handlers::get_stock)
        .service(handlers::get_financials);
}

pub async fn run_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let data = web::Data::new(state);
    info!("Starting NSE dashboard service at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(middleware::DefaultHeaders::new().add(("Access-Control-Allow-Origin", "*")))
            .app_data(data.clone())
            .configure(configure)
    })
    .bind((host, port))
    .with_context(|| format!("Failed to bind {host}:{port}"))?
    .run()
    .await
    .context("Server terminated with an error")
}
