pub mod cli;
pub mod core;
pub mod dashboard;
pub mod providers;
pub mod server;

use crate::core::config::AppConfig;
use crate::cli::analyze::Lookback;
use crate::core::period::{DateRange, Period};
use crate::dashboard::client::ApiClient;
use crate::dashboard::state::StatementKind;
use crate::providers::YahooFinanceProvider;
use crate::server::AppState;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// Run the HTTP service. Arguments override the configured address.
    Serve {
        host: Option<String>,
        port: Option<u16>,
    },
    Dashboard,
    View {
        symbol: Option<String>,
        period: Period,
        statement: Option<StatementKind>,
    },
    /// Rank the curated symbols. Either date bound switches from `period`
    /// to an explicit window.
    Analyze {
        period: Period,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        count: Option<usize>,
    },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

fn yahoo_provider(config: &AppConfig) -> Result<YahooFinanceProvider> {
    let yahoo = config.yahoo();
    YahooFinanceProvider::new(&yahoo.base_url, yahoo.timeout())?
        .with_session_url(yahoo.session_url())
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        AppCommand::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let state = AppState {
                provider: Arc::new(yahoo_provider(&config)?),
                symbols: config.curated_symbols(),
            };
            info!(symbols = state.symbols.len(), "Serving curated symbols");
            server::run_server(state, &host, port).await
        }
        AppCommand::Dashboard => {
            let client = ApiClient::new(&config.dashboard.api_url)?;
            dashboard::Dashboard::new(client).run_interactive().await
        }
        AppCommand::View {
            symbol,
            period,
            statement,
        } => {
            let client = ApiClient::new(&config.dashboard.api_url)?;
            let output =
                dashboard::render_snapshot(client, symbol.as_deref(), period, statement).await?;
            println!("{output}");
            Ok(())
        }
        AppCommand::Analyze {
            period,
            from,
            to,
            count,
        } => {
            let lookback = if from.is_some() || to.is_some() {
                Lookback::Range(DateRange::resolve(from, to, Local::now().date_naive())?)
            } else {
                Lookback::Period(period)
            };
            let provider = yahoo_provider(&config)?;
            let mut symbols = config.curated_symbols();
            if let Some(count) = count {
                symbols.truncate(count);
            }
            cli::analyze::run(&provider, &symbols, lookback).await
        }
    }
}
