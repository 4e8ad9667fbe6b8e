//! Terminal dashboard backed by the HTTP service.
//!
//! Fetches run as spawned tasks that report back over a channel as
//! [`Action`]s; every state change goes through [`state::reduce`].

pub mod client;
pub mod command;
pub mod state;
pub mod view;

use crate::cli::ui;
use crate::core::period::Period;
use crate::core::symbols::normalize_ticker;
use anyhow::{Context, Result};
use client::ApiClient;
use command::{Command, HELP, Selection};
use state::{Action, RequestSequence, StatementKind, ViewState, reduce};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub struct Dashboard {
    client: ApiClient,
    state: ViewState,
    sequence: RequestSequence,
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Action>,
}

impl Dashboard {
    pub fn new(client: ApiClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Dashboard {
            client,
            state: ViewState::default(),
            sequence: RequestSequence::default(),
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    fn dispatch(&mut self, action: Action) {
        debug!(?action, "Dispatching");
        self.state = reduce(std::mem::take(&mut self.state), action);
    }

    /// Fetches the symbol list and starts loading the first symbol.
    pub async fn load(&mut self) -> Result<()> {
        let symbols = self
            .client
            .list_symbols()
            .await
            .context("Failed to load the symbol list")?;
        self.dispatch(Action::SymbolsLoaded(symbols));
        self.request_stock();
        Ok(())
    }

    pub fn select_symbol(&mut self, symbol: &str) {
        self.dispatch(Action::SelectSymbol(symbol.to_string()));
        self.request_stock();
    }

    pub fn select_period(&mut self, period: Period) {
        self.dispatch(Action::SelectPeriod(period));
        self.request_stock();
    }

    pub fn show_statement(&mut self, statement: StatementKind) {
        self.dispatch(Action::ShowStatement(statement));
        if self.state.financials.is_none() && !self.state.is_fetching_financials() {
            self.request_financials();
        }
    }

    fn request_stock(&mut self) {
        let Some(symbol) = self.state.selected.clone() else {
            return;
        };
        let id = self.sequence.next_id();
        self.dispatch(Action::StockRequested(id));

        let client = self.client.clone();
        let tx = self.tx.clone();
        let period = self.state.period;
        tokio::spawn(async move {
            let action = match client.fetch_stock(&symbol, period).await {
                Ok(stock) => Action::StockLoaded(id, stock),
                Err(e) => {
                    error!(%symbol, error = %e, "Failed to load stock");
                    Action::StockFailed(id)
                }
            };
            let _ = tx.send(action);
        });
    }

    fn request_financials(&mut self) {
        let Some(symbol) = self.state.selected.clone() else {
            return;
        };
        let id = self.sequence.next_id();
        self.dispatch(Action::FinancialsRequested(id));

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let action = match client.fetch_financials(&symbol).await {
                Ok(financials) => Action::FinancialsLoaded(id, financials),
                Err(e) => {
                    error!(%symbol, error = %e, "Failed to load financials");
                    Action::FinancialsFailed(id)
                }
            };
            let _ = tx.send(action);
        });
    }

    /// Applies fetch results until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.state.loading || self.state.is_fetching_financials() {
            match self.rx.recv().await {
                Some(action) => self.dispatch(action),
                None => break,
            }
        }
    }

    pub fn render(&self) -> String {
        view::render(&self.state, ui::term_width().saturating_sub(2))
    }

    /// Applies one prompt command. Returns `false` when the user quits.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::List => println!("{}", view::render_symbols(&self.state)),
            Command::Search(text) => {
                self.dispatch(Action::SetSearch(text));
                println!("{}", view::render_symbols(&self.state));
            }
            Command::Select(selection) => match self.resolve(selection) {
                Ok(symbol) => self.select_symbol(&symbol),
                Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
            },
            Command::Period(period) => self.select_period(period),
            Command::Financials(statement) => {
                let statement = statement.unwrap_or(self.state.statement);
                self.show_statement(statement);
                println!("{}", self.render());
            }
            Command::Hide => {
                self.dispatch(Action::HideFinancials);
                println!("{}", self.render());
            }
            Command::Show => println!("{}", self.render()),
            Command::Help => println!("{HELP}"),
            Command::Quit => return false,
        }
        true
    }

    fn resolve(&self, selection: Selection) -> Result<String> {
        match selection {
            Selection::Position(position) => self
                .state
                .filtered_symbols()
                .get(position.wrapping_sub(1))
                .map(|s| s.value.clone())
                .with_context(|| format!("No symbol at position {position}")),
            Selection::Ticker(ticker) => Ok(normalize_ticker(&ticker)?),
        }
    }

    /// Reads commands from stdin and redraws as results arrive.
    pub async fn run_interactive(mut self) -> Result<()> {
        self.load().await?;
        println!("{HELP}\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read input")? else {
                        break;
                    };
                    match Command::parse(&line) {
                        Ok(command) => {
                            if !self.handle(command) {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(input = %line, "Rejected command");
                            println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
                        }
                    }
                }
                Some(action) = self.rx.recv() => {
                    self.dispatch(action);
                    if !self.state.loading {
                        ui::print_separator();
                        println!("{}", self.render());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Renders a single dashboard snapshot without prompting.
pub async fn render_snapshot(
    client: ApiClient,
    symbol: Option<&str>,
    period: Period,
    statement: Option<StatementKind>,
) -> Result<String> {
    let mut dashboard = Dashboard::new(client);
    dashboard.load().await?;
    dashboard.settle().await;

    if let Some(symbol) = symbol {
        dashboard.select_symbol(&normalize_ticker(symbol)?);
    }
    if period != dashboard.state.period {
        dashboard.select_period(period);
    }
    if let Some(statement) = statement {
        dashboard.show_statement(statement);
    }
    dashboard.settle().await;

    Ok(dashboard.render())
}
