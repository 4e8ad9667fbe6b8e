//! Dashboard view state and its reducer.
//!
//! `reduce` is pure: it consumes a snapshot and an action and returns the
//! next snapshot. Fetches are tagged with a [`RequestId`]; a response is only
//! applied when its id is the latest one issued for that kind of fetch, so a
//! slow answer for an old selection can never overwrite a newer one.

use crate::core::analytics::{self, PriceChange};
use crate::core::market::{FinancialStatement, Financials, Symbol};
use crate::core::period::Period;
use crate::server::models::StockResponse;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(u64);

/// Issues strictly increasing request ids.
#[derive(Debug, Default)]
pub struct RequestSequence {
    last: u64,
}

impl RequestSequence {
    pub fn next_id(&mut self) -> RequestId {
        self.last += 1;
        RequestId(self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementKind {
    #[default]
    Income,
    Balance,
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::Income,
        StatementKind::Balance,
        StatementKind::CashFlow,
    ];

    pub fn select<'a>(&self, financials: &'a Financials) -> &'a FinancialStatement {
        match self {
            StatementKind::Income => &financials.income_statement,
            StatementKind::Balance => &financials.balance_sheet,
            StatementKind::CashFlow => &financials.cash_flow,
        }
    }
}

impl Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StatementKind::Income => "Income Statement",
            StatementKind::Balance => "Balance Sheet",
            StatementKind::CashFlow => "Cash Flow",
        })
    }
}

impl FromStr for StatementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "income_statement" => Ok(StatementKind::Income),
            "balance" | "balance_sheet" => Ok(StatementKind::Balance),
            "cash" | "cashflow" | "cash_flow" => Ok(StatementKind::CashFlow),
            _ => Err(anyhow::anyhow!("Unknown statement: {}", s)),
        }
    }
}

#[derive(Debug)]
pub enum Action {
    SymbolsLoaded(Vec<Symbol>),
    SelectSymbol(String),
    SelectPeriod(Period),
    SetSearch(String),
    StockRequested(RequestId),
    StockLoaded(RequestId, StockResponse),
    StockFailed(RequestId),
    FinancialsRequested(RequestId),
    FinancialsLoaded(RequestId, Financials),
    FinancialsFailed(RequestId),
    ShowStatement(StatementKind),
    HideFinancials,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub symbols: Vec<Symbol>,
    pub selected: Option<String>,
    pub period: Period,
    pub search: String,
    pub loading: bool,
    pub stock: Option<StockResponse>,
    pub financials: Option<Financials>,
    pub show_financials: bool,
    pub statement: StatementKind,
    pub(crate) pending_stock: Option<RequestId>,
    pub(crate) pending_financials: Option<RequestId>,
}

pub fn reduce(state: ViewState, action: Action) -> ViewState {
    match action {
        Action::SymbolsLoaded(symbols) => {
            let selected = state
                .selected
                .or_else(|| symbols.first().map(|s| s.value.clone()));
            ViewState {
                symbols,
                selected,
                ..state
            }
        }
        Action::SelectSymbol(symbol) => ViewState {
            selected: Some(symbol.trim().to_uppercase()),
            ..clear_financials(state)
        },
        Action::SelectPeriod(period) => ViewState {
            period,
            ..clear_financials(state)
        },
        Action::SetSearch(search) => ViewState { search, ..state },
        Action::StockRequested(id) => ViewState {
            loading: true,
            pending_stock: Some(id),
            ..state
        },
        Action::StockLoaded(id, stock) if state.pending_stock == Some(id) => ViewState {
            loading: false,
            stock: Some(stock),
            pending_stock: None,
            ..state
        },
        Action::StockFailed(id) if state.pending_stock == Some(id) => ViewState {
            loading: false,
            stock: None,
            pending_stock: None,
            ..state
        },
        Action::FinancialsRequested(id) => ViewState {
            show_financials: true,
            pending_financials: Some(id),
            ..state
        },
        Action::FinancialsLoaded(id, financials) if state.pending_financials == Some(id) => {
            ViewState {
                financials: Some(financials),
                pending_financials: None,
                ..state
            }
        }
        Action::FinancialsFailed(id) if state.pending_financials == Some(id) => ViewState {
            financials: None,
            pending_financials: None,
            ..state
        },
        Action::ShowStatement(statement) => ViewState {
            statement,
            show_financials: true,
            ..state
        },
        Action::HideFinancials => ViewState {
            show_financials: false,
            ..state
        },
        // Stale responses
        Action::StockLoaded(..)
        | Action::StockFailed(_)
        | Action::FinancialsLoaded(..)
        | Action::FinancialsFailed(_) => state,
    }
}

fn clear_financials(state: ViewState) -> ViewState {
    ViewState {
        financials: None,
        show_financials: false,
        pending_financials: None,
        ..state
    }
}

impl ViewState {
    /// Symbols whose label or ticker contains the search text, ignoring case.
    pub fn filtered_symbols(&self) -> Vec<&Symbol> {
        let needle = self.search.trim().to_lowercase();
        self.symbols
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || s.label.to_lowercase().contains(&needle)
                    || s.value.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Drift between the first and last close of the loaded history.
    pub fn period_change(&self) -> Option<PriceChange> {
        analytics::period_change(&self.stock.as_ref()?.history)
    }

    /// Live price against the previous session close.
    pub fn day_change(&self) -> Option<PriceChange> {
        let info = &self.stock.as_ref()?.info;
        analytics::day_change(info.current_price, info.previous_close)
    }

    pub fn is_fetching_financials(&self) -> bool {
        self.pending_financials.is_some()
    }
}
