//! Turns a [`ViewState`] snapshot into terminal output.

use crate::cli::ui;
use crate::core::analytics::PriceChange;
use crate::core::market::FinancialStatement;
use crate::dashboard::state::{StatementKind, ViewState};
use crate::server::models::StockResponse;
use chrono::NaiveDate;
use comfy_table::{Cell, CellAlignment, Table};
use std::fmt::Display;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A labelled statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct StatCard {
    pub label: String,
    pub value: String,
}

impl StatCard {
    fn new(label: &str, value: String) -> Self {
        StatCard {
            label: label.to_string(),
            value,
        }
    }
}

pub fn format_price(value: Option<f64>) -> String {
    value.map_or_else(|| ui::PLACEHOLDER.to_string(), |v| format!("{v:.2}"))
}

/// `+12.30 (+1.25%)`, or the placeholder when there is nothing to compare.
pub fn format_change(change: Option<PriceChange>) -> String {
    match change {
        Some(PriceChange {
            absolute,
            percent: Some(percent),
        }) => format!("{absolute:+.2} ({percent:+.2}%)"),
        Some(PriceChange {
            absolute,
            percent: None,
        }) => format!("{absolute:+.2}"),
        None => ui::PLACEHOLDER.to_string(),
    }
}

/// Short form for statement values, e.g. `9.00T`.
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    format!("{scaled:.2}{suffix}")
}

/// Splits a line item key into words: `NetIncomeCommonStockholders` becomes
/// `Net Income Common Stockholders`, `BasicEPS` becomes `Basic EPS`.
pub fn humanize_line_item(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || (prev.is_uppercase() && next_is_lower) {
                out.push(' ');
            }
        }
        out.push(*c);
    }
    out
}

pub fn stat_cards(stock: &StockResponse, state: &ViewState) -> Vec<StatCard> {
    let info = &stock.info;
    vec![
        StatCard::new("Current Price", format_price(info.current_price)),
        StatCard::new("Day Change", format_change(state.day_change())),
        StatCard::new(
            &format!("Change over {}", state.period),
            format_change(state.period_change()),
        ),
        StatCard::new("Day High", format_price(info.day_high)),
        StatCard::new("Day Low", format_price(info.day_low)),
        StatCard::new("52W High", format_price(info.fifty_two_week_high)),
        StatCard::new("52W Low", format_price(info.fifty_two_week_low)),
        StatCard::new("Sector", info.sector.clone()),
        StatCard::new("Currency", info.currency.clone()),
    ]
}

/// Line items by period-end dates, most recent date first.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementTable {
    pub columns: Vec<NaiveDate>,
    pub rows: Vec<StatementRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub name: String,
    /// One cell per column; `None` where the item has no value for that date.
    pub cells: Vec<Option<f64>>,
}

impl StatementTable {
    pub fn from_statement(statement: &FinancialStatement) -> Self {
        let columns = statement.period_ends();
        let rows = statement
            .rows
            .iter()
            .map(|(name, values)| StatementRow {
                name: name.clone(),
                cells: columns
                    .iter()
                    .map(|date| values.get(date).copied().flatten())
                    .collect(),
            })
            .collect();
        StatementTable { columns, rows }
    }

    pub fn to_table(&self) -> Table {
        let mut table = ui::new_styled_table();
        let mut header = vec![ui::header_cell("Line Item")];
        header.extend(
            self.columns
                .iter()
                .map(|d| ui::header_cell(&d.format("%Y-%m-%d").to_string())),
        );
        table.set_header(header);

        for row in &self.rows {
            let mut cells = vec![Cell::new(humanize_line_item(&row.name))];
            cells.extend(
                row.cells
                    .iter()
                    .map(|v| ui::format_optional_cell(*v, format_compact)),
            );
            table.add_row(cells);
        }
        table
    }
}

/// Resamples `values` into at most `width` columns and draws them as bars.
pub fn sparkline(values: &[f64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }

    let cols = width.min(values.len());
    let buckets: Vec<f64> = (0..cols)
        .map(|i| {
            let start = i * values.len() / cols;
            let end = ((i + 1) * values.len() / cols).max(start + 1);
            let slice = &values[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect();

    let min = buckets.iter().copied().fold(f64::INFINITY, f64::min);
    let max = buckets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let top = (SPARK_LEVELS.len() - 1) as f64;

    buckets
        .iter()
        .map(|v| {
            let level = if range > 0.0 {
                ((v - min) / range * top).round() as usize
            } else {
                SPARK_LEVELS.len() / 2
            };
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

fn render_cards(cards: &[StatCard]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(cards.iter().map(|c| ui::header_cell(&c.label)));
    table.add_row(
        cards
            .iter()
            .map(|c| Cell::new(&c.value).set_alignment(CellAlignment::Right)),
    );
    table
}

fn push_line(out: &mut String, line: impl Display) {
    out.push_str(&line.to_string());
    out.push('\n');
}

fn render_chart(out: &mut String, state: &ViewState, stock: &StockResponse, width: usize) {
    let closes: Vec<f64> = stock.history.iter().map(|p| p.close).collect();
    let (Some(first), Some(last)) = (stock.history.first(), stock.history.last()) else {
        push_line(out, ui::style_text("No price history", ui::StyleType::Subtle));
        return;
    };
    let low = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let high = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    push_line(
        out,
        format!(
            "{} {} to {}  (low {:.2}, high {:.2})",
            ui::style_text("Close", ui::StyleType::Label),
            first.date.format("%Y-%m-%d"),
            last.date.format("%Y-%m-%d"),
            low,
            high
        ),
    );
    let trend = match state.period_change() {
        Some(change) if change.is_gain() => ui::StyleType::Gain,
        Some(_) => ui::StyleType::Loss,
        None => ui::StyleType::Subtle,
    };
    push_line(out, ui::style_text(&sparkline(&closes, width), trend));
}

fn render_financials(out: &mut String, state: &ViewState) {
    let tabs: Vec<String> = StatementKind::ALL
        .iter()
        .map(|kind| {
            if *kind == state.statement {
                ui::style_text(&format!("[{kind}]"), ui::StyleType::Label)
            } else {
                ui::style_text(&format!(" {kind} "), ui::StyleType::Subtle)
            }
        })
        .collect();
    push_line(out, format!("\n{}", tabs.join("  ")));

    match &state.financials {
        Some(financials) => {
            let statement = state.statement.select(financials);
            if statement.is_empty() {
                push_line(out, ui::style_text("No data reported", ui::StyleType::Subtle));
            } else {
                push_line(out, StatementTable::from_statement(statement).to_table());
            }
        }
        None if state.is_fetching_financials() => {
            push_line(out, ui::style_text("Loading...", ui::StyleType::Subtle));
        }
        None => {
            push_line(
                out,
                ui::style_text("Financials unavailable", ui::StyleType::Subtle),
            );
        }
    }
}

/// Full dashboard for the current snapshot.
pub fn render(state: &ViewState, width: usize) -> String {
    let mut out = String::new();

    let title = match &state.selected {
        Some(symbol) => format!("{symbol} ({})", state.period),
        None => "No symbol selected".to_string(),
    };
    push_line(&mut out, ui::style_text(&title, ui::StyleType::Title));

    if state.loading {
        push_line(&mut out, ui::style_text("Loading...", ui::StyleType::Subtle));
    }

    match &state.stock {
        Some(stock) => {
            push_line(
                &mut out,
                ui::style_text(&stock.info.long_name, ui::StyleType::Label),
            );
            push_line(&mut out, render_cards(&stat_cards(stock, state)));
            render_chart(&mut out, state, stock, width);
        }
        None if !state.loading => {
            push_line(&mut out, ui::style_text("No data", ui::StyleType::Subtle));
        }
        None => {}
    }

    if state.show_financials {
        render_financials(&mut out, state);
    }
    out
}

/// The symbol picker, numbered so entries can be selected by position.
pub fn render_symbols(state: &ViewState) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Label"),
        ui::header_cell("Ticker"),
    ]);
    for (i, symbol) in state.filtered_symbols().iter().enumerate() {
        let marker = if state.selected.as_deref() == Some(symbol.value.as_str()) {
            "*"
        } else {
            ""
        };
        table.add_row(vec![
            Cell::new(format!("{}{}", i + 1, marker)),
            Cell::new(&symbol.label),
            Cell::new(&symbol.value),
        ]);
    }
    table.to_string()
}
