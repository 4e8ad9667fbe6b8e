use super::ui;
use crate::core::analytics::{Performance, Signal};
use crate::core::market::{MarketDataProvider, Symbol};
use crate::core::period::{DateRange, Interval, Period};
use anyhow::Result;
use comfy_table::{Cell, Color};
use futures::future::join_all;
use std::fmt::Display;
use tracing::{debug, warn};

/// Rows shown from each end of the ranking once it gets long.
const RANK_EDGE: usize = 7;

/// Window the ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Period(Period),
    Range(DateRange),
}

impl Display for Lookback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookback::Period(period) => write!(f, "{period}"),
            Lookback::Range(range) => write!(f, "{range}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSymbol {
    pub symbol: Symbol,
    pub performance: Performance,
}

#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Sorted by return, best first.
    pub ranked: Vec<RankedSymbol>,
    /// Ticker and reason for every symbol that could not be analysed.
    pub failures: Vec<(String, String)>,
}

impl AnalysisReport {
    pub fn new(mut ranked: Vec<RankedSymbol>, failures: Vec<(String, String)>) -> Self {
        ranked.sort_by(|a, b| {
            b.performance
                .return_pct
                .total_cmp(&a.performance.return_pct)
        });
        AnalysisReport { ranked, failures }
    }

    /// Rows to display, with `None` standing for the elided middle.
    pub fn visible_rows(&self) -> Vec<Option<&RankedSymbol>> {
        if self.ranked.len() <= RANK_EDGE * 2 {
            return self.ranked.iter().map(Some).collect();
        }
        let top = self.ranked.iter().take(RANK_EDGE).map(Some);
        let bottom = self.ranked[self.ranked.len() - RANK_EDGE..].iter().map(Some);
        top.chain(std::iter::once(None)).chain(bottom).collect()
    }

    pub fn top_gainer(&self) -> Option<&RankedSymbol> {
        self.ranked.first()
    }

    pub fn biggest_loser(&self) -> Option<&RankedSymbol> {
        self.ranked.last()
    }

    pub fn average_return(&self) -> Option<f64> {
        mean(self.ranked.iter().map(|r| r.performance.return_pct))
    }

    pub fn average_volatility(&self) -> Option<f64> {
        mean(self.ranked.iter().filter_map(|r| r.performance.volatility_pct))
    }

    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Rank"),
            ui::header_cell("Symbol"),
            ui::header_cell("Name"),
            ui::header_cell("Return"),
            ui::header_cell("Volatility"),
            ui::header_cell("Signal"),
        ]);

        let mut rank = 0;
        for row in self.visible_rows() {
            let Some(row) = row else {
                rank = self.ranked.len() - RANK_EDGE;
                table.add_row(vec!["...", "...", "...", "...", "...", "..."]);
                continue;
            };
            rank += 1;
            table.add_row(vec![
                Cell::new(rank),
                Cell::new(&row.symbol.value),
                Cell::new(&row.symbol.label),
                ui::change_cell(row.performance.return_pct),
                ui::format_optional_cell(row.performance.volatility_pct, |v| format!("{v:.2}%")),
                signal_cell(row.performance.signal),
            ]);
        }
        table.to_string()
    }

    pub fn stats_panel(&self) -> String {
        let describe = |row: Option<&RankedSymbol>| {
            row.map_or(ui::PLACEHOLDER.to_string(), |r| {
                format!("{} ({:+.2}%)", r.symbol.value, r.performance.return_pct)
            })
        };
        let pct = |v: Option<f64>| v.map_or(ui::PLACEHOLDER.to_string(), |v| format!("{v:.2}%"));

        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Statistic"), ui::header_cell("Value")]);
        table.add_row(vec!["Top Gainer".to_string(), describe(self.top_gainer())]);
        table.add_row(vec!["Biggest Loser".to_string(), describe(self.biggest_loser())]);
        table.add_row(vec!["Market Average".to_string(), pct(self.average_return())]);
        table.add_row(vec!["Average Volatility".to_string(), pct(self.average_volatility())]);
        table.to_string()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn signal_cell(signal: Signal) -> Cell {
    let color = match signal {
        Signal::Buy => Color::Green,
        Signal::Sell => Color::Red,
        Signal::Neutral => Color::Yellow,
    };
    Cell::new(signal).fg(color)
}

/// Fetches every symbol concurrently and ranks them by return over `lookback`.
pub async fn analyze(
    provider: &dyn MarketDataProvider,
    symbols: &[Symbol],
    lookback: Lookback,
) -> AnalysisReport {
    let pb = ui::new_progress_bar(symbols.len() as u64);
    pb.set_message("Fetching history...");

    let futures = symbols.iter().map(|symbol| {
        let pb = pb.clone();
        async move {
            let result = match lookback {
                Lookback::Period(period) => {
                    provider
                        .fetch_stock(&symbol.value, period, Interval::OneDay)
                        .await
                }
                Lookback::Range(range) => {
                    provider
                        .fetch_history_between(&symbol.value, range, Interval::OneDay)
                        .await
                }
            };
            pb.inc(1);
            (symbol, result)
        }
    });
    let results = join_all(futures).await;
    pb.finish_and_clear();

    let mut ranked = Vec::new();
    let mut failures = Vec::new();
    for (symbol, result) in results {
        match result {
            Ok(data) => match Performance::from_history(&data.history) {
                Some(performance) => {
                    debug!(symbol = %symbol.value, ?performance, "Analysed");
                    ranked.push(RankedSymbol {
                        symbol: symbol.clone(),
                        performance,
                    });
                }
                None => failures.push((symbol.value.clone(), "Not enough history".to_string())),
            },
            Err(e) => {
                warn!(symbol = %symbol.value, error = %e, "Skipping symbol");
                failures.push((symbol.value.clone(), e.to_string()));
            }
        }
    }
    AnalysisReport::new(ranked, failures)
}

pub async fn run(
    provider: &dyn MarketDataProvider,
    symbols: &[Symbol],
    lookback: Lookback,
) -> Result<()> {
    let report = analyze(provider, symbols, lookback).await;

    println!(
        "{}\n",
        ui::style_text(&format!("Performance over {lookback}"), ui::StyleType::Title)
    );
    if report.ranked.is_empty() {
        println!("{}", ui::style_text("No symbols could be analysed", ui::StyleType::Error));
    } else {
        println!("{}", report.display_as_table());
        println!("\n{}", report.stats_panel());
    }

    if !report.failures.is_empty() {
        ui::print_separator();
        println!("{}", ui::style_text("Failed symbols", ui::StyleType::Label));
        for (symbol, reason) in &report.failures {
            println!("  {}: {}", symbol, ui::style_text(reason, ui::StyleType::Error));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ProviderError;
    use crate::core::market::{Financials, HistoryPoint, QuoteSnapshot, StockData};
    use crate::core::period::Frequency;
    use async_trait::async_trait;
    use chrono::{Datelike, NaiveDate};

    fn ranked(value: &str, return_pct: f64, volatility_pct: Option<f64>) -> RankedSymbol {
        RankedSymbol {
            symbol: Symbol::new(value, value),
            performance: Performance {
                return_pct,
                volatility_pct,
                signal: Signal::Neutral,
            },
        }
    }

    #[test]
    fn test_report_is_sorted_and_summarised() {
        let report = AnalysisReport::new(
            vec![
                ranked("A", 5.0, Some(20.0)),
                ranked("B", -10.0, None),
                ranked("C", 20.0, Some(30.0)),
            ],
            Vec::new(),
        );

        let order: Vec<_> = report.ranked.iter().map(|r| r.symbol.value.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
        assert_eq!(report.top_gainer().unwrap().symbol.value, "C");
        assert_eq!(report.biggest_loser().unwrap().symbol.value, "B");
        assert_eq!(report.average_return(), Some(5.0));
        assert_eq!(report.average_volatility(), Some(25.0));
    }

    #[test]
    fn test_empty_report_has_no_stats() {
        let report = AnalysisReport::default();
        assert!(report.top_gainer().is_none());
        assert!(report.average_return().is_none());
        assert!(report.stats_panel().contains(ui::PLACEHOLDER));
    }

    #[test]
    fn test_long_ranking_is_elided() {
        let rows = (0..20u32).map(|i| ranked(&format!("S{i}"), f64::from(i), None)).collect();
        let report = AnalysisReport::new(rows, Vec::new());
        let visible = report.visible_rows();

        assert_eq!(visible.len(), 15);
        assert!(visible[7].is_none());
        assert_eq!(visible[0].unwrap().symbol.value, "S19");
        assert_eq!(visible[14].unwrap().symbol.value, "S0");

        let short = AnalysisReport::new(
            (0..14u32).map(|i| ranked(&format!("S{i}"), f64::from(i), None)).collect(),
            Vec::new(),
        );
        assert!(short.visible_rows().iter().all(Option::is_some));
    }

    fn stock(symbol: &str, start: NaiveDate, closes: &[f64]) -> StockData {
        let history = closes
            .iter()
            .enumerate()
            .map(|(i, close)| HistoryPoint {
                date: (start + chrono::Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 1,
            })
            .collect();
        StockData {
            symbol: symbol.to_string(),
            quote: QuoteSnapshot::default(),
            history,
        }
    }

    struct FakeProvider;

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        async fn fetch_stock(
            &self,
            symbol: &str,
            _period: Period,
            _interval: Interval,
        ) -> Result<StockData, ProviderError> {
            let closes: &[f64] = match symbol {
                "UP.NS" => &[100.0, 110.0, 120.0],
                "DOWN.NS" => &[100.0, 90.0],
                "FLAT.NS" => &[100.0],
                _ => return Err(ProviderError::NotFound(symbol.to_string())),
            };
            Ok(stock(symbol, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), closes))
        }

        // Only listings old enough to cover the window have data
        async fn fetch_history_between(
            &self,
            symbol: &str,
            range: DateRange,
            _interval: Interval,
        ) -> Result<StockData, ProviderError> {
            let closes: &[f64] = match symbol {
                "UP.NS" => &[50.0, 100.0],
                "DOWN.NS" if range.start.year() >= 2023 => &[100.0, 75.0],
                _ => return Err(ProviderError::NotFound(symbol.to_string())),
            };
            Ok(stock(symbol, range.start, closes))
        }

        async fn fetch_financials(
            &self,
            symbol: &str,
            _frequency: Frequency,
        ) -> Result<Financials, ProviderError> {
            Err(ProviderError::NotFound(symbol.to_string()))
        }
    }

    #[tokio::test]
    async fn test_analyze_collects_failures() {
        let symbols = vec![
            Symbol::new("Up", "UP.NS"),
            Symbol::new("Missing", "MISSING.NS"),
            Symbol::new("Down", "DOWN.NS"),
            Symbol::new("Flat", "FLAT.NS"),
        ];

        let report = analyze(&FakeProvider, &symbols, Lookback::Period(Period::OneYear)).await;

        let order: Vec<_> = report.ranked.iter().map(|r| r.symbol.value.as_str()).collect();
        assert_eq!(order, vec!["UP.NS", "DOWN.NS"]);
        assert_eq!(report.ranked[0].performance.return_pct, 20.0);

        let failed: Vec<_> = report.failures.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(failed, vec!["MISSING.NS", "FLAT.NS"]);
        assert!(report.failures[0].1.contains("No data found"));
    }

    #[tokio::test]
    async fn test_analyze_over_date_range() {
        let symbols = vec![Symbol::new("Up", "UP.NS"), Symbol::new("Down", "DOWN.NS")];
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
        .unwrap();
        let lookback = Lookback::Range(range);

        let report = analyze(&FakeProvider, &symbols, lookback).await;

        assert_eq!(lookback.to_string(), "2023-06-01 to 2024-06-01");
        let returns: Vec<_> = report.ranked.iter().map(|r| r.performance.return_pct).collect();
        assert_eq!(returns, vec![100.0, -25.0]);
        assert!(report.failures.is_empty());

        let older = DateRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        )
        .unwrap();
        let report = analyze(&FakeProvider, &symbols, Lookback::Range(older)).await;
        assert_eq!(report.ranked.len(), 1);
        assert_eq!(report.failures[0].0, "DOWN.NS");
    }
}
