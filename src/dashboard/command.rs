use crate::core::period::Period;
use crate::dashboard::state::StatementKind;
use anyhow::{Context, Result, anyhow};

pub const HELP: &str = "\
Commands:
  list                    show the symbol list
  search <text>           filter the symbol list (empty text clears)
  select <ticker|number>  pick a symbol by ticker or list position
  period <p>              1mo 3mo 6mo 1y 5y max (also 1d 5d 2y 10y ytd)
  financials [statement]  show income, balance or cash flow tables
  hide                    hide the financial tables
  show                    redraw the dashboard
  help                    this text
  quit                    leave the dashboard";

/// A line typed at the dashboard prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Search(String),
    Select(Selection),
    Period(Period),
    Financials(Option<StatementKind>),
    Hide,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// 1-based position in the filtered symbol list.
    Position(usize),
    Ticker(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        match word.to_lowercase().as_str() {
            "list" | "ls" => Ok(Command::List),
            "search" | "find" => Ok(Command::Search(rest.to_string())),
            "select" | "s" => {
                if rest.is_empty() {
                    return Err(anyhow!("Usage: select <ticker|number>"));
                }
                Ok(Command::Select(match rest.parse::<usize>() {
                    Ok(position) => Selection::Position(position),
                    Err(_) => Selection::Ticker(rest.to_string()),
                }))
            }
            "period" | "p" => rest.parse::<Period>().map(Command::Period).with_context(|| {
                let choices: Vec<&str> = Period::PICKER.iter().map(Period::as_str).collect();
                format!("Usage: period <{}>", choices.join("|"))
            }),
            "financials" | "fin" | "f" => {
                if rest.is_empty() {
                    Ok(Command::Financials(None))
                } else {
                    Ok(Command::Financials(Some(rest.parse()?)))
                }
            }
            "hide" => Ok(Command::Hide),
            "show" | "" => Ok(Command::Show),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(anyhow!("Unknown command: {other}. Type `help` for a list")),
        }
    }
}
