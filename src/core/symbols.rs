//! The curated NSE symbol list and ticker normalisation

use crate::core::error::ValidationError;
use crate::core::market::Symbol;
use std::collections::HashSet;
use tracing::warn;

const NSE_SYMBOLS: &[(&str, &str)] = &[
    ("Reliance Industries", "RELIANCE.NS"),
    ("Tata Consultancy Services", "TCS.NS"),
    ("HDFC Bank", "HDFCBANK.NS"),
    ("ICICI Bank", "ICICIBANK.NS"),
    ("Infosys", "INFY.NS"),
    ("Bharti Airtel", "BHARTIARTL.NS"),
    ("State Bank of India", "SBIN.NS"),
    ("Hindustan Unilever", "HINDUNILVR.NS"),
    ("ITC", "ITC.NS"),
    ("Larsen & Toubro", "LT.NS"),
    ("Bajaj Finance", "BAJFINANCE.NS"),
    ("Kotak Mahindra Bank", "KOTAKBANK.NS"),
    ("HCL Technologies", "HCLTECH.NS"),
    ("Axis Bank", "AXISBANK.NS"),
    ("Asian Paints", "ASIANPAINT.NS"),
    ("Maruti Suzuki", "MARUTI.NS"),
    ("Sun Pharmaceutical", "SUNPHARMA.NS"),
    ("Mahindra & Mahindra", "M&M.NS"),
    ("Titan Company", "TITAN.NS"),
    ("UltraTech Cement", "ULTRACEMCO.NS"),
    ("NTPC", "NTPC.NS"),
    ("Wipro", "WIPRO.NS"),
    ("Tata Motors", "TATAMOTORS.NS"),
    ("Power Grid Corporation", "POWERGRID.NS"),
    ("Oil & Natural Gas Corporation", "ONGC.NS"),
    ("Tata Steel", "TATASTEEL.NS"),
    ("Adani Enterprises", "ADANIENT.NS"),
    ("Nestle India", "NESTLEIND.NS"),
    ("Coal India", "COALINDIA.NS"),
    ("JSW Steel", "JSWSTEEL.NS"),
];

/// Built-in list used when the configuration does not name any symbols.
pub fn default_symbols() -> Vec<Symbol> {
    NSE_SYMBOLS
        .iter()
        .map(|(label, value)| Symbol::new(label, value))
        .collect()
}

/// Drops repeated tickers, keeping the first occurrence.
pub fn dedupe(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .filter(|symbol| {
            let fresh = seen.insert(symbol.value.clone());
            if !fresh {
                warn!(symbol = %symbol.value, "Dropping duplicate symbol from curated list");
            }
            fresh
        })
        .collect()
}

/// Trims and upper-cases free-text ticker input.
pub fn normalize_ticker(input: &str) -> Result<String, ValidationError> {
    let ticker = input.trim().to_uppercase();
    if ticker.is_empty() || ticker.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidSymbol(input.to_string()));
    }
    Ok(ticker)
}
