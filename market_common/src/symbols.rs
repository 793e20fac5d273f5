//! Instrument symbols, the default watchlist and watchlist parsing.

use std::collections::HashSet;
use std::io::BufRead;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::MarketError;

/// Trait providing watchlist parsing from any buffered source.
pub trait WatchlistParser {
    /// Parses symbols from a buffered reader.
    ///
    /// Symbols may be separated by commas, whitespace or new lines. Each entry is
    /// normalized with [`normalize_symbol`]; the first invalid entry aborts parsing.
    /// Duplicates are dropped, keeping the first occurrence.
    fn parse_watchlist<R: BufRead>(reader: R) -> Result<Vec<String>, MarketError>;
}

/// Marker type implementing [`WatchlistParser`].
pub struct Watchlist;

impl WatchlistParser for Watchlist {
    fn parse_watchlist<R: BufRead>(reader: R) -> Result<Vec<String>, MarketError> {
        let mut symbols = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(MarketError::Io)?;
            for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
                if token.is_empty() {
                    continue;
                }
                match normalize_symbol(token) {
                    Ok(symbol) => symbols.push(symbol),
                    Err(e) => return Err(MarketError::ParseWatchlist(e.to_string())),
                }
            }
        }
        Ok(dedup(symbols))
    }
}

/// Upper-cases and validates a single instrument symbol.
pub fn normalize_symbol(raw: &str) -> Result<String, MarketError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(MarketError::InvalidSymbol(raw.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Normalizes a requested symbol set for a subscription.
///
/// Order of first appearance is kept so snapshots list instruments the way the
/// caller asked for them.
pub fn normalize_symbols<I, S>(symbols: I) -> Result<Vec<String>, MarketError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let normalized = symbols
        .into_iter()
        .map(|s| normalize_symbol(s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    if normalized.is_empty() {
        return Err(MarketError::EmptySubscription);
    }
    Ok(dedup(normalized))
}

fn dedup(symbols: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    symbols.into_iter().filter(|s| seen.insert(s.clone())).collect()
}

/// Instruments shown on the markets screen when no watchlist is given.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Hash,
    Eq,
    PartialEq,
)]
#[strum(ascii_case_insensitive)]
pub enum Market {
    BTCUSDT,
    ETHUSDT,
    SOLUSDT,
    BNBUSDT,
    XRPUSDT,
}

impl Market {
    /// Default watchlist, in display order.
    pub const ALL: [Market; 5] = [
        Market::BTCUSDT,
        Market::ETHUSDT,
        Market::SOLUSDT,
        Market::BNBUSDT,
        Market::XRPUSDT,
    ];

    /// Human readable asset name.
    pub fn name(&self) -> &'static str {
        match self {
            Market::BTCUSDT => "Bitcoin",
            Market::ETHUSDT => "Ethereum",
            Market::SOLUSDT => "Solana",
            Market::BNBUSDT => "BNB",
            Market::XRPUSDT => "XRP",
        }
    }

    /// Symbols of the default watchlist as strings.
    pub fn default_symbols() -> Vec<String> {
        Self::ALL.iter().map(|m| m.to_string()).collect()
    }
}
