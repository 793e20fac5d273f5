//! Quote snapshot model and inbound ticker frame decoding.
//!
//! A `Quote` is what the feed hands to listeners: the latest price, the rolling
//! 24h change and a transient `Direction` flag for the most recent move.
//! `TickerTick` is one decoded inbound frame. Frames arrive either raw
//! (`{"s":"BTCUSDT","c":"68200.10","P":"-1.32",...}`) or wrapped by a combined
//! stream (`{"stream":"btcusdt@ticker","data":{...}}`); numbers may be JSON
//! strings or JSON numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::Display;

use crate::error::MarketError;
use crate::symbols::normalize_symbol;

/// Direction of the most recent price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Price strictly above the previous one.
    Up,
    /// Price strictly below the previous one.
    Down,
    /// Unchanged, first tick, or the flash window elapsed.
    #[default]
    None,
}

impl Direction {
    /// Compares `next` against the previously stored price.
    ///
    /// Without a previous price the move is `None`.
    pub fn between(previous: Option<f64>, next: f64) -> Self {
        match previous {
            Some(prev) if next > prev => Direction::Up,
            Some(prev) if next < prev => Direction::Down,
            _ => Direction::None,
        }
    }

    /// Returns true for `Up` and `Down`.
    pub fn is_directional(&self) -> bool {
        !matches!(self, Direction::None)
    }

    /// Terminal marker for the move.
    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Up => "▲",
            Direction::Down => "▼",
            Direction::None => " ",
        }
    }
}

/// Latest known market state for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Uppercase instrument symbol, e.g. `BTCUSDT`.
    pub symbol: String,
    /// Most recent trade price.
    pub last_price: f64,
    /// Signed rolling 24h change in percent.
    pub percent_change_24h: f64,
    /// Transient move flag for the latest tick.
    pub direction: Direction,
    /// Exchange event time of the tick that produced this snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<DateTime<Utc>>,
}

impl Quote {
    /// Neutral placeholder shown before the first tick arrives.
    pub fn neutral(symbol: &str) -> Self {
        Quote {
            symbol: symbol.to_string(),
            last_price: 0.0,
            percent_change_24h: 0.0,
            direction: Direction::None,
            event_time: None,
        }
    }
}

/// One validated ticker update decoded from an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerTick {
    /// Uppercase instrument symbol.
    pub symbol: String,
    /// Last trade price, finite and non-negative.
    pub last_price: f64,
    /// 24h percent change, finite.
    pub percent_change_24h: f64,
    /// Exchange event time, when the frame carries one.
    pub event_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawTicker {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "c", deserialize_with = "number_or_string")]
    last_price: f64,
    #[serde(rename = "P", deserialize_with = "number_or_string")]
    percent_change: f64,
    #[serde(rename = "E", default)]
    event_time: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Frame {
    Combined { data: RawTicker },
    Raw(RawTicker),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Number::deserialize(deserializer)? {
        Number::Float(value) => Ok(value),
        Number::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl TickerTick {
    /// Decodes and validates one text frame.
    ///
    /// Returns `MalformedFrame` or `SerdeJson` for anything that is not a usable
    /// ticker update; callers treat both as noise.
    pub fn parse(text: &str) -> Result<Self, MarketError> {
        let raw = match serde_json::from_str::<Frame>(text) {
            Ok(Frame::Combined { data }) | Ok(Frame::Raw(data)) => data,
            Err(_) => {
                // untagged errors are opaque; re-decode as a bare value for a useful message
                let value: serde_json::Value = serde_json::from_str(text)?;
                return Err(MarketError::MalformedFrame(format!(
                    "missing ticker fields in {}",
                    value
                )));
            }
        };

        let symbol = normalize_symbol(&raw.symbol)
            .map_err(|e| MarketError::MalformedFrame(e.to_string()))?;
        if !raw.last_price.is_finite() || raw.last_price < 0.0 {
            return Err(MarketError::MalformedFrame(format!(
                "{}: bad price {}",
                symbol, raw.last_price
            )));
        }
        if !raw.percent_change.is_finite() {
            return Err(MarketError::MalformedFrame(format!(
                "{}: bad change {}",
                symbol, raw.percent_change
            )));
        }

        Ok(TickerTick {
            symbol,
            last_price: raw.last_price,
            percent_change_24h: raw.percent_change,
            event_time: raw.event_time.and_then(DateTime::from_timestamp_millis),
        })
    }
}
