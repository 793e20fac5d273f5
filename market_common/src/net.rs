//! Stream endpoints, timing constants and URL helpers used by the feed and the client.

use std::time::Duration;

use crate::error::MarketError;
use crate::symbols::normalize_symbols;

/// Public market-data websocket endpoint (no trailing slash).
pub const BINANCE_STREAM_BASE: &str = "wss://stream.binance.com:9443";
/// Stream name suffix selecting the rolling 24h ticker channel.
pub const TICKER_STREAM: &str = "ticker";
/// How long an up/down direction flag stays visible after a tick.
pub const FLASH_DELAY: Duration = Duration::from_millis(300);
/// Upper bound for the TCP connect and for the websocket handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Socket read timeout; bounds how long closing a live connection can take.
pub const READ_TIMEOUT: Duration = Duration::from_millis(250);
/// First delay between reconnect attempts.
pub const RECONNECT_INITIAL: Duration = Duration::from_secs(1);
/// Upper bound for the reconnect delay.
pub const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Builds the raw-stream URL covering every requested symbol on one connection.
///
/// One symbol gives `<base>/ws/btcusdt@ticker`, many symbols are joined with `/`
/// into `<base>/ws/btcusdt@ticker/ethusdt@ticker`.
pub fn stream_url<S: AsRef<str>>(base: &str, symbols: &[S]) -> Result<String, MarketError> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Err(MarketError::Format(String::from("empty stream endpoint")));
    }
    let streams: Vec<String> = normalize_symbols(symbols)?
        .iter()
        .map(|s| format!("{}@{}", s.to_ascii_lowercase(), TICKER_STREAM))
        .collect();
    Ok(format!("{}/ws/{}", base, streams.join("/")))
}
