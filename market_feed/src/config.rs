//! Feed settings.

use std::time::Duration;

use market_common::net::{BINANCE_STREAM_BASE, CONNECT_TIMEOUT, FLASH_DELAY, READ_TIMEOUT};

/// Settings shared by every subscription opened from one [`QuoteFeed`].
///
/// [`QuoteFeed`]: crate::QuoteFeed
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Websocket base URL, e.g. `wss://stream.binance.com:9443`.
    pub endpoint: String,
    /// How long an up/down flag lives before it is cleared.
    pub flash_delay: Duration,
    /// Limit for the TCP connect and the websocket handshake.
    pub connect_timeout: Duration,
    /// Socket read timeout of the websocket reader.
    pub read_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from(BINANCE_STREAM_BASE),
            flash_delay: FLASH_DELAY,
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
        }
    }
}
