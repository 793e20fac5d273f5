//! Error types shared between the feed and the client.
//!
//! The `MarketError` enum unifies common failure cases for I/O, JSON decoding,
//! websocket transport and input validation, allowing
//! crates to propagate a single error type.
use std::io;

use thiserror::Error;

/// Unified error type shared by every crate in the workspace.
#[derive(Error, Debug)]
pub enum MarketError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Websocket handshake or transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The endpoint could not be reached or did not finish the handshake in time.
    #[error("Connect error: {0}")]
    Connect(String),

    /// A frame decoded as JSON but is not a usable ticker update.
    #[error("Malformed ticker frame: {0}")]
    MalformedFrame(String),

    /// A symbol that is empty or contains characters other than ASCII letters and digits.
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// A subscription was requested for an empty set of symbols.
    #[error("Subscription needs at least one symbol")]
    EmptySubscription,

    /// Error while parsing a watchlist file or a CLI symbol list.
    #[error("Parse watchlist error: {0}")]
    ParseWatchlist(String),

    /// A feed source was asked to open a second time.
    #[error("Feed source already opened")]
    SourceAlreadyOpen,
}
