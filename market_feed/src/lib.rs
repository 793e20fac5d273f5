//! Live quote ingestion over a push-based ticker feed.
//!
//! One [`Subscription`] owns one feed connection covering every requested
//! symbol, plus a worker thread that turns inbound frames into [`Quote`]
//! snapshots and fans them out to listeners:
//!
//! - `source`: the `FeedSource` seam and an in-process channel source.
//! - `websocket`: the exchange websocket source.
//! - `simulated`: an offline random-walk source speaking the same wire format.
//! - `book`: per-symbol quote state and cancellable direction clears.
//! - `subscription`: the worker loop and the subscription handle.
//! - `backoff`: reconnect delay policy for callers that re-subscribe.
//! - `config`: feed settings.
//!
//! [`Quote`]: market_common::Quote
#![warn(missing_docs)]
pub mod backoff;
pub mod book;
pub mod config;
pub mod simulated;
pub mod source;
pub mod subscription;
pub mod websocket;

pub use backoff::Backoff;
pub use book::QuoteBook;
pub use config::FeedConfig;
pub use source::{ChannelFeed, ChannelSource, FeedEvent, FeedSource, channel_source};
pub use subscription::{QuoteFeed, Subscription, SubscriptionState};
