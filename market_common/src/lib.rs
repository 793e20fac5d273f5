//!
//! Common types and utilities shared by the quote feed and the client.
//!
//! This crate aggregates:
//! - `error`: unified error type `MarketError` used across the workspace.
//! - `result`: handy `Result<T, MarketError>` alias.
//! - `symbols`: instrument symbols, the default watchlist and watchlist parsing.
//! - `net`: stream endpoints, timing constants and URL building.
//! - `quote`: the `Quote` snapshot, `Direction` flag and inbound ticker frames.
//! - `format`: price, change and money rendering for display.
//! - `allocation`: the three-bucket allocation split and its valuation.
#![warn(missing_docs)]
pub mod allocation;
pub mod error;
pub mod format;
pub mod net;
pub mod quote;
pub mod result;
pub mod symbols;

pub use allocation::{AllocationSplit, Bucket};
pub use error::MarketError;
pub use quote::{Direction, Quote, TickerTick};
pub use result::Result;
