//! Command-line arguments for the market client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::{Args as ClapArgs, Parser, Subcommand};
use market_common::allocation::{BucketEdit, Currency, DEFAULT_BALANCE_KES, KES_PER_USD};
use market_common::net::BINANCE_STREAM_BASE;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Client actions.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream live quotes for a watchlist and print every update.
    Watch(WatchArgs),
    /// Apply slider edits to an allocation split and print the breakdown.
    Allocate(AllocateArgs),
}

/// Options of the `watch` action.
#[derive(Debug, ClapArgs)]
pub struct WatchArgs {
    /// Symbols to watch, comma separated (e.g. `btcusdt,ethusdt`).
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Path to a watchlist file.
    /// Symbols may be separated by commas, spaces, or new lines.
    #[arg(long, conflicts_with = "symbols")]
    pub path: Option<String>,

    /// Websocket endpoint of the ticker stream.
    #[arg(long, default_value = BINANCE_STREAM_BASE)]
    pub endpoint: String,

    /// How long the up/down marker stays on a quote, in milliseconds.
    #[arg(long, default_value_t = 300)]
    pub flash_ms: u64,

    /// Use the offline random-walk feed instead of the network.
    #[arg(long)]
    pub simulate: bool,

    /// Tick interval of the offline feed, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub tick_ms: u64,

    /// Exit when the feed is lost instead of re-subscribing.
    #[arg(long)]
    pub no_reconnect: bool,

    /// Print quotes as JSON lines on stdout instead of log lines.
    #[arg(long)]
    pub json: bool,
}

/// Options of the `allocate` action.
#[derive(Debug, ClapArgs)]
pub struct AllocateArgs {
    /// Starting trading share.
    #[arg(long, default_value_t = 70, value_parser = clap::value_parser!(u16).range(0..=100))]
    pub trading: u16,

    /// Starting locked (collateral) share.
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u16).range(0..=100))]
    pub locked: u16,

    /// Starting referral share.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(0..=100))]
    pub referral: u16,

    /// Slider edit `bucket=value`, applied in order. Repeatable.
    #[arg(long = "set")]
    pub edits: Vec<BucketEdit>,

    /// Currency used to print amounts.
    #[arg(long, value_enum, default_value_t = Currency::Kes)]
    pub currency: Currency,

    /// Total balance in KES.
    #[arg(long, default_value_t = DEFAULT_BALANCE_KES)]
    pub balance: f64,

    /// KES per USD.
    #[arg(long, default_value_t = KES_PER_USD)]
    pub rate: f64,

    /// Print the resulting split as JSON.
    #[arg(long)]
    pub json: bool,
}
