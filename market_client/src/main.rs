//! Market Client, a terminal stand-in for the dashboard screens.
//!
//! `watch` subscribes to the live 24h ticker stream for a watchlist (one websocket
//! connection for all symbols) and prints every quote update with its up/down
//! marker. `allocate` applies slider edits to the trading / locked / referral
//! split and prints what each bucket is worth.
//!
//! Usage example (CLI):
//! ```bash
//! market_client watch --symbols btcusdt,ethusdt
//! market_client watch --simulate --path ./watchlist.txt
//! market_client allocate --set trading=90 --currency usd
//! ```
//!
//! The watchlist file should contain symbols separated by commas, spaces, or new lines.
#![warn(missing_docs)]
mod allocate;
mod args;
mod watch;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::args::{Args, Command};
use clap::Parser;
use log::info;
use market_common::{MarketError, Result};

fn main() -> Result<(), MarketError> {
    init_logger();
    let args = Args::parse();

    match args.command {
        Command::Watch(watch_args) => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let shutdown = shutdown.clone();
                ctrlc::set_handler(move || {
                    info!("Ctrl+C received. Shutting down client...");
                    shutdown.store(true, Ordering::SeqCst);
                })
                .map_err(|e| MarketError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;
            }
            watch::run(watch_args, shutdown)
        }
        Command::Allocate(allocate_args) => allocate::run(allocate_args),
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
