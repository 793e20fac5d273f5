//! Offline ticker source.
//!
//! The `SimulatedSource` runs a background thread that synthesizes ticker frames
//! for the subscribed symbols and sends them in the same JSON shape the exchange
//! stream uses, so the whole decode path runs without a network.
//!
//! Design notes:
//! - Uses a small random walk around the last price to simulate movement.
//! - The 24h change is measured against the price the walk started from.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, unbounded};
use log::{error, info};
use market_common::symbols::Market;
use market_common::{MarketError, Result};
use rand::Rng;
use serde_json::json;

use crate::source::{FeedEvent, FeedSource};

/// Default pause between two rounds of ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Random-walk ticker generator.
pub struct SimulatedSource {
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    generator: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    /// Create a generator emitting one tick per symbol every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            generator: None,
        }
    }

    /// Calculate the next synthetic price using a small random walk around `current_price`.
    ///
    /// The change is sampled uniformly from the range `[-1%, +1%]` and the result is
    /// clamped to a minimum positive value to avoid non-sensical zero/negative prices.
    pub fn next_price(current_price: f64) -> f64 {
        let mut rng = rand::rng();
        let change: f64 = rng.random_range(-0.01..0.01);
        let new_price = current_price * (1.0 + change);
        new_price.max(0.01)
    }

    /// Rough starting price so simulated quotes look plausible.
    pub fn seed_price(symbol: &str) -> f64 {
        match symbol.parse::<Market>() {
            Ok(Market::BTCUSDT) => 69_000.0,
            Ok(Market::ETHUSDT) => 3_500.0,
            Ok(Market::SOLUSDT) => 150.0,
            Ok(Market::BNBUSDT) => 600.0,
            Ok(Market::XRPUSDT) => 0.55,
            Err(_) => 100.0,
        }
    }

    /// Builds one ticker frame in the exchange wire format.
    pub fn frame(symbol: &str, price: f64, open_price: f64) -> String {
        let change = (price - open_price) / open_price * 100.0;
        json!({
            "e": "24hrTicker",
            "E": Utc::now().timestamp_millis(),
            "s": symbol,
            "c": format!("{:.8}", price),
            "P": format!("{:.3}", change),
        })
        .to_string()
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl FeedSource for SimulatedSource {
    fn open(&mut self, symbols: &[String]) -> Result<Receiver<FeedEvent>> {
        if self.generator.is_some() {
            return Err(MarketError::SourceAlreadyOpen);
        }
        let (tx, rx) = unbounded::<FeedEvent>();
        let symbols = symbols.to_vec();
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        self.generator = Some(thread::spawn(move || {
            let open_prices: HashMap<String, f64> = symbols
                .iter()
                .map(|s| (s.clone(), Self::seed_price(s)))
                .collect();
            let mut current_prices = open_prices.clone();
            info!("Simulated feed started for {} symbols", symbols.len());

            while !shutdown.load(Ordering::Relaxed) {
                for symbol in &symbols {
                    let open_price = open_prices.get(symbol).copied().unwrap_or(100.0);
                    let price = Self::next_price(current_prices.get(symbol).copied().unwrap_or(open_price));
                    current_prices.insert(symbol.clone(), price);

                    if tx.send(FeedEvent::Message(Self::frame(symbol, price, open_price))).is_err() {
                        return;
                    }
                }
                thread::sleep(interval);
            }
            info!("Simulated feed stopping...");
        }));
        Ok(rx)
    }

    fn close(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(generator) = self.generator.take() {
            if generator.join().is_err() {
                error!("Simulated feed thread panicked");
            }
        }
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.close();
    }
}
