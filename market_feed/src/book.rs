//! Per-symbol quote state with cancellable direction clears.
//!
//! The book holds one `Quote` per subscribed symbol and a deadline map of
//! pending direction clears. It exposes three core operations:
//!
//! - `QuoteBook::apply(tick, now)`: store a tick, derive its direction and
//!   (re)schedule or cancel the clear for that symbol.
//! - `QuoteBook::expire(now)`: fire every clear whose deadline has passed and
//!   return the cleared snapshots.
//! - `QuoteBook::next_deadline()`: earliest pending clear, for the worker's timer.
//!
//! Design notes:
//! - Time is passed in as `Instant` so the rules can be exercised without sleeping.
//! - A symbol has at most one pending clear; scheduling again replaces it.
//! - The book is not synchronized; the subscription wraps it in a `Mutex`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use market_common::{Direction, Quote, TickerTick};

/// Internal bookkeeping for one symbol.
struct Entry {
    quote: Quote,
    /// Price of the last accepted tick; the neutral placeholder does not count.
    previous: Option<f64>,
}

/// Latest quotes for a fixed symbol set.
pub struct QuoteBook {
    /// Subscribed symbols in subscription order.
    order: Vec<String>,
    entries: HashMap<String, Entry>,
    /// Symbol -> instant at which its direction reverts to `None`.
    clears: HashMap<String, Instant>,
    flash_delay: Duration,
}

impl QuoteBook {
    /// Create a book with a neutral quote for every symbol.
    pub fn new(symbols: &[String], flash_delay: Duration) -> Self {
        let entries = symbols
            .iter()
            .map(|symbol| {
                (
                    symbol.clone(),
                    Entry {
                        quote: Quote::neutral(symbol),
                        previous: None,
                    },
                )
            })
            .collect();
        Self {
            order: symbols.to_vec(),
            entries,
            clears: HashMap::new(),
            flash_delay,
        }
    }

    /// Store `tick` and return the updated snapshot.
    ///
    /// Returns `None` when the symbol is not part of this book.
    pub fn apply(&mut self, tick: TickerTick, now: Instant) -> Option<Quote> {
        let entry = self.entries.get_mut(&tick.symbol)?;
        let direction = Direction::between(entry.previous, tick.last_price);

        entry.previous = Some(tick.last_price);
        entry.quote = Quote {
            symbol: tick.symbol,
            last_price: tick.last_price,
            percent_change_24h: tick.percent_change_24h,
            direction,
            event_time: tick.event_time,
        };

        if direction.is_directional() {
            self.clears
                .insert(entry.quote.symbol.clone(), now + self.flash_delay);
        } else {
            self.clears.remove(&entry.quote.symbol);
        }
        Some(entry.quote.clone())
    }

    /// Clear every direction whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<Quote> {
        let entries = &mut self.entries;
        let mut cleared = Vec::new();

        self.clears.retain(|symbol, deadline| {
            if *deadline > now {
                return true;
            }
            if let Some(entry) = entries.get_mut(symbol) {
                entry.quote.direction = Direction::None;
                cleared.push(entry.quote.clone());
            }
            false
        });
        cleared
    }

    /// Earliest pending clear.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.clears.values().min().copied()
    }

    /// Number of scheduled clears.
    pub fn pending_clears(&self) -> usize {
        self.clears.len()
    }

    /// Drop every scheduled clear without firing it.
    pub fn cancel_all(&mut self) {
        self.clears.clear();
    }

    /// Current snapshot for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.entries.get(symbol).map(|entry| entry.quote.clone())
    }

    /// Snapshots of every symbol in subscription order.
    pub fn snapshot(&self) -> Vec<Quote> {
        self.order
            .iter()
            .filter_map(|symbol| self.get(symbol))
            .collect()
    }
}
