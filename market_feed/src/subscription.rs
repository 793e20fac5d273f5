//! Subscription worker and handle.
//!
//! `QuoteFeed::subscribe` opens one source connection for all requested symbols
//! and spawns a worker thread that owns it. The worker multiplexes four inputs
//! with crossbeam `select!`:
//!
//! - stop requests from the handle (`unsubscribe` or drop);
//! - listener registrations;
//! - inbound frames, decoded into ticks and applied to the `QuoteBook`;
//! - the earliest pending direction clear.
//!
//! Every accepted frame yields exactly one emission, sent to the listeners of
//! that symbol and to the catch-all listeners in arrival order. Malformed frames
//! and ticks for other symbols are dropped at `debug` level. When the source
//! closes, the subscription turns `Closed` and stops emitting; reconnecting is
//! up to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, at, never, select, unbounded};
use log::{debug, error, info, warn};
use market_common::symbols::normalize_symbols;
use market_common::{Quote, Result, TickerTick};

use crate::book::QuoteBook;
use crate::config::FeedConfig;
use crate::source::{FeedEvent, FeedSource};
use crate::websocket::WebSocketSource;

/// Lifecycle of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// The worker is consuming the feed.
    Active,
    /// Unsubscribed, or the feed connection was lost.
    Closed,
}

/// A registered quote receiver; `symbol == None` receives every symbol.
struct Listener {
    symbol: Option<String>,
    tx: Sender<Quote>,
}

/// Factory for subscriptions sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct QuoteFeed {
    config: FeedConfig,
}

impl QuoteFeed {
    /// Create a feed using `config` for every subscription.
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    /// Settings used by this feed.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Opens `source` for `symbols` and starts consuming it.
    ///
    /// Symbols are upper-cased and deduplicated; an empty set is rejected before
    /// the source is touched.
    pub fn subscribe<S, I, T>(&self, mut source: S, symbols: I) -> Result<Subscription>
    where
        S: FeedSource + 'static,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let symbols = normalize_symbols(symbols)?;
        let events = source.open(&symbols)?;
        info!("Subscribed to {} symbols: {}", symbols.len(), symbols.join(","));

        let book = Arc::new(Mutex::new(QuoteBook::new(&symbols, self.config.flash_delay)));
        let closed = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = unbounded::<()>();
        let (listener_tx, listener_rx) = unbounded::<Listener>();

        let worker = {
            let book = Arc::clone(&book);
            let closed = Arc::clone(&closed);
            thread::spawn(move || {
                run_worker(Box::new(source), events, stop_rx, listener_rx, book, closed)
            })
        };

        Ok(Subscription {
            symbols,
            book,
            closed,
            listener_tx,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Subscribes to the exchange websocket stream for `symbols`.
    pub fn subscribe_stream<I, T>(&self, symbols: I) -> Result<Subscription>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.subscribe(WebSocketSource::new(&self.config), symbols)
    }
}

/// Handle to a live quote subscription.
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    symbols: Vec<String>,
    book: Arc<Mutex<QuoteBook>>,
    closed: Arc<AtomicBool>,
    listener_tx: Sender<Listener>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

fn lock(book: &Mutex<QuoteBook>) -> MutexGuard<'_, QuoteBook> {
    // the book holds plain values; a panic mid-update cannot leave it inconsistent
    book.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Subscription {
    /// Symbols covered by this subscription, normalized.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Receiver of every emission for `symbol`.
    ///
    /// The receiver disconnects when the subscription closes. Registering on a
    /// closed subscription yields an already-disconnected receiver.
    pub fn listen(&self, symbol: &str) -> Receiver<Quote> {
        self.register(Some(symbol.trim().to_ascii_uppercase()))
    }

    /// Receiver of every emission for every symbol.
    pub fn listen_all(&self) -> Receiver<Quote> {
        self.register(None)
    }

    fn register(&self, symbol: Option<String>) -> Receiver<Quote> {
        let (tx, rx) = unbounded::<Quote>();
        if self.listener_tx.send(Listener { symbol, tx }).is_err() {
            debug!("Listener registered after the subscription closed");
        }
        rx
    }

    /// Current snapshot for `symbol`.
    pub fn quote(&self, symbol: &str) -> Option<Quote> {
        lock(&self.book).get(&symbol.trim().to_ascii_uppercase())
    }

    /// Current snapshots of all symbols, in subscription order.
    pub fn snapshot(&self) -> Vec<Quote> {
        lock(&self.book).snapshot()
    }

    /// Number of direction clears still scheduled.
    pub fn pending_clears(&self) -> usize {
        lock(&self.book).pending_clears()
    }

    /// Whether the subscription is still consuming its feed.
    pub fn state(&self) -> SubscriptionState {
        if self.closed.load(Ordering::SeqCst) {
            SubscriptionState::Closed
        } else {
            SubscriptionState::Active
        }
    }

    /// Closes the feed connection, cancels pending clears and stops the worker.
    ///
    /// Safe to call repeatedly; once it returns no further quote is emitted.
    pub fn unsubscribe(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Subscription worker panicked");
            }
            info!("Unsubscribed from {}", self.symbols.join(","));
        }
        // the worker may have died before cancelling
        lock(&self.book).cancel_all();
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Sends `quote` to every matching listener, pruning listeners that hung up.
fn emit(listeners: &mut Vec<Listener>, quote: &Quote) {
    listeners.retain(|listener| {
        let wanted = listener
            .symbol
            .as_ref()
            .is_none_or(|symbol| *symbol == quote.symbol);
        !wanted || listener.tx.send(quote.clone()).is_ok()
    });
}

/// Adds registrations queued so far, so they see the emission about to happen.
fn take_listeners(listener_rx: &Receiver<Listener>, listeners: &mut Vec<Listener>) {
    listeners.extend(listener_rx.try_iter());
}

/// Worker loop for one subscription.
///
/// Runs until a stop request arrives or the source closes. On exit it marks the
/// subscription closed, cancels pending clears and closes the source, and only
/// then drops the listeners so their receivers observe the closed state.
fn run_worker(
    mut source: Box<dyn FeedSource>,
    events: Receiver<FeedEvent>,
    stop_rx: Receiver<()>,
    listener_rx: Receiver<Listener>,
    book: Arc<Mutex<QuoteBook>>,
    closed: Arc<AtomicBool>,
) {
    let mut listeners: Vec<Listener> = Vec::new();

    loop {
        let timer = match lock(&book).next_deadline() {
            Some(deadline) => at(deadline),
            None => never(),
        };

        select! {
            recv(stop_rx) -> _ => break,
            recv(listener_rx) -> msg => if let Ok(listener) = msg {
                listeners.push(listener);
            },
            recv(events) -> event => match event {
                Ok(FeedEvent::Message(text)) => {
                    take_listeners(&listener_rx, &mut listeners);
                    match TickerTick::parse(&text) {
                        Ok(tick) => {
                            let symbol = tick.symbol.clone();
                            let applied = lock(&book).apply(tick, Instant::now());
                            match applied {
                                Some(quote) => emit(&mut listeners, &quote),
                                None => debug!("Ignoring tick for unsubscribed symbol {}", symbol),
                            }
                        }
                        Err(e) => debug!("Discarding frame: {}", e),
                    }
                }
                Ok(FeedEvent::Closed(reason)) => {
                    warn!("Feed closed: {}", reason.as_deref().unwrap_or("no reason given"));
                    break;
                }
                Err(_) => {
                    warn!("Feed channel disconnected");
                    break;
                }
            },
            recv(timer) -> _ => {
                take_listeners(&listener_rx, &mut listeners);
                let cleared = lock(&book).expire(Instant::now());
                debug!("Cleared direction on {} symbols", cleared.len());
                for quote in &cleared {
                    emit(&mut listeners, quote);
                }
            },
        }
    }

    closed.store(true, Ordering::SeqCst);
    lock(&book).cancel_all();
    source.close();
    drop(listeners);
}
