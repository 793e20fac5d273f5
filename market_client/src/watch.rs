//! `watch` action: stream quotes for a watchlist and print every update.
//!
//! The feed itself never reconnects; this loop re-subscribes after a feed loss,
//! waiting according to a `Backoff` that resets once a connection delivered data.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use log::{error, info, warn};
use market_common::format::{format_change, format_price};
use market_common::symbols::{Market, Watchlist, WatchlistParser, normalize_symbols};
use market_common::{MarketError, Quote, Result};
use market_feed::simulated::SimulatedSource;
use market_feed::websocket::WebSocketSource;
use market_feed::{Backoff, FeedConfig, FeedSource, QuoteFeed, Subscription};

use crate::args::WatchArgs;

/// How often blocking waits re-check the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Runs the watch loop until Ctrl+C, or until the feed is lost with `--no-reconnect`.
pub fn run(args: WatchArgs, shutdown: Arc<AtomicBool>) -> Result<()> {
    let symbols = resolve_symbols(&args)?;
    info!("Watching {}", symbols.join(", "));

    let feed = QuoteFeed::new(FeedConfig {
        endpoint: args.endpoint.clone(),
        flash_delay: Duration::from_millis(args.flash_ms),
        ..FeedConfig::default()
    });
    let tick = Duration::from_millis(args.tick_ms);
    let connect = || -> Box<dyn FeedSource> {
        if args.simulate {
            Box::new(SimulatedSource::new(tick))
        } else {
            Box::new(WebSocketSource::new(feed.config()))
        }
    };

    watch_loop(&feed, &symbols, &args, &shutdown, &mut Backoff::default(), connect)?;
    info!("Watch stopping...");
    Ok(())
}

/// Subscribes through a fresh source from `connect` after every feed loss,
/// waiting as long as `backoff` says.
fn watch_loop<F>(
    feed: &QuoteFeed,
    symbols: &[String],
    args: &WatchArgs,
    shutdown: &AtomicBool,
    backoff: &mut Backoff,
    mut connect: F,
) -> Result<()>
where
    F: FnMut() -> Box<dyn FeedSource>,
{
    while !shutdown.load(Ordering::Relaxed) {
        match feed.subscribe(connect(), symbols) {
            Ok(mut subscription) => {
                let received = start_receiver_loop(&subscription, shutdown, args.json)?;
                subscription.unsubscribe();
                if received > 0 {
                    backoff.reset();
                }
            }
            Err(e) if args.no_reconnect => return Err(e),
            Err(e) => error!("Subscription failed: {}", e),
        }

        if shutdown.load(Ordering::Relaxed) || args.no_reconnect {
            break;
        }
        let delay = backoff.next_delay();
        warn!("Feed lost. Re-subscribing in {:?}", delay);
        sleep_unless_shutdown(delay, shutdown);
    }
    Ok(())
}

/// Receives quotes from `subscription` and prints them until shutdown or feed loss.
///
/// Returns how many quotes were printed.
fn start_receiver_loop(
    subscription: &Subscription,
    shutdown: &AtomicBool,
    json: bool,
) -> Result<usize> {
    let rx = subscription.listen_all();
    let mut received = 0;

    while !shutdown.load(Ordering::Relaxed) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(quote) => {
                print_quote(&quote, json)?;
                received += 1;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(received)
}

fn print_quote(quote: &Quote, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(quote)?);
        return Ok(());
    }
    let name = quote
        .symbol
        .parse::<Market>()
        .map(|market| market.name())
        .unwrap_or_default();
    info!(
        "QUOTE: {:<10} {:>16} {:>8} {} {}",
        quote.symbol,
        format!("${}", format_price(quote.last_price)),
        format_change(quote.percent_change_24h),
        quote.direction.marker(),
        name
    );
    Ok(())
}

/// Symbols from `--path`, else `--symbols`, else the default markets list.
fn resolve_symbols(args: &WatchArgs) -> Result<Vec<String>> {
    if let Some(raw) = &args.path {
        let file_path = normalize_path(raw);
        if !is_file_exist(&file_path) {
            return Err(MarketError::ParseWatchlist(format!(
                "no such file: {}",
                file_path.display()
            )));
        }
        let symbols = Watchlist::parse_watchlist(BufReader::new(File::open(&file_path)?))?;
        if !symbols.is_empty() {
            return Ok(symbols);
        }
        warn!("{} lists no symbols, using the default markets", file_path.display());
    } else if !args.symbols.is_empty() {
        return normalize_symbols(&args.symbols);
    }
    Ok(Market::default_symbols())
}

fn sleep_unless_shutdown(delay: Duration, shutdown: &AtomicBool) {
    let until = Instant::now() + delay;
    while !shutdown.load(Ordering::Relaxed) {
        let left = until.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        thread::sleep(left.min(POLL_INTERVAL));
    }
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &Path) -> bool {
    path.exists() && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Args, Command};
    use clap::Parser;
    use market_feed::channel_source;

    fn watch_args(argv: &[&str]) -> WatchArgs {
        let mut full = vec!["market_client", "watch"];
        full.extend_from_slice(argv);
        match Args::parse_from(full).command {
            Command::Watch(args) => args,
            Command::Allocate(_) => panic!("parsed the wrong action"),
        }
    }

    #[test]
    fn defaults_to_markets_list() {
        let symbols = resolve_symbols(&watch_args(&[])).unwrap();
        assert_eq!(symbols, Market::default_symbols());
    }

    #[test]
    fn symbols_flag_is_normalized() {
        let symbols = resolve_symbols(&watch_args(&["--symbols", "btcusdt,ethusdt,btcusdt"])).unwrap();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn missing_watchlist_file_is_an_error() {
        let err = resolve_symbols(&watch_args(&["--path", "\"/definitely/not/here.txt\""])).unwrap_err();
        assert!(matches!(err, MarketError::ParseWatchlist(_)));
    }

    #[test]
    fn quoted_paths_are_unwrapped() {
        assert_eq!(normalize_path("  \"C:\\tickers.txt\" "), PathBuf::from("C:\\tickers.txt"));
        assert_eq!(normalize_path("list.txt"), PathBuf::from("list.txt"));
    }

    fn ticker(symbol: &str, price: f64) -> String {
        format!(r#"{{"s":"{}","c":"{}","P":"0.1"}}"#, symbol, price)
    }

    fn quick_backoff() -> Backoff {
        Backoff::new(Duration::from_millis(10), Duration::from_millis(80))
    }

    #[test]
    fn resubscribes_after_feed_loss_and_resets_backoff() {
        let args = watch_args(&["--symbols", "btcusdt"]);
        let symbols = resolve_symbols(&args).unwrap();
        let shutdown = AtomicBool::new(false);
        let mut backoff = quick_backoff();
        let mut opened = 0;
        let mut pushers = Vec::new();

        let connect = || -> Box<dyn FeedSource> {
            opened += 1;
            if opened == 3 {
                shutdown.store(true, Ordering::SeqCst);
            }
            let (feed, source) = channel_source();
            pushers.push(thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                feed.push(ticker("BTCUSDT", 68_000.0));
                feed.disconnect("server going away");
            }));
            Box::new(source)
        };
        watch_loop(&QuoteFeed::default(), &symbols, &args, &shutdown, &mut backoff, connect).unwrap();

        for pusher in pushers {
            pusher.join().unwrap();
        }
        assert_eq!(opened, 3);
        // reset after each delivering subscription, then one step
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
    }

    #[test]
    fn silent_feeds_keep_growing_the_delay() {
        let args = watch_args(&["--symbols", "ethusdt"]);
        let symbols = resolve_symbols(&args).unwrap();
        let shutdown = AtomicBool::new(false);
        let mut backoff = quick_backoff();
        let mut opened = 0;

        let connect = || -> Box<dyn FeedSource> {
            opened += 1;
            if opened == 4 {
                shutdown.store(true, Ordering::SeqCst);
            }
            let (feed, source) = channel_source();
            feed.disconnect("rejected");
            Box::new(source)
        };
        watch_loop(&QuoteFeed::default(), &symbols, &args, &shutdown, &mut backoff, connect).unwrap();

        assert_eq!(opened, 4);
        assert_eq!(backoff.next_delay(), Duration::from_millis(80));
    }

    #[test]
    fn no_reconnect_stops_after_first_loss() {
        let args = watch_args(&["--symbols", "solusdt", "--no-reconnect"]);
        let symbols = resolve_symbols(&args).unwrap();
        let shutdown = AtomicBool::new(false);
        let mut opened = 0;

        let connect = || -> Box<dyn FeedSource> {
            opened += 1;
            let (feed, source) = channel_source();
            feed.disconnect("gone");
            Box::new(source)
        };
        watch_loop(&QuoteFeed::default(), &symbols, &args, &shutdown, &mut quick_backoff(), connect).unwrap();

        assert_eq!(opened, 1);
    }

    #[test]
    fn simulated_watch_stops_on_shutdown() {
        let args = watch_args(&["--simulate", "--tick-ms", "5", "--symbols", "solusdt"]);
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            flag.store(true, Ordering::SeqCst);
        });
        run(args, shutdown).unwrap();
        stopper.join().unwrap();
    }
}
