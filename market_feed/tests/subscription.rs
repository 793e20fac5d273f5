use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use market_common::{Direction, MarketError, Quote};
use market_feed::{ChannelFeed, FeedConfig, QuoteFeed, Subscription, SubscriptionState, channel_source};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(150);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn frame(symbol: &str, price: f64, change: f64) -> String {
    format!(r#"{{"e":"24hrTicker","s":"{}","c":"{}","P":"{}"}}"#, symbol, price, change)
}

fn feed_with_flash(flash_ms: u64) -> QuoteFeed {
    QuoteFeed::new(FeedConfig {
        flash_delay: Duration::from_millis(flash_ms),
        ..FeedConfig::default()
    })
}

fn open(flash_ms: u64, symbols: &[&str]) -> (ChannelFeed, Subscription) {
    init_logger();
    let (feed, source) = channel_source();
    let subscription = feed_with_flash(flash_ms)
        .subscribe(source, symbols.iter().copied())
        .unwrap();
    (feed, subscription)
}

fn next(rx: &Receiver<Quote>) -> Quote {
    rx.recv_timeout(WAIT).expect("expected a quote")
}

#[test]
fn emits_latest_price_in_arrival_order() {
    let (feed, subscription) = open(60_000, &["BTCUSDT"]);
    let rx = subscription.listen("BTCUSDT");

    let prices = [68_000.5, 68_010.0, 67_990.25, 67_990.25];
    for price in prices {
        assert!(feed.push(frame("BTCUSDT", price, -1.32)));
    }

    let received: Vec<f64> = prices.iter().map(|_| next(&rx).last_price).collect();
    assert_eq!(received, prices);
    assert_eq!(subscription.quote("btcusdt").unwrap().last_price, 67_990.25);
    assert_eq!(subscription.quote("BTCUSDT").unwrap().percent_change_24h, -1.32);
}

#[test]
fn direction_follows_previous_tick() {
    let (feed, subscription) = open(60_000, &["ETHUSDT"]);
    let rx = subscription.listen_all();

    for price in [3_500.0, 3_501.0, 3_499.0, 3_499.0] {
        feed.push(frame("ETHUSDT", price, 0.4));
    }

    let directions: Vec<Direction> = (0..4).map(|_| next(&rx).direction).collect();
    assert_eq!(
        directions,
        vec![Direction::None, Direction::Up, Direction::Down, Direction::None]
    );
    assert_eq!(subscription.pending_clears(), 0);
}

#[test]
fn direction_reverts_after_flash_delay() {
    let (feed, subscription) = open(50, &["SOLUSDT"]);
    let rx = subscription.listen("SOLUSDT");

    feed.push(frame("SOLUSDT", 150.0, 1.0));
    assert_eq!(next(&rx).direction, Direction::None);

    let sent = Instant::now();
    feed.push(frame("SOLUSDT", 151.0, 1.5));
    let up = next(&rx);
    assert_eq!(up.direction, Direction::Up);

    let cleared = next(&rx);
    assert!(sent.elapsed() >= Duration::from_millis(50));
    assert_eq!(cleared.direction, Direction::None);
    assert_eq!(cleared.last_price, 151.0);
    assert_eq!(subscription.quote("SOLUSDT").unwrap().direction, Direction::None);
    assert_eq!(subscription.pending_clears(), 0);
}

#[test]
fn listener_added_before_a_clear_receives_it() {
    let (feed, subscription) = open(100, &["BNBUSDT"]);
    let early = subscription.listen("BNBUSDT");

    feed.push(frame("BNBUSDT", 600.0, 0.1));
    feed.push(frame("BNBUSDT", 601.0, 0.2));
    next(&early);
    assert_eq!(next(&early).direction, Direction::Up);

    let late = subscription.listen("BNBUSDT");
    let cleared = next(&late);
    assert_eq!(cleared.direction, Direction::None);
    assert_eq!(cleared.last_price, 601.0);
    assert_eq!(next(&early), cleared);
}

#[test]
fn ticks_only_reach_matching_listeners() {
    let (feed, subscription) = open(60_000, &["BTCUSDT", "ETHUSDT"]);
    let btc = subscription.listen("BTCUSDT");
    let eth = subscription.listen("ETHUSDT");

    feed.push(frame("ETHUSDT", 3_500.0, 2.0));

    assert_eq!(next(&eth).symbol, "ETHUSDT");
    assert_eq!(btc.recv_timeout(QUIET), Err(RecvTimeoutError::Timeout));
    assert_eq!(subscription.quote("BTCUSDT").unwrap(), Quote::neutral("BTCUSDT"));
}

#[test]
fn noise_is_discarded_silently() {
    let (feed, subscription) = open(60_000, &["XRPUSDT"]);
    let rx = subscription.listen_all();

    feed.push("not json at all");
    feed.push(r#"{"result":null,"id":1}"#);
    feed.push(frame("DOGEUSDT", 0.1, 3.0));
    feed.push(frame("XRPUSDT", 0.55, -0.5));

    let quote = next(&rx);
    assert_eq!(quote.symbol, "XRPUSDT");
    assert_eq!(quote.last_price, 0.55);
    assert_eq!(rx.recv_timeout(QUIET), Err(RecvTimeoutError::Timeout));
    assert_eq!(subscription.state(), SubscriptionState::Active);
}

#[test]
fn unsubscribe_silences_and_cancels_timers() {
    let (feed, mut subscription) = open(60_000, &["BNBUSDT"]);
    let rx = subscription.listen("BNBUSDT");

    feed.push(frame("BNBUSDT", 600.0, 0.1));
    feed.push(frame("BNBUSDT", 601.0, 0.2));
    next(&rx);
    assert_eq!(next(&rx).direction, Direction::Up);
    assert_eq!(subscription.pending_clears(), 1);

    subscription.unsubscribe();
    assert!(feed.is_closed());
    assert_eq!(subscription.pending_clears(), 0);
    assert_eq!(subscription.state(), SubscriptionState::Closed);

    assert!(!feed.push(frame("BNBUSDT", 602.0, 0.3)));
    assert_eq!(rx.recv_timeout(QUIET), Err(RecvTimeoutError::Disconnected));

    subscription.unsubscribe();
    let late = subscription.listen("BNBUSDT");
    assert_eq!(late.recv_timeout(QUIET), Err(RecvTimeoutError::Disconnected));
}

#[test]
fn feed_loss_closes_the_subscription() {
    let (feed, subscription) = open(60_000, &["BTCUSDT"]);
    let rx = subscription.listen_all();

    feed.push(frame("BTCUSDT", 68_000.0, 0.0));
    next(&rx);
    assert!(feed.disconnect("server going away"));

    assert_eq!(rx.recv_timeout(WAIT), Err(RecvTimeoutError::Disconnected));
    assert_eq!(subscription.state(), SubscriptionState::Closed);
    assert!(feed.is_closed());
    assert_eq!(subscription.quote("BTCUSDT").unwrap().last_price, 68_000.0);
}

#[test]
fn dropping_the_handle_closes_the_source() {
    let (feed, subscription) = open(60_000, &["BTCUSDT"]);
    drop(subscription);
    assert!(feed.is_closed());
}

#[test]
fn independent_subscriptions_do_not_interfere() {
    let (feed_a, mut sub_a) = open(60_000, &["BTCUSDT"]);
    let (feed_b, sub_b) = open(60_000, &["BTCUSDT"]);
    let rx_a = sub_a.listen_all();
    let rx_b = sub_b.listen_all();

    feed_a.push(frame("BTCUSDT", 1.0, 0.0));
    assert_eq!(next(&rx_a).last_price, 1.0);
    assert_eq!(rx_b.recv_timeout(QUIET), Err(RecvTimeoutError::Timeout));

    sub_a.unsubscribe();
    feed_b.push(frame("BTCUSDT", 2.0, 0.0));
    assert_eq!(next(&rx_b).last_price, 2.0);
    assert_eq!(sub_b.state(), SubscriptionState::Active);
}

#[test]
fn subscribe_normalizes_symbols_and_rejects_empty_sets() {
    init_logger();
    let (_feed, source) = channel_source();
    let subscription = QuoteFeed::default()
        .subscribe(source, ["ethusdt", "BTCUSDT", "ETHUSDT"])
        .unwrap();
    assert_eq!(subscription.symbols(), ["ETHUSDT", "BTCUSDT"]);
    let symbols: Vec<String> = subscription.snapshot().into_iter().map(|q| q.symbol).collect();
    assert_eq!(symbols, vec!["ETHUSDT", "BTCUSDT"]);

    let (_feed, source) = channel_source();
    let none: [&str; 0] = [];
    assert!(matches!(
        QuoteFeed::default().subscribe(source, none),
        Err(MarketError::EmptySubscription)
    ));
}
