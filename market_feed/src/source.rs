//! Feed source seam.
//!
//! A `FeedSource` opens one connection for a symbol set and hands back a
//! channel of raw text frames. The subscription worker never touches the
//! transport directly, so tests and embedders can push frames through a
//! [`ChannelSource`] instead of a socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use market_common::{MarketError, Result};

/// Event produced by a feed connection.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// One text frame, not yet decoded.
    Message(String),
    /// The connection is gone; carries the reason when one is known.
    Closed(Option<String>),
}

/// A push-based connection delivering ticker frames.
pub trait FeedSource: Send {
    /// Opens the connection for `symbols` and returns its frame channel.
    ///
    /// Called once per subscription, before the worker starts.
    fn open(&mut self, symbols: &[String]) -> Result<Receiver<FeedEvent>>;

    /// Closes the connection. Must tolerate being called more than once.
    fn close(&mut self);
}

impl<T: FeedSource + ?Sized> FeedSource for Box<T> {
    fn open(&mut self, symbols: &[String]) -> Result<Receiver<FeedEvent>> {
        (**self).open(symbols)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// In-process source fed through a [`ChannelFeed`].
pub struct ChannelSource {
    rx: Option<Receiver<FeedEvent>>,
    closed: Arc<AtomicBool>,
}

/// Producer side of a [`ChannelSource`].
#[derive(Clone)]
pub struct ChannelFeed {
    tx: Sender<FeedEvent>,
    closed: Arc<AtomicBool>,
}

/// Creates a connected producer/source pair.
pub fn channel_source() -> (ChannelFeed, ChannelSource) {
    let (tx, rx) = unbounded::<FeedEvent>();
    let closed = Arc::new(AtomicBool::new(false));
    (
        ChannelFeed {
            tx,
            closed: Arc::clone(&closed),
        },
        ChannelSource {
            rx: Some(rx),
            closed,
        },
    )
}

impl ChannelFeed {
    /// Pushes one text frame. Returns `false` once the subscription side is gone.
    pub fn push(&self, text: impl Into<String>) -> bool {
        !self.is_closed() && self.tx.send(FeedEvent::Message(text.into())).is_ok()
    }

    /// Simulates the remote end dropping the connection.
    pub fn disconnect(&self, reason: &str) -> bool {
        self.tx
            .send(FeedEvent::Closed(Some(reason.to_string())))
            .is_ok()
    }

    /// True after the subscription closed its side.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl FeedSource for ChannelSource {
    fn open(&mut self, _symbols: &[String]) -> Result<Receiver<FeedEvent>> {
        self.rx.take().ok_or(MarketError::SourceAlreadyOpen)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_source_opens_once() {
        let (feed, mut source) = channel_source();
        let rx = source.open(&[String::from("BTCUSDT")]).unwrap();
        assert!(feed.push("frame"));
        assert_eq!(rx.recv().unwrap(), FeedEvent::Message(String::from("frame")));
        assert!(matches!(
            source.open(&[]),
            Err(MarketError::SourceAlreadyOpen)
        ));
    }

    #[test]
    fn close_is_visible_to_producer() {
        let (feed, mut source) = channel_source();
        let _rx = source.open(&[]).unwrap();
        source.close();
        source.close();
        assert!(feed.is_closed());
        assert!(!feed.push("late"));
    }
}
