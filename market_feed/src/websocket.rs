//! Exchange websocket source.
//!
//! Connects to the raw ticker stream for every requested symbol on a single
//! socket and forwards text frames to the subscription worker from a reader
//! thread. The socket carries a short read timeout so the reader notices a
//! close request without waiting for the next tick.

use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info, warn};
use market_common::net::stream_url;
use market_common::{MarketError, Result};
use tungstenite::client::{IntoClientRequest, uri_mode};
use tungstenite::stream::{MaybeTlsStream, Mode};
use tungstenite::{HandshakeError, Message, WebSocket};

use crate::config::FeedConfig;
use crate::source::{FeedEvent, FeedSource};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Websocket connection to a ticker stream endpoint.
pub struct WebSocketSource {
    endpoint: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl WebSocketSource {
    /// Create a source for the endpoint and timeouts in `config`.
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            shutdown: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(match last_error {
        Some(e) => MarketError::Io(e),
        None => MarketError::Connect(format!("{} did not resolve", host)),
    })
}

/// Connects to `url` and runs the websocket handshake.
///
/// The TCP connect is bounded by `timeout`. For `ws://` endpoints the upgrade
/// exchange is bounded too. A `wss://` handshake runs without a read timeout,
/// since the TLS layer cannot resume after a timed-out read.
fn connect(url: &str, timeout: Duration) -> Result<Socket> {
    let request = url.into_client_request()?;
    let mode = uri_mode(request.uri())?;
    let host = request
        .uri()
        .host()
        .ok_or_else(|| MarketError::Connect(format!("no host in {}", url)))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_owned();
    let port = request.uri().port_u16().unwrap_or(match mode {
        Mode::Plain => 80,
        Mode::Tls => 443,
    });

    let stream = connect_tcp(&host, port, timeout)?;
    stream.set_write_timeout(Some(timeout))?;
    if let Mode::Plain = mode {
        stream.set_read_timeout(Some(timeout))?;
    }

    let (socket, response) = tungstenite::client_tls(request, stream).map_err(|e| match e {
        HandshakeError::Failure(e) => MarketError::WebSocket(e),
        HandshakeError::Interrupted(_) => {
            MarketError::Connect(format!("handshake with {} timed out", host))
        }
    })?;
    info!("Stream connected (HTTP {})", response.status());
    Ok(socket)
}

fn set_read_timeout(socket: &Socket, timeout: Duration) -> Result<()> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout))?,
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(Some(timeout))?,
        _ => warn!("Unknown websocket stream kind; close will wait for the next frame"),
    }
    Ok(())
}

/// Blocking loop that reads frames from `socket` and forwards text frames to `tx`
/// until `shutdown` is raised, the remote side closes, or the worker goes away.
fn start_reader_loop(mut socket: Socket, tx: Sender<FeedEvent>, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::Relaxed) {
        match socket.read() {
            Ok(Message::Text(text)) => {
                if tx.send(FeedEvent::Message(text.as_str().to_owned())).is_err() {
                    break;
                }
            }
            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| f.reason.as_str().to_owned());
                info!("Stream closed by server: {:?}", reason);
                let _ = tx.send(FeedEvent::Closed(reason));
                // the next read sends the queued close reply
                drain(&mut socket);
                return;
            }
            Ok(other) => debug!("Ignoring non-text frame ({} bytes)", other.len()),
            Err(tungstenite::Error::Io(e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                error!("Stream read error: {}", e);
                let _ = tx.send(FeedEvent::Closed(Some(e.to_string())));
                return;
            }
        }
    }

    debug!("Reader loop stopping...");
    if let Err(e) = socket.close(None) {
        debug!("Close handshake not sent: {}", e);
    }
    drain(&mut socket);
}

/// Reads until the closing handshake finishes or the read timeout trips.
fn drain(socket: &mut Socket) {
    while socket.read().is_ok() {}
}

impl FeedSource for WebSocketSource {
    fn open(&mut self, symbols: &[String]) -> Result<Receiver<FeedEvent>> {
        if self.reader.is_some() {
            return Err(MarketError::SourceAlreadyOpen);
        }
        let url = stream_url(&self.endpoint, symbols)?;
        info!("Connecting to {}", url);
        let socket = connect(&url, self.connect_timeout)?;
        set_read_timeout(&socket, self.read_timeout)?;

        let (tx, rx) = unbounded::<FeedEvent>();
        let shutdown = Arc::clone(&self.shutdown);
        self.reader = Some(thread::spawn(move || start_reader_loop(socket, tx, shutdown)));
        Ok(rx)
    }

    fn close(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                error!("Stream reader thread panicked");
            }
            info!("Stream connection closed");
        }
    }
}

impl Drop for WebSocketSource {
    fn drop(&mut self) {
        self.close();
    }
}
