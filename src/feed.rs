//! # Emotion Feed Module
//!
//! Client side of the classifier connection. The classifier pushes raw
//! `label:score` text over TCP with no framing; the feed picks up whatever
//! bytes are waiting on each poll and keeps only the newest valid reading.
//!
//! ## Polling Model
//!
//! [`EmotionFeed::poll`] never blocks. The host calls it on a fixed cadence
//! (40 ms by default) whether or not data is waiting. A read may hold half a
//! message or several messages glued together; such frames fail to parse and
//! are dropped, exactly like any other malformed frame.
//!
//! ## Failure Handling
//!
//! - Connection failures are logged and leave the feed disconnected
//! - While disconnected, the feed retries at most once per reconnect interval
//! - Retries run on a helper thread; a later poll adopts the new stream
//! - The live emotion keeps its last value across disconnects
//!
//! Nothing here is fatal to the caller.

use crate::emotion::{parse_frame, EmotionEvent, EmotionSource};
use log::{debug, error, info, trace, warn};
use std::io::{self, ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Bytes taken from the socket per poll.
pub const READ_BUFFER_SIZE: usize = 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("could not connect to classifier at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("classifier address {0} did not resolve to any socket address")]
    Unresolved(String),
    #[error("classifier connection failed: {0}")]
    Io(#[from] io::Error),
}

/// Live view of the classifier stream.
#[derive(Debug)]
pub struct EmotionFeed {
    address: String,
    stream: Option<TcpStream>,
    current: EmotionEvent,
    reconnect_interval: Duration,
    last_attempt: Option<Instant>,
    pending: Option<Receiver<Result<TcpStream, FeedError>>>,
    buffer: Vec<u8>,
}

impl EmotionFeed {
    /// Creates a disconnected feed.
    ///
    /// Nothing touches the network until [`connect`](Self::connect) or the
    /// first [`poll`](Self::poll). Polling starts connection attempts on its
    /// own, so a host may skip `connect` entirely.
    ///
    /// # Arguments
    ///
    /// * `address` - `host:port` of the classifier
    /// * `reconnect_interval` - Minimum time between two connection attempts
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::feed::EmotionFeed;
    /// use std::time::Duration;
    ///
    /// let feed = EmotionFeed::new("localhost:8080", Duration::from_secs(5));
    /// assert!(!feed.is_connected());
    /// assert_eq!(feed.current_emotion().label, "neutral");
    /// ```
    pub fn new(address: impl Into<String>, reconnect_interval: Duration) -> Self {
        Self {
            address: address.into(),
            stream: None,
            current: EmotionEvent::default(),
            reconnect_interval,
            last_attempt: None,
            pending: None,
            buffer: vec![0; READ_BUFFER_SIZE],
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the classifier connection, blocking for up to the connect
    /// timeout per resolved address.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Connect`] when no resolved address accepts the
    /// connection. The failure is also logged; the feed stays disconnected
    /// and its live emotion is untouched.
    pub fn connect(&mut self) -> Result<(), FeedError> {
        self.last_attempt = Some(Instant::now());
        self.pending = None;

        match open_stream(&self.address) {
            Ok(stream) => {
                info!("Connected to emotion classifier at {}", self.address);
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                error!("Socket error: {e}");
                self.stream = None;
                Err(e)
            }
        }
    }

    /// Starts a connection attempt on a helper thread.
    fn begin_connect(&mut self, now: Instant) {
        debug!("Retrying classifier connection to {}", self.address);
        self.last_attempt = Some(now);

        let (tx, rx) = mpsc::channel();
        let address = self.address.clone();
        thread::spawn(move || {
            // The feed may be gone by the time the attempt finishes.
            tx.send(open_stream(&address)).ok();
        });
        self.pending = Some(rx);
    }

    /// Adopts the outcome of a finished background attempt, if any.
    fn finish_connect(&mut self) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };

        match pending.try_recv() {
            Ok(Ok(stream)) => {
                info!("Connected to emotion classifier at {}", self.address);
                self.stream = Some(stream);
                self.pending = None;
            }
            Ok(Err(e)) => {
                error!("Socket error: {e}");
                self.pending = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                warn!("Connection attempt to {} ended without a result", self.address);
                self.pending = None;
            }
        }
    }

    /// Whether a background connection attempt is in flight.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops the connection. The live emotion is kept.
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            info!("Disconnected from emotion classifier at {}", self.address);
        }
    }

    /// One cooperative poll: reconnect if due, then take whatever bytes are
    /// waiting. Returns `true` if the live emotion changed.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    /// [`poll`](Self::poll) against an explicit clock, for hosts that keep
    /// their own time.
    ///
    /// # Behavior
    ///
    /// - Connected: one non-blocking read of up to [`READ_BUFFER_SIZE`] bytes
    /// - Disconnected with an attempt in flight: adopts the stream if the
    ///   attempt has finished, otherwise returns at once
    /// - Disconnected and idle: starts a background attempt once
    ///   `reconnect_interval` has passed since the last one
    ///
    /// No branch waits on the network.
    ///
    /// # Returns
    ///
    /// `true` if a frame was accepted and the live emotion replaced.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        if self.stream.is_none() {
            self.finish_connect();
        }
        if self.stream.is_none() {
            if self.pending.is_none() && self.reconnect_due(now) {
                self.begin_connect(now);
            }
            return false;
        }

        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        match stream.read(&mut self.buffer) {
            Ok(0) => {
                warn!("Emotion classifier closed the connection");
                self.disconnect();
                false
            }
            Ok(read) => {
                let frame = String::from_utf8_lossy(&self.buffer[..read]).into_owned();
                self.ingest(&frame)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) if e.kind() == ErrorKind::Interrupted => false,
            Err(e) => {
                error!("Emotion classifier read failed: {e}");
                self.disconnect();
                false
            }
        }
    }

    fn reconnect_due(&self, now: Instant) -> bool {
        self.last_attempt
            .map_or(true, |last| now.saturating_duration_since(last) >= self.reconnect_interval)
    }

    /// Applies one raw frame. Malformed frames leave the live emotion as it
    /// was. Returns `true` if the frame was accepted.
    pub fn ingest(&mut self, frame: &str) -> bool {
        match parse_frame(frame) {
            Ok(event) => {
                trace!("Emotion update: {event}");
                self.current = event;
                true
            }
            Err(e) => {
                trace!("Dropping classifier frame {frame:?}: {e}");
                false
            }
        }
    }

    /// Latest accepted reading, or `neutral: 0` before the first one.
    #[must_use]
    pub fn current_emotion(&self) -> &EmotionEvent {
        &self.current
    }
}

fn open_stream(address: &str) -> Result<TcpStream, FeedError> {
    let addrs = address.to_socket_addrs().map_err(|source| FeedError::Connect {
        address: address.to_string(),
        source,
    })?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                stream.set_nonblocking(true)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }

    match last_error {
        Some(source) => Err(FeedError::Connect {
            address: address.to_string(),
            source,
        }),
        None => Err(FeedError::Unresolved(address.to_string())),
    }
}

impl EmotionSource for EmotionFeed {
    fn current_emotion(&self) -> &EmotionEvent {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    fn offline_feed() -> EmotionFeed {
        EmotionFeed::new("127.0.0.1:9", Duration::from_secs(60))
    }

    #[test]
    fn test_new_feed_reports_neutral() {
        let feed = offline_feed();
        assert!(!feed.is_connected());
        assert_eq!(feed.current_emotion(), &EmotionEvent::new("neutral", 0.0));
    }

    #[test]
    fn test_malformed_frame_keeps_previous_value() {
        let mut feed = offline_feed();
        assert!(feed.ingest("happy:80"));
        assert!(!feed.ingest("garbage"));
        assert!(!feed.ingest("sad:not-a-number"));

        assert_eq!(feed.current_emotion(), &EmotionEvent::new("happy", 80.0));
    }

    #[test]
    fn test_connect_failure_is_reported_and_not_fatal() {
        // Bind then drop so the port is known to be closed.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut feed = EmotionFeed::new(format!("127.0.0.1:{port}"), Duration::from_secs(60));
        feed.ingest("sad:20");

        let result = feed.connect();
        assert!(matches!(result, Err(FeedError::Connect { .. })));
        assert!(!feed.is_connected());
        assert_eq!(feed.current_emotion().label, "sad", "live emotion survives a failed connect");
    }

    #[test]
    fn test_reconnect_waits_for_interval() {
        let mut feed = offline_feed();
        let start = Instant::now();
        feed.last_attempt = Some(start);

        assert!(!feed.reconnect_due(start + Duration::from_secs(1)));
        assert!(feed.reconnect_due(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_poll_reads_frames_from_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let address = listener.local_addr().unwrap().to_string();

        let mut feed = EmotionFeed::new(address, Duration::from_secs(60));
        feed.connect().expect("Failed to connect to local listener");
        let (mut server, _) = listener.accept().unwrap();

        assert!(!feed.poll(), "no data yet means no change");

        server.write_all(b"happy:72.5").unwrap();
        server.flush().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !feed.poll() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(feed.current_emotion(), &EmotionEvent::new("happy", 72.5));
    }

    #[test]
    fn test_poll_detects_closed_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut feed = EmotionFeed::new(listener.local_addr().unwrap().to_string(), Duration::from_secs(60));
        feed.connect().unwrap();
        let (server, _) = listener.accept().unwrap();
        drop(server);

        let deadline = Instant::now() + Duration::from_secs(2);
        while feed.is_connected() && Instant::now() < deadline {
            feed.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!feed.is_connected());
        assert_eq!(feed.current_emotion().label, "neutral");
    }

    #[test]
    fn test_poll_never_waits_on_connect() {
        let mut feed = offline_feed();
        let start = Instant::now();

        assert!(!feed.poll_at(start));
        assert!(feed.is_connecting());
        assert!(start.elapsed() < Duration::from_millis(500), "poll blocked on connect");
    }

    #[test]
    fn test_poll_reconnects_after_interval() {
        let interval = Duration::from_millis(200);
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut feed = EmotionFeed::new(format!("127.0.0.1:{port}"), interval);
        feed.ingest("sad:20");

        assert!(feed.connect().is_err());
        let start = Instant::now();

        let listener = TcpListener::bind(("127.0.0.1", port)).expect("Failed to rebind classifier port");

        // Too early: no attempt is started.
        assert!(!feed.poll_at(start));
        assert!(!feed.is_connecting());

        let deadline = Instant::now() + Duration::from_secs(2);
        while !feed.is_connected() && Instant::now() < deadline {
            feed.poll_at(start + interval);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(feed.is_connected(), "feed should reconnect once the interval passes");
        assert_eq!(feed.current_emotion().label, "sad", "live emotion survives the outage");

        let (mut server, _) = listener.accept().unwrap();
        server.write_all(b"happy:64").unwrap();
        server.flush().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !feed.poll_at(start + interval) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(feed.current_emotion(), &EmotionEvent::new("happy", 64.0));
    }
}
