//! Server-sent-events push channel with auto-reconnect.
//!
//! Subscribes to the backend's `notifications/subscribe` endpoint and
//! streams decoded events through a [`tokio::sync::broadcast`] channel.
//! Drops are expected (the server times idle emitters out), so the loop
//! reconnects with exponential backoff + jitter on its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use stationflow_api::events::{PushChannelHandle, PushEvent, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let handle = PushChannelHandle::connect(
//!     client.http().clone(),
//!     client.push_url()?,
//!     ReconnectConfig::default(),
//!     CancellationToken::new(),
//! );
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     if let PushEvent::StationUpdate(station) = event.as_ref() {
//!         println!("{} now has {} available", station.name, station.available);
//!     }
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderValue};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::StationRecord;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Event name carrying a full station record.
pub const STATION_UPDATE_EVENT: &str = "station-update";
/// Event name of the liveness ping.
pub const HEARTBEAT_EVENT: &str = "heartbeat";

// ── PushEvent ────────────────────────────────────────────────────────

/// A decoded event from the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A station changed; the payload is the full record.
    StationUpdate(StationRecord),
    /// Liveness ping. Carries no data worth keeping.
    Heartbeat,
    /// Any other named event, passed through undecoded.
    Other { event: String, data: String },
}

/// Connection state of the push channel, published through a `watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    Connecting,
    Connected,
    /// Waiting out a backoff delay before attempt number `attempt`.
    Reconnecting { attempt: u32 },
    Closed,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for push reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── PushChannelHandle ────────────────────────────────────────────────

/// Handle to a running push subscription.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`connect`](Self::connect)) to tear down the background task.
pub struct PushChannelHandle {
    event_rx: broadcast::Receiver<Arc<PushEvent>>,
    status_rx: watch::Receiver<PushStatus>,
    cancel: CancellationToken,
}

impl PushChannelHandle {
    /// Spawn the subscribe-and-reconnect loop.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. `http` should have no request timeout (see
    /// [`TransportConfig::streaming`](crate::TransportConfig::streaming)).
    pub fn connect(
        http: reqwest::Client,
        url: Url,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(PushStatus::Connecting);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            push_loop(http, url, event_tx, status_tx, reconnect, task_cancel).await;
        });

        Self {
            event_rx,
            status_rx,
            cancel,
        }
    }

    /// Get a new receiver for the event stream.
    ///
    /// A consumer that falls behind gets
    /// [`broadcast::error::RecvError::Lagged`] and should resync.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushEvent>> {
        self.event_rx.resubscribe()
    }

    /// Watch the connection state.
    pub fn status(&self) -> watch::Receiver<PushStatus> {
        self.status_rx.clone()
    }

    /// Signal the background task to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// State carried across connections.
#[derive(Debug, Default)]
struct StreamState {
    attempt: u32,
    last_event_id: Option<String>,
    server_retry: Option<Duration>,
}

async fn push_loop(
    http: reqwest::Client,
    url: Url,
    event_tx: broadcast::Sender<Arc<PushEvent>>,
    status_tx: watch::Sender<PushStatus>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut state = StreamState::default();

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&http, &url, &event_tx, &status_tx, &mut state) => result,
        };

        let delay = match result {
            // The server ended the stream (emitter timeout). Reconnect after
            // the server-advertised retry interval, or the base delay.
            Ok(()) => {
                tracing::info!("push channel closed by server, reconnecting");
                state.attempt = 0;
                state.server_retry.unwrap_or(reconnect.initial_delay)
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt = state.attempt, "push channel error");

                if let Some(max) = reconnect.max_retries {
                    if state.attempt >= max {
                        tracing::error!(max_retries = max, "push reconnection limit reached, giving up");
                        break;
                    }
                }
                calculate_backoff(state.attempt, &reconnect)
            }
        };

        state.attempt = state.attempt.saturating_add(1);
        status_tx.send_replace(PushStatus::Reconnecting {
            attempt: state.attempt,
        });
        tracing::debug!(delay_ms = delay.as_millis(), attempt = state.attempt, "waiting before reconnect");

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    status_tx.send_replace(PushStatus::Closed);
    tracing::debug!("push loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect_and_read(
    http: &reqwest::Client,
    url: &Url,
    event_tx: &broadcast::Sender<Arc<PushEvent>>,
    status_tx: &watch::Sender<PushStatus>,
    state: &mut StreamState,
) -> Result<(), Error> {
    tracing::info!(url = %url, "subscribing to push channel");

    let mut request = http
        .get(url.clone())
        .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
        .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Some(id) = &state.last_event_id {
        request = request.header("Last-Event-ID", id.as_str());
    }

    let mut resp = request
        .send()
        .await
        .map_err(|e| Error::PushConnect(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::PushConnect(format!("HTTP {status}")));
    }

    tracing::info!("push channel connected");
    status_tx.send_replace(PushStatus::Connected);
    state.attempt = 0;

    let mut decoder = SseDecoder::default();
    loop {
        match resp.chunk().await {
            Ok(Some(bytes)) => {
                for frame in decoder.feed(&bytes) {
                    if frame.id.is_some() {
                        state.last_event_id.clone_from(&frame.id);
                    }
                    broadcast_frame(frame, event_tx);
                }
                if decoder.retry.is_some() {
                    state.server_retry = decoder.retry;
                }
            }
            Ok(None) => return Ok(()),
            Err(e) => return Err(Error::PushConnect(e.to_string())),
        }
    }
}

// ── SSE decoding ─────────────────────────────────────────────────────

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` decoder.
///
/// Accepts arbitrary chunk boundaries, `\n` or `\r\n` line endings,
/// comment lines, and multi-line `data:` fields.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: BytesMut,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    /// Most recent `retry:` value sent by the server.
    pub retry: Option<Duration>,
}

impl SseDecoder {
    /// Feed a chunk of bytes, returning every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw = self.buf.split_to(pos);
            self.buf.advance(1);
            let line = String::from_utf8_lossy(&raw);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
        }

        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            "id" => self.id = Some(value.to_owned()),
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            other => tracing::trace!(field = other, "ignoring unknown SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.unwrap_or_else(|| "message".to_owned()),
            data,
            id,
        })
    }
}

// ── Event parsing ────────────────────────────────────────────────────

/// Decode a dispatched frame into a [`PushEvent`].
///
/// Malformed `station-update` payloads are dropped with a warning.
pub(crate) fn decode_frame(frame: SseFrame) -> Option<PushEvent> {
    match frame.event.as_str() {
        STATION_UPDATE_EVENT => match serde_json::from_str::<StationRecord>(&frame.data) {
            Ok(station) => Some(PushEvent::StationUpdate(station)),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed station-update payload");
                None
            }
        },
        HEARTBEAT_EVENT => Some(PushEvent::Heartbeat),
        _ => Some(PushEvent::Other {
            event: frame.event,
            data: frame.data,
        }),
    }
}

fn broadcast_frame(frame: SseFrame, event_tx: &broadcast::Sender<Arc<PushEvent>>) {
    if let Some(event) = decode_frame(frame) {
        // No receivers right now is fine.
        let _ = event_tx.send(Arc::new(event));
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 ± 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic spread seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────
