//! Server-sent event stream with auto-reconnect.
//!
//! Opens the store's streaming endpoint for a path (`GET <path>.json` with
//! `Accept: text/event-stream`) and broadcasts parsed [`StoreEvent`]s
//! through a [`tokio::sync::broadcast`] channel. Every (re)connect starts
//! with a full `put` at `/`, so consumers resynchronize without extra work.
//! Reconnection uses exponential backoff with jitter.
//!
//! # Example
//!
//! ```rust,ignore
//! use relevancy_api::events::{EventStreamHandle, ReconnectConfig};
//! use relevancy_api::TransportConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let url = client.url_for(&StorePath::site("acme")?)?;
//! let handle = EventStreamHandle::connect(url, &TransportConfig::default(),
//!     ReconnectConfig::default(), cancel.clone())?;
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, redact};
use crate::transport::TransportConfig;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── StoreEvent ───────────────────────────────────────────────────────

/// A data change reported by the store, relative to the streamed path.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Replace the node at `path` with `data` (`null` deletes it).
    Put {
        path: String,
        data: serde_json::Value,
    },
    /// Merge each child of `data` into the node at `path`.
    Patch {
        path: String,
        data: serde_json::Value,
    },
}

/// Lifecycle of the background stream, observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Connecting,
    Open,
    Retrying { attempt: u32 },
    Closed,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
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

// ── EventStreamHandle ────────────────────────────────────────────────

/// Handle to a running event stream.
///
/// Drop the handle or call [`shutdown`](Self::shutdown) to tear down the
/// background task.
pub struct EventStreamHandle {
    event_rx: broadcast::Receiver<Arc<StoreEvent>>,
    status_rx: watch::Receiver<StreamStatus>,
    cancel: CancellationToken,
}

impl EventStreamHandle {
    /// Spawn the streaming loop for `url` (a REST URL from
    /// [`StoreClient::url_for`](crate::StoreClient::url_for)).
    ///
    /// Returns once the background task is spawned; the first connection
    /// attempt happens asynchronously.
    pub fn connect(
        url: Url,
        transport: &TransportConfig,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let http = transport.build_stream_client()?;
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(StreamStatus::Connecting);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            stream_loop(http, url, event_tx, status_tx, reconnect, task_cancel).await;
        });

        Ok(Self {
            event_rx,
            status_rx,
            cancel,
        })
    }

    /// Get a new broadcast receiver for the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StoreEvent>> {
        self.event_rx.resubscribe()
    }

    /// Observe connection status changes.
    pub fn status(&self) -> watch::Receiver<StreamStatus> {
        self.status_rx.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventStreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn stream_loop(
    http: reqwest::Client,
    url: Url,
    event_tx: broadcast::Sender<Arc<StoreEvent>>,
    status_tx: watch::Sender<StreamStatus>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&http, &url, &event_tx, &status_tx, &cancel) => {
                match result {
                    // Server closed the stream cleanly; reconnect immediately.
                    Ok(()) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        tracing::info!("event stream ended, reconnecting");
                        attempt = 0;
                    }
                    Err(e) if !is_retryable(&e) => {
                        tracing::error!(error = %e, "event stream stopped");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "event stream error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "event stream reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let _ = status_tx.send(StreamStatus::Retrying { attempt });
                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    let _ = status_tx.send(StreamStatus::Closed);
    tracing::debug!("event stream loop exiting");
}

fn is_retryable(err: &Error) -> bool {
    !matches!(
        err,
        Error::PermissionDenied { .. } | Error::StreamCancelled(_) | Error::InvalidUrl(_)
    )
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Open one streaming request and read frames until it drops.
async fn connect_and_read(
    http: &reqwest::Client,
    url: &Url,
    event_tx: &broadcast::Sender<Arc<StoreEvent>>,
    status_tx: &watch::Sender<StreamStatus>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(path = url.path(), "opening event stream");

    let resp = http
        .get(url.clone())
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| Error::Stream(redact(e).to_string()))?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "event stream rejected the auth token".into(),
        });
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::PermissionDenied {
            path: url.path().to_owned(),
        });
    }
    if !status.is_success() {
        return Err(Error::Stream(format!("HTTP {status}")));
    }

    let _ = status_tx.send(StreamStatus::Open);
    tracing::info!("event stream open");

    let mut body = resp.bytes_stream();
    let mut decoder = SseDecoder::default();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            chunk = body.next() => {
                match chunk {
                    Some(Ok(bytes)) => {
                        for frame in decoder.feed(&bytes) {
                            dispatch_frame(frame, event_tx)?;
                        }
                    }
                    Some(Err(e)) => return Err(Error::Stream(redact(e).to_string())),
                    None => return Ok(()),
                }
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// One `event:` / `data:` block, terminated by a blank line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` decoder. Chunks may split lines
/// (and UTF-8 sequences) anywhere; only complete lines are interpreted.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    current: SseFrame,
    has_data: bool,
}

impl SseDecoder {
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if self.has_data || !self.current.event.is_empty() {
                    frames.push(std::mem::take(&mut self.current));
                }
                self.has_data = false;
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => value.clone_into(&mut self.current.event),
                "data" => {
                    if self.has_data {
                        self.current.data.push('\n');
                    }
                    self.current.data.push_str(value);
                    self.has_data = true;
                }
                _ => tracing::trace!(field, "ignoring unknown SSE field"),
            }
        }

        frames
    }
}

/// Payload of `put` and `patch` frames.
#[derive(Debug, Deserialize)]
struct ChangePayload {
    path: String,
    data: serde_json::Value,
}

/// Turn a decoded frame into a broadcast event or a terminal error.
fn dispatch_frame(
    frame: SseFrame,
    event_tx: &broadcast::Sender<Arc<StoreEvent>>,
) -> Result<(), Error> {
    match frame.event.as_str() {
        "put" | "patch" => {
            let payload: ChangePayload = match serde_json::from_str(&frame.data) {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!(error = %e, event = %frame.event, "malformed change payload");
                    return Ok(());
                }
            };
            let event = if frame.event == "put" {
                StoreEvent::Put {
                    path: payload.path,
                    data: payload.data,
                }
            } else {
                StoreEvent::Patch {
                    path: payload.path,
                    data: payload.data,
                }
            };
            // Send errors only mean nobody is subscribed right now.
            let _ = event_tx.send(Arc::new(event));
            Ok(())
        }
        "keep-alive" => {
            tracing::trace!("event stream keep-alive");
            Ok(())
        }
        "cancel" => Err(Error::StreamCancelled(frame_reason(&frame.data))),
        "auth_revoked" => Err(Error::Authentication {
            message: format!("auth revoked: {}", frame_reason(&frame.data)),
        }),
        other => {
            tracing::debug!(event = other, "ignoring unknown stream event");
            Ok(())
        }
    }
}

/// `cancel` / `auth_revoked` carry either a JSON string or `null`.
fn frame_reason(data: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Null) => "no reason given".into(),
        _ if data.trim().is_empty() => "no reason given".into(),
        _ => data.to_owned(),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
