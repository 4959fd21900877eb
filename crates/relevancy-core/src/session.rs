// ── Site session ──
//
// Full lifecycle management for one bound site: initial load, a serialized
// write queue for optimistic inserts, and (optionally) a live event-stream
// bridge that keeps the SiteStore in step with the remote document.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relevancy_api::transport::{TlsMode, TransportConfig};
use relevancy_api::{EventStreamHandle, ReconnectConfig, StoreClient, StorePath, StreamStatus};

use crate::binding::{CaseRemover, LiveSite};
use crate::config::{SessionConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{Case, CaseId, Site};
use crate::store::SiteStore;
use crate::stream::SiteStream;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

// ── Write queue ──────────────────────────────────────────────────

#[derive(Debug)]
enum WriteRequest {
    PutCase { id: CaseId, case: Case },
    /// Reply with the first write failure since the previous flush.
    Flush {
        reply: oneshot::Sender<Result<(), CoreError>>,
    },
}

// ── SiteSession ──────────────────────────────────────────────────

/// A live binding to `sites/<site>` in the store.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Implements [`LiveSite`] and
/// [`CaseRemover`], so one session backs a `CaseController` on its own.
#[derive(Clone)]
pub struct SiteSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    store: Arc<SiteStore>,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    /// Child token for the current connection, replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    client: Mutex<Option<StoreClient>>,
    /// Sender half of the write queue; `None` while disconnected.
    writes: ArcSwapOption<mpsc::UnboundedSender<WriteRequest>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    stream_handle: Mutex<Option<EventStreamHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SiteSession {
    /// Create a new session from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to load the site and start background tasks.
    pub fn new(config: SessionConfig) -> Self {
        let store = Arc::new(SiteStore::new(config.site.clone()));
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(SessionInner {
                config,
                store,
                connection_state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                client: Mutex::new(None),
                writes: ArcSwapOption::empty(),
                writer: Mutex::new(None),
                stream_handle: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Access the underlying SiteStore.
    pub fn store(&self) -> &Arc<SiteStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the store.
    ///
    /// Loads the site document, spawns the write processor and, when
    /// streaming is enabled, the event-stream bridge.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        // Fresh child token for this connection (supports reconnect).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        match self.establish(&child).await {
            Ok(()) => {
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Connected);
                info!(site = %self.inner.config.site, "site session connected");
                Ok(())
            }
            Err(e) => {
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Failed);
                Err(e)
            }
        }
    }

    async fn establish(&self, child: &CancellationToken) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let transport = build_transport(config);
        let client = StoreClient::new(config.root.clone(), config.auth_token.clone(), &transport)?;
        let site_path = StorePath::site(&config.site)?;

        // Initial data load
        load_site(&client, &site_path, &self.inner.store).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_processor_task(
            client.clone(),
            config.site.clone(),
            rx,
        ));
        *self.inner.writer.lock().await = Some(writer);
        self.inner.writes.store(Some(Arc::new(tx)));

        if config.streaming {
            self.spawn_event_stream(&client, &site_path, &transport, child)
                .await;
        }

        *self.inner.client.lock().await = Some(client);
        Ok(())
    }

    /// Spawn the event stream and a bridge task that applies its changes
    /// to the SiteStore and mirrors its status into `connection_state`.
    ///
    /// Non-fatal on failure: the session keeps its initial snapshot.
    async fn spawn_event_stream(
        &self,
        client: &StoreClient,
        site_path: &StorePath,
        transport: &TransportConfig,
        cancel: &CancellationToken,
    ) {
        let url = match client.url_for(site_path) {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "invalid event stream URL");
                return;
            }
        };

        let stream_cancel = cancel.child_token();
        let handle = match EventStreamHandle::connect(
            url,
            transport,
            ReconnectConfig::default(),
            stream_cancel.clone(),
        ) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "event stream unavailable (non-fatal)");
                return;
            }
        };

        let mut events = handle.subscribe();
        let mut status = handle.status();
        let session = self.clone();
        let client = client.clone();
        let site_path = site_path.clone();

        let bridge = tokio::spawn(async move {
            let store = Arc::clone(&session.inner.store);
            loop {
                tokio::select! {
                    biased;
                    () = stream_cancel.cancelled() => break,
                    result = events.recv() => {
                        match result {
                            Ok(event) => store.apply_event(&event),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!(skipped = n, "event bridge lagged, reloading site");
                                if let Err(e) = load_site(&client, &site_path, &store).await {
                                    warn!(error = %e, "site reload failed");
                                }
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current = status.borrow_and_update().clone();
                        session.apply_stream_status(&current, &stream_cancel);
                    }
                }
            }
        });

        self.inner.task_handles.lock().await.push(bridge);
        *self.inner.stream_handle.lock().await = Some(handle);
        info!("event stream spawned");
    }

    fn apply_stream_status(&self, status: &StreamStatus, cancel: &CancellationToken) {
        let next = match status {
            StreamStatus::Connecting => return,
            StreamStatus::Open => ConnectionState::Connected,
            StreamStatus::Retrying { attempt } => ConnectionState::Reconnecting { attempt: *attempt },
            StreamStatus::Closed if cancel.is_cancelled() => return,
            StreamStatus::Closed => ConnectionState::Failed,
        };
        debug!(state = ?next, "event stream state changed");
        self.inner.connection_state.send_replace(next);
    }

    /// Disconnect from the store.
    ///
    /// Closes the write queue and waits for queued writes to finish, then
    /// cancels background tasks and resets the connection state to
    /// [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        // Dropping the only sender lets the writer drain and exit.
        self.inner.writes.store(None);
        if let Some(writer) = self.inner.writer.lock().await.take() {
            if let Err(e) = writer.await {
                warn!(error = %e, "write processor task failed");
            }
        }

        // Cancel the child token (not the parent -- allows reconnect).
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(handle) = self.inner.stream_handle.lock().await.take() {
            handle.shutdown();
        }
        *self.inner.client.lock().await = None;

        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Wait for every queued write to reach the store.
    ///
    /// Returns the first write failure since the previous flush.
    pub async fn flush(&self) -> Result<(), CoreError> {
        let (reply, rx) = oneshot::channel();
        {
            let writes = self.inner.writes.load();
            let Some(tx) = &*writes else {
                return Err(CoreError::SessionClosed);
            };
            tx.send(WriteRequest::Flush { reply })
                .map_err(|_| CoreError::SessionClosed)?;
        }
        rx.await.map_err(|_| CoreError::SessionClosed)?
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Optimized for CLI: disables the event stream since we only need
    /// a single request-response cycle.
    pub async fn oneshot<F, Fut, T>(config: SessionConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(SiteSession) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.streaming = false;

        let session = SiteSession::new(cfg);
        session.connect().await?;
        let result = f(session.clone()).await;
        session.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }
}

// ── Collaborator implementations ─────────────────────────────────

impl LiveSite for SiteSession {
    fn site_id(&self) -> &str {
        &self.inner.config.site
    }

    fn snapshot(&self) -> Arc<Site> {
        self.inner.store.snapshot()
    }

    fn subscribe(&self) -> SiteStream {
        self.inner.store.subscribe()
    }

    fn insert_case(&self, id: CaseId, case: Case) -> Result<(), CoreError> {
        let writes = self.inner.writes.load();
        let Some(tx) = &*writes else {
            return Err(CoreError::SessionClosed);
        };

        // Validate the remote path first so the mirror never holds a case
        // that cannot be written.
        StorePath::case(&self.inner.config.site, id.as_str())?;

        self.inner.store.set_case(&id, &case)?;
        tx.send(WriteRequest::PutCase { id, case })
            .map_err(|_| CoreError::SessionClosed)
    }
}

#[async_trait]
impl CaseRemover for SiteSession {
    async fn remove_case(&self, id: &CaseId) -> Result<(), CoreError> {
        let client = self
            .inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::SessionClosed)?;
        let path = StorePath::case(&self.inner.config.site, id.as_str())?;

        client.delete(&path).await?;
        debug!(case = %id, "case deleted");
        Ok(())
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Apply queued writes in order. Runs until every sender is dropped,
/// so a disconnect never loses a write that was already accepted.
async fn write_processor_task(
    client: StoreClient,
    site: String,
    mut rx: mpsc::UnboundedReceiver<WriteRequest>,
) {
    let mut first_error: Option<CoreError> = None;

    while let Some(request) = rx.recv().await {
        match request {
            WriteRequest::PutCase { id, case } => {
                let result = match StorePath::case(&site, id.as_str()) {
                    Ok(path) => client.put(&path, &case).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(()) => debug!(case = %id, "case written"),
                    Err(e) => {
                        warn!(case = %id, error = %e, "case write failed");
                        first_error.get_or_insert(e.into());
                    }
                }
            }
            WriteRequest::Flush { reply } => {
                let result = first_error.take().map_or(Ok(()), Err);
                let _ = reply.send(result);
            }
        }
    }

    debug!("write processor exiting");
}

// ── Helpers ──────────────────────────────────────────────────────

/// Fetch the site document and replace the store's mirror with it.
async fn load_site(
    client: &StoreClient,
    site_path: &StorePath,
    store: &SiteStore,
) -> Result<(), CoreError> {
    let document: Option<Value> = client.get_with_priority(site_path).await?;
    if document.is_none() {
        debug!(site = store.site_id(), "site has no data yet");
    }
    store.replace(document.unwrap_or(Value::Null));
    Ok(())
}

/// Build a [`TransportConfig`] from the session configuration.
fn build_transport(config: &SessionConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
