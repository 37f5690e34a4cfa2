// ── Connection supervision ──
//
// Full lifecycle management for one OBS connection. `ObsSession` owns
// the supervisor loop: connect → relay events until the transport drops
// → wait the fixed reconnect delay → retry, forever, until cancelled.
// State is observable through a watch channel; the live `RemoteSession`
// handle is swapped in and out by the supervisor alone.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use obslink_api::RemoteSession;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::CoreError;
use crate::events::RemoteEvent;

const EVENT_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ─────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── ObsSession ──────────────────────────────────────────────────────

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc`. [`initialize`](Self::initialize) starts
/// the supervisor; every remote operation lives in the facade impl
/// (`ops` module) and short-circuits to a neutral value while the
/// connection is down.
#[derive(Clone)]
pub struct ObsSession {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    config: RwLock<ConnectionConfig>,
    state_tx: watch::Sender<ConnectionState>,
    remote: RwLock<Option<RemoteSession>>,
    event_tx: broadcast::Sender<RemoteEvent>,
    supervisor: Mutex<Option<Supervisor>>,
}

struct Supervisor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ObsSession {
    /// Create a session from configuration. Does NOT connect — call
    /// [`initialize`](Self::initialize) to start supervision.
    pub fn new(config: ConnectionConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Self {
            inner: Arc::new(SessionInner {
                config: RwLock::new(config),
                state_tx,
                remote: RwLock::new(None),
                event_tx,
                supervisor: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Start the supervisor loop. Idempotent: a no-op while one is
    /// already running, so a second host init never doubles
    /// subscriptions or reconnect timers.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        let mut guard = self.inner.supervisor.lock().await;
        if guard.is_some() {
            debug!("session already initialized");
            return Ok(());
        }
        read_lock(&self.inner.config).validate()?;
        *guard = Some(self.spawn_supervisor());
        Ok(())
    }

    /// Swap the configuration wholesale and restart supervision.
    ///
    /// The running supervisor is cancelled and awaited before the new
    /// one spawns, so two loops can never run in parallel.
    pub async fn replace_config(&self, config: ConnectionConfig) -> Result<(), CoreError> {
        config.validate()?;
        let mut guard = self.inner.supervisor.lock().await;
        if let Some(supervisor) = guard.take() {
            supervisor.cancel.cancel();
            let _ = supervisor.handle.await;
        }
        *write_lock(&self.inner.config) = config;
        *guard = Some(self.spawn_supervisor());
        Ok(())
    }

    /// Stop supervision and drop the connection.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.supervisor.lock().await;
        if let Some(supervisor) = guard.take() {
            supervisor.cancel.cancel();
            let _ = supervisor.handle.await;
        }
        *write_lock(&self.inner.remote) = None;
        let _ = self.inner.state_tx.send(ConnectionState::Disconnected);
    }

    fn spawn_supervisor(&self) -> Supervisor {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(supervise(Arc::clone(&self.inner), cancel.clone()));
        Supervisor { cancel, handle }
    }

    // ── Observation ─────────────────────────────────────────────────

    /// Whether the connection is up right now. Non-blocking.
    pub fn is_ready(&self) -> bool {
        *self.inner.state_tx.borrow() == ConnectionState::Connected
    }

    /// Watch the connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribe to relayed remote events. Fire-and-forget: events
    /// published while nobody listens are gone.
    pub fn events(&self) -> broadcast::Receiver<RemoteEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> ConnectionConfig {
        read_lock(&self.inner.config).clone()
    }

    /// The live protocol session, if connected. Used by the facade.
    pub(crate) fn remote(&self) -> Option<RemoteSession> {
        read_lock(&self.inner.remote).clone()
    }
}

// ── Supervisor loop ─────────────────────────────────────────────────

/// Connect → relay → disconnect → fixed delay → retry, until cancelled.
/// The loop structure guarantees exactly one reconnect is armed per
/// disconnect.
async fn supervise(inner: Arc<SessionInner>, cancel: CancellationToken) {
    loop {
        let config = read_lock(&inner.config).clone();
        let endpoint = config.endpoint();
        let _ = inner.state_tx.send(ConnectionState::Connecting);

        let connect = RemoteSession::connect(&endpoint, config.password_str(), config.protocol);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = inner.state_tx.send(ConnectionState::Disconnected);
                return;
            }
            result = connect => result,
        };

        match result {
            Ok(remote) => {
                info!(version = %config.protocol, endpoint, "connected to OBS");
                *write_lock(&inner.remote) = Some(remote.clone());
                let _ = inner.state_tx.send(ConnectionState::Connected);

                relay(&inner, &remote, &cancel, config.verbose_logging).await;

                *write_lock(&inner.remote) = None;
                let _ = inner.state_tx.send(ConnectionState::Disconnected);
                if cancel.is_cancelled() {
                    return;
                }
                warn!(
                    endpoint,
                    delay_secs = config.reconnect_delay.as_secs_f64(),
                    "connection to OBS lost, reconnecting"
                );
            }
            Err(e) => {
                let _ = inner.state_tx.send(ConnectionState::Disconnected);
                if config.verbose_logging {
                    debug!(endpoint, error = %e, "connect attempt failed");
                } else {
                    debug!(endpoint, "connect attempt failed");
                }
            }
        }

        if !wait_for_retry(&cancel, config.reconnect_delay).await {
            let _ = inner.state_tx.send(ConnectionState::Disconnected);
            return;
        }
    }
}

/// Sleep out the reconnect delay. Returns `false` when cancelled.
async fn wait_for_retry(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

/// Forward remote notifications into the host event channel until the
/// transport drops or the supervisor is cancelled.
///
/// The protocol subscription dies with the connection's reader task, so
/// a reconnect can never double-deliver.
async fn relay(
    inner: &SessionInner,
    remote: &RemoteSession,
    cancel: &CancellationToken,
    verbose: bool,
) {
    let closed = remote.closed();
    let mut events = remote.events();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = closed.cancelled() => return,
            event = events.recv() => match event {
                Ok(protocol_event) => {
                    let event = RemoteEvent::from_protocol(protocol_event);
                    if verbose {
                        debug!(event_id = event.event_id(), "relaying remote event");
                    }
                    let _ = inner.event_tx.send(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event relay lagged, notifications dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        }
    }
}

// ── Lock helpers ────────────────────────────────────────────────────
//
// Lock poisoning cannot corrupt these values (plain data, no partial
// writes), so a poisoned guard is recovered rather than propagated.

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_disconnected_and_not_ready() {
        let session = ObsSession::new(ConnectionConfig::default());
        assert!(!session.is_ready());
        assert_eq!(*session.state().borrow(), ConnectionState::Disconnected);
        assert!(session.remote().is_none());
    }

    #[tokio::test]
    async fn initialize_rejects_invalid_config() {
        let config = ConnectionConfig {
            host: String::new(),
            ..ConnectionConfig::default()
        };
        let session = ObsSession::new(config);
        assert!(matches!(
            session.initialize().await,
            Err(CoreError::Config { .. })
        ));
    }
}
