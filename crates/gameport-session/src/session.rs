use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Sender};
use gameport_core::{AtomicAxisPolicy, AxisPolicy};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::events::{EventReceiver, SessionEvent};
use crate::runtime::start_session_thread;
use crate::sink::SinkProvider;
use crate::transport::Connector;
use crate::types::SessionState;

/// Shared state used by the session handle and its worker thread.
pub(crate) struct Inner {
    pub subscribers: Mutex<Vec<Sender<SessionEvent>>>,
    pub state: RwLock<SessionState>,
    pub policy: AtomicAxisPolicy,
    pub config: SessionConfig,
    pub connector: Box<dyn Connector>,
    pub provider: Box<dyn SinkProvider>,
}

impl Inner {
    pub(crate) fn broadcast(&self, event: SessionEvent) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

struct Worker {
    port: String,
    handle: JoinHandle<()>,
    /// Dropping the sender is the stop signal.
    #[allow(dead_code)]
    stop_tx: Sender<()>,
}

/// Owns the lifecycle of one serial connection: connect, forward frames,
/// reconnect after failures, stop on request.
///
/// At most one worker thread runs at a time; it is joined before a new one
/// is started.
pub struct ConnectionSession {
    inner: Arc<Inner>,
    worker: Mutex<Option<Worker>>,
}

impl ConnectionSession {
    /// Creates an idle session.
    pub fn new<C, P>(connector: C, provider: P, config: SessionConfig) -> Self
    where
        C: Connector + 'static,
        P: SinkProvider + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(Vec::new()),
                state: RwLock::new(SessionState::Idle),
                policy: AtomicAxisPolicy::default(),
                config,
                connector: Box::new(connector),
                provider: Box::new(provider),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Subscribes to state changes and log events. Dropped subscribers are
    /// cleaned automatically.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = unbounded();
        if let Ok(mut subs) = self.inner.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    /// Starts connecting to `port`. Fails if a worker is already running.
    pub fn start(&self, port: &str) -> Result<()> {
        let mut worker = self.lock_worker();
        if let Some(current) = worker.as_ref() {
            if !current.handle.is_finished() {
                return Err(SessionError::AlreadyRunning(current.port.clone()));
            }
        }
        if let Some(finished) = worker.take() {
            join(finished);
        }

        let (stop_tx, stop_rx) = bounded(1);
        let handle = start_session_thread(self.inner.clone(), port.to_owned(), stop_rx)?;
        *worker = Some(Worker {
            port: port.to_owned(),
            handle,
            stop_tx,
        });
        Ok(())
    }

    /// Stops the session and waits for the worker to release the port and
    /// the virtual device. Cancels a pending retry. No-op when idle.
    pub fn stop(&self) {
        let worker = self.lock_worker().take();
        if let Some(worker) = worker {
            join(worker);
        }
    }

    /// Starts when stopped and stops when running.
    /// Returns whether the session is running afterwards.
    pub fn toggle(&self, port: &str) -> Result<bool> {
        if self.is_running() {
            self.stop();
            Ok(false)
        } else {
            self.start(port)?;
            Ok(true)
        }
    }

    /// Whether a worker is alive, including while waiting to retry.
    pub fn is_running(&self) -> bool {
        self.lock_worker()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Port of the current or last started worker.
    pub fn port(&self) -> Option<String> {
        self.lock_worker().as_ref().map(|worker| worker.port.clone())
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner
            .state
            .read()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Returns the policy the next frame will be mapped with.
    pub fn policy(&self) -> AxisPolicy {
        self.inner.policy.load()
    }

    /// Replaces the mapping policy. Safe to call while connected; applies
    /// from the next received frame.
    pub fn update_policy(&self, policy: AxisPolicy) {
        self.inner.policy.store(policy);
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<Worker>> {
        self.worker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join(worker: Worker) {
    let Worker {
        port,
        handle,
        stop_tx,
    } = worker;
    drop(stop_tx);
    if handle.join().is_err() {
        log::error!("session worker for {port} panicked");
    }
}
