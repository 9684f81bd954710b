use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use gameport_core::{decode_line, map_frame, parse_line};

use crate::error::ConnectionError;
use crate::events::{LogEvent, SessionEvent};
use crate::session::Inner;
use crate::sink::DeviceSink;
use crate::transport::Transport;
use crate::types::{Failure, SessionState};

/// Resources held while connected. Dropping it closes the port and
/// removes the virtual device.
struct Link {
    transport: Box<dyn Transport>,
    sink: Box<dyn DeviceSink>,
}

/// How a connection attempt ended.
enum Outcome {
    Stopped,
    Failed(ConnectionError),
}

/// Starts the worker thread that owns the connection lifecycle.
///
/// The worker stops once every sender of `stop_rx` is dropped.
pub(crate) fn start_session_thread(
    inner: Arc<Inner>,
    port: String,
    stop_rx: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("gameport-session".into())
        .spawn(move || {
            Worker {
                inner,
                port,
                stop_rx,
            }
            .run();
        })
}

struct Worker {
    inner: Arc<Inner>,
    port: String,
    stop_rx: Receiver<()>,
}

impl Worker {
    fn run(self) {
        let config = &self.inner.config;
        let mut failures: u32 = 0;

        loop {
            self.set_state(SessionState::Connecting);
            self.log(LogEvent::Connecting {
                port: self.port.as_str().into(),
            });

            let outcome = match self.connect() {
                Ok(link) => {
                    failures = 0;
                    self.set_state(SessionState::Connected);
                    self.log(LogEvent::Connected {
                        port: self.port.as_str().into(),
                    });
                    self.pump(link)
                }
                Err(outcome) => outcome,
            };

            let err = match outcome {
                Outcome::Stopped => break,
                Outcome::Failed(err) => err,
            };

            let failure = Failure::from(&err);
            log::debug!("connection attempt on {} failed: {err:?}", self.port);
            self.log(LogEvent::Error(failure.clone()));
            self.set_state(SessionState::Failed(failure));

            failures += 1;
            if config.max_retries.is_some_and(|max| failures > max) {
                self.log(LogEvent::RetriesExhausted { attempts: failures });
                break;
            }

            self.log(LogEvent::Retrying {
                delay: config.retry_delay,
            });
            if self.wait(config.retry_delay) {
                break;
            }
        }

        self.log(LogEvent::Disconnected);
        self.set_state(SessionState::Idle);
    }

    /// Open the port, let the board settle, then acquire the virtual device.
    fn connect(&self) -> Result<Link, Outcome> {
        let config = &self.inner.config;
        let transport = self
            .inner
            .connector
            .open(&self.port, config)
            .map_err(|e| Outcome::Failed(ConnectionError::TransportOpen(e)))?;

        if self.wait(config.settle_delay) {
            self.set_state(SessionState::Disconnecting);
            drop(transport);
            return Err(Outcome::Stopped);
        }

        let sink = self
            .inner
            .provider
            .acquire(config.device_id)
            .map_err(|e| Outcome::Failed(ConnectionError::SinkAcquisition(e)))?;

        Ok(Link { transport, sink })
    }

    /// Read, decode and forward lines until stopped or a fatal error.
    /// The link is released before returning.
    fn pump(&self, mut link: Link) -> Outcome {
        loop {
            if self.stop_requested() {
                self.set_state(SessionState::Disconnecting);
                drop(link);
                return Outcome::Stopped;
            }

            let raw = match link.transport.read_line() {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    drop(link);
                    return Outcome::Failed(ConnectionError::TransportRead(e));
                }
            };

            let line = decode_line(&raw);
            if line.is_empty() {
                continue;
            }
            self.log(LogEvent::Raw(line.as_str().into()));

            let frame = match parse_line(&line) {
                Ok(frame) => frame,
                Err(reason) => {
                    self.log(LogEvent::Skipped(reason));
                    continue;
                }
            };

            let state = map_frame(&frame, self.inner.policy.load());
            if let Err(e) = link.sink.forward(&state) {
                drop(link);
                return Outcome::Failed(ConnectionError::SinkWrite(e));
            }
        }
    }

    fn stop_requested(&self) -> bool {
        !matches!(self.stop_rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// Sleep for `delay`. Returns `true` if a stop was requested meanwhile.
    fn wait(&self, delay: Duration) -> bool {
        !matches!(
            self.stop_rx.recv_timeout(delay),
            Err(RecvTimeoutError::Timeout)
        )
    }

    fn set_state(&self, state: SessionState) {
        if let Ok(mut current) = self.inner.state.write() {
            *current = state.clone();
        }
        log::debug!("session state: {state}");
        self.inner.broadcast(SessionEvent::StateChanged(state));
    }

    fn log(&self, event: LogEvent) {
        self.inner.broadcast(SessionEvent::Log(event));
    }
}
